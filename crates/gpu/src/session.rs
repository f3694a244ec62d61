//! GPU resource lifecycle driven by the host's layer callbacks.
//!
//! The host calls `initialize` once a context exists, renders any number of
//! frames, may report that the context was lost, and finally calls
//! `deinitialize`. The session state is a typed enum: GPU handles only exist
//! inside [`SessionState::Ready`], so drawing without a linked program cannot
//! be expressed.

use std::fmt;

use foundation::math::Mat4;

use crate::context::{GlApi, ShaderKind};
use crate::renderer::FramePass;
use crate::shaders::{
    ATTRIB_NORMAL, ATTRIB_POSITION, ShaderSources, UNIFORM_MODEL, UNIFORM_PROJECTION,
};

#[derive(Debug, thiserror::Error)]
pub enum GpuInitError {
    #[error("could not create {object}: {reason}")]
    CreateObject { object: &'static str, reason: String },
    #[error("{kind} shader failed to compile: {log}")]
    Compile { kind: ShaderKind, log: String },
    #[error("shader program failed to link: {log}")]
    Link { log: String },
    #[error("attribute {0:?} not found in program")]
    MissingAttribute(&'static str),
    #[error("uniform {0:?} not found in program")]
    MissingUniform(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("render session is not ready (phase: {0})")]
    NotReady(SessionPhase),
    #[error("render session is already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Init(#[from] GpuInitError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Ready,
    Lost,
    Deinitialized,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Ready => "ready",
            SessionPhase::Lost => "context lost",
            SessionPhase::Deinitialized => "deinitialized",
        };
        f.write_str(name)
    }
}

/// Handles owned by a ready session.
pub struct GpuResources<G: GlApi> {
    pub(crate) program: G::Program,
    pub(crate) vertex_shader: G::Shader,
    pub(crate) fragment_shader: G::Shader,
    pub(crate) position_attrib: u32,
    pub(crate) normal_attrib: u32,
    pub(crate) projection_uniform: G::UniformLocation,
    pub(crate) model_uniform: G::UniformLocation,
    pub(crate) vertex_buffer: G::Buffer,
    pub(crate) index_buffer: G::Buffer,
}

impl<G: GlApi> GpuResources<G> {
    fn release(self, gl: &G) {
        gl.delete_buffer(self.vertex_buffer);
        gl.delete_buffer(self.index_buffer);
        for shader in [self.vertex_shader, self.fragment_shader] {
            gl.detach_shader(self.program, shader);
            gl.delete_shader(shader);
        }
        gl.delete_program(self.program);
    }
}

impl<G: GlApi> fmt::Debug for GpuResources<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResources")
            .field("program", &self.program)
            .field("position_attrib", &self.position_attrib)
            .field("normal_attrib", &self.normal_attrib)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .finish_non_exhaustive()
    }
}

pub enum SessionState<G: GlApi> {
    Uninitialized,
    Ready(GpuResources<G>),
    Lost,
    Deinitialized,
}

impl<G: GlApi> SessionState<G> {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Uninitialized => SessionPhase::Uninitialized,
            SessionState::Ready(_) => SessionPhase::Ready,
            SessionState::Lost => SessionPhase::Lost,
            SessionState::Deinitialized => SessionPhase::Deinitialized,
        }
    }
}

impl<G: GlApi> fmt::Debug for SessionState<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Ready(resources) => f.debug_tuple("Ready").field(resources).finish(),
            other => write!(f, "{:?}", other.phase()),
        }
    }
}

/// Objects created during `initialize`, deleted again unless initialization
/// completes.
struct PendingObjects<'g, G: GlApi> {
    gl: &'g G,
    shaders: Vec<G::Shader>,
    program: Option<G::Program>,
    attached: bool,
    buffers: Vec<G::Buffer>,
}

impl<'g, G: GlApi> PendingObjects<'g, G> {
    fn new(gl: &'g G) -> Self {
        Self {
            gl,
            shaders: Vec::with_capacity(2),
            program: None,
            attached: false,
            buffers: Vec::with_capacity(2),
        }
    }

    fn commit(mut self) {
        self.shaders.clear();
        self.program = None;
        self.buffers.clear();
    }
}

impl<G: GlApi> Drop for PendingObjects<'_, G> {
    fn drop(&mut self) {
        for buffer in self.buffers.drain(..) {
            self.gl.delete_buffer(buffer);
        }
        for shader in self.shaders.drain(..) {
            if let (Some(program), true) = (self.program, self.attached) {
                self.gl.detach_shader(program, shader);
            }
            self.gl.delete_shader(shader);
        }
        if let Some(program) = self.program.take() {
            self.gl.delete_program(program);
        }
    }
}

#[derive(Debug)]
pub struct RenderSession<G: GlApi> {
    sources: ShaderSources,
    state: SessionState<G>,
}

impl<G: GlApi> Default for RenderSession<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GlApi> RenderSession<G> {
    pub fn new() -> Self {
        Self::with_shaders(ShaderSources::default())
    }

    pub fn with_shaders(sources: ShaderSources) -> Self {
        Self {
            sources,
            state: SessionState::Uninitialized,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Compile and link the program and allocate the shared buffers.
    ///
    /// Allowed from every phase except `Ready`. On failure every object
    /// created so far is deleted and the phase is left unchanged.
    pub fn initialize(&mut self, gl: &G) -> Result<(), SessionError> {
        if self.is_ready() {
            return Err(SessionError::AlreadyInitialized);
        }

        let resources = match build_resources(gl, &self.sources) {
            Ok(resources) => resources,
            Err(err) => {
                tracing::error!("render session initialization failed: {err}");
                return Err(err.into());
            }
        };
        tracing::debug!(program = ?resources.program, "render session ready");
        self.state = SessionState::Ready(resources);
        Ok(())
    }

    /// Start drawing a frame: applies the frame's GL state and uploads the
    /// projection matrix once.
    pub fn begin_frame<'a>(
        &'a self,
        gl: &'a G,
        projection: &Mat4,
    ) -> Result<FramePass<'a, G>, SessionError> {
        match &self.state {
            SessionState::Ready(resources) => Ok(FramePass::begin(gl, resources, projection)),
            other => Err(SessionError::NotReady(other.phase())),
        }
    }

    /// The context is gone and took every handle with it. No GL calls are made.
    pub fn context_lost(&mut self) {
        if self.is_ready() {
            tracing::info!("GL context lost; render session handles dropped");
            self.state = SessionState::Lost;
        }
    }

    /// Release GPU objects if the session holds any. Safe to call repeatedly.
    pub fn deinitialize(&mut self, gl: &G) {
        match std::mem::replace(&mut self.state, SessionState::Deinitialized) {
            SessionState::Ready(resources) => {
                resources.release(gl);
                tracing::debug!("render session released");
            }
            previous => {
                tracing::trace!(phase = %previous.phase(), "deinitialize without live handles");
            }
        }
    }
}

fn build_resources<G: GlApi>(
    gl: &G,
    sources: &ShaderSources,
) -> Result<GpuResources<G>, GpuInitError> {
    let mut pending = PendingObjects::new(gl);

    let vertex_shader = compile(&mut pending, ShaderKind::Vertex, &sources.vertex)?;
    let fragment_shader = compile(&mut pending, ShaderKind::Fragment, &sources.fragment)?;

    let program = gl
        .create_program()
        .map_err(|reason| GpuInitError::CreateObject {
            object: "program",
            reason,
        })?;
    pending.program = Some(program);
    gl.attach_shader(program, vertex_shader);
    gl.attach_shader(program, fragment_shader);
    pending.attached = true;
    gl.link_program(program);
    if !gl.program_link_status(program) {
        return Err(GpuInitError::Link {
            log: gl.program_info_log(program),
        });
    }

    let position_attrib = gl
        .attrib_location(program, ATTRIB_POSITION)
        .ok_or(GpuInitError::MissingAttribute(ATTRIB_POSITION))?;
    let normal_attrib = gl
        .attrib_location(program, ATTRIB_NORMAL)
        .ok_or(GpuInitError::MissingAttribute(ATTRIB_NORMAL))?;
    let projection_uniform = gl
        .uniform_location(program, UNIFORM_PROJECTION)
        .ok_or(GpuInitError::MissingUniform(UNIFORM_PROJECTION))?;
    let model_uniform = gl
        .uniform_location(program, UNIFORM_MODEL)
        .ok_or(GpuInitError::MissingUniform(UNIFORM_MODEL))?;

    let vertex_buffer = create_buffer(&mut pending, "vertex buffer")?;
    let index_buffer = create_buffer(&mut pending, "index buffer")?;

    pending.commit();
    Ok(GpuResources {
        program,
        vertex_shader,
        fragment_shader,
        position_attrib,
        normal_attrib,
        projection_uniform,
        model_uniform,
        vertex_buffer,
        index_buffer,
    })
}

fn compile<G: GlApi>(
    pending: &mut PendingObjects<'_, G>,
    kind: ShaderKind,
    source: &str,
) -> Result<G::Shader, GpuInitError> {
    let gl = pending.gl;
    let shader = gl
        .create_shader(kind)
        .map_err(|reason| GpuInitError::CreateObject {
            object: "shader",
            reason,
        })?;
    pending.shaders.push(shader);
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.shader_compile_status(shader) {
        return Err(GpuInitError::Compile {
            kind,
            log: gl.shader_info_log(shader),
        });
    }
    Ok(shader)
}

fn create_buffer<G: GlApi>(
    pending: &mut PendingObjects<'_, G>,
    object: &'static str,
) -> Result<G::Buffer, GpuInitError> {
    let buffer = pending
        .gl
        .create_buffer()
        .map_err(|reason| GpuInitError::CreateObject { object, reason })?;
    pending.buffers.push(buffer);
    Ok(buffer)
}
