//! The GL-style device the model layer draws through.
//!
//! The host owns the context; the layer only borrows it for the duration of
//! a lifecycle callback. Implementations wrap the host's GL bindings (or a
//! recording device in tests) and are expected to be used from the thread
//! that owns the context.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub const fn gl_enum(self) -> u32 {
        match self {
            ShaderKind::Vertex => 0x8B31,
            ShaderKind::Fragment => 0x8B30,
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => write!(f, "vertex"),
            ShaderKind::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    pub const fn gl_enum(self) -> u32 {
        match self {
            BufferTarget::Array => 0x8892,
            BufferTarget::ElementArray => 0x8893,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    DynamicDraw,
}

impl BufferUsage {
    pub const fn gl_enum(self) -> u32 {
        match self {
            BufferUsage::DynamicDraw => 0x88E8,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    StencilTest,
    Blend,
}

impl Capability {
    pub const fn gl_enum(self) -> u32 {
        match self {
            Capability::DepthTest => 0x0B71,
            Capability::CullFace => 0x0B44,
            Capability::StencilTest => 0x0B90,
            Capability::Blend => 0x0BE2,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    Less,
}

impl DepthFunc {
    pub const fn gl_enum(self) -> u32 {
        match self {
            DepthFunc::Less => 0x0201,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
}

impl FrontFace {
    pub const fn gl_enum(self) -> u32 {
        match self {
            FrontFace::Ccw => 0x0901,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CullFace {
    Back,
}

impl CullFace {
    pub const fn gl_enum(self) -> u32 {
        match self {
            CullFace::Back => 0x0405,
        }
    }
}

/// GL primitives consumed by the render session.
///
/// Object handles are associated types so a handle can never be confused
/// with a plain integer (and a null handle can never be drawn with).
pub trait GlApi {
    type Shader: Copy + Eq + fmt::Debug;
    type Program: Copy + Eq + fmt::Debug;
    type Buffer: Copy + Eq + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;

    fn create_shader(&self, kind: ShaderKind) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn enable_vertex_attrib_array(&self, index: u32);
    /// `glVertexAttribPointer` with `GL_FLOAT` components, not normalized.
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);
    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, value: &[f32; 16]);

    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn depth_mask(&self, write: bool);
    fn depth_func(&self, func: DepthFunc);
    fn front_face(&self, face: FrontFace);
    fn cull_face(&self, face: CullFace);

    /// `glDrawElements(GL_TRIANGLES, count, GL_UNSIGNED_INT, offset)` on the
    /// bound element array buffer.
    fn draw_triangles_u32(&self, count: i32, offset: i32);
}
