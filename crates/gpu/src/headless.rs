//! A recording GL device with no real context behind it.
//!
//! Used for tests and for dry runs from the command line: every call is
//! appended to a log, object lifetimes are tracked so leaks and double
//! deletes are visible, and compile/link failures can be forced.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use crate::context::{
    BufferTarget, BufferUsage, Capability, CullFace, DepthFunc, FrontFace, GlApi, ShaderKind,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader { shader: u32, kind: ShaderKind },
    ShaderSource { shader: u32 },
    CompileShader { shader: u32 },
    DeleteShader { shader: u32 },
    CreateProgram { program: u32 },
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram { program: u32 },
    UseProgram { program: Option<u32> },
    DeleteProgram { program: u32 },
    CreateBuffer { buffer: u32 },
    BindBuffer { target: BufferTarget, buffer: Option<u32> },
    BufferData { target: BufferTarget, bytes: usize, usage: BufferUsage },
    DeleteBuffer { buffer: u32 },
    EnableVertexAttribArray { index: u32 },
    VertexAttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    UniformMatrix4 { location: u32, value: [f32; 16] },
    Enable(Capability),
    Disable(Capability),
    DepthMask(bool),
    DepthFunc(DepthFunc),
    FrontFace(FrontFace),
    CullFace(CullFace),
    DrawTriangles { count: i32, offset: i32 },
}

#[derive(Debug, Default)]
pub struct HeadlessGl {
    next_handle: Cell<u32>,
    calls: RefCell<Vec<GlCall>>,
    live: RefCell<BTreeSet<u32>>,
    shader_kinds: RefCell<BTreeMap<u32, ShaderKind>>,
    locations: RefCell<BTreeMap<(u32, String), u32>>,
    invalid_deletes: Cell<u32>,
    fail_compile: Option<ShaderKind>,
    fail_link: bool,
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shaders of `kind` report a failed compile.
    pub fn failing_compile(kind: ShaderKind) -> Self {
        Self {
            fail_compile: Some(kind),
            ..Self::default()
        }
    }

    /// Programs report a failed link.
    pub fn failing_link() -> Self {
        Self {
            fail_link: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn draw_calls(&self) -> Vec<(i32, i32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                GlCall::DrawTriangles { count, offset } => Some((*count, *offset)),
                _ => None,
            })
            .collect()
    }

    /// Objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.live.borrow().len()
    }

    /// Deletes of handles that were never created or already deleted.
    pub fn invalid_deletes(&self) -> u32 {
        self.invalid_deletes.get()
    }

    /// Simulate the context going away: every object is gone with it.
    pub fn lose_context(&self) {
        self.live.borrow_mut().clear();
        self.shader_kinds.borrow_mut().clear();
        self.locations.borrow_mut().clear();
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn alloc(&self) -> u32 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        self.live.borrow_mut().insert(handle);
        handle
    }

    fn release(&self, handle: u32) {
        if !self.live.borrow_mut().remove(&handle) {
            self.invalid_deletes.set(self.invalid_deletes.get() + 1);
        }
    }

    fn location(&self, program: u32, name: &str) -> u32 {
        let mut locations = self.locations.borrow_mut();
        let next = locations.keys().filter(|(p, _)| *p == program).count() as u32;
        *locations.entry((program, name.to_string())).or_insert(next)
    }
}

impl GlApi for HeadlessGl {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type UniformLocation = u32;

    fn create_shader(&self, kind: ShaderKind) -> Result<u32, String> {
        let shader = self.alloc();
        self.shader_kinds.borrow_mut().insert(shader, kind);
        self.record(GlCall::CreateShader { shader, kind });
        Ok(shader)
    }

    fn shader_source(&self, shader: u32, _source: &str) {
        self.record(GlCall::ShaderSource { shader });
    }

    fn compile_shader(&self, shader: u32) {
        self.record(GlCall::CompileShader { shader });
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        let kind = self.shader_kinds.borrow().get(&shader).copied();
        kind.is_some() && kind != self.fail_compile
    }

    fn shader_info_log(&self, shader: u32) -> String {
        if self.shader_compile_status(shader) {
            String::new()
        } else {
            format!("ERROR: 0:1: shader {shader} rejected by headless device")
        }
    }

    fn delete_shader(&self, shader: u32) {
        self.release(shader);
        self.shader_kinds.borrow_mut().remove(&shader);
        self.record(GlCall::DeleteShader { shader });
    }

    fn create_program(&self) -> Result<u32, String> {
        let program = self.alloc();
        self.record(GlCall::CreateProgram { program });
        Ok(program)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(GlCall::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.record(GlCall::DetachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        self.record(GlCall::LinkProgram { program });
    }

    fn program_link_status(&self, program: u32) -> bool {
        !self.fail_link && self.live.borrow().contains(&program)
    }

    fn program_info_log(&self, program: u32) -> String {
        if self.program_link_status(program) {
            String::new()
        } else {
            format!("program {program} failed to link on headless device")
        }
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(GlCall::UseProgram { program });
    }

    fn delete_program(&self, program: u32) {
        self.release(program);
        self.record(GlCall::DeleteProgram { program });
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        self.live
            .borrow()
            .contains(&program)
            .then(|| self.location(program, name))
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        self.attrib_location(program, name)
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let buffer = self.alloc();
        self.record(GlCall::CreateBuffer { buffer });
        Ok(buffer)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<u32>) {
        self.record(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.record(GlCall::BufferData {
            target,
            bytes: data.len(),
            usage,
        });
    }

    fn delete_buffer(&self, buffer: u32) {
        self.release(buffer);
        self.record(GlCall::DeleteBuffer { buffer });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray { index });
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn uniform_matrix_4_f32(&self, location: &u32, value: &[f32; 16]) {
        self.record(GlCall::UniformMatrix4 {
            location: *location,
            value: *value,
        });
    }

    fn enable(&self, capability: Capability) {
        self.record(GlCall::Enable(capability));
    }

    fn disable(&self, capability: Capability) {
        self.record(GlCall::Disable(capability));
    }

    fn depth_mask(&self, write: bool) {
        self.record(GlCall::DepthMask(write));
    }

    fn depth_func(&self, func: DepthFunc) {
        self.record(GlCall::DepthFunc(func));
    }

    fn front_face(&self, face: FrontFace) {
        self.record(GlCall::FrontFace(face));
    }

    fn cull_face(&self, face: CullFace) {
        self.record(GlCall::CullFace(face));
    }

    fn draw_triangles_u32(&self, count: i32, offset: i32) {
        self.record(GlCall::DrawTriangles { count, offset });
    }
}
