use formats::{DecodedModel, ModelVertex};
use foundation::math::Mat4;

use crate::context::{
    BufferTarget, BufferUsage, Capability, CullFace, DepthFunc, FrontFace, GlApi,
};
use crate::session::GpuResources;

/// GL state every model frame relies on. The host may have left anything
/// bound, so it is set unconditionally at the start of each frame.
pub fn apply_frame_state<G: GlApi>(gl: &G) {
    gl.enable(Capability::DepthTest);
    gl.depth_mask(true);
    gl.depth_func(DepthFunc::Less);
    gl.enable(Capability::CullFace);
    gl.cull_face(CullFace::Back);
    // Front faces are CCW after the shader's xzy swizzle; they would be CW in xyz order.
    gl.front_face(FrontFace::Ccw);
    gl.disable(Capability::StencilTest);
    gl.disable(Capability::Blend);
}

/// One frame's worth of draws through a ready session.
#[derive(Debug)]
pub struct FramePass<'a, G: GlApi> {
    gl: &'a G,
    resources: &'a GpuResources<G>,
    draws: usize,
}

impl<'a, G: GlApi> FramePass<'a, G> {
    pub(crate) fn begin(gl: &'a G, resources: &'a GpuResources<G>, projection: &Mat4) -> Self {
        gl.use_program(Some(resources.program));
        apply_frame_state(gl);
        gl.uniform_matrix_4_f32(&resources.projection_uniform, &projection.to_cols_array_f32());
        Self {
            gl,
            resources,
            draws: 0,
        }
    }

    /// Upload `model` into the shared buffers and draw it with `model_matrix`.
    ///
    /// Returns `false` without touching GL when the model has nothing to draw
    /// or does not fit the GL index count.
    pub fn draw(&mut self, model_matrix: &Mat4, model: &DecodedModel) -> bool {
        if model.vertex_count() == 0 || model.index_count() == 0 {
            tracing::trace!(name = model.name(), "empty model, nothing to draw");
            return false;
        }
        let Ok(count) = i32::try_from(model.index_count()) else {
            tracing::warn!(
                name = model.name(),
                indices = model.index_count(),
                "model has too many indices for a single draw"
            );
            return false;
        };

        let gl = self.gl;
        let res = self.resources;
        gl.uniform_matrix_4_f32(&res.model_uniform, &model_matrix.to_cols_array_f32());

        gl.bind_buffer(BufferTarget::Array, Some(res.vertex_buffer));
        gl.buffer_data(BufferTarget::Array, model.vertex_bytes(), BufferUsage::DynamicDraw);
        gl.bind_buffer(BufferTarget::ElementArray, Some(res.index_buffer));
        gl.buffer_data(
            BufferTarget::ElementArray,
            model.index_bytes(),
            BufferUsage::DynamicDraw,
        );

        let stride = ModelVertex::STRIDE as i32;
        gl.enable_vertex_attrib_array(res.position_attrib);
        gl.vertex_attrib_pointer_f32(
            res.position_attrib,
            3,
            stride,
            ModelVertex::POSITION_OFFSET as i32,
        );
        gl.enable_vertex_attrib_array(res.normal_attrib);
        gl.vertex_attrib_pointer_f32(
            res.normal_attrib,
            3,
            stride,
            ModelVertex::NORMAL_OFFSET as i32,
        );

        gl.draw_triangles_u32(count, 0);
        self.draws += 1;
        tracing::trace!(name = model.name(), indices = count, "drew model");
        true
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }
}

#[cfg(test)]
mod tests {
    use super::apply_frame_state;
    use crate::context::{BufferTarget, BufferUsage, Capability, CullFace, DepthFunc, FrontFace};
    use crate::headless::{GlCall, HeadlessGl};
    use crate::session::RenderSession;
    use formats::decode_model;
    use foundation::math::Mat4;
    use pretty_assertions::assert_eq;

    const QUAD: &str = r#"{
        "name": "quad",
        "dataArrays": {
            "position": [0,0,0, 1,0,0, 0,1,0, 1,1,0],
            "normal":   [0,0,1, 0,0,1, 0,0,1, 0,0,1]
        },
        "meshes": [ { "indices": [0, 1, 2, 1, 2, 3] } ]
    }"#;

    #[test]
    fn frame_state_is_set_explicitly() {
        let gl = HeadlessGl::new();
        apply_frame_state(&gl);
        let calls = gl.calls();
        assert!(calls.contains(&GlCall::Enable(Capability::DepthTest)));
        assert!(calls.contains(&GlCall::DepthMask(true)));
        assert!(calls.contains(&GlCall::DepthFunc(DepthFunc::Less)));
        assert!(calls.contains(&GlCall::Disable(Capability::StencilTest)));
        assert!(calls.contains(&GlCall::Disable(Capability::Blend)));
        assert!(calls.contains(&GlCall::Enable(Capability::CullFace)));
        assert!(calls.contains(&GlCall::CullFace(CullFace::Back)));
        assert!(calls.contains(&GlCall::FrontFace(FrontFace::Ccw)));
    }

    #[test]
    fn projection_is_uploaded_once_per_frame() {
        let gl = HeadlessGl::new();
        let mut session = RenderSession::new();
        session.initialize(&gl).expect("initialize");
        let model = decode_model(QUAD).expect("decode");

        gl.clear_calls();
        let mut frame = session.begin_frame(&gl, &Mat4::IDENTITY).expect("frame");
        for _ in 0..3 {
            assert!(frame.draw(&Mat4::IDENTITY, &model));
        }
        assert_eq!(frame.draw_count(), 3);

        let uniforms = gl
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::UniformMatrix4 { .. }))
            .count();
        // one projection + one model matrix per draw
        assert_eq!(uniforms, 4);
        assert_eq!(gl.draw_calls(), vec![(6, 0); 3]);
    }

    #[test]
    fn draw_reuploads_interleaved_data() {
        let gl = HeadlessGl::new();
        let mut session = RenderSession::new();
        session.initialize(&gl).expect("initialize");
        let model = decode_model(QUAD).expect("decode");

        gl.clear_calls();
        let mut frame = session.begin_frame(&gl, &Mat4::IDENTITY).expect("frame");
        frame.draw(&Mat4::IDENTITY, &model);

        let calls = gl.calls();
        assert!(calls.contains(&GlCall::BufferData {
            target: BufferTarget::Array,
            bytes: 4 * 24,
            usage: BufferUsage::DynamicDraw,
        }));
        assert!(calls.contains(&GlCall::BufferData {
            target: BufferTarget::ElementArray,
            bytes: 6 * 4,
            usage: BufferUsage::DynamicDraw,
        }));
        assert!(calls.iter().any(|c| matches!(
            c,
            GlCall::VertexAttribPointer {
                stride: 24,
                offset: 12,
                ..
            }
        )));
    }

    #[test]
    fn empty_models_are_not_drawn() {
        let gl = HeadlessGl::new();
        let mut session = RenderSession::new();
        session.initialize(&gl).expect("initialize");
        let empty = decode_model(
            r#"{ "name": "empty", "dataArrays": { "position": [], "normal": [] }, "meshes": [ { "indices": [] } ] }"#,
        )
        .expect("decode");

        let mut frame = session.begin_frame(&gl, &Mat4::IDENTITY).expect("frame");
        assert!(!frame.draw(&Mat4::IDENTITY, &empty));
        assert_eq!(frame.draw_count(), 0);
        assert!(gl.draw_calls().is_empty());
    }
}
