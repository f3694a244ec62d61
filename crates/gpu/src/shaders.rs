use std::borrow::Cow;

pub const ATTRIB_POSITION: &str = "position";
pub const ATTRIB_NORMAL: &str = "normal";
pub const UNIFORM_PROJECTION: &str = "projectionMatrix";
pub const UNIFORM_MODEL: &str = "modelMatrix";

// Assets are Y-up, the map is Z-up: the swizzle lives here and is not configurable.
const MODEL_VERTEX_SHADER: &str = r#"
uniform mat4 projectionMatrix;
uniform mat4 modelMatrix;

attribute vec3 position;
attribute vec3 normal;

varying vec3 v_color;

void main() {
    v_color = normal * 0.5 + 0.5;
    gl_Position = projectionMatrix * modelMatrix * vec4(position.xzy, 1.0);
}
"#;

const MODEL_FRAGMENT_SHADER: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif

varying vec3 v_color;

void main() {
    gl_FragColor = vec4(v_color, 1.0);
}
"#;

/// Shader program sources owned by a render session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::new(MODEL_VERTEX_SHADER, MODEL_FRAGMENT_SHADER)
    }
}
