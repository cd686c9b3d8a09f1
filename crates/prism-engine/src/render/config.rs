use crate::paint::Color;

/// Pipeline variant configuration.
///
/// The depth and texture stages are switches on one pipeline rather than
/// separate implementations. Shader and texture names are logical asset names
/// (see [`crate::assets`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Clear and test a depth buffer every frame.
    pub depth_test_enabled: bool,

    /// Sample a texture in the fragment stage.
    ///
    /// Requires `texture` and a shader pair that declares `TexCoordIn` and `Texture`.
    /// When off, the shader pair must not sample `Texture`.
    pub texturing_enabled: bool,

    /// Vertex stage, read from `shaders/<name>.wgsl`.
    pub vertex_shader: String,

    /// Fragment stage, read from `shaders/<name>.wgsl`.
    pub fragment_shader: String,

    /// Texture asset, read from `textures/<name>`.
    pub texture: Option<String>,

    pub clear_color: Color,
}

impl PipelineConfig {
    /// Textured cube with depth testing.
    pub fn textured_cube() -> Self {
        Self {
            depth_test_enabled: true,
            texturing_enabled: true,
            vertex_shader: "TexturedVertex".to_string(),
            fragment_shader: "TexturedFragment".to_string(),
            texture: Some("tile_floor.png".to_string()),
            clear_color: background(),
        }
    }

    /// Vertex-colored quad, no depth buffer, no texture.
    pub fn flat_quad() -> Self {
        Self {
            depth_test_enabled: false,
            texturing_enabled: false,
            vertex_shader: "SimpleVertex".to_string(),
            fragment_shader: "SimpleFragment".to_string(),
            texture: None,
            clear_color: background(),
        }
    }

    /// Vertex-colored cube with depth testing.
    pub fn colored_cube() -> Self {
        Self {
            depth_test_enabled: true,
            ..Self::flat_quad()
        }
    }

    /// Texture asset to load, if texturing is on.
    pub fn texture_name(&self) -> Option<&str> {
        if self.texturing_enabled {
            self.texture.as_deref()
        } else {
            None
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::textured_cube()
    }
}

/// `rgb(0, 104, 55)`, opaque.
fn background() -> Color {
    Color::from_srgb_u8(0, 104, 55, 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_flags_and_assets() {
        let textured = PipelineConfig::textured_cube();
        assert!(textured.depth_test_enabled && textured.texturing_enabled);
        assert_eq!(textured.texture_name(), Some("tile_floor.png"));

        let quad = PipelineConfig::flat_quad();
        assert!(!quad.depth_test_enabled && !quad.texturing_enabled);

        let cube = PipelineConfig::colored_cube();
        assert!(cube.depth_test_enabled && !cube.texturing_enabled);
        assert_eq!(cube.clear_color, textured.clear_color);
    }

    #[test]
    fn texture_is_ignored_when_texturing_is_off() {
        let config = PipelineConfig {
            texturing_enabled: false,
            ..PipelineConfig::textured_cube()
        };
        assert_eq!(config.texture_name(), None);
    }
}
