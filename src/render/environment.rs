//! 环境贴图背景
//!
//! 背景通过排列缓存绘制一个单位立方体；没有环境或关闭背景时不绘制。

use super::backend::{FrontFace, GpuContext, RenderCommand, UniformValue};
use super::defines::ShaderDefines;
use super::shader_cache::ShaderCache;
use crate::config::RenderingParameters;
use crate::scene::{Accessor, ComponentType, ElementType, Environment, PrimitiveMode};
use glam::{Mat3, Mat4};

/// 环境贴图绕 Y 轴的旋转矩阵（角度）
pub fn environment_rotation_matrix(degrees: f32) -> Mat3 {
    Mat3::from_rotation_y(degrees.to_radians())
}

/// 环境背景渲染器
pub trait EnvironmentRenderer {
    /// 绘制背景，返回是否发出了绘制调用
    fn draw_environment(
        &mut self,
        gpu: &mut dyn GpuContext,
        cache: &mut ShaderCache,
        view_projection: Mat4,
        environment: Option<&Environment>,
        params: &RenderingParameters,
        fragment_defines: &ShaderDefines,
    ) -> bool;
}

/// 立方体贴图背景
#[derive(Debug, Clone)]
pub struct CubemapEnvironmentRenderer {
    positions: Accessor,
    indices: Accessor,
}

impl CubemapEnvironmentRenderer {
    pub const VERTEX_SHADER: &'static str = "cubemap.vert";
    pub const FRAGMENT_SHADER: &'static str = "cubemap.frag";
    /// 模糊背景使用的归一化 mip 层级
    pub const BLUR_LEVEL: f32 = 0.6;

    pub fn new() -> Self {
        #[rustfmt::skip]
        let positions = vec![
            -1.0, -1.0, -1.0,
             1.0, -1.0, -1.0,
             1.0,  1.0, -1.0,
            -1.0,  1.0, -1.0,
            -1.0, -1.0,  1.0,
             1.0, -1.0,  1.0,
             1.0,  1.0,  1.0,
            -1.0,  1.0,  1.0,
        ];
        #[rustfmt::skip]
        let indices = vec![
            1.0, 2.0, 0.0, 2.0, 3.0, 0.0,
            6.0, 2.0, 1.0, 1.0, 5.0, 6.0,
            6.0, 5.0, 4.0, 4.0, 7.0, 6.0,
            6.0, 3.0, 2.0, 7.0, 3.0, 6.0,
            3.0, 7.0, 0.0, 7.0, 4.0, 0.0,
            5.0, 1.0, 0.0, 4.0, 5.0, 0.0,
        ];

        Self {
            positions: Accessor::new(ElementType::Vec3, ComponentType::Float, positions)
                .with_buffer_view(0),
            indices: Accessor::new(ElementType::Scalar, ComponentType::UnsignedByte, indices)
                .with_buffer_view(1),
        }
    }
}

impl Default for CubemapEnvironmentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentRenderer for CubemapEnvironmentRenderer {
    fn draw_environment(
        &mut self,
        gpu: &mut dyn GpuContext,
        cache: &mut ShaderCache,
        view_projection: Mat4,
        environment: Option<&Environment>,
        params: &RenderingParameters,
        fragment_defines: &ShaderDefines,
    ) -> bool {
        let Some(environment) = environment else {
            return false;
        };
        if !params.render_environment_map {
            return false;
        }

        let Some(program) = cache.resolve(
            gpu,
            Self::VERTEX_SHADER,
            &ShaderDefines::new(),
            Self::FRAGMENT_SHADER,
            fragment_defines,
        ) else {
            return false;
        };

        gpu.submit(RenderCommand::UseProgram(program.handle()));
        gpu.submit(RenderCommand::FrontFace(FrontFace::Ccw));
        gpu.submit(RenderCommand::SetCulling(true));
        gpu.submit(RenderCommand::SetBlend(None));

        if let Some(location) = program.uniform_location("u_GGXEnvSampler") {
            if let Err(error) = gpu.set_texture(location, environment.specular_env_map, 0) {
                tracing::warn!(target: "render", "Environment background skipped: {error}");
                return false;
            }
        }

        let blur = if params.blur_environment_map {
            Self::BLUR_LEVEL
        } else {
            0.0
        };
        program.set_uniform(gpu, "u_ViewProjectionMatrix", UniformValue::Mat4(view_projection));
        program.set_uniform(
            gpu,
            "u_EnvRotation",
            UniformValue::Mat3(environment_rotation_matrix(params.environment_rotation)),
        );
        program.set_uniform(gpu, "u_MipCount", UniformValue::Float(environment.mip_count as f32));
        program.set_uniform(gpu, "u_EnvBlurNormalized", UniformValue::Float(blur));
        program.set_uniform(gpu, "u_EnvIntensity", UniformValue::Float(1.0));
        program.set_uniform(gpu, "u_Exposure", UniformValue::Float(params.exposure));

        if let Err(error) = gpu.set_indices(&self.indices) {
            tracing::warn!(target: "render", "Environment background skipped: {error}");
            return false;
        }
        let Some(location) = program.attribute_location("a_position") else {
            return false;
        };
        if let Err(error) = gpu.enable_attribute(location, &self.positions) {
            tracing::warn!(target: "render", "Environment background skipped: {error}");
            return false;
        }

        gpu.submit(RenderCommand::DrawIndexed {
            mode: PrimitiveMode::Triangles,
            index_count: self.indices.count,
            index_type: self.indices.component_type,
        });
        gpu.submit(RenderCommand::DisableAttribute { location });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShaderCacheSettings;
    use crate::render::backend::{RecordingBackend, TextureHandle};
    use crate::render::shaders::default_shader_cache;

    fn environment() -> Environment {
        Environment {
            diffuse_env_map: TextureHandle(100),
            specular_env_map: TextureHandle(101),
            lut: TextureHandle(102),
            sheen_env_map: TextureHandle(103),
            sheen_lut: TextureHandle(104),
            sheen_e_lut: TextureHandle(105),
            mip_count: 10,
        }
    }

    #[test]
    fn test_draws_cube_with_environment() {
        let mut gpu = RecordingBackend::new();
        let mut cache = default_shader_cache(ShaderCacheSettings::default());
        let mut renderer = CubemapEnvironmentRenderer::new();
        let env = environment();
        let mut defines = ShaderDefines::new();
        defines.flag("LINEAR_OUTPUT");

        assert!(renderer.draw_environment(
            &mut gpu,
            &mut cache,
            Mat4::IDENTITY,
            Some(&env),
            &RenderingParameters::default(),
            &defines,
        ));

        assert!(gpu.commands().contains(&RenderCommand::DrawIndexed {
            mode: PrimitiveMode::Triangles,
            index_count: 36,
            index_type: ComponentType::UnsignedByte,
        }));
        assert!(gpu.commands().iter().any(|c| matches!(
            c,
            RenderCommand::BindTexture { texture, .. } if *texture == env.specular_env_map
        )));
        let (_, fragment) = gpu
            .compiled_sources()
            .iter()
            .find(|(id, _)| id == "cubemap.frag")
            .unwrap();
        assert!(fragment.contains("#define LINEAR_OUTPUT 1"));
    }

    #[test]
    fn test_nothing_drawn_without_environment() {
        let mut gpu = RecordingBackend::new();
        let mut cache = default_shader_cache(ShaderCacheSettings::default());
        let mut renderer = CubemapEnvironmentRenderer::new();
        let mut params = RenderingParameters::default();

        assert!(!renderer.draw_environment(
            &mut gpu,
            &mut cache,
            Mat4::IDENTITY,
            None,
            &params,
            &ShaderDefines::new(),
        ));

        params.render_environment_map = false;
        let env = environment();
        assert!(!renderer.draw_environment(
            &mut gpu,
            &mut cache,
            Mat4::IDENTITY,
            Some(&env),
            &params,
            &ShaderDefines::new(),
        ));
        assert!(gpu.commands().is_empty());
        assert_eq!(gpu.compile_count(), 0);
    }

    #[test]
    fn test_rotation_matrix() {
        let rotation = environment_rotation_matrix(90.0);
        let rotated = rotation * glam::Vec3::X;
        assert!(rotated.abs_diff_eq(glam::Vec3::NEG_Z, 1e-6));
    }
}
