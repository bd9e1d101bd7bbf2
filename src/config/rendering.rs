use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::render::defines::{DebugOutput, ToneMap};
use serde::{Deserialize, Serialize};

/// 每帧渲染参数
///
/// 由查看器外壳持有，渲染器每帧只读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingParameters {
    /// 骨骼蒙皮
    pub skinning: bool,
    /// 变形目标
    pub morphing: bool,
    /// 点光源/方向光/聚光灯
    pub use_punctual: bool,
    /// 基于图像的光照
    pub use_ibl: bool,
    /// 场景无灯光且关闭IBL时使用内置的主光与补光
    pub use_directional_lights_with_disabled_ibl: bool,
    /// 绘制环境贴图背景
    pub render_environment_map: bool,
    /// 背景使用模糊的环境贴图
    pub blur_environment_map: bool,
    /// 色调映射
    pub tone_map: ToneMap,
    /// 调试输出通道
    pub debug_output: DebugOutput,
    /// 环境贴图绕Y轴旋转（角度）
    pub environment_rotation: f32,
    /// 曝光
    pub exposure: f32,
    /// 清屏颜色 (RGBA8)
    pub clear_color: [u8; 4],
    /// 透射捕获缓冲的多重采样数
    pub internal_msaa: u32,
    /// 启用的材质扩展
    pub enabled_extensions: EnabledExtensions,
}

impl_default!(RenderingParameters {
    skinning: true,
    morphing: true,
    use_punctual: true,
    use_ibl: true,
    use_directional_lights_with_disabled_ibl: false,
    render_environment_map: true,
    blur_environment_map: true,
    tone_map: ToneMap::None,
    debug_output: DebugOutput::None,
    environment_rotation: 90.0,
    exposure: 1.0,
    clear_color: [58, 64, 74, 255],
    internal_msaa: 4,
    enabled_extensions: EnabledExtensions::default(),
});

impl RenderingParameters {
    /// 支持的最大多重采样数
    pub const MAX_MSAA: u32 = 16;

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.exposure > 0.0 && self.exposure.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "Exposure must be positive, got {}",
                self.exposure
            )));
        }
        if !self.internal_msaa.is_power_of_two() || self.internal_msaa > Self::MAX_MSAA {
            return Err(ConfigError::ValidationError(format!(
                "MSAA sample count must be a power of two up to {}, got {}",
                Self::MAX_MSAA,
                self.internal_msaa
            )));
        }
        if !self.environment_rotation.is_finite() {
            return Err(ConfigError::ValidationError(
                "Environment rotation must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// 材质扩展开关
///
/// 关闭的扩展不会产生对应的着色器宏，材质按核心PBR模型着色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledExtensions {
    /// KHR_materials_transmission
    pub transmission: bool,
    /// KHR_materials_sheen
    pub sheen: bool,
    /// KHR_materials_clearcoat
    pub clearcoat: bool,
    /// KHR_materials_volume
    pub volume: bool,
    /// KHR_materials_ior
    pub ior: bool,
    /// KHR_materials_specular
    pub specular: bool,
    /// KHR_materials_emissive_strength
    pub emissive_strength: bool,
    /// KHR_texture_transform
    pub texture_transform: bool,
    /// KHR_materials_variants
    pub variants: bool,
}

impl_default!(EnabledExtensions {
    transmission: true,
    sheen: true,
    clearcoat: true,
    volume: true,
    ior: true,
    specular: true,
    emissive_strength: true,
    texture_transform: true,
    variants: true,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_valid() {
        assert!(RenderingParameters::default().validate().is_ok());
    }

    #[test]
    fn test_exposure_validation() {
        let mut params = RenderingParameters::default();
        params.exposure = 0.0;
        assert!(params.validate().is_err());
        params.exposure = f32::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_msaa_validation() {
        let mut params = RenderingParameters::default();
        for samples in [1, 2, 4, 8, 16] {
            params.internal_msaa = samples;
            assert!(params.validate().is_ok(), "{samples} should be accepted");
        }
        for samples in [0, 3, 6, 32] {
            params.internal_msaa = samples;
            assert!(params.validate().is_err(), "{samples} should be rejected");
        }
    }

    #[test]
    fn test_rotation_validation() {
        let mut params = RenderingParameters::default();
        params.environment_rotation = f32::INFINITY;
        assert!(params.validate().is_err());
    }
}
