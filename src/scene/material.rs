//! PBR 材质
//!
//! 材质对渲染器只读：提供片元阶段的宏、标量/向量 uniform 和纹理列表。

use crate::config::RenderingParameters;
use crate::impl_default;
use crate::render::backend::{TextureHandle, UniformValue};
use crate::render::defines::ShaderDefines;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Alpha 模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub fn define(&self) -> &'static str {
        match self {
            AlphaMode::Opaque => "ALPHAMODE_OPAQUE",
            AlphaMode::Mask => "ALPHAMODE_MASK",
            AlphaMode::Blend => "ALPHAMODE_BLEND",
        }
    }
}

/// KHR_materials_sheen
#[derive(Debug, Clone, PartialEq)]
pub struct Sheen {
    pub color_factor: Vec3,
    pub roughness_factor: f32,
}

impl_default!(Sheen {
    color_factor: Vec3::ZERO,
    roughness_factor: 0.0,
});

/// KHR_materials_clearcoat
#[derive(Debug, Clone, PartialEq)]
pub struct Clearcoat {
    pub factor: f32,
    pub roughness_factor: f32,
}

impl_default!(Clearcoat {
    factor: 0.0,
    roughness_factor: 0.0,
});

/// KHR_materials_transmission
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub factor: f32,
}

impl_default!(Transmission { factor: 0.0 });

/// KHR_materials_volume
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub thickness_factor: f32,
    pub attenuation_distance: f32,
    pub attenuation_color: Vec3,
}

impl_default!(Volume {
    thickness_factor: 0.0,
    attenuation_distance: f32::INFINITY,
    attenuation_color: Vec3::ONE,
});

/// KHR_materials_specular
#[derive(Debug, Clone, PartialEq)]
pub struct Specular {
    pub factor: f32,
    pub color_factor: Vec3,
}

impl_default!(Specular {
    factor: 1.0,
    color_factor: Vec3::ONE,
});

/// 绑定到材质的纹理
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTexture {
    /// 采样器 uniform 名称，如 `u_BaseColorSampler`
    pub sampler_name: String,
    /// 启用该贴图的宏名，如 `HAS_BASE_COLOR_MAP`
    pub define: String,
    pub texture: TextureHandle,
    /// UV 集
    pub tex_coord: u32,
}

impl MaterialTexture {
    pub fn new(sampler_name: &str, define: &str, texture: TextureHandle) -> Self {
        Self {
            sampler_name: sampler_name.to_string(),
            define: define.to_string(),
            texture,
            tex_coord: 0,
        }
    }

    /// 采样器名对应的 UV 集 uniform，如 `u_BaseColorUVSet`
    pub fn uv_set_uniform(&self) -> String {
        let stem = self
            .sampler_name
            .strip_suffix("Sampler")
            .unwrap_or(&self.sampler_name);
        format!("{stem}UVSet")
    }
}

/// PBR 材质
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    /// KHR_materials_unlit
    pub unlit: bool,
    pub base_color_factor: Vec4,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Vec3,
    /// KHR_materials_emissive_strength
    pub emissive_strength: Option<f32>,
    /// KHR_materials_ior
    pub ior: Option<f32>,
    pub sheen: Option<Sheen>,
    pub clearcoat: Option<Clearcoat>,
    pub transmission: Option<Transmission>,
    pub volume: Option<Volume>,
    pub specular: Option<Specular>,
    pub textures: Vec<MaterialTexture>,
}

impl_default!(Material {
    name: None,
    alpha_mode: AlphaMode::Opaque,
    alpha_cutoff: 0.5,
    double_sided: false,
    unlit: false,
    base_color_factor: Vec4::ONE,
    metallic_factor: 1.0,
    roughness_factor: 1.0,
    emissive_factor: Vec3::ZERO,
    emissive_strength: None,
    ior: None,
    sheen: None,
    clearcoat: None,
    transmission: None,
    volume: None,
    specular: None,
    textures: Vec::new(),
});

impl Material {
    /// 片元着色器标识
    pub const SHADER_IDENTIFIER: &'static str = "pbr.frag";

    pub fn shader_identifier(&self) -> &'static str {
        Self::SHADER_IDENTIFIER
    }

    /// 是否声明了透射扩展
    pub fn has_transmission(&self) -> bool {
        self.transmission.is_some()
    }

    /// 片元阶段的材质宏
    pub fn defines(&self, params: &RenderingParameters) -> ShaderDefines {
        let extensions = &params.enabled_extensions;
        let mut defines = ShaderDefines::new();

        if self.unlit {
            defines.flag("MATERIAL_UNLIT");
        } else {
            defines.flag("MATERIAL_METALLICROUGHNESS");
        }

        for texture in &self.textures {
            defines.flag(&texture.define);
        }

        if extensions.sheen && self.sheen.is_some() {
            defines.flag("MATERIAL_SHEEN");
        }
        if extensions.clearcoat && self.clearcoat.is_some() {
            defines.flag("MATERIAL_CLEARCOAT");
        }
        if extensions.transmission && self.transmission.is_some() {
            defines.flag("MATERIAL_TRANSMISSION");
        }
        if extensions.volume && self.volume.is_some() {
            defines.flag("MATERIAL_VOLUME");
        }
        if extensions.ior && self.ior.is_some() {
            defines.flag("MATERIAL_IOR");
        }
        if extensions.specular && self.specular.is_some() {
            defines.flag("MATERIAL_SPECULAR");
        }
        if extensions.emissive_strength && self.emissive_strength.is_some() {
            defines.flag("MATERIAL_EMISSIVE_STRENGTH");
        }

        defines.push("ALPHAMODE_OPAQUE", 0);
        defines.push("ALPHAMODE_MASK", 1);
        defines.push("ALPHAMODE_BLEND", 2);
        defines.push("ALPHAMODE", self.alpha_mode.define());

        defines
    }

    /// 材质的 uniform 值
    pub fn properties(&self) -> Vec<(String, UniformValue)> {
        let mut properties = vec![
            (
                "u_BaseColorFactor".to_string(),
                UniformValue::Vec4(self.base_color_factor),
            ),
            (
                "u_MetallicFactor".to_string(),
                UniformValue::Float(self.metallic_factor),
            ),
            (
                "u_RoughnessFactor".to_string(),
                UniformValue::Float(self.roughness_factor),
            ),
            (
                "u_EmissiveFactor".to_string(),
                UniformValue::Vec3(self.emissive_factor),
            ),
        ];

        if self.alpha_mode == AlphaMode::Mask {
            properties.push((
                "u_AlphaCutoff".to_string(),
                UniformValue::Float(self.alpha_cutoff),
            ));
        }
        if let Some(strength) = self.emissive_strength {
            properties.push((
                "u_EmissiveStrength".to_string(),
                UniformValue::Float(strength),
            ));
        }
        if let Some(ior) = self.ior {
            properties.push(("u_Ior".to_string(), UniformValue::Float(ior)));
        }
        if let Some(sheen) = &self.sheen {
            properties.push((
                "u_SheenColorFactor".to_string(),
                UniformValue::Vec3(sheen.color_factor),
            ));
            properties.push((
                "u_SheenRoughnessFactor".to_string(),
                UniformValue::Float(sheen.roughness_factor),
            ));
        }
        if let Some(clearcoat) = &self.clearcoat {
            properties.push((
                "u_ClearcoatFactor".to_string(),
                UniformValue::Float(clearcoat.factor),
            ));
            properties.push((
                "u_ClearcoatRoughnessFactor".to_string(),
                UniformValue::Float(clearcoat.roughness_factor),
            ));
        }
        if let Some(transmission) = &self.transmission {
            properties.push((
                "u_TransmissionFactor".to_string(),
                UniformValue::Float(transmission.factor),
            ));
        }
        if let Some(volume) = &self.volume {
            properties.push((
                "u_ThicknessFactor".to_string(),
                UniformValue::Float(volume.thickness_factor),
            ));
            properties.push((
                "u_AttenuationColor".to_string(),
                UniformValue::Vec3(volume.attenuation_color),
            ));
            properties.push((
                "u_AttenuationDistance".to_string(),
                UniformValue::Float(volume.attenuation_distance),
            ));
        }
        if let Some(specular) = &self.specular {
            properties.push((
                "u_KHR_materials_specular_specularFactor".to_string(),
                UniformValue::Float(specular.factor),
            ));
            properties.push((
                "u_KHR_materials_specular_specularColorFactor".to_string(),
                UniformValue::Vec3(specular.color_factor),
            ));
        }
        for texture in &self.textures {
            properties.push((
                texture.uv_set_uniform(),
                UniformValue::Int(texture.tex_coord as i32),
            ));
        }

        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material_defines() {
        let material = Material::default();
        let defines = material.defines(&RenderingParameters::default());

        assert!(defines.contains("MATERIAL_METALLICROUGHNESS 1"));
        assert!(defines.contains("ALPHAMODE ALPHAMODE_OPAQUE"));
        assert!(!defines.contains_name("MATERIAL_TRANSMISSION"));
    }

    #[test]
    fn test_extension_defines_respect_parameters() {
        let material = Material {
            transmission: Some(Transmission { factor: 1.0 }),
            sheen: Some(Sheen::default()),
            ..Default::default()
        };

        let mut params = RenderingParameters::default();
        let defines = material.defines(&params);
        assert!(defines.contains("MATERIAL_TRANSMISSION 1"));
        assert!(defines.contains("MATERIAL_SHEEN 1"));

        params.enabled_extensions.transmission = false;
        let defines = material.defines(&params);
        assert!(!defines.contains_name("MATERIAL_TRANSMISSION"));
        assert!(material.has_transmission());
    }

    #[test]
    fn test_texture_defines_and_uv_sets() {
        let material = Material {
            textures: vec![MaterialTexture::new(
                "u_BaseColorSampler",
                "HAS_BASE_COLOR_MAP",
                TextureHandle(7),
            )],
            ..Default::default()
        };

        let defines = material.defines(&RenderingParameters::default());
        assert!(defines.contains("HAS_BASE_COLOR_MAP 1"));

        let properties = material.properties();
        assert!(properties
            .iter()
            .any(|(name, value)| name == "u_BaseColorUVSet" && *value == UniformValue::Int(0)));
    }

    #[test]
    fn test_alpha_cutoff_only_for_mask() {
        let opaque = Material::default();
        assert!(!opaque.properties().iter().any(|(n, _)| n == "u_AlphaCutoff"));

        let masked = Material {
            alpha_mode: AlphaMode::Mask,
            alpha_cutoff: 0.25,
            ..Default::default()
        };
        assert!(masked
            .properties()
            .iter()
            .any(|(n, v)| n == "u_AlphaCutoff" && *v == UniformValue::Float(0.25)));
    }
}
