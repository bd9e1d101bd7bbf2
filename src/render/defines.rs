//! 着色器宏定义
//!
//! 每个宏是一条 `NAME VALUE` 文本（例如 `USE_PUNCTUAL 1`），注入源码时变为
//! `#define NAME VALUE`。色调映射和调试输出是封闭枚举，经由静态表映射到宏名。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 有序的宏定义列表
///
/// 顺序会被保留：默认的排列键对顺序敏感。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderDefines {
    entries: Vec<String>,
}

impl ShaderDefines {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加 `NAME VALUE`
    pub fn push(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.entries.push(format!("{name} {value}"));
        self
    }

    /// 追加 `NAME 1`
    pub fn flag(&mut self, name: &str) -> &mut Self {
        self.push(name, 1)
    }

    /// 追加另一个列表的全部宏
    pub fn extend(&mut self, other: &ShaderDefines) -> &mut Self {
        self.entries.extend(other.entries.iter().cloned());
        self
    }

    /// 返回 `other` 在前、`self` 在后的新列表
    pub fn prepended_with(&self, other: &ShaderDefines) -> ShaderDefines {
        let mut entries = other.entries.clone();
        entries.extend(self.entries.iter().cloned());
        ShaderDefines { entries }
    }

    pub fn contains(&self, define: &str) -> bool {
        self.entries.iter().any(|d| d == define)
    }

    /// 是否存在以 `name` 为名的宏（忽略值）
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|d| d.split_whitespace().next() == Some(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }
}

impl<S: Into<String>> FromIterator<S> for ShaderDefines {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// 色调映射算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMap {
    #[default]
    None,
    AcesNarkowicz,
    AcesHill,
    AcesHillExposureBoost,
}

impl ToneMap {
    pub const ALL: [ToneMap; 4] = [
        ToneMap::None,
        ToneMap::AcesNarkowicz,
        ToneMap::AcesHill,
        ToneMap::AcesHillExposureBoost,
    ];

    /// 对应的宏名，`None` 不产生宏
    pub fn define(&self) -> Option<&'static str> {
        match self {
            ToneMap::None => None,
            ToneMap::AcesNarkowicz => Some("TONEMAP_ACES_NARKOWICZ"),
            ToneMap::AcesHill => Some("TONEMAP_ACES_HILL"),
            ToneMap::AcesHillExposureBoost => Some("TONEMAP_ACES_HILL_EXPOSURE_BOOST"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToneMap::None => "none",
            ToneMap::AcesNarkowicz => "aces_narkowicz",
            ToneMap::AcesHill => "aces_hill",
            ToneMap::AcesHillExposureBoost => "aces_hill_exposure_boost",
        }
    }
}

impl FromStr for ToneMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(s);
        ToneMap::ALL
            .into_iter()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| format!("unknown tone map {s:?}"))
    }
}

/// 调试输出通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DebugOutput {
    #[default]
    None,
    WorldspaceNormal,
    Normal,
    GeometryNormal,
    Tangent,
    Bitangent,
    Alpha,
    UvCoords0,
    UvCoords1,
    Occlusion,
    Emissive,
    EmissiveLinear,
    MetallicRoughness,
    Basecolor,
    BasecolorLinear,
    Roughness,
    Metallic,
    Clearcoat,
    ClearcoatFactor,
    ClearcoatRoughness,
    ClearcoatNormal,
    Sheen,
    SheenColor,
    SheenRoughness,
    Specular,
    SpecularFactor,
    SpecularColor,
    TransmissionVolume,
    TransmissionFactor,
    VolumeThickness,
    F0,
    Diffuse,
}

/// 调试输出表：(通道, 宏名, 配置名)
///
/// 表序即宏的数值，着色器依赖这些数值，不能重排。
pub const DEBUG_OUTPUT_TABLE: [(DebugOutput, &str, &str); 32] = [
    (DebugOutput::None, "DEBUG_NONE", "none"),
    (DebugOutput::WorldspaceNormal, "DEBUG_NORMAL_SHADING", "worldspace_normal"),
    (DebugOutput::Normal, "DEBUG_NORMAL_TEXTURE", "normal"),
    (DebugOutput::GeometryNormal, "DEBUG_NORMAL_GEOMETRY", "geometry_normal"),
    (DebugOutput::Tangent, "DEBUG_TANGENT", "tangent"),
    (DebugOutput::Bitangent, "DEBUG_BITANGENT", "bitangent"),
    (DebugOutput::Alpha, "DEBUG_ALPHA", "alpha"),
    (DebugOutput::UvCoords0, "DEBUG_UV_0", "uv_coords_0"),
    (DebugOutput::UvCoords1, "DEBUG_UV_1", "uv_coords_1"),
    (DebugOutput::Occlusion, "DEBUG_OCCLUSION", "occlusion"),
    (DebugOutput::Emissive, "DEBUG_EMISSIVE_SRGB", "emissive"),
    (DebugOutput::EmissiveLinear, "DEBUG_EMISSIVE_LINEAR", "emissive_linear"),
    (DebugOutput::MetallicRoughness, "DEBUG_METALLIC_ROUGHNESS", "metallic_roughness"),
    (DebugOutput::Basecolor, "DEBUG_BASE_COLOR_SRGB", "basecolor"),
    (DebugOutput::BasecolorLinear, "DEBUG_BASE_COLOR_LINEAR", "basecolor_linear"),
    (DebugOutput::Roughness, "DEBUG_ROUGHNESS", "roughness"),
    (DebugOutput::Metallic, "DEBUG_METALLIC", "metallic"),
    (DebugOutput::Clearcoat, "DEBUG_CLEARCOAT_SRGB", "clearcoat"),
    (DebugOutput::ClearcoatFactor, "DEBUG_CLEARCOAT_FACTOR", "clearcoat_factor"),
    (DebugOutput::ClearcoatRoughness, "DEBUG_CLEARCOAT_ROUGHNESS", "clearcoat_roughness"),
    (DebugOutput::ClearcoatNormal, "DEBUG_CLEARCOAT_NORMAL", "clearcoat_normal"),
    (DebugOutput::Sheen, "DEBUG_SHEEN_SRGB", "sheen"),
    (DebugOutput::SheenColor, "DEBUG_SHEEN_COLOR", "sheen_color"),
    (DebugOutput::SheenRoughness, "DEBUG_SHEEN_ROUGHNESS", "sheen_roughness"),
    (DebugOutput::Specular, "DEBUG_SPECULAR_SRGB", "specular"),
    (DebugOutput::SpecularFactor, "DEBUG_SPECULAR_FACTOR", "specular_factor"),
    (DebugOutput::SpecularColor, "DEBUG_SPECULAR_COLOR", "specular_color"),
    (DebugOutput::TransmissionVolume, "DEBUG_TRANSMISSION_VOLUME_SRGB", "transmission_volume"),
    (DebugOutput::TransmissionFactor, "DEBUG_TRANSMISSION_FACTOR", "transmission_factor"),
    (DebugOutput::VolumeThickness, "DEBUG_VOLUME_THICKNESS", "volume_thickness"),
    (DebugOutput::F0, "DEBUG_F0", "f0"),
    (DebugOutput::Diffuse, "DEBUG_DIFFUSE_SRGB", "diffuse"),
];

impl DebugOutput {
    /// 对应的宏名
    pub fn define(&self) -> &'static str {
        DEBUG_OUTPUT_TABLE
            .iter()
            .find(|(output, _, _)| output == self)
            .map(|(_, define, _)| *define)
            .unwrap_or("DEBUG_NONE")
    }

    pub fn name(&self) -> &'static str {
        DEBUG_OUTPUT_TABLE
            .iter()
            .find(|(output, _, _)| output == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("none")
    }
}

impl FromStr for DebugOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(s);
        DEBUG_OUTPUT_TABLE
            .iter()
            .find(|(_, _, name)| *name == normalized)
            .map(|(output, _, _)| *output)
            .ok_or_else(|| format!("unknown debug output {s:?}"))
    }
}

fn normalize_name(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// 追加片元阶段的全局参数宏
///
/// 顺序：光源、IBL、色调映射、整张调试表（`NAME index`），最后恰好一条
/// `DEBUG <selected>`。
pub fn push_fragment_parameter_defines(
    defines: &mut ShaderDefines,
    use_punctual: bool,
    light_count: usize,
    use_ibl: bool,
    tone_map: ToneMap,
    debug_output: DebugOutput,
) {
    if use_punctual {
        defines.flag("USE_PUNCTUAL");
        defines.push("LIGHT_COUNT", light_count);
    }

    if use_ibl {
        defines.flag("USE_IBL");
    }

    if let Some(tone_map_define) = tone_map.define() {
        defines.flag(tone_map_define);
    }

    for (index, (_, define, _)) in DEBUG_OUTPUT_TABLE.iter().enumerate() {
        defines.push(define, index);
    }
    defines.push("DEBUG", debug_output.define());
}
