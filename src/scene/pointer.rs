//! 属性指针
//!
//! 用 JSON 指针（RFC 6901）寻址文档中的可动画属性，例如
//! `/nodes/3/rotation` 或 `/materials/0/pbrMetallicRoughness/baseColorFactor`。
//! 指针先解析为封闭的 [`PropertyPath`]，再通过 [`PropertyAccess`] 读写，
//! 不做任何反射查找。值统一以 `f32` 分量序列表示。

use super::camera::Projection;
use super::Gltf;
use crate::core::error::{PointerError, PointerResult};
use glam::{Quat, Vec3, Vec4};
use std::collections::HashSet;
use std::fmt;

/// 节点属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeProperty {
    Translation,
    Rotation,
    Scale,
    /// 世界矩阵，只读
    GlobalMatrix,
}

/// 网格属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshProperty {
    Weights,
}

/// 材质属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialProperty {
    BaseColorFactor,
    MetallicFactor,
    RoughnessFactor,
    EmissiveFactor,
    AlphaCutoff,
    EmissiveStrength,
    Ior,
    TransmissionFactor,
    ThicknessFactor,
    AttenuationDistance,
    AttenuationColor,
    SheenColorFactor,
    SheenRoughnessFactor,
    ClearcoatFactor,
    ClearcoatRoughnessFactor,
    SpecularFactor,
    SpecularColorFactor,
}

/// 灯光属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightProperty {
    Color,
    Intensity,
    Range,
    InnerConeAngle,
    OuterConeAngle,
}

/// 相机属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraProperty {
    Yfov,
    AspectRatio,
    PerspectiveZnear,
    PerspectiveZfar,
    Xmag,
    Ymag,
    OrthographicZnear,
    OrthographicZfar,
}

/// 已解析的属性路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Node(usize, NodeProperty),
    Mesh(usize, MeshProperty),
    Material(usize, MaterialProperty),
    Light(usize, LightProperty),
    Camera(usize, CameraProperty),
}

/// 材质属性表：(扩展名, 属性名, 属性)。扩展名为空表示核心属性。
const MATERIAL_PROPERTIES: &[(&str, &str, MaterialProperty)] = &[
    ("pbrMetallicRoughness", "baseColorFactor", MaterialProperty::BaseColorFactor),
    ("pbrMetallicRoughness", "metallicFactor", MaterialProperty::MetallicFactor),
    ("pbrMetallicRoughness", "roughnessFactor", MaterialProperty::RoughnessFactor),
    ("", "emissiveFactor", MaterialProperty::EmissiveFactor),
    ("", "alphaCutoff", MaterialProperty::AlphaCutoff),
    ("KHR_materials_emissive_strength", "emissiveStrength", MaterialProperty::EmissiveStrength),
    ("KHR_materials_ior", "ior", MaterialProperty::Ior),
    ("KHR_materials_transmission", "transmissionFactor", MaterialProperty::TransmissionFactor),
    ("KHR_materials_volume", "thicknessFactor", MaterialProperty::ThicknessFactor),
    ("KHR_materials_volume", "attenuationDistance", MaterialProperty::AttenuationDistance),
    ("KHR_materials_volume", "attenuationColor", MaterialProperty::AttenuationColor),
    ("KHR_materials_sheen", "sheenColorFactor", MaterialProperty::SheenColorFactor),
    ("KHR_materials_sheen", "sheenRoughnessFactor", MaterialProperty::SheenRoughnessFactor),
    ("KHR_materials_clearcoat", "clearcoatFactor", MaterialProperty::ClearcoatFactor),
    (
        "KHR_materials_clearcoat",
        "clearcoatRoughnessFactor",
        MaterialProperty::ClearcoatRoughnessFactor,
    ),
    ("KHR_materials_specular", "specularFactor", MaterialProperty::SpecularFactor),
    ("KHR_materials_specular", "specularColorFactor", MaterialProperty::SpecularColorFactor),
];

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn parse_index(pointer: &str, segment: &str) -> PointerResult<usize> {
    if segment.len() > 1 && segment.starts_with('0') {
        return Err(PointerError::Malformed(pointer.to_string()));
    }
    segment
        .parse()
        .map_err(|_| PointerError::Malformed(pointer.to_string()))
}

impl PropertyPath {
    /// 解析 JSON 指针
    pub fn parse(pointer: &str) -> PointerResult<Self> {
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(PointerError::Malformed(pointer.to_string()));
        };
        let segments: Vec<String> = rest.split('/').map(unescape).collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let not_found = || PointerError::NotFound(pointer.to_string());

        match segments.as_slice() {
            ["nodes", index, property] => {
                let index = parse_index(pointer, index)?;
                let property = match *property {
                    "translation" => NodeProperty::Translation,
                    "rotation" => NodeProperty::Rotation,
                    "scale" => NodeProperty::Scale,
                    "globalMatrix" => NodeProperty::GlobalMatrix,
                    _ => return Err(not_found()),
                };
                Ok(PropertyPath::Node(index, property))
            }
            ["meshes", index, "weights"] => {
                Ok(PropertyPath::Mesh(parse_index(pointer, index)?, MeshProperty::Weights))
            }
            ["materials", index, tail @ ..] => {
                let index = parse_index(pointer, index)?;
                let (group, name) = match tail {
                    [name] => ("", *name),
                    ["pbrMetallicRoughness", name] => ("pbrMetallicRoughness", *name),
                    ["extensions", extension, name] => (*extension, *name),
                    _ => return Err(not_found()),
                };
                MATERIAL_PROPERTIES
                    .iter()
                    .find(|(g, n, _)| *g == group && *n == name)
                    .map(|(_, _, property)| PropertyPath::Material(index, *property))
                    .ok_or_else(not_found)
            }
            ["extensions", "KHR_lights_punctual", "lights", index, tail @ ..] => {
                let index = parse_index(pointer, index)?;
                let property = match tail {
                    ["color"] => LightProperty::Color,
                    ["intensity"] => LightProperty::Intensity,
                    ["range"] => LightProperty::Range,
                    ["spot", "innerConeAngle"] => LightProperty::InnerConeAngle,
                    ["spot", "outerConeAngle"] => LightProperty::OuterConeAngle,
                    _ => return Err(not_found()),
                };
                Ok(PropertyPath::Light(index, property))
            }
            ["cameras", index, kind, name] => {
                let index = parse_index(pointer, index)?;
                let property = match (*kind, *name) {
                    ("perspective", "yfov") => CameraProperty::Yfov,
                    ("perspective", "aspectRatio") => CameraProperty::AspectRatio,
                    ("perspective", "znear") => CameraProperty::PerspectiveZnear,
                    ("perspective", "zfar") => CameraProperty::PerspectiveZfar,
                    ("orthographic", "xmag") => CameraProperty::Xmag,
                    ("orthographic", "ymag") => CameraProperty::Ymag,
                    ("orthographic", "znear") => CameraProperty::OrthographicZnear,
                    ("orthographic", "zfar") => CameraProperty::OrthographicZfar,
                    _ => return Err(not_found()),
                };
                Ok(PropertyPath::Camera(index, property))
            }
            _ => Err(not_found()),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Node(index, property) => {
                let name = match property {
                    NodeProperty::Translation => "translation",
                    NodeProperty::Rotation => "rotation",
                    NodeProperty::Scale => "scale",
                    NodeProperty::GlobalMatrix => "globalMatrix",
                };
                write!(f, "/nodes/{index}/{name}")
            }
            PropertyPath::Mesh(index, MeshProperty::Weights) => {
                write!(f, "/meshes/{index}/weights")
            }
            PropertyPath::Material(index, property) => {
                let (group, name) = MATERIAL_PROPERTIES
                    .iter()
                    .find(|(_, _, p)| p == property)
                    .map(|(g, n, _)| (*g, *n))
                    .unwrap_or(("", "unknown"));
                match group {
                    "" => write!(f, "/materials/{index}/{name}"),
                    "pbrMetallicRoughness" => {
                        write!(f, "/materials/{index}/pbrMetallicRoughness/{name}")
                    }
                    extension => write!(f, "/materials/{index}/extensions/{extension}/{name}"),
                }
            }
            PropertyPath::Light(index, property) => {
                let name = match property {
                    LightProperty::Color => "color",
                    LightProperty::Intensity => "intensity",
                    LightProperty::Range => "range",
                    LightProperty::InnerConeAngle => "spot/innerConeAngle",
                    LightProperty::OuterConeAngle => "spot/outerConeAngle",
                };
                write!(f, "/extensions/KHR_lights_punctual/lights/{index}/{name}")
            }
            PropertyPath::Camera(index, property) => {
                let name = match property {
                    CameraProperty::Yfov => "perspective/yfov",
                    CameraProperty::AspectRatio => "perspective/aspectRatio",
                    CameraProperty::PerspectiveZnear => "perspective/znear",
                    CameraProperty::PerspectiveZfar => "perspective/zfar",
                    CameraProperty::Xmag => "orthographic/xmag",
                    CameraProperty::Ymag => "orthographic/ymag",
                    CameraProperty::OrthographicZnear => "orthographic/znear",
                    CameraProperty::OrthographicZfar => "orthographic/zfar",
                };
                write!(f, "/cameras/{index}/{name}")
            }
        }
    }
}

/// 属性读写能力
pub trait PropertyAccess {
    /// 读取属性
    fn get(&self, path: &PropertyPath) -> PointerResult<Vec<f32>>;

    /// 写入属性，分量个数必须与当前值一致
    fn set(&mut self, path: &PropertyPath, value: &[f32]) -> PointerResult<()>;

    /// 按指针读取
    fn get_pointer(&self, pointer: &str) -> PointerResult<Vec<f32>> {
        self.get(&PropertyPath::parse(pointer)?)
    }

    /// 按指针写入
    fn set_pointer(&mut self, pointer: &str, value: &[f32]) -> PointerResult<()> {
        self.set(&PropertyPath::parse(pointer)?, value)
    }
}

fn expect_len(path: &PropertyPath, value: &[f32], expected: usize) -> PointerResult<()> {
    if value.len() != expected {
        return Err(PointerError::TypeMismatch {
            pointer: path.to_string(),
            expected,
            actual: value.len(),
        });
    }
    Ok(())
}

fn vec3(value: &[f32]) -> Vec3 {
    Vec3::new(value[0], value[1], value[2])
}

impl PropertyAccess for Gltf {
    fn get(&self, path: &PropertyPath) -> PointerResult<Vec<f32>> {
        let not_found = || PointerError::NotFound(path.to_string());

        match *path {
            PropertyPath::Node(index, property) => {
                let node = self.nodes.get(index).ok_or_else(not_found)?;
                Ok(match property {
                    NodeProperty::Translation => node.translation.to_array().to_vec(),
                    NodeProperty::Rotation => node.rotation.to_array().to_vec(),
                    NodeProperty::Scale => node.scale.to_array().to_vec(),
                    NodeProperty::GlobalMatrix => node.world_transform.to_cols_array().to_vec(),
                })
            }
            PropertyPath::Mesh(index, MeshProperty::Weights) => {
                let mesh = self.meshes.get(index).ok_or_else(not_found)?;
                Ok(mesh.current_weights().to_vec())
            }
            PropertyPath::Material(index, property) => {
                let material = self.materials.get(index).ok_or_else(not_found)?;
                let value = match property {
                    MaterialProperty::BaseColorFactor => {
                        Some(material.base_color_factor.to_array().to_vec())
                    }
                    MaterialProperty::MetallicFactor => Some(vec![material.metallic_factor]),
                    MaterialProperty::RoughnessFactor => Some(vec![material.roughness_factor]),
                    MaterialProperty::EmissiveFactor => {
                        Some(material.emissive_factor.to_array().to_vec())
                    }
                    MaterialProperty::AlphaCutoff => Some(vec![material.alpha_cutoff]),
                    MaterialProperty::EmissiveStrength => {
                        material.emissive_strength.map(|v| vec![v])
                    }
                    MaterialProperty::Ior => material.ior.map(|v| vec![v]),
                    MaterialProperty::TransmissionFactor => {
                        material.transmission.as_ref().map(|t| vec![t.factor])
                    }
                    MaterialProperty::ThicknessFactor => {
                        material.volume.as_ref().map(|v| vec![v.thickness_factor])
                    }
                    MaterialProperty::AttenuationDistance => {
                        material.volume.as_ref().map(|v| vec![v.attenuation_distance])
                    }
                    MaterialProperty::AttenuationColor => material
                        .volume
                        .as_ref()
                        .map(|v| v.attenuation_color.to_array().to_vec()),
                    MaterialProperty::SheenColorFactor => material
                        .sheen
                        .as_ref()
                        .map(|s| s.color_factor.to_array().to_vec()),
                    MaterialProperty::SheenRoughnessFactor => {
                        material.sheen.as_ref().map(|s| vec![s.roughness_factor])
                    }
                    MaterialProperty::ClearcoatFactor => {
                        material.clearcoat.as_ref().map(|c| vec![c.factor])
                    }
                    MaterialProperty::ClearcoatRoughnessFactor => {
                        material.clearcoat.as_ref().map(|c| vec![c.roughness_factor])
                    }
                    MaterialProperty::SpecularFactor => {
                        material.specular.as_ref().map(|s| vec![s.factor])
                    }
                    MaterialProperty::SpecularColorFactor => material
                        .specular
                        .as_ref()
                        .map(|s| s.color_factor.to_array().to_vec()),
                };
                value.ok_or_else(not_found)
            }
            PropertyPath::Light(index, property) => {
                let light = self.lights.get(index).ok_or_else(not_found)?;
                match property {
                    LightProperty::Color => Ok(light.color.to_array().to_vec()),
                    LightProperty::Intensity => Ok(vec![light.intensity]),
                    LightProperty::Range => light.range.map(|r| vec![r]).ok_or_else(not_found),
                    LightProperty::InnerConeAngle => Ok(vec![light.inner_cone_angle]),
                    LightProperty::OuterConeAngle => Ok(vec![light.outer_cone_angle]),
                }
            }
            PropertyPath::Camera(index, property) => {
                let camera = self.cameras.get(index).ok_or_else(not_found)?;
                let value = match (&camera.projection, property) {
                    (Projection::Perspective { yfov, .. }, CameraProperty::Yfov) => Some(*yfov),
                    (Projection::Perspective { aspect_ratio, .. }, CameraProperty::AspectRatio) => {
                        *aspect_ratio
                    }
                    (Projection::Perspective { znear, .. }, CameraProperty::PerspectiveZnear) => {
                        Some(*znear)
                    }
                    (Projection::Perspective { zfar, .. }, CameraProperty::PerspectiveZfar) => {
                        *zfar
                    }
                    (Projection::Orthographic { xmag, .. }, CameraProperty::Xmag) => Some(*xmag),
                    (Projection::Orthographic { ymag, .. }, CameraProperty::Ymag) => Some(*ymag),
                    (Projection::Orthographic { znear, .. }, CameraProperty::OrthographicZnear) => {
                        Some(*znear)
                    }
                    (Projection::Orthographic { zfar, .. }, CameraProperty::OrthographicZfar) => {
                        Some(*zfar)
                    }
                    _ => None,
                };
                value.map(|v| vec![v]).ok_or_else(not_found)
            }
        }
    }

    fn set(&mut self, path: &PropertyPath, value: &[f32]) -> PointerResult<()> {
        let not_found = || PointerError::NotFound(path.to_string());

        if let PropertyPath::Node(_, NodeProperty::GlobalMatrix) = path {
            return Err(PointerError::ReadOnly(path.to_string()));
        }

        // 先读取当前值以校验存在性和分量个数
        let current = self.get(path)?;
        // 没有默认权重的网格接受任意个数的权重
        let unsized_weights =
            matches!(path, PropertyPath::Mesh(_, MeshProperty::Weights)) && current.is_empty();
        if !unsized_weights {
            expect_len(path, value, current.len())?;
        }

        match *path {
            PropertyPath::Node(index, property) => {
                let node = self.nodes.get_mut(index).ok_or_else(not_found)?;
                match property {
                    NodeProperty::Translation => node.translation = vec3(value),
                    NodeProperty::Rotation => {
                        node.rotation = Quat::from_xyzw(value[0], value[1], value[2], value[3])
                    }
                    NodeProperty::Scale => node.scale = vec3(value),
                    NodeProperty::GlobalMatrix => {
                        return Err(PointerError::ReadOnly(path.to_string()))
                    }
                }
            }
            PropertyPath::Mesh(index, MeshProperty::Weights) => {
                let mesh = self.meshes.get_mut(index).ok_or_else(not_found)?;
                mesh.weights_animated = Some(value.to_vec());
            }
            PropertyPath::Material(index, property) => {
                let material = self.materials.get_mut(index).ok_or_else(not_found)?;
                match property {
                    MaterialProperty::BaseColorFactor => {
                        material.base_color_factor = Vec4::from_slice(value)
                    }
                    MaterialProperty::MetallicFactor => material.metallic_factor = value[0],
                    MaterialProperty::RoughnessFactor => material.roughness_factor = value[0],
                    MaterialProperty::EmissiveFactor => material.emissive_factor = vec3(value),
                    MaterialProperty::AlphaCutoff => material.alpha_cutoff = value[0],
                    MaterialProperty::EmissiveStrength => {
                        material.emissive_strength = Some(value[0])
                    }
                    MaterialProperty::Ior => material.ior = Some(value[0]),
                    MaterialProperty::TransmissionFactor => {
                        if let Some(t) = material.transmission.as_mut() {
                            t.factor = value[0];
                        }
                    }
                    MaterialProperty::ThicknessFactor => {
                        if let Some(v) = material.volume.as_mut() {
                            v.thickness_factor = value[0];
                        }
                    }
                    MaterialProperty::AttenuationDistance => {
                        if let Some(v) = material.volume.as_mut() {
                            v.attenuation_distance = value[0];
                        }
                    }
                    MaterialProperty::AttenuationColor => {
                        if let Some(v) = material.volume.as_mut() {
                            v.attenuation_color = vec3(value);
                        }
                    }
                    MaterialProperty::SheenColorFactor => {
                        if let Some(s) = material.sheen.as_mut() {
                            s.color_factor = vec3(value);
                        }
                    }
                    MaterialProperty::SheenRoughnessFactor => {
                        if let Some(s) = material.sheen.as_mut() {
                            s.roughness_factor = value[0];
                        }
                    }
                    MaterialProperty::ClearcoatFactor => {
                        if let Some(c) = material.clearcoat.as_mut() {
                            c.factor = value[0];
                        }
                    }
                    MaterialProperty::ClearcoatRoughnessFactor => {
                        if let Some(c) = material.clearcoat.as_mut() {
                            c.roughness_factor = value[0];
                        }
                    }
                    MaterialProperty::SpecularFactor => {
                        if let Some(s) = material.specular.as_mut() {
                            s.factor = value[0];
                        }
                    }
                    MaterialProperty::SpecularColorFactor => {
                        if let Some(s) = material.specular.as_mut() {
                            s.color_factor = vec3(value);
                        }
                    }
                }
            }
            PropertyPath::Light(index, property) => {
                let light = self.lights.get_mut(index).ok_or_else(not_found)?;
                match property {
                    LightProperty::Color => light.color = vec3(value),
                    LightProperty::Intensity => light.intensity = value[0],
                    LightProperty::Range => light.range = Some(value[0]),
                    LightProperty::InnerConeAngle => light.inner_cone_angle = value[0],
                    LightProperty::OuterConeAngle => light.outer_cone_angle = value[0],
                }
            }
            PropertyPath::Camera(index, property) => {
                let camera = self.cameras.get_mut(index).ok_or_else(not_found)?;
                match (&mut camera.projection, property) {
                    (Projection::Perspective { yfov, .. }, CameraProperty::Yfov) => {
                        *yfov = value[0]
                    }
                    (Projection::Perspective { aspect_ratio, .. }, CameraProperty::AspectRatio) => {
                        *aspect_ratio = Some(value[0])
                    }
                    (Projection::Perspective { znear, .. }, CameraProperty::PerspectiveZnear) => {
                        *znear = value[0]
                    }
                    (Projection::Perspective { zfar, .. }, CameraProperty::PerspectiveZfar) => {
                        *zfar = Some(value[0])
                    }
                    (Projection::Orthographic { xmag, .. }, CameraProperty::Xmag) => {
                        *xmag = value[0]
                    }
                    (Projection::Orthographic { ymag, .. }, CameraProperty::Ymag) => {
                        *ymag = value[0]
                    }
                    (Projection::Orthographic { znear, .. }, CameraProperty::OrthographicZnear) => {
                        *znear = value[0]
                    }
                    (Projection::Orthographic { zfar, .. }, CameraProperty::OrthographicZfar) => {
                        *zfar = value[0]
                    }
                    _ => return Err(not_found()),
                }
            }
        }
        Ok(())
    }
}

/// 无效目标日志
///
/// 同一路径的失败只警告一次，之后静默跳过。
#[derive(Debug, Default)]
pub struct InvalidTargetLog {
    reported: HashSet<String>,
}

impl InvalidTargetLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录失败，首次出现时返回 `true` 并输出警告
    pub fn report(&mut self, pointer: &str, error: &dyn fmt::Display) -> bool {
        if self.reported.contains(pointer) {
            return false;
        }
        tracing::warn!(target: "scene", "Cannot target {pointer}: {error}");
        self.reported.insert(pointer.to_string());
        true
    }

    /// 已报告过的路径个数
    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }

    pub fn is_reported(&self, pointer: &str) -> bool {
        self.reported.contains(pointer)
    }

    /// 读取属性，失败时记录并返回 `None`
    pub fn get<A: PropertyAccess + ?Sized>(
        &mut self,
        target: &A,
        pointer: &str,
    ) -> Option<Vec<f32>> {
        match target.get_pointer(pointer) {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(pointer, &error);
                None
            }
        }
    }

    /// 写入属性，失败时记录并作为空操作
    pub fn set<A: PropertyAccess + ?Sized>(
        &mut self,
        target: &mut A,
        pointer: &str,
        value: &[f32],
    ) -> bool {
        match target.set_pointer(pointer, value) {
            Ok(()) => true,
            Err(error) => {
                self.report(pointer, &error);
                false
            }
        }
    }
}
