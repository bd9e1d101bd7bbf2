//! KHR_lights_punctual 灯光

use super::Gltf;
use glam::{Mat3, Quat, Vec3};

/// 灯光类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

impl LightType {
    /// 着色器中的类型编号
    pub fn shader_value(&self) -> i32 {
        match self {
            LightType::Directional => 0,
            LightType::Point => 1,
            LightType::Spot => 2,
        }
    }
}

/// 打包后的灯光 uniform（std140，64 字节）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub direction: [f32; 3],
    /// 小于等于 0 表示无限范围
    pub range: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub inner_cone_cos: f32,
    pub outer_cone_cos: f32,
    pub light_type: i32,
    pub _pad: [f32; 2],
}

/// 灯光
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: Option<String>,
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub range: Option<f32>,
    /// 聚光灯内锥角（弧度）
    pub inner_cone_angle: f32,
    /// 聚光灯外锥角（弧度）
    pub outer_cone_angle: f32,
    /// 挂载节点
    pub node: Option<usize>,
    /// 未挂载节点时使用的固定方向
    pub direction: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            name: None,
            light_type: LightType::Directional,
            color: Vec3::ONE,
            intensity: 1.0,
            range: None,
            inner_cone_angle: 0.0,
            outer_cone_angle: std::f32::consts::FRAC_PI_4,
            node: None,
            direction: Vec3::NEG_Z,
        }
    }
}

impl Light {
    /// 方向光，方向由旋转作用于 -Z 得到
    pub fn directional_from_rotation(rotation: Quat, intensity: f32) -> Self {
        Self {
            intensity,
            direction: rotation * Vec3::NEG_Z,
            ..Default::default()
        }
    }

    /// 打包为着色器使用的结构
    pub fn to_uniform(&self, gltf: &Gltf) -> GpuLight {
        let (position, direction) = match self.node.and_then(|index| gltf.nodes.get(index)) {
            Some(node) => {
                let world = node.world_transform;
                let direction = (Mat3::from_mat4(world) * Vec3::NEG_Z).normalize_or_zero();
                (world.w_axis.truncate(), direction)
            }
            None => (Vec3::ZERO, self.direction),
        };

        GpuLight {
            direction: direction.to_array(),
            range: self.range.unwrap_or(-1.0),
            color: self.color.to_array(),
            intensity: self.intensity,
            position: position.to_array(),
            inner_cone_cos: self.inner_cone_angle.cos(),
            outer_cone_cos: self.outer_cone_angle.cos(),
            light_type: self.light_type.shader_value(),
            _pad: [0.0; 2],
        }
    }
}
