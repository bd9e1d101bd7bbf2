use crate::scene::pointer::{NodeProperty, PropertyPath};
use crate::scene::Gltf;

/// 通道的目标属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpolationPath {
    Translation,
    Rotation,
    Scale,
    /// 节点网格的变形权重
    Weights,
    /// KHR_animation_pointer 指针
    Pointer(String),
}

impl InterpolationPath {
    pub fn parse(path: &str, pointer: Option<&str>) -> Option<Self> {
        match (path, pointer) {
            ("translation", _) => Some(InterpolationPath::Translation),
            ("rotation", _) => Some(InterpolationPath::Rotation),
            ("scale", _) => Some(InterpolationPath::Scale),
            ("weights", _) => Some(InterpolationPath::Weights),
            ("pointer", Some(pointer)) => Some(InterpolationPath::Pointer(pointer.to_string())),
            _ => None,
        }
    }
}

/// 动画通道：采样器驱动一个目标属性
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    pub sampler: usize,
    /// 目标节点，指针通道为 `None`
    pub target_node: Option<usize>,
    pub path: InterpolationPath,
}

impl AnimationChannel {
    pub fn new(sampler: usize, target_node: usize, path: InterpolationPath) -> Self {
        Self {
            sampler,
            target_node: Some(target_node),
            path,
        }
    }

    pub fn pointer(sampler: usize, pointer: impl Into<String>) -> Self {
        Self {
            sampler,
            target_node: None,
            path: InterpolationPath::Pointer(pointer.into()),
        }
    }

    /// 目标的 JSON 指针，用于写入和日志
    pub fn target_pointer(&self, gltf: &Gltf) -> String {
        let node = self.target_node.unwrap_or(usize::MAX);
        match &self.path {
            InterpolationPath::Translation => format!("/nodes/{node}/translation"),
            InterpolationPath::Rotation => format!("/nodes/{node}/rotation"),
            InterpolationPath::Scale => format!("/nodes/{node}/scale"),
            InterpolationPath::Weights => {
                match gltf.nodes.get(node).and_then(|n| n.mesh) {
                    Some(mesh) => format!("/meshes/{mesh}/weights"),
                    None => format!("/nodes/{node}/weights"),
                }
            }
            InterpolationPath::Pointer(pointer) => pointer.clone(),
        }
    }

    /// 是否为四元数目标，需要球面插值
    pub fn is_rotation(&self) -> bool {
        match &self.path {
            InterpolationPath::Rotation => true,
            InterpolationPath::Pointer(pointer) => matches!(
                PropertyPath::parse(pointer),
                Ok(PropertyPath::Node(_, NodeProperty::Rotation))
            ),
            _ => false,
        }
    }
}
