//! glTF 文档模型
//!
//! 渲染核心读取的内存中 glTF 文档：节点、网格、图元、访问器、材质、蒙皮、
//! 相机、灯光、场景、动画和材质变体。文件解析不在本模块范围内。
//!
//! ## 失效戳
//!
//! 每个 [`Gltf`] 在进程内拥有唯一的 [`DocumentId`] 与结构修订号。结构性修改
//! （增删节点、图元、材质引用等）后调用 [`Gltf::mark_structure_changed`]，
//! 渲染器据此重新分类可绘制对象，而不是依赖对象地址。

pub mod camera;
pub mod environment;
pub mod light;
pub mod material;
pub mod mesh;
pub mod node;
pub mod pointer;
pub mod skin;

pub use camera::{Camera, Projection};
pub use environment::Environment;
pub use light::{GpuLight, Light, LightType};
pub use material::{AlphaMode, Material, MaterialTexture};
pub use mesh::{
    Accessor, ComponentType, ElementType, Mesh, Primitive, PrimitiveMode, VariantMapping,
};
pub use node::Node;
pub use pointer::{InvalidTargetLog, PropertyAccess, PropertyPath};
pub use skin::Skin;

use crate::animation::Animation;
use glam::Mat4;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// 文档ID（进程内唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

/// 场景失效戳：文档、场景索引与结构修订号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneStamp {
    pub document: DocumentId,
    pub scene: usize,
    pub revision: u64,
}

/// 可绘制对象：节点与其网格中的一个图元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Drawable {
    pub node: usize,
    pub mesh: usize,
    pub primitive: usize,
}

/// 场景：根节点列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

impl Scene {
    pub fn new(nodes: Vec<usize>) -> Self {
        Self { name: None, nodes }
    }

    /// 深度优先收集场景中的全部节点（先序，去重）
    pub fn gather_nodes(&self, gltf: &Gltf) -> Vec<usize> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<usize> = self.nodes.iter().rev().copied().collect();

        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            let Some(node) = gltf.nodes.get(index) else {
                continue;
            };
            order.push(index);
            stack.extend(node.children.iter().rev().copied());
        }

        order
    }

    pub fn includes_node(&self, gltf: &Gltf, node: usize) -> bool {
        self.gather_nodes(gltf).contains(&node)
    }
}

/// glTF 文档
#[derive(Debug)]
pub struct Gltf {
    id: DocumentId,
    revision: u64,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub accessors: Vec<Accessor>,
    pub skins: Vec<Skin>,
    pub cameras: Vec<Camera>,
    /// KHR_lights_punctual
    pub lights: Vec<Light>,
    pub scenes: Vec<Scene>,
    /// 默认场景
    pub scene: Option<usize>,
    pub animations: Vec<Animation>,
    /// KHR_materials_variants 变体名称
    pub variants: Vec<String>,
}

impl Default for Gltf {
    fn default() -> Self {
        Self {
            id: DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)),
            revision: 0,
            nodes: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            accessors: Vec::new(),
            skins: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            scenes: Vec::new(),
            scene: None,
            animations: Vec::new(),
            variants: Vec::new(),
        }
    }
}

impl Gltf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 标记结构已修改，使已准备的分类失效
    pub fn mark_structure_changed(&mut self) {
        self.revision += 1;
        tracing::debug!(target: "scene", "Document {} revision {}", self.id.0, self.revision);
    }

    /// 指定场景的失效戳
    pub fn stamp(&self, scene: usize) -> SceneStamp {
        SceneStamp {
            document: self.id,
            scene,
            revision: self.revision,
        }
    }

    /// 变体名称对应的索引
    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == name)
    }

    /// 从场景根节点开始重新计算世界变换
    pub fn update_world_transforms(&mut self, scene: usize) {
        let Some(roots) = self.scenes.get(scene).map(|s| s.nodes.clone()) else {
            return;
        };

        let mut visited = HashSet::new();
        let mut stack: Vec<(usize, Mat4)> =
            roots.into_iter().map(|r| (r, Mat4::IDENTITY)).collect();

        while let Some((index, parent)) = stack.pop() {
            if !visited.insert(index) {
                tracing::warn!(
                    target: "scene",
                    "Node {index} is referenced more than once, skipping"
                );
                continue;
            }
            let Some(node) = self.nodes.get_mut(index) else {
                continue;
            };
            let world = parent * node.local_transform();
            node.apply_world_transform(world);
            stack.extend(node.children.iter().map(|child| (*child, world)));
        }
    }

    /// 为挂载蒙皮的节点计算关节矩阵
    pub fn update_skin(&mut self, node_index: usize) {
        let Some(skin_index) = self.nodes.get(node_index).and_then(|n| n.skin) else {
            return;
        };
        let Gltf {
            skins,
            nodes,
            accessors,
            ..
        } = self;
        if let Some(skin) = skins.get_mut(skin_index) {
            skin.compute_joints(nodes, accessors, node_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn hierarchy() -> Gltf {
        let mut gltf = Gltf::new();
        let mut root = Node::new();
        root.translation = Vec3::new(1.0, 0.0, 0.0);
        root.children = vec![1];
        let mut child = Node::new();
        child.translation = Vec3::new(0.0, 2.0, 0.0);
        child.children = vec![2];
        let leaf = Node::new();
        gltf.nodes = vec![root, child, leaf, Node::new()];
        gltf.scenes.push(Scene::new(vec![0]));
        gltf
    }

    #[test]
    fn test_document_ids_are_unique() {
        let a = Gltf::new();
        let b = Gltf::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_stamp_changes_with_revision() {
        let mut gltf = Gltf::new();
        let before = gltf.stamp(0);
        gltf.mark_structure_changed();
        assert_ne!(before, gltf.stamp(0));
        assert_ne!(gltf.stamp(0), gltf.stamp(1));
    }

    #[test]
    fn test_world_transforms() {
        let mut gltf = hierarchy();
        gltf.update_world_transforms(0);

        let leaf = gltf.nodes[2].world_transform.w_axis.truncate();
        assert_eq!(leaf, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_gather_nodes() {
        let gltf = hierarchy();
        let scene = &gltf.scenes[0];
        assert_eq!(scene.gather_nodes(&gltf), vec![0, 1, 2]);
        assert!(scene.includes_node(&gltf, 2));
        assert!(!scene.includes_node(&gltf, 3));
    }

    #[test]
    fn test_cycles_are_cut() {
        let mut gltf = hierarchy();
        gltf.nodes[2].children = vec![0];
        gltf.update_world_transforms(0);
        assert_eq!(gltf.scenes[0].gather_nodes(&gltf), vec![0, 1, 2]);
    }
}
