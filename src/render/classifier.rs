//! 可绘制对象分类
//!
//! 把场景中的图元分为不透明、半透明和透射三个互不相交的桶。分类结果按
//! [`SceneStamp`] 缓存，文档、场景或结构修订号变化时才重新分类。
//! 桶内无序，深度排序在每帧进行。

use crate::scene::{AlphaMode, Drawable, Gltf, SceneStamp};

/// 分类结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawableBuckets {
    pub opaque: Vec<Drawable>,
    pub transparent: Vec<Drawable>,
    pub transmissive: Vec<Drawable>,
    /// 没有有效材质而被跳过的图元数
    pub skipped: usize,
    /// 挂载了蒙皮的网格节点
    pub skinned: Vec<usize>,
}

impl DrawableBuckets {
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len() + self.transmissive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 对场景中的全部图元分类
    pub fn classify(gltf: &Gltf, scene: usize) -> Self {
        let mut buckets = Self::default();
        let Some(scene) = gltf.scenes.get(scene) else {
            return buckets;
        };

        for node_index in scene.gather_nodes(gltf) {
            let node = &gltf.nodes[node_index];
            let Some(mesh_index) = node.mesh else {
                continue;
            };
            let Some(mesh) = gltf.meshes.get(mesh_index) else {
                continue;
            };
            if node.skin.is_some() {
                buckets.skinned.push(node_index);
            }

            for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
                let drawable = Drawable {
                    node: node_index,
                    mesh: mesh_index,
                    primitive: primitive_index,
                };
                let Some(material) = primitive.material.and_then(|m| gltf.materials.get(m)) else {
                    buckets.skipped += 1;
                    continue;
                };

                if material.has_transmission() {
                    buckets.transmissive.push(drawable);
                } else if material.alpha_mode == AlphaMode::Blend {
                    buckets.transparent.push(drawable);
                } else {
                    buckets.opaque.push(drawable);
                }
            }
        }

        buckets
    }
}

/// 带失效戳的分类器
#[derive(Debug, Default)]
pub struct DrawableClassifier {
    stamp: Option<SceneStamp>,
    buckets: DrawableBuckets,
}

impl DrawableClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 需要时重新分类，返回是否发生了重新分类
    pub fn prepare(&mut self, gltf: &Gltf, scene: usize) -> bool {
        let stamp = gltf.stamp(scene);
        if self.stamp == Some(stamp) {
            return false;
        }

        self.buckets = DrawableBuckets::classify(gltf, scene);
        self.stamp = Some(stamp);
        tracing::debug!(
            target: "render",
            "Classified scene {}: {} opaque, {} transparent, {} transmissive, {} skipped",
            scene,
            self.buckets.opaque.len(),
            self.buckets.transparent.len(),
            self.buckets.transmissive.len(),
            self.buckets.skipped
        );
        true
    }

    pub fn buckets(&self) -> &DrawableBuckets {
        &self.buckets
    }

    pub fn stamp(&self) -> Option<SceneStamp> {
        self.stamp
    }

    /// 丢弃缓存的分类
    pub fn invalidate(&mut self) {
        self.stamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::Transmission;
    use crate::scene::{Material, Mesh, Node, Primitive, Scene};
    use proptest::prelude::*;

    fn primitive(material: Option<usize>) -> Primitive {
        Primitive::new(&[], &[], None, material, &[])
    }

    fn document(kinds: &[u8]) -> Gltf {
        let mut gltf = Gltf::new();
        gltf.materials = vec![
            Material::default(),
            Material {
                alpha_mode: AlphaMode::Blend,
                ..Default::default()
            },
            Material {
                alpha_mode: AlphaMode::Blend,
                transmission: Some(Transmission { factor: 1.0 }),
                ..Default::default()
            },
        ];
        let primitives = kinds
            .iter()
            .map(|kind| primitive((*kind < 3).then_some(*kind as usize)))
            .collect();
        gltf.meshes.push(Mesh::new(primitives));
        gltf.nodes.push(Node::with_mesh(0));
        gltf.scenes.push(Scene::new(vec![0]));
        gltf
    }

    #[test]
    fn test_classification() {
        let gltf = document(&[0, 1, 2, 3, 0]);
        let buckets = DrawableBuckets::classify(&gltf, 0);

        assert_eq!(buckets.opaque.len(), 2);
        assert_eq!(buckets.transparent.len(), 1);
        assert_eq!(buckets.transmissive.len(), 1);
        assert_eq!(buckets.skipped, 1);
        assert_eq!(buckets.transmissive[0].primitive, 2);
        assert!(buckets.skinned.is_empty());
    }

    #[test]
    fn test_skinned_nodes_recorded() {
        let mut gltf = document(&[0]);
        gltf.nodes[0].skin = Some(0);
        assert_eq!(DrawableBuckets::classify(&gltf, 0).skinned, vec![0]);
    }

    #[test]
    fn test_prepare_uses_stamp() {
        let mut gltf = document(&[0]);
        let mut classifier = DrawableClassifier::new();

        assert!(classifier.prepare(&gltf, 0));
        assert!(!classifier.prepare(&gltf, 0));

        gltf.meshes[0].primitives.push(primitive(Some(1)));
        assert!(!classifier.prepare(&gltf, 0));
        assert_eq!(classifier.buckets().len(), 1);

        gltf.mark_structure_changed();
        assert!(classifier.prepare(&gltf, 0));
        assert_eq!(classifier.buckets().transparent.len(), 1);

        classifier.invalidate();
        assert!(classifier.prepare(&gltf, 0));
    }

    #[test]
    fn test_missing_scene() {
        let gltf = document(&[0]);
        assert!(DrawableBuckets::classify(&gltf, 4).is_empty());
    }

    proptest! {
        #[test]
        fn test_buckets_partition_primitives(kinds in prop::collection::vec(0u8..4, 0..40)) {
            let gltf = document(&kinds);
            let buckets = DrawableBuckets::classify(&gltf, 0);

            let with_material = kinds.iter().filter(|k| **k < 3).count();
            prop_assert_eq!(buckets.len(), with_material);
            prop_assert_eq!(buckets.skipped, kinds.len() - with_material);

            let mut seen: Vec<usize> = buckets
                .opaque
                .iter()
                .chain(&buckets.transparent)
                .chain(&buckets.transmissive)
                .map(|d| d.primitive)
                .collect();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), with_material);
        }
    }
}
