use super::mesh::Accessor;
use super::node::Node;
use glam::Mat4;

/// 蒙皮
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub name: Option<String>,
    /// 关节节点
    pub joints: Vec<usize>,
    /// 逆绑定矩阵访问器（MAT4）
    pub inverse_bind_matrices: Option<usize>,
    /// 最近一次计算的关节矩阵
    pub joint_matrices: Vec<Mat4>,
    /// 关节法线矩阵
    pub joint_normal_matrices: Vec<Mat4>,
}

impl Skin {
    pub fn new(joints: Vec<usize>, inverse_bind_matrices: Option<usize>) -> Self {
        Self {
            joints,
            inverse_bind_matrices,
            ..Default::default()
        }
    }

    /// 计算关节矩阵
    ///
    /// `joint = inverse(mesh_node.world) * joint_node.world * inverse_bind`，
    /// 法线矩阵为其逆矩阵的转置。缺失的逆绑定矩阵按单位矩阵处理。
    pub fn compute_joints(&mut self, nodes: &[Node], accessors: &[Accessor], node_index: usize) {
        let Some(node) = nodes.get(node_index) else {
            tracing::warn!(target: "scene", "Skinned node {node_index} not found");
            return;
        };
        let inverse_world = node.inverse_world_transform;
        let ibm_accessor = self
            .inverse_bind_matrices
            .and_then(|index| accessors.get(index));

        self.joint_matrices.clear();
        self.joint_normal_matrices.clear();

        for (i, joint_index) in self.joints.iter().enumerate() {
            let joint_world = nodes
                .get(*joint_index)
                .map(|joint| joint.world_transform)
                .unwrap_or(Mat4::IDENTITY);

            let inverse_bind = ibm_accessor
                .and_then(|accessor| accessor.element(i))
                .and_then(|values| <[f32; 16]>::try_from(values).ok())
                .map(|values| Mat4::from_cols_array(&values))
                .unwrap_or(Mat4::IDENTITY);

            let joint_matrix = inverse_world * joint_world * inverse_bind;
            self.joint_matrices.push(joint_matrix);
            self.joint_normal_matrices
                .push(joint_matrix.inverse().transpose());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mesh::{ComponentType, ElementType};
    use glam::Vec3;

    #[test]
    fn test_compute_joints() {
        let mut mesh_node = Node::new();
        mesh_node.apply_world_transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let mut joint = Node::new();
        joint.apply_world_transform(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        let nodes = vec![mesh_node, joint];

        let ibm = Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0));
        let accessors = vec![Accessor::new(
            ElementType::Mat4,
            ComponentType::Float,
            ibm.to_cols_array().to_vec(),
        )];

        let mut skin = Skin::new(vec![1], Some(0));
        skin.compute_joints(&nodes, &accessors, 0);

        assert_eq!(skin.joint_matrices.len(), 1);
        assert!(skin.joint_matrices[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert_eq!(skin.joint_normal_matrices.len(), 1);
    }

    #[test]
    fn test_missing_inverse_bind_is_identity() {
        let mut joint = Node::new();
        joint.apply_world_transform(Mat4::from_translation(Vec3::X));
        let nodes = vec![Node::new(), joint];

        let mut skin = Skin::new(vec![1], None);
        skin.compute_joints(&nodes, &[], 0);
        assert!(skin.joint_matrices[0].abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }
}
