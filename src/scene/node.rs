use glam::{Mat4, Quat, Vec3};

/// 场景节点
#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    /// KHR_lights_punctual 灯光索引
    pub light: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// 显式矩阵，存在时优先于 TRS
    pub matrix: Option<Mat4>,
    /// 世界变换（由 `Gltf::update_world_transforms` 计算）
    pub world_transform: Mat4,
    /// 世界变换的逆矩阵
    pub inverse_world_transform: Mat4,
    /// 法线矩阵：世界变换逆矩阵的转置
    pub normal_matrix: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            children: Vec::new(),
            mesh: None,
            skin: None,
            camera: None,
            light: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            matrix: None,
            world_transform: Mat4::IDENTITY,
            inverse_world_transform: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
        }
    }
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(mesh: usize) -> Self {
        Self {
            mesh: Some(mesh),
            ..Default::default()
        }
    }

    /// 局部变换
    pub fn local_transform(&self) -> Mat4 {
        self.matrix.unwrap_or_else(|| {
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
        })
    }

    /// 写入世界变换并更新派生矩阵
    pub fn apply_world_transform(&mut self, world: Mat4) {
        self.world_transform = world;
        self.inverse_world_transform = world.inverse();
        self.normal_matrix = self.inverse_world_transform.transpose();
    }

    /// 世界变换是否翻转了手性
    pub fn is_mirrored(&self) -> bool {
        self.world_transform.determinant() < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_transform_prefers_matrix() {
        let mut node = Node::new();
        node.translation = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(
            node.local_transform().w_axis.truncate(),
            Vec3::new(1.0, 2.0, 3.0)
        );

        node.matrix = Some(Mat4::from_translation(Vec3::X));
        assert_eq!(node.local_transform().w_axis.truncate(), Vec3::X);
    }

    #[test]
    fn test_mirrored() {
        let mut node = Node::new();
        node.apply_world_transform(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
        assert!(node.is_mirrored());

        node.apply_world_transform(Mat4::from_scale(Vec3::splat(2.0)));
        assert!(!node.is_mirrored());
        assert!((node.normal_matrix.x_axis.x - 0.5).abs() < 1e-6);
    }
}
