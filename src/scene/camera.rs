//! 相机
//!
//! 投影矩阵遵循 GL 约定（右手系，NDC 深度范围 [-1, 1]）。

use super::{Drawable, Gltf};
use glam::{Mat4, Vec3, Vec4};

/// 投影类型
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        /// 垂直视场角（弧度）
        yfov: f32,
        znear: f32,
        /// `None` 为无限远平面
        zfar: Option<f32>,
        aspect_ratio: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

/// 相机
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
    /// 挂载节点；为 `None` 时使用 `transform`
    pub node: Option<usize>,
    /// 未挂载到节点时的世界变换（用户相机）
    pub transform: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(45f32.to_radians(), 0.01, Some(100.0))
    }
}

impl Camera {
    pub fn perspective(yfov: f32, znear: f32, zfar: Option<f32>) -> Self {
        Self {
            name: None,
            projection: Projection::Perspective {
                yfov,
                znear,
                zfar,
                aspect_ratio: None,
            },
            node: None,
            transform: Mat4::IDENTITY,
        }
    }

    /// 用户相机：位于 `eye`，看向 `target`
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            transform: Mat4::look_at_rh(eye, target, Vec3::Y).inverse(),
            ..Self::default()
        }
    }

    /// 设置宽高比（仅透视投影）
    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        if let Projection::Perspective { aspect_ratio, .. } = &mut self.projection {
            *aspect_ratio = Some(ratio);
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                yfov,
                znear,
                zfar,
                aspect_ratio,
            } => {
                let aspect = aspect_ratio.unwrap_or(1.0);
                match zfar {
                    Some(zfar) => Mat4::perspective_rh_gl(yfov, aspect, znear, zfar),
                    None => {
                        let f = 1.0 / (yfov / 2.0).tan();
                        Mat4::from_cols(
                            Vec4::new(f / aspect, 0.0, 0.0, 0.0),
                            Vec4::new(0.0, f, 0.0, 0.0),
                            Vec4::new(0.0, 0.0, -1.0, -1.0),
                            Vec4::new(0.0, 0.0, -2.0 * znear, 0.0),
                        )
                    }
                }
            }
            Projection::Orthographic {
                xmag,
                ymag,
                znear,
                zfar,
            } => Mat4::orthographic_rh_gl(-xmag, xmag, -ymag, ymag, znear, zfar),
        }
    }

    /// 相机的世界变换
    pub fn world_transform(&self, gltf: &Gltf) -> Mat4 {
        self.node
            .and_then(|index| gltf.nodes.get(index))
            .map(|node| node.world_transform)
            .unwrap_or(self.transform)
    }

    pub fn view_matrix(&self, gltf: &Gltf) -> Mat4 {
        self.world_transform(gltf).inverse()
    }

    pub fn position(&self, gltf: &Gltf) -> Vec3 {
        self.world_transform(gltf).w_axis.truncate()
    }

    /// 按观察空间深度从远到近排序
    pub fn sort_primitives_by_depth(&self, gltf: &Gltf, drawables: &mut [Drawable]) {
        let view = self.view_matrix(gltf);
        let depth = |drawable: &Drawable| -> f32 {
            let Some(node) = gltf.nodes.get(drawable.node) else {
                return 0.0;
            };
            let centroid = gltf
                .meshes
                .get(drawable.mesh)
                .and_then(|mesh| mesh.primitives.get(drawable.primitive))
                .map(|primitive| primitive.centroid)
                .unwrap_or(Vec3::ZERO);
            (view * node.world_transform).transform_point3(centroid).z
        };

        drawables.sort_by(|a, b| depth(a).total_cmp(&depth(b)));
    }
}
