//! 查看器状态
//!
//! 渲染器每帧读取的输入：文档、活动场景、相机选择、渲染参数、环境、
//! 材质变体与动画计时器。

use crate::animation::{AnimationService, AnimationTimer};
use crate::config::{RenderingParameters, ViewerConfig};
use crate::scene::{Camera, Environment, Gltf, InvalidTargetLog};
use glam::Vec3;

/// 查看器状态
#[derive(Debug)]
pub struct ViewerState {
    pub gltf: Gltf,
    /// 活动场景
    pub scene_index: usize,
    /// 文档相机索引，`None` 使用用户相机
    pub camera_index: Option<usize>,
    pub user_camera: Camera,
    pub rendering_parameters: RenderingParameters,
    pub environment: Option<Environment>,
    /// 活动材质变体名，`None` 使用默认材质
    pub variant: Option<String>,
    /// 每个动画一个计时器
    pub animation_timers: Vec<AnimationTimer>,
    pub invalid_targets: InvalidTargetLog,
}

impl ViewerState {
    pub fn new(gltf: Gltf) -> Self {
        let animation_timers = AnimationService::create_timers(&gltf);
        let scene_index = gltf.scene.unwrap_or(0);
        let mut state = Self {
            gltf,
            scene_index,
            camera_index: None,
            user_camera: Camera::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO),
            rendering_parameters: RenderingParameters::default(),
            environment: None,
            variant: None,
            animation_timers,
            invalid_targets: InvalidTargetLog::new(),
        };
        state.gltf.update_world_transforms(scene_index);
        state
    }

    /// 使用配置中的渲染参数
    pub fn with_config(gltf: Gltf, config: &ViewerConfig) -> Self {
        let mut state = Self::new(gltf);
        state.rendering_parameters = config.rendering.clone();
        state
    }

    /// 切换活动场景并重新计算世界变换
    pub fn set_scene(&mut self, scene_index: usize) {
        if scene_index >= self.gltf.scenes.len() {
            tracing::warn!(target: "scene", "Scene {scene_index} does not exist");
            return;
        }
        self.scene_index = scene_index;
        self.gltf.update_world_transforms(scene_index);
    }

    /// 活动变体的索引；未知变体名按默认处理
    pub fn active_variant(&self) -> Option<usize> {
        self.variant
            .as_deref()
            .and_then(|name| self.gltf.variant_index(name))
    }

    /// 当前相机，宽高比强制为视口宽高比
    pub fn active_camera(&self, aspect_ratio: f32) -> Camera {
        let mut camera = match self.camera_index {
            Some(index) => match self.gltf.cameras.get(index) {
                Some(camera) => camera.clone(),
                None => {
                    tracing::warn!(
                        target: "scene",
                        "Camera {index} does not exist, using user camera"
                    );
                    self.user_camera.clone()
                }
            },
            None => self.user_camera.clone(),
        };
        camera.set_aspect_ratio(aspect_ratio);
        camera
    }

    /// 推进动画并重新计算世界变换，返回写入的通道数
    pub fn advance_animations(&mut self, delta_time: f32) -> usize {
        let applied = AnimationService::apply(
            &mut self.gltf,
            &mut self.animation_timers,
            delta_time,
            &mut self.invalid_targets,
        );
        self.gltf.update_world_transforms(self.scene_index);
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{
        Animation, AnimationChannel, AnimationSampler, InterpolationMode, InterpolationPath,
    };
    use crate::scene::{Accessor, ComponentType, ElementType, Node, Scene};

    fn document() -> Gltf {
        let mut gltf = Gltf::new();
        let mut parent = Node::new();
        parent.children = vec![1];
        gltf.nodes = vec![parent, Node::new()];
        gltf.scenes.push(Scene::new(vec![0]));
        gltf.variants = vec!["red".to_string(), "blue".to_string()];
        gltf.cameras.push(Camera::perspective(1.0, 0.1, Some(10.0)));
        gltf.accessors.push(Accessor::scalars(vec![0.0, 1.0]));
        gltf.accessors.push(Accessor::new(
            ElementType::Vec3,
            ComponentType::Float,
            vec![0.0, 0.0, 0.0, 0.0, 2.0, 0.0],
        ));
        gltf.animations.push(Animation::new(
            None,
            vec![AnimationChannel::new(0, 0, InterpolationPath::Translation)],
            vec![AnimationSampler::new(0, 1, InterpolationMode::Linear)],
        ));
        gltf
    }

    #[test]
    fn test_advance_updates_world_transforms() {
        let mut state = ViewerState::new(document());
        AnimationService::play(&mut state.animation_timers[0]);

        assert_eq!(state.advance_animations(0.5), 1);
        let child_world = state.gltf.nodes[1].world_transform;
        assert_eq!(child_world.w_axis.truncate(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_active_variant() {
        let mut state = ViewerState::new(document());
        assert_eq!(state.active_variant(), None);

        state.variant = Some("blue".to_string());
        assert_eq!(state.active_variant(), Some(1));

        state.variant = Some("green".to_string());
        assert_eq!(state.active_variant(), None);
    }

    #[test]
    fn test_camera_selection_falls_back_to_user_camera() {
        let mut state = ViewerState::new(document());
        state.camera_index = Some(0);
        assert_eq!(
            state.active_camera(2.0).projection,
            crate::scene::Projection::Perspective {
                yfov: 1.0,
                znear: 0.1,
                zfar: Some(10.0),
                aspect_ratio: Some(2.0),
            }
        );

        state.camera_index = Some(7);
        let camera = state.active_camera(1.5);
        assert_eq!(camera.transform, state.user_camera.transform);
    }

    #[test]
    fn test_set_scene_rejects_unknown_scene() {
        let mut state = ViewerState::new(document());
        state.set_scene(3);
        assert_eq!(state.scene_index, 0);
    }
}
