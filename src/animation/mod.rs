//! 动画系统模块
//!
//! 关键帧动画求值：采样器给出曲线，通道指定目标属性，每个通道一个
//! [`Interpolator`] 维护查找游标。求得的值通过属性指针写回文档。
//!
//! ## 功能特性
//!
//! - 阶梯、线性、三次样条与四元数球面插值
//! - 节点变换、变形权重与 KHR_animation_pointer 目标
//! - 播放控制：播放、暂停、停止、跳转、速度与重复次数
//!
//! ## 使用示例
//!
//! ```rust
//! use gltf_viewer_core::animation::{
//!     Animation, AnimationChannel, AnimationSampler, AnimationService, InterpolationMode,
//!     InterpolationPath,
//! };
//! use gltf_viewer_core::scene::{
//!     Accessor, ComponentType, ElementType, Gltf, InvalidTargetLog, Node, Scene,
//! };
//!
//! let mut gltf = Gltf::new();
//! gltf.nodes.push(Node::new());
//! gltf.scenes.push(Scene::new(vec![0]));
//! gltf.accessors.push(Accessor::scalars(vec![0.0, 1.0]));
//! gltf.accessors.push(Accessor::new(
//!     ElementType::Vec3,
//!     ComponentType::Float,
//!     vec![0.0, 0.0, 0.0, 10.0, 0.0, 0.0],
//! ));
//! gltf.animations.push(Animation::new(
//!     Some("slide".to_string()),
//!     vec![AnimationChannel::new(0, 0, InterpolationPath::Translation)],
//!     vec![AnimationSampler::new(0, 1, InterpolationMode::Linear)],
//! ));
//!
//! let mut timers = AnimationService::create_timers(&gltf);
//! AnimationService::play(&mut timers[0]);
//!
//! let mut log = InvalidTargetLog::new();
//! AnimationService::apply(&mut gltf, &mut timers, 0.5, &mut log);
//! assert_eq!(gltf.nodes[0].translation.x, 5.0);
//! ```

pub mod channel;
pub mod interpolator;
pub mod sampler;
pub mod service;
pub mod timer;

pub use channel::{AnimationChannel, InterpolationPath};
pub use interpolator::Interpolator;
pub use sampler::{AnimationSampler, InterpolationMode, KeyframeCurve};
pub use service::AnimationService;
pub use timer::{AnimationTimer, PlaybackState};

use crate::core::error::{AnimationError, AnimationResult};
use crate::scene::{Accessor, Gltf, InvalidTargetLog, PropertyAccess};

/// 动画：通道、采样器与每个通道的插值器
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: Option<String>,
    pub channels: Vec<AnimationChannel>,
    pub samplers: Vec<AnimationSampler>,
    interpolators: Vec<Interpolator>,
}

impl Animation {
    pub fn new(
        name: Option<String>,
        channels: Vec<AnimationChannel>,
        samplers: Vec<AnimationSampler>,
    ) -> Self {
        let interpolators = vec![Interpolator::new(); channels.len()];
        Self {
            name,
            channels,
            samplers,
            interpolators,
        }
    }

    /// 动画时长：所有采样器最后一个关键帧时间的最大值
    pub fn duration(&self, accessors: &[Accessor]) -> f32 {
        self.samplers
            .iter()
            .filter_map(|sampler| sampler.curve(accessors).ok())
            .map(|curve| curve.max_time())
            .fold(0.0, f32::max)
    }

    /// 检查通道引用的采样器和访问器是否存在且非空
    pub fn validate(&self, accessors: &[Accessor]) -> AnimationResult<()> {
        for channel in &self.channels {
            let sampler = self
                .samplers
                .get(channel.sampler)
                .ok_or(AnimationError::MissingSampler(channel.sampler))?;
            let curve = sampler.curve(accessors)?;
            if curve.input.is_empty() || curve.output.is_empty() {
                return Err(AnimationError::EmptyCurve);
            }
        }
        Ok(())
    }

    /// 重置所有插值器游标
    pub fn reset(&mut self) {
        self.interpolators.iter_mut().for_each(Interpolator::reset);
    }

    /// 在 `time` 时刻求值所有通道并写入文档，返回成功写入的通道数
    ///
    /// 写入目标的当前分量个数即为步长。无效目标只警告一次。
    pub fn advance(&mut self, gltf: &mut Gltf, time: f32, log: &mut InvalidTargetLog) -> usize {
        self.evaluate(gltf, log, |_| time)
    }

    /// 每个通道停在自己的末帧（`at_end` 为 `false` 时停在首帧）
    ///
    /// 播放结束后使用：较短的通道不会折回首帧。
    pub fn settle(&mut self, gltf: &mut Gltf, at_end: bool, log: &mut InvalidTargetLog) -> usize {
        self.evaluate(gltf, log, |curve| if at_end { curve.max_time() } else { 0.0 })
    }

    fn evaluate<F>(&mut self, gltf: &mut Gltf, log: &mut InvalidTargetLog, time_of: F) -> usize
    where
        F: Fn(&KeyframeCurve<'_>) -> f32,
    {
        let mut applied = 0;

        for (channel, interpolator) in self.channels.iter().zip(self.interpolators.iter_mut()) {
            let pointer = channel.target_pointer(gltf);
            let current = match gltf.get_pointer(&pointer) {
                Ok(current) => current.len(),
                Err(error) => {
                    log.report(&pointer, &error);
                    continue;
                }
            };

            let Some(sampler) = self.samplers.get(channel.sampler) else {
                log.report(&pointer, &AnimationError::MissingSampler(channel.sampler));
                continue;
            };
            let value = sampler.curve(&gltf.accessors).and_then(|curve| {
                // 没有默认权重的网格按输出推断权重个数
                let stride = if current == 0 && channel.path == InterpolationPath::Weights {
                    curve.implied_stride()
                } else {
                    current
                };
                curve.validate(stride)?;
                interpolator
                    .interpolate(&curve, time_of(&curve), stride, channel.is_rotation())
                    .ok_or(AnimationError::StrideMismatch {
                        stride,
                        available: curve.output.len(),
                        required: curve.input.len() * 4 * curve.interpolation.elements_per_key(),
                    })
            });

            match value {
                Ok(value) => {
                    if log.set(gltf, &pointer, &value) {
                        applied += 1;
                    }
                }
                Err(error) => {
                    log.report(&pointer, &error);
                }
            }
        }

        applied
    }
}
