//! 动画服务层
//!
//! 贫血模型：计时器只保存数据，播放控制与求值逻辑集中在 Service 中。

use super::timer::{AnimationTimer, PlaybackState};
use crate::scene::{Gltf, InvalidTargetLog};

/// 动画服务
///
/// - `AnimationTimer`: 播放状态
/// - `AnimationService`: 播放控制与求值
/// - `ViewerState::advance_animations`: 每帧调度
pub struct AnimationService;

impl AnimationService {
    /// 为文档中的每个动画创建计时器，无效动画只记录警告
    pub fn create_timers(gltf: &Gltf) -> Vec<AnimationTimer> {
        gltf.animations
            .iter()
            .enumerate()
            .map(|(index, animation)| {
                if let Err(error) = animation.validate(&gltf.accessors) {
                    tracing::warn!(
                        target: "animation",
                        "Animation {} ({}) is invalid: {}",
                        index,
                        animation.name.as_deref().unwrap_or("unnamed"),
                        error
                    );
                }
                AnimationTimer::new(index)
            })
            .collect()
    }

    /// 从头开始播放
    pub fn play(timer: &mut AnimationTimer) {
        timer.elapsed = 0.0;
        timer.state = PlaybackState::Playing;
    }

    /// 暂停播放
    pub fn pause(timer: &mut AnimationTimer) {
        if timer.state == PlaybackState::Playing {
            timer.state = PlaybackState::Paused;
        }
    }

    /// 从当前时间继续播放
    pub fn resume(timer: &mut AnimationTimer) {
        if timer.state != PlaybackState::Finished {
            timer.state = PlaybackState::Playing;
        }
    }

    /// 停止播放并重置
    pub fn stop(timer: &mut AnimationTimer) {
        timer.state = PlaybackState::Stopped;
        timer.elapsed = 0.0;
    }

    /// 设置播放速度
    pub fn set_speed(timer: &mut AnimationTimer, speed: f32) {
        if speed.is_finite() {
            timer.speed = speed;
        }
    }

    /// 设置重复次数，`None` 为无限循环
    pub fn set_repetitions(timer: &mut AnimationTimer, repetitions: Option<u32>) {
        timer.repetitions = repetitions;
    }

    /// 跳转到指定时间，已结束的动画转为暂停
    pub fn seek(timer: &mut AnimationTimer, time: f32) {
        if !time.is_finite() {
            return;
        }
        timer.elapsed = time;
        if matches!(timer.state, PlaybackState::Finished | PlaybackState::Stopped) {
            timer.state = PlaybackState::Paused;
        }
    }

    /// 推进计时器
    pub fn update(timer: &mut AnimationTimer, duration: f32, delta_time: f32) {
        if !timer.is_playing() {
            return;
        }

        timer.elapsed += delta_time * timer.speed;

        if let Some(repetitions) = timer.repetitions {
            let end = repetitions as f32 * duration;
            if duration > 0.0 && timer.elapsed.abs() >= end {
                timer.elapsed = end.copysign(timer.elapsed);
                timer.state = PlaybackState::Finished;
                tracing::debug!(
                    target: "animation",
                    "Animation {} finished after {} repetitions",
                    timer.animation,
                    repetitions
                );
            }
        }
    }

    /// 求值时间：结束后停在最后（倒放时为第一）帧
    pub fn sample_time(timer: &AnimationTimer, duration: f32) -> f32 {
        if timer.state == PlaybackState::Finished && duration > 0.0 {
            if timer.elapsed >= 0.0 {
                duration
            } else {
                0.0
            }
        } else {
            timer.elapsed
        }
    }

    /// 获取当前循环内的播放进度 (0.0 - 1.0)
    pub fn progress(timer: &AnimationTimer, duration: f32) -> f32 {
        if duration <= 0.0 {
            return 0.0;
        }
        let time = Self::sample_time(timer, duration);
        if (0.0..=duration).contains(&time) {
            time / duration
        } else {
            time.rem_euclid(duration) / duration
        }
    }

    /// 检查动画是否播放完成
    pub fn is_finished(timer: &AnimationTimer) -> bool {
        timer.state == PlaybackState::Finished
    }

    /// 推进所有计时器并把活动动画写入文档，返回写入的通道数
    ///
    /// 之后需要重新计算世界变换。
    pub fn apply(
        gltf: &mut Gltf,
        timers: &mut [AnimationTimer],
        delta_time: f32,
        log: &mut InvalidTargetLog,
    ) -> usize {
        let mut animations = std::mem::take(&mut gltf.animations);
        let mut applied = 0;

        for timer in timers.iter_mut() {
            let Some(animation) = animations.get_mut(timer.animation) else {
                continue;
            };
            let duration = animation.duration(&gltf.accessors);
            Self::update(timer, duration, delta_time);

            if timer.state == PlaybackState::Finished {
                applied += animation.settle(gltf, timer.elapsed >= 0.0, log);
            } else if timer.is_active() {
                let time = Self::sample_time(timer, duration);
                applied += animation.advance(gltf, time, log);
            }
        }

        gltf.animations = animations;
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{
        Animation, AnimationChannel, AnimationSampler, InterpolationMode, InterpolationPath,
    };
    use crate::scene::{Accessor, ComponentType, ElementType, Node};

    fn sliding_document() -> Gltf {
        let mut gltf = Gltf::new();
        gltf.nodes.push(Node::new());
        gltf.accessors.push(Accessor::scalars(vec![0.0, 1.0]));
        gltf.accessors.push(Accessor::new(
            ElementType::Vec3,
            ComponentType::Float,
            vec![0.0, 0.0, 0.0, 4.0, 0.0, 0.0],
        ));
        gltf.animations.push(Animation::new(
            Some("slide".to_string()),
            vec![AnimationChannel::new(0, 0, InterpolationPath::Translation)],
            vec![AnimationSampler::new(0, 1, InterpolationMode::Linear)],
        ));
        gltf
    }

    #[test]
    fn test_play_pause_resume() {
        let mut timer = AnimationTimer::new(0);

        AnimationService::play(&mut timer);
        assert!(timer.is_playing());
        assert_eq!(timer.elapsed, 0.0);

        AnimationService::pause(&mut timer);
        assert_eq!(timer.state, PlaybackState::Paused);

        AnimationService::update(&mut timer, 1.0, 0.5);
        assert_eq!(timer.elapsed, 0.0);

        AnimationService::resume(&mut timer);
        AnimationService::update(&mut timer, 1.0, 0.25);
        assert_eq!(timer.elapsed, 0.25);

        AnimationService::stop(&mut timer);
        assert_eq!(timer.state, PlaybackState::Stopped);
        assert_eq!(timer.elapsed, 0.0);
    }

    #[test]
    fn test_speed_and_progress() {
        let mut timer = AnimationTimer::new(0);
        AnimationService::play(&mut timer);
        AnimationService::set_speed(&mut timer, 2.0);
        AnimationService::update(&mut timer, 4.0, 0.5);

        assert_eq!(timer.elapsed, 1.0);
        assert!((AnimationService::progress(&timer, 4.0) - 0.25).abs() < 1e-6);

        AnimationService::update(&mut timer, 4.0, 2.0);
        assert!((AnimationService::progress(&timer, 4.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_repetitions_finish_on_last_frame() {
        let mut timer = AnimationTimer::new(0);
        AnimationService::set_repetitions(&mut timer, Some(2));
        AnimationService::play(&mut timer);

        AnimationService::update(&mut timer, 1.0, 1.5);
        assert!(!AnimationService::is_finished(&timer));

        AnimationService::update(&mut timer, 1.0, 1.0);
        assert!(AnimationService::is_finished(&timer));
        assert_eq!(timer.elapsed, 2.0);
        assert_eq!(AnimationService::sample_time(&timer, 1.0), 1.0);

        AnimationService::resume(&mut timer);
        assert!(AnimationService::is_finished(&timer));
    }

    #[test]
    fn test_seek_while_stopped() {
        let mut timer = AnimationTimer::new(0);
        AnimationService::seek(&mut timer, 0.75);
        assert_eq!(timer.state, PlaybackState::Paused);
        assert_eq!(timer.elapsed, 0.75);
        assert!(timer.is_active());
    }

    #[test]
    fn test_apply_drives_document() {
        let mut gltf = sliding_document();
        let mut timers = AnimationService::create_timers(&gltf);
        let mut log = InvalidTargetLog::new();

        // 停止的动画不写入
        assert_eq!(AnimationService::apply(&mut gltf, &mut timers, 0.5, &mut log), 0);

        AnimationService::play(&mut timers[0]);
        assert_eq!(AnimationService::apply(&mut gltf, &mut timers, 0.25, &mut log), 1);
        assert_eq!(gltf.nodes[0].translation.x, 1.0);

        AnimationService::seek(&mut timers[0], 0.5);
        AnimationService::pause(&mut timers[0]);
        AnimationService::apply(&mut gltf, &mut timers, 1.0, &mut log);
        assert_eq!(gltf.nodes[0].translation.x, 2.0);
        assert_eq!(gltf.animations.len(), 1);
    }

    #[test]
    fn test_finished_channels_hold_their_own_last_frame() {
        let mut gltf = Gltf::new();
        gltf.nodes = vec![Node::new(), Node::new()];
        // 0: 1 秒时间轴, 1: 2 秒时间轴, 2: x 从 0 到 10
        gltf.accessors.push(Accessor::scalars(vec![0.0, 1.0]));
        gltf.accessors.push(Accessor::scalars(vec![0.0, 2.0]));
        gltf.accessors.push(Accessor::new(
            ElementType::Vec3,
            ComponentType::Float,
            vec![0.0, 0.0, 0.0, 10.0, 0.0, 0.0],
        ));
        gltf.animations.push(Animation::new(
            None,
            vec![
                AnimationChannel::new(0, 0, InterpolationPath::Translation),
                AnimationChannel::new(1, 1, InterpolationPath::Translation),
            ],
            vec![
                AnimationSampler::new(0, 2, InterpolationMode::Linear),
                AnimationSampler::new(1, 2, InterpolationMode::Linear),
            ],
        ));

        let mut timers = AnimationService::create_timers(&gltf);
        AnimationService::set_repetitions(&mut timers[0], Some(1));
        AnimationService::play(&mut timers[0]);
        let mut log = InvalidTargetLog::new();

        assert_eq!(AnimationService::apply(&mut gltf, &mut timers, 5.0, &mut log), 2);
        assert!(AnimationService::is_finished(&timers[0]));
        assert_eq!(gltf.nodes[0].translation.x, 10.0);
        assert_eq!(gltf.nodes[1].translation.x, 10.0);

        // 倒放结束停在首帧
        AnimationService::play(&mut timers[0]);
        AnimationService::set_speed(&mut timers[0], -1.0);
        AnimationService::apply(&mut gltf, &mut timers, 5.0, &mut log);
        assert!(AnimationService::is_finished(&timers[0]));
        assert_eq!(gltf.nodes[0].translation.x, 0.0);
        assert_eq!(gltf.nodes[1].translation.x, 0.0);
        assert_eq!(log.reported_count(), 0);
    }
}
