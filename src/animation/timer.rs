/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// 未播放，不写入场景
    #[default]
    Stopped,
    Playing,
    Paused,
    /// 重复次数用尽，停在最后一帧
    Finished,
}

/// 动画计时器 (贫血模型 - 纯数据结构)
///
/// 每个动画一个，业务逻辑见 [`AnimationService`](super::AnimationService)。
/// 对应行为扩展的动画控制回调：设置时间、播放/暂停、重置、速度与重复次数。
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTimer {
    /// 文档中的动画索引
    pub animation: usize,
    pub state: PlaybackState,
    /// 已播放的本地时间 (秒)，未折回
    pub elapsed: f32,
    /// 播放速度 (1.0 = 正常速度，负数倒放)
    pub speed: f32,
    /// 重复次数，`None` 为无限循环
    pub repetitions: Option<u32>,
}

impl AnimationTimer {
    pub fn new(animation: usize) -> Self {
        Self {
            animation,
            state: PlaybackState::Stopped,
            elapsed: 0.0,
            speed: 1.0,
            repetitions: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// 是否需要把当前时间的值写入场景
    pub fn is_active(&self) -> bool {
        self.state != PlaybackState::Stopped
    }
}
