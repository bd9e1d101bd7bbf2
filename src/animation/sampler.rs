use crate::core::error::{AnimationError, AnimationResult};
use crate::scene::Accessor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 插值模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// 线性插值
    #[default]
    Linear,
    /// 阶梯插值 (无插值)
    Step,
    /// 三次样条插值 (Hermite，带入/出切线)
    CubicSpline,
}

impl FromStr for InterpolationMode {
    type Err = AnimationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LINEAR" => Ok(InterpolationMode::Linear),
            "STEP" => Ok(InterpolationMode::Step),
            "CUBICSPLINE" => Ok(InterpolationMode::CubicSpline),
            _ => Err(AnimationError::UnknownInterpolation(value.to_string())),
        }
    }
}

impl InterpolationMode {
    /// 每个关键帧在输出中占用的元素个数
    pub fn elements_per_key(&self) -> usize {
        match self {
            InterpolationMode::CubicSpline => 3,
            _ => 1,
        }
    }
}

/// 动画采样器：输入（时间）与输出（值）访问器
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSampler {
    pub input: usize,
    pub output: usize,
    pub interpolation: InterpolationMode,
}

impl AnimationSampler {
    pub fn new(input: usize, output: usize, interpolation: InterpolationMode) -> Self {
        Self {
            input,
            output,
            interpolation,
        }
    }

    /// 从访问器中借出关键帧曲线
    pub fn curve<'a>(&self, accessors: &'a [Accessor]) -> AnimationResult<KeyframeCurve<'a>> {
        let input = accessors
            .get(self.input)
            .ok_or(AnimationError::MissingAccessor(self.input))?;
        let output = accessors
            .get(self.output)
            .ok_or(AnimationError::MissingAccessor(self.output))?;

        Ok(KeyframeCurve {
            input: input.deinterlaced_view(),
            output: output.deinterlaced_view(),
            interpolation: self.interpolation,
        })
    }
}

/// 关键帧曲线：时间戳与平铺的输出值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeCurve<'a> {
    pub input: &'a [f32],
    pub output: &'a [f32],
    pub interpolation: InterpolationMode,
}

impl<'a> KeyframeCurve<'a> {
    pub fn new(input: &'a [f32], output: &'a [f32], interpolation: InterpolationMode) -> Self {
        Self {
            input,
            output,
            interpolation,
        }
    }

    /// 最后一个关键帧的时间
    pub fn max_time(&self) -> f32 {
        self.input.last().copied().unwrap_or(0.0)
    }

    /// 由输出长度推断的每帧分量个数
    pub fn implied_stride(&self) -> usize {
        let per_key = self.input.len() * self.interpolation.elements_per_key();
        if per_key == 0 {
            0
        } else {
            self.output.len() / per_key
        }
    }

    /// 检查输出是否足以覆盖全部关键帧
    pub fn validate(&self, stride: usize) -> AnimationResult<()> {
        if self.input.is_empty() || stride == 0 {
            return Err(AnimationError::EmptyCurve);
        }
        let required = self.input.len() * stride * self.interpolation.elements_per_key();
        if self.output.len() < required {
            return Err(AnimationError::StrideMismatch {
                stride,
                available: self.output.len(),
                required,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interpolation() {
        assert_eq!("STEP".parse::<InterpolationMode>(), Ok(InterpolationMode::Step));
        assert_eq!(
            "CUBICSPLINE".parse::<InterpolationMode>(),
            Ok(InterpolationMode::CubicSpline)
        );
        assert!("cubic".parse::<InterpolationMode>().is_err());
    }

    #[test]
    fn test_curve_validation() {
        let input = [0.0, 1.0];
        let output = [0.0, 0.0, 0.0, 1.0, 1.0];
        let curve = KeyframeCurve::new(&input, &output, InterpolationMode::Linear);

        assert!(curve.validate(2).is_ok());
        assert_eq!(
            curve.validate(3),
            Err(AnimationError::StrideMismatch {
                stride: 3,
                available: 5,
                required: 6
            })
        );

        let cubic = KeyframeCurve::new(&input, &output, InterpolationMode::CubicSpline);
        assert!(cubic.validate(1).is_err());
        assert_eq!(curve.max_time(), 1.0);
    }

    #[test]
    fn test_curve_from_accessors() {
        let accessors = vec![
            Accessor::scalars(vec![0.0, 2.0]),
            Accessor::scalars(vec![1.0, 3.0]),
        ];
        let sampler = AnimationSampler::new(0, 1, InterpolationMode::Step);
        let curve = sampler.curve(&accessors).unwrap();
        assert_eq!(curve.output, &[1.0, 3.0]);

        let missing = AnimationSampler::new(0, 4, InterpolationMode::Step);
        assert_eq!(
            missing.curve(&accessors),
            Err(AnimationError::MissingAccessor(4))
        );
    }
}
