//! 关键帧插值器
//!
//! 每个通道持有一个游标 `(prev_key, prev_t)`。时间单调递增时从上次命中的
//! 关键帧继续向后扫描；时间回退时游标重置到 0。
//!
//! 输出按关键帧平铺：线性/阶梯每帧 `stride` 个分量；三次样条每帧
//! `3 * stride` 个分量，依次为入切线、值、出切线。

use super::sampler::{InterpolationMode, KeyframeCurve};
use crate::impl_default_and_new;
use glam::{Quat, Vec4};

/// 单通道插值器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    prev_key: usize,
    prev_t: f32,
}

impl_default_and_new!(Interpolator {
    prev_key: 0,
    prev_t: 0.0,
});

/// 将时间折回 `[0, max_time]`
fn wrap_time(time: f32, max_time: f32) -> f32 {
    if !time.is_finite() || max_time <= 0.0 {
        return 0.0;
    }
    if (0.0..=max_time).contains(&time) {
        time
    } else {
        time.rem_euclid(max_time)
    }
}

fn quat_at(output: &[f32], offset: usize) -> Quat {
    let v = Vec4::from_slice(&output[offset..offset + 4]);
    if v.length_squared() > 0.0 {
        Quat::from_vec4(v.normalize())
    } else {
        Quat::IDENTITY
    }
}

impl Interpolator {
    /// 当前游标 `(prev_key, prev_t)`
    pub fn cursor(&self) -> (usize, f32) {
        (self.prev_key, self.prev_t)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 计算 `time` 时刻的值
    ///
    /// `spherical` 为 `true` 时按四元数处理（`stride` 必须为 4），
    /// 任何插值模式下都做球面插值并归一化。
    /// 曲线为空或输出不足时返回 `None`。
    pub fn interpolate(
        &mut self,
        curve: &KeyframeCurve<'_>,
        time: f32,
        stride: usize,
        spherical: bool,
    ) -> Option<Vec<f32>> {
        if curve.validate(stride).is_err() || (spherical && stride != 4) {
            return None;
        }

        let input = curve.input;
        let output = curve.output;
        let per_key = curve.interpolation.elements_per_key() * stride;
        // 三次样条的值位于入切线之后
        let value_offset = if curve.interpolation == InterpolationMode::CubicSpline {
            stride
        } else {
            0
        };
        let sample = |key: usize| -> Vec<f32> {
            let start = key * per_key + value_offset;
            output[start..start + stride].to_vec()
        };

        if input.len() == 1 {
            return Some(sample(0));
        }

        let t = wrap_time(time, curve.max_time());
        if self.prev_t > t {
            self.prev_key = 0;
        }
        self.prev_t = t;

        let last = input.len() - 1;
        let start = self.prev_key.min(last);
        let next = input[start..]
            .iter()
            .position(|&key_time| t <= key_time)
            .map_or(last, |offset| start + offset)
            .clamp(1, last);
        let prev = next - 1;
        self.prev_key = prev;

        let key_delta = input[next] - input[prev];
        if key_delta <= 0.0 {
            return Some(sample(prev));
        }
        let u = ((t - input[prev]) / key_delta).clamp(0.0, 1.0);

        if spherical {
            let q0 = quat_at(output, prev * per_key + value_offset);
            let q1 = quat_at(output, next * per_key + value_offset);
            return Some(q0.slerp(q1, u).normalize().to_array().to_vec());
        }

        match curve.interpolation {
            InterpolationMode::Step => Some(sample(prev)),
            InterpolationMode::Linear => {
                let v0 = &output[prev * stride..(prev + 1) * stride];
                let v1 = &output[next * stride..(next + 1) * stride];
                Some(
                    v0.iter()
                        .zip(v1)
                        .map(|(a, b)| a * (1.0 - u) + b * u)
                        .collect(),
                )
            }
            InterpolationMode::CubicSpline => {
                let p = prev * per_key;
                let n = next * per_key;
                let u2 = u * u;
                let u3 = u2 * u;

                let result = (0..stride)
                    .map(|i| {
                        let v0 = output[p + stride + i];
                        let out_tangent = key_delta * output[p + 2 * stride + i];
                        let in_tangent = key_delta * output[n + i];
                        let v1 = output[n + stride + i];

                        (2.0 * u3 - 3.0 * u2 + 1.0) * v0
                            + (u3 - 2.0 * u2 + u) * out_tangent
                            + (-2.0 * u3 + 3.0 * u2) * v1
                            + (u3 - u2) * in_tangent
                    })
                    .collect();
                Some(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn linear<'a>(input: &'a [f32], output: &'a [f32]) -> KeyframeCurve<'a> {
        KeyframeCurve::new(input, output, InterpolationMode::Linear)
    }

    #[test]
    fn test_single_keyframe() {
        let mut interpolator = Interpolator::new();
        let curve = linear(&[0.5], &[1.0, 2.0, 3.0]);
        assert_eq!(
            interpolator.interpolate(&curve, 10.0, 3, false),
            Some(vec![1.0, 2.0, 3.0])
        );

        let cubic = KeyframeCurve::new(&[0.0], &[9.0, 4.0, 9.0], InterpolationMode::CubicSpline);
        assert_eq!(interpolator.interpolate(&cubic, 0.3, 1, false), Some(vec![4.0]));
    }

    #[test]
    fn test_linear_midpoint() {
        let mut interpolator = Interpolator::new();
        let curve = linear(&[0.0, 1.0], &[0.0, 10.0]);
        assert_eq!(interpolator.interpolate(&curve, 0.5, 1, false), Some(vec![5.0]));
    }

    #[test]
    fn test_linear_hits_keyframes_exactly() {
        let input = [0.0, 0.3, 0.7, 1.1];
        let output = [0.1, 7.3, -2.9, 4.4];
        let curve = linear(&input, &output);
        let mut interpolator = Interpolator::new();

        for (time, expected) in input.iter().zip(output) {
            assert_eq!(
                interpolator.interpolate(&curve, *time, 1, false),
                Some(vec![expected])
            );
        }
    }

    #[test]
    fn test_step_holds_lower_sample() {
        let mut interpolator = Interpolator::new();
        let curve = KeyframeCurve::new(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0], InterpolationMode::Step);
        assert_eq!(interpolator.interpolate(&curve, 0.99, 1, false), Some(vec![1.0]));
        assert_eq!(interpolator.interpolate(&curve, 1.5, 1, false), Some(vec![2.0]));
    }

    #[test]
    fn test_cursor_moves_forward_and_resets() {
        let input = [0.0, 1.0, 2.0, 3.0];
        let output = [0.0, 1.0, 2.0, 3.0];
        let curve = linear(&input, &output);
        let mut interpolator = Interpolator::new();

        interpolator.interpolate(&curve, 1.5, 1, false);
        assert_eq!(interpolator.cursor(), (1, 1.5));

        interpolator.interpolate(&curve, 2.5, 1, false);
        assert_eq!(interpolator.cursor(), (2, 2.5));

        let value = interpolator.interpolate(&curve, 0.5, 1, false);
        assert_eq!(interpolator.cursor(), (0, 0.5));
        assert_eq!(value, Some(vec![0.5]));
    }

    #[test]
    fn test_time_wraps() {
        let mut interpolator = Interpolator::new();
        let curve = linear(&[0.0, 2.0], &[0.0, 2.0]);
        assert_eq!(interpolator.interpolate(&curve, 3.0, 1, false), Some(vec![1.0]));
        assert_eq!(interpolator.interpolate(&curve, -0.5, 1, false), Some(vec![1.5]));
        assert_eq!(interpolator.interpolate(&curve, 2.0, 1, false), Some(vec![2.0]));
    }

    #[test]
    fn test_cubic_spline_with_flat_tangents() {
        let mut interpolator = Interpolator::new();
        // (入切线, 值, 出切线) × 2
        let output = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let curve = KeyframeCurve::new(&[0.0, 1.0], &output, InterpolationMode::CubicSpline);

        let mid = interpolator.interpolate(&curve, 0.5, 1, false).unwrap();
        assert!((mid[0] - 0.5).abs() < 1e-6);
        let late = interpolator.interpolate(&curve, 0.75, 1, false).unwrap();
        assert!((late[0] - 0.84375).abs() < 1e-6);
    }

    #[test]
    fn test_cubic_tangents_scale_with_interval() {
        let mut interpolator = Interpolator::new();
        // 值恒为 0，出切线 1，区间长度 2
        let output = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let curve = KeyframeCurve::new(&[0.0, 2.0], &output, InterpolationMode::CubicSpline);

        let value = interpolator.interpolate(&curve, 1.0, 1, false).unwrap();
        // (u³ - 2u² + u) * delta * 1，u = 0.5
        assert!((value[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_zero_interval_returns_lower_sample() {
        let mut interpolator = Interpolator::new();
        let curve = linear(&[0.0, 0.0, 1.0], &[3.0, 4.0, 5.0]);
        assert_eq!(interpolator.interpolate(&curve, 0.0, 1, false), Some(vec![3.0]));
    }

    #[test]
    fn test_rotation_slerp() {
        let mut interpolator = Interpolator::new();
        let end = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut output = Quat::IDENTITY.to_array().to_vec();
        output.extend(end.to_array());
        let curve = linear(&[0.0, 1.0], &output);

        let value = interpolator.interpolate(&curve, 0.5, 4, true).unwrap();
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(Quat::from_slice(&value).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_invalid_curves() {
        let mut interpolator = Interpolator::new();
        assert_eq!(interpolator.interpolate(&linear(&[], &[]), 0.0, 1, false), None);
        assert_eq!(
            interpolator.interpolate(&linear(&[0.0, 1.0], &[0.0, 1.0, 2.0]), 0.5, 3, false),
            None
        );
        assert_eq!(
            interpolator.interpolate(&linear(&[0.0, 1.0], &[0.0; 6]), 0.5, 3, true),
            None
        );
    }

    proptest! {
        #[test]
        fn test_rotation_output_is_normalized(
            a in prop::array::uniform4(-1.0f32..1.0),
            b in prop::array::uniform4(-1.0f32..1.0),
            time in 0.0f32..4.0,
            mode in prop::sample::select(vec![
                InterpolationMode::Linear,
                InterpolationMode::Step,
                InterpolationMode::CubicSpline,
            ]),
        ) {
            prop_assume!(Vec4::from_array(a).length() > 0.1);
            prop_assume!(Vec4::from_array(b).length() > 0.1);

            let output: Vec<f32> = if mode == InterpolationMode::CubicSpline {
                [[0.0; 4], a, [0.0; 4], [0.0; 4], b, [0.0; 4]].concat()
            } else {
                [a, b].concat()
            };
            let curve = KeyframeCurve::new(&[0.0, 1.5], &output, mode);
            let mut interpolator = Interpolator::new();

            let value = interpolator.interpolate(&curve, time, 4, true).unwrap();
            let length = Vec4::from_slice(&value).length();
            prop_assert!((length - 1.0).abs() < 1e-4);
        }

        #[test]
        fn test_linear_stays_within_key_range(
            v0 in -100.0f32..100.0,
            v1 in -100.0f32..100.0,
            time in 0.0f32..1.0,
        ) {
            let input = [0.0, 1.0];
            let output = [v0, v1];
            let mut interpolator = Interpolator::new();
            let value = interpolator.interpolate(&linear(&input, &output), time, 1, false).unwrap();
            prop_assert!(value[0] >= v0.min(v1) - 1e-3 && value[0] <= v0.max(v1) + 1e-3);
        }
    }
}
