//! 动画插值性能基准测试
//!
//! 测试线性、三次样条和球面插值在不同关键帧数量下的开销，以及整帧动画推进

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Quat;
use gltf_viewer_core::animation::{
    Animation, AnimationChannel, AnimationSampler, AnimationService, InterpolationMode,
    InterpolationPath, Interpolator, KeyframeCurve,
};
use gltf_viewer_core::scene::{
    Accessor, ComponentType, ElementType, Gltf, InvalidTargetLog, Node, Scene,
};

fn timeline(keys: usize) -> Vec<f32> {
    (0..keys).map(|i| i as f32 / 30.0).collect()
}

fn bench_linear_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_interpolation");

    for keys in [16, 256, 4096].iter() {
        let input = timeline(*keys);
        let output: Vec<f32> = (0..keys * 3).map(|i| (i as f32).sin()).collect();
        let duration = input[keys - 1];

        group.bench_with_input(BenchmarkId::from_parameter(keys), keys, |b, _| {
            let curve = KeyframeCurve::new(&input, &output, InterpolationMode::Linear);
            let mut interpolator = Interpolator::new();
            let mut time = 0.0;
            b.iter(|| {
                // 单调前进，游标命中
                time = (time + 1.0 / 60.0) % duration;
                black_box(interpolator.interpolate(&curve, black_box(time), 3, false))
            });
        });
    }

    group.finish();
}

fn bench_cubic_spline(c: &mut Criterion) {
    let mut group = c.benchmark_group("cubic_spline");

    for keys in [16, 256].iter() {
        let input = timeline(*keys);
        let output: Vec<f32> = (0..keys * 9).map(|i| (i as f32 * 0.1).cos()).collect();
        let duration = input[keys - 1];

        group.bench_with_input(BenchmarkId::from_parameter(keys), keys, |b, _| {
            let curve = KeyframeCurve::new(&input, &output, InterpolationMode::CubicSpline);
            let mut interpolator = Interpolator::new();
            let mut time = 0.0;
            b.iter(|| {
                time = (time + 1.0 / 60.0) % duration;
                black_box(interpolator.interpolate(&curve, black_box(time), 3, false))
            });
        });
    }

    group.finish();
}

fn bench_rotation_slerp(c: &mut Criterion) {
    let keys = 128;
    let input = timeline(keys);
    let output: Vec<f32> = (0..keys)
        .flat_map(|i| Quat::from_rotation_y(i as f32 * 0.05).to_array())
        .collect();
    let duration = input[keys - 1];

    c.bench_function("rotation_slerp", |b| {
        let curve = KeyframeCurve::new(&input, &output, InterpolationMode::Linear);
        let mut interpolator = Interpolator::new();
        let mut time = 0.0;
        b.iter(|| {
            time = (time + 1.0 / 60.0) % duration;
            black_box(interpolator.interpolate(&curve, black_box(time), 4, true))
        });
    });
}

/// 每个节点一条平移通道
fn animated_document(nodes: usize) -> Gltf {
    let mut gltf = Gltf::new();
    gltf.accessors.push(Accessor::scalars(timeline(60)));
    gltf.accessors.push(Accessor::new(
        ElementType::Vec3,
        ComponentType::Float,
        (0..180).map(|i| i as f32).collect(),
    ));

    let channels = (0..nodes)
        .map(|node| AnimationChannel::new(0, node, InterpolationPath::Translation))
        .collect();
    gltf.animations.push(Animation::new(
        None,
        channels,
        vec![AnimationSampler::new(0, 1, InterpolationMode::Linear)],
    ));
    gltf.nodes = (0..nodes).map(|_| Node::new()).collect();
    gltf.scenes.push(Scene::new((0..nodes).collect()));
    gltf
}

fn bench_animation_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("animation_apply");

    for nodes in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(nodes), nodes, |b, &count| {
            let mut gltf = animated_document(count);
            let mut timers = AnimationService::create_timers(&gltf);
            AnimationService::play(&mut timers[0]);
            let mut log = InvalidTargetLog::new();

            b.iter(|| {
                let applied = AnimationService::apply(&mut gltf, &mut timers, 1.0 / 60.0, &mut log);
                gltf.update_world_transforms(0);
                black_box(applied)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_linear_interpolation,
    bench_cubic_spline,
    bench_rotation_slerp,
    bench_animation_apply
);
criterion_main!(benches);
