//! 帧渲染器
//!
//! 每帧的流程：
//!
//! ```text
//! classify (按 SceneStamp 缓存) ──► 相机/灯光/蒙皮 ──┬──► 透射捕获通道（有透射图元时）
//!                                                  └──► 最终通道
//! ```
//!
//! 透射捕获通道把环境背景、不透明图元和按深度排序的半透明图元以线性输出
//! 绘制到多重采样目标，解析到捕获纹理并生成 mipmap。最终通道依次绘制环境
//! 背景、不透明图元、排序后的透射图元（采样捕获纹理）和排序后的半透明图元。

use super::backend::{
    BlendState, FrontFace, GpuContext, RenderCommand, TextureHandle, UniformValue,
};
use super::classifier::DrawableClassifier;
use super::defines::{push_fragment_parameter_defines, ShaderDefines};
use super::environment::{
    environment_rotation_matrix, CubemapEnvironmentRenderer, EnvironmentRenderer,
};
use super::shader_cache::{ShaderCache, ShaderProgram};
use super::shaders::default_shader_cache;
use super::targets::{RenderTargets, CAPTURE_SIZE};
use crate::config::{RenderingParameters, ShaderCacheSettings};
use crate::scene::{AlphaMode, Drawable, GpuLight, Gltf, Light, Node, Primitive};
use crate::state::ViewerState;
use glam::{Mat4, Quat, Vec3};

/// 初始化时请求的 GPU 扩展
pub const REQUESTED_EXTENSIONS: [&str; 4] = [
    "EXT_texture_filter_anisotropic",
    "OES_texture_float_linear",
    "EXT_color_buffer_float",
    "EXT_texture_norm16",
];

/// 场景没有灯光且关闭 IBL 时使用的主光
const KEY_LIGHT_ROTATION: Quat = Quat::from_xyzw(-0.3535534, -0.35355338, -0.14644659, 0.8535534);
/// 补光
const FILL_LIGHT_ROTATION: Quat =
    Quat::from_xyzw(-0.8535534, 0.14644665, -0.35355332, -0.35355344);
const FILL_LIGHT_INTENSITY: f32 = 0.5;

/// 渲染通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassKind {
    /// 透射采样捕获
    Transmission,
    /// 输出到显示目标
    Final,
}

/// 单帧统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// 按执行顺序的通道
    pub passes: Vec<RenderPassKind>,
    /// 发出的绘制调用（含环境背景）
    pub draw_calls: usize,
    /// 因缺少程序、几何或绑定失败而跳过的图元
    pub skipped_primitives: usize,
}

/// 每帧的相机与灯光
#[derive(Debug, Clone, Default)]
struct FrameContext {
    projection: Mat4,
    view: Mat4,
    view_projection: Mat4,
    camera_position: Vec3,
    lights: Vec<GpuLight>,
}

/// 帧渲染器
pub struct FrameRenderer<G: GpuContext> {
    gpu: G,
    cache: ShaderCache,
    environment_renderer: Box<dyn EnvironmentRenderer>,
    classifier: DrawableClassifier,
    targets: Option<RenderTargets>,
    width: u32,
    height: u32,
    frame: FrameContext,
}

impl<G: GpuContext> FrameRenderer<G> {
    /// 使用内置着色器与立方体贴图背景
    pub fn new(gpu: G, settings: ShaderCacheSettings) -> Self {
        Self::with_parts(
            gpu,
            default_shader_cache(settings),
            Box::new(CubemapEnvironmentRenderer::new()),
        )
    }

    /// 指定着色器缓存与环境渲染器
    pub fn with_parts(
        mut gpu: G,
        cache: ShaderCache,
        environment_renderer: Box<dyn EnvironmentRenderer>,
    ) -> Self {
        let loaded = gpu.load_extensions(&REQUESTED_EXTENSIONS);
        tracing::info!(
            target: "render",
            "Frame renderer on {} backend ({} extensions loaded)",
            gpu.name(),
            loaded.len()
        );

        Self {
            gpu,
            cache,
            environment_renderer,
            classifier: DrawableClassifier::new(),
            targets: None,
            width: 1,
            height: 1,
            frame: FrameContext::default(),
        }
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn shader_cache(&self) -> &ShaderCache {
        &self.cache
    }

    pub fn targets(&self) -> Option<&RenderTargets> {
        self.targets.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 分配透射目标，采样数变化时重新分配渲染缓冲
    pub fn init(&mut self, requested_samples: u32) {
        match &mut self.targets {
            Some(targets) => {
                targets.set_samples(&mut self.gpu, requested_samples);
            }
            None => {
                self.targets = Some(RenderTargets::new(&mut self.gpu, requested_samples));
            }
        }
    }

    /// 设置显示目标尺寸
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != (self.width, self.height) {
            tracing::debug!(
                target: "render",
                "Resize {}x{} -> {}x{}",
                self.width,
                self.height,
                width,
                height
            );
            self.width = width;
            self.height = height;
        }
    }

    /// 清除显示目标与透射目标
    pub fn clear_frame(&mut self, clear_color: [u8; 4]) {
        let color = clear_color.map(|c| c as f32 / 255.0);

        self.gpu.submit(RenderCommand::BindFramebuffer(None));
        self.gpu.submit(RenderCommand::Clear { color });

        if let Some(targets) = &self.targets {
            for framebuffer in [targets.opaque_framebuffer, targets.msaa_framebuffer] {
                self.gpu.submit(RenderCommand::BindFramebuffer(Some(framebuffer)));
                self.gpu.submit(RenderCommand::Clear { color });
            }
            self.gpu.submit(RenderCommand::BindFramebuffer(None));
        }
    }

    /// 渲染活动场景的一帧
    pub fn draw_scene(&mut self, state: &mut ViewerState) -> FrameStats {
        let mut stats = FrameStats::default();
        let scene_index = state.scene_index;
        if state.gltf.scenes.get(scene_index).is_none() {
            tracing::warn!(target: "render", "Scene {scene_index} does not exist, nothing drawn");
            return stats;
        }

        self.init(state.rendering_parameters.internal_msaa);
        self.classifier.prepare(&state.gltf, scene_index);
        let buckets = self.classifier.buckets().clone();

        let camera = state.active_camera(self.width as f32 / self.height as f32);
        let projection = camera.projection_matrix();
        let view = camera.view_matrix(&state.gltf);
        self.frame = FrameContext {
            projection,
            view,
            view_projection: projection * view,
            camera_position: camera.position(&state.gltf),
            lights: visible_lights(&state.gltf, scene_index, &state.rendering_parameters),
        };

        if state.rendering_parameters.skinning {
            for node in &buckets.skinned {
                state.gltf.update_skin(*node);
            }
        }

        let state = &*state;
        let params = &state.rendering_parameters;
        let use_ibl = params.use_ibl && state.environment.is_some();

        if !buckets.transmissive.is_empty() {
            if let Some(targets) = self.targets.clone() {
                stats.passes.push(RenderPassKind::Transmission);
                self.gpu
                    .submit(RenderCommand::BindFramebuffer(Some(targets.msaa_framebuffer)));
                self.gpu.submit(RenderCommand::Viewport {
                    width: CAPTURE_SIZE,
                    height: CAPTURE_SIZE,
                });

                let mut linear = ShaderDefines::new();
                linear.flag("LINEAR_OUTPUT");
                self.draw_environment(state, &linear, &mut stats);

                for drawable in &buckets.opaque {
                    self.record_draw(state, *drawable, true, None, &mut stats);
                }
                let mut transparent = buckets.transparent.clone();
                camera.sort_primitives_by_depth(&state.gltf, &mut transparent);
                for drawable in &transparent {
                    self.record_draw(state, *drawable, true, None, &mut stats);
                }

                self.gpu.submit(RenderCommand::BlitFramebuffer {
                    source: targets.msaa_framebuffer,
                    destination: targets.opaque_framebuffer,
                    width: CAPTURE_SIZE,
                    height: CAPTURE_SIZE,
                });
                self.gpu
                    .submit(RenderCommand::GenerateMipmap(targets.opaque_texture));
            }
        }

        stats.passes.push(RenderPassKind::Final);
        self.gpu.submit(RenderCommand::BindFramebuffer(None));
        self.gpu.submit(RenderCommand::Viewport {
            width: self.width,
            height: self.height,
        });

        let mut background = ShaderDefines::new();
        push_fragment_parameter_defines(
            &mut background,
            params.use_punctual,
            self.frame.lights.len(),
            use_ibl,
            params.tone_map,
            params.debug_output,
        );
        self.draw_environment(state, &background, &mut stats);

        for drawable in &buckets.opaque {
            self.record_draw(state, *drawable, false, None, &mut stats);
        }

        let capture = self.targets.as_ref().map(|t| t.opaque_texture);
        let mut transmissive = buckets.transmissive.clone();
        camera.sort_primitives_by_depth(&state.gltf, &mut transmissive);
        for drawable in &transmissive {
            self.record_draw(state, *drawable, false, capture, &mut stats);
        }

        let mut transparent = buckets.transparent;
        camera.sort_primitives_by_depth(&state.gltf, &mut transparent);
        for drawable in &transparent {
            self.record_draw(state, *drawable, false, None, &mut stats);
        }

        tracing::trace!(
            target: "render",
            "Frame: {} passes, {} draw calls, {} skipped",
            stats.passes.len(),
            stats.draw_calls,
            stats.skipped_primitives
        );
        stats
    }

    fn draw_environment(
        &mut self,
        state: &ViewerState,
        defines: &ShaderDefines,
        stats: &mut FrameStats,
    ) {
        if self.environment_renderer.draw_environment(
            &mut self.gpu,
            &mut self.cache,
            self.frame.view_projection,
            state.environment.as_ref(),
            &state.rendering_parameters,
            defines,
        ) {
            stats.draw_calls += 1;
        }
    }

    fn record_draw(
        &mut self,
        state: &ViewerState,
        drawable: Drawable,
        linear_output: bool,
        transmission: Option<TextureHandle>,
        stats: &mut FrameStats,
    ) {
        if self.draw_primitive(state, drawable, linear_output, transmission) {
            stats.draw_calls += 1;
        } else {
            stats.skipped_primitives += 1;
        }
    }

    /// 绘制单个图元，返回是否发出了绘制调用
    ///
    /// 使用最近一次 [`draw_scene`](Self::draw_scene) 计算的相机与灯光。
    /// 缺少程序、索引或属性绑定失败、纹理绑定失败时跳过该图元。
    pub fn draw_primitive(
        &mut self,
        state: &ViewerState,
        drawable: Drawable,
        linear_output: bool,
        transmission: Option<TextureHandle>,
    ) -> bool {
        let gltf = &state.gltf;
        let params = &state.rendering_parameters;

        let Some(node) = gltf.nodes.get(drawable.node) else {
            return false;
        };
        let Some(primitive) = gltf
            .meshes
            .get(drawable.mesh)
            .and_then(|mesh| mesh.primitives.get(drawable.primitive))
        else {
            return false;
        };
        if primitive.skip {
            return false;
        }

        let variant = if params.enabled_extensions.variants {
            state.active_variant()
        } else {
            None
        };
        let Some(material) = primitive
            .effective_material(variant)
            .and_then(|index| gltf.materials.get(index))
        else {
            return false;
        };

        let mut vertex_defines = primitive.defines().clone();
        vertex_defines.extend(&vertex_parameter_defines(params, gltf, node, primitive));

        let mut fragment_defines = material.defines(params);
        fragment_defines.extend(&vertex_defines);
        if linear_output {
            fragment_defines.flag("LINEAR_OUTPUT");
        }
        let environment = state.environment.as_ref();
        push_fragment_parameter_defines(
            &mut fragment_defines,
            params.use_punctual,
            self.frame.lights.len(),
            params.use_ibl && environment.is_some(),
            params.tone_map,
            params.debug_output,
        );

        let Self {
            gpu, cache, frame, ..
        } = self;
        let gpu: &mut dyn GpuContext = gpu;

        let Some(program) = cache.resolve(
            gpu,
            primitive.shader_identifier(),
            &vertex_defines,
            material.shader_identifier(),
            &fragment_defines,
        ) else {
            return false;
        };

        gpu.submit(RenderCommand::UseProgram(program.handle()));

        if params.use_punctual && !frame.lights.is_empty() {
            let block = bytemuck::cast_slice::<GpuLight, u8>(&frame.lights).to_vec();
            program.set_uniform(gpu, "u_Lights", UniformValue::Block(block));
        }

        program.set_uniform(
            gpu,
            "u_ViewProjectionMatrix",
            UniformValue::Mat4(frame.view_projection),
        );
        program.set_uniform(gpu, "u_ModelMatrix", UniformValue::Mat4(node.world_transform));
        program.set_uniform(gpu, "u_NormalMatrix", UniformValue::Mat4(node.normal_matrix));
        program.set_uniform(gpu, "u_Exposure", UniformValue::Float(params.exposure));
        program.set_uniform(gpu, "u_Camera", UniformValue::Vec3(frame.camera_position));

        apply_animation_uniforms(gpu, program, params, gltf, node, primitive);

        let front_face = if node.world_transform.determinant() < 0.0 {
            FrontFace::Cw
        } else {
            FrontFace::Ccw
        };
        gpu.submit(RenderCommand::FrontFace(front_face));
        gpu.submit(RenderCommand::SetCulling(!material.double_sided));
        let blend = (material.alpha_mode == AlphaMode::Blend).then_some(BlendState::ALPHA_BLENDING);
        gpu.submit(RenderCommand::SetBlend(blend));

        let index_accessor = match primitive.indices {
            Some(index) => {
                let Some(accessor) = gltf.accessors.get(index) else {
                    tracing::warn!(target: "render", "Index accessor {index} not found");
                    return false;
                };
                if let Err(error) = gpu.set_indices(accessor) {
                    tracing::warn!(target: "render", "Primitive skipped: {error}");
                    return false;
                }
                Some(accessor)
            }
            None => None,
        };

        let mut vertex_count = 0;
        let mut enabled = Vec::with_capacity(primitive.attributes.len());
        for attribute in &primitive.attributes {
            let Some(accessor) = gltf.accessors.get(attribute.accessor) else {
                tracing::warn!(
                    target: "render",
                    "Attribute accessor {} not found",
                    attribute.accessor
                );
                return false;
            };
            vertex_count = accessor.count;

            let Some(location) = program.attribute_location(&attribute.name) else {
                continue;
            };
            if let Err(error) = gpu.enable_attribute(location, accessor) {
                tracing::warn!(target: "render", "Primitive skipped: {error}");
                return false;
            }
            enabled.push(location);
        }

        for (name, value) in material.properties() {
            program.set_uniform(gpu, &name, value);
        }

        for (slot, texture) in material.textures.iter().enumerate() {
            let Some(location) = program.uniform_location(&texture.sampler_name) else {
                continue;
            };
            if let Err(error) = gpu.set_texture(location, texture.texture, slot as u32) {
                tracing::warn!(target: "render", "Material skipped: {error}");
                return false;
            }
        }

        let mut slot = material.textures.len() as u32;
        if let Some(environment) = environment {
            if params.use_ibl {
                for (name, texture) in [
                    ("u_LambertianEnvSampler", environment.diffuse_env_map),
                    ("u_GGXEnvSampler", environment.specular_env_map),
                    ("u_GGXLUT", environment.lut),
                    ("u_CharlieEnvSampler", environment.sheen_env_map),
                    ("u_CharlieLUT", environment.sheen_lut),
                ] {
                    bind_texture(gpu, program, name, texture, slot);
                    slot += 1;
                }
                program.set_uniform(
                    gpu,
                    "u_MipCount",
                    UniformValue::Int(environment.mip_count as i32),
                );
                program.set_uniform(
                    gpu,
                    "u_EnvRotation",
                    UniformValue::Mat3(environment_rotation_matrix(params.environment_rotation)),
                );
            }

            if params.use_punctual {
                bind_texture(gpu, program, "u_SheenELUT", environment.sheen_e_lut, slot);
                slot += 1;
            }
        }

        if let Some(capture) = transmission {
            if (params.use_ibl || params.use_punctual)
                && environment.is_some()
                && params.enabled_extensions.transmission
            {
                bind_texture(gpu, program, "u_TransmissionFramebufferSampler", capture, slot);
                program.set_uniform(
                    gpu,
                    "u_TransmissionFramebufferSize",
                    UniformValue::IVec2([CAPTURE_SIZE as i32, CAPTURE_SIZE as i32]),
                );
                program.set_uniform(gpu, "u_ModelMatrix", UniformValue::Mat4(node.world_transform));
                program.set_uniform(gpu, "u_ViewMatrix", UniformValue::Mat4(frame.view));
                program.set_uniform(
                    gpu,
                    "u_ProjectionMatrix",
                    UniformValue::Mat4(frame.projection),
                );
            }
        }

        match index_accessor {
            Some(accessor) => gpu.submit(RenderCommand::DrawIndexed {
                mode: primitive.mode,
                index_count: accessor.count,
                index_type: accessor.component_type,
            }),
            None => gpu.submit(RenderCommand::Draw {
                mode: primitive.mode,
                vertex_count,
            }),
        }

        for location in enabled {
            gpu.submit(RenderCommand::DisableAttribute { location });
        }
        true
    }

    /// 释放着色器缓存
    pub fn destroy(&mut self) {
        self.cache.destroy(&mut self.gpu);
        tracing::info!(target: "render", "Frame renderer destroyed");
    }
}

/// 活动场景中挂载在节点上的灯光
///
/// 没有灯光、关闭 IBL 且开启 `use_directional_lights_with_disabled_ibl` 时
/// 使用内置的主光与补光。
pub fn visible_lights(gltf: &Gltf, scene: usize, params: &RenderingParameters) -> Vec<GpuLight> {
    let nodes = gltf
        .scenes
        .get(scene)
        .map(|scene| scene.gather_nodes(gltf))
        .unwrap_or_default();

    let mut lights: Vec<GpuLight> = gltf
        .lights
        .iter()
        .filter(|light| light.node.is_some_and(|node| nodes.contains(&node)))
        .map(|light| light.to_uniform(gltf))
        .collect();

    if lights.is_empty() && !params.use_ibl && params.use_directional_lights_with_disabled_ibl {
        lights.push(Light::directional_from_rotation(KEY_LIGHT_ROTATION, 1.0).to_uniform(gltf));
        lights.push(
            Light::directional_from_rotation(FILL_LIGHT_ROTATION, FILL_LIGHT_INTENSITY)
                .to_uniform(gltf),
        );
    }

    lights
}

/// 蒙皮与变形的顶点宏
pub fn vertex_parameter_defines(
    params: &RenderingParameters,
    gltf: &Gltf,
    node: &Node,
    primitive: &Primitive,
) -> ShaderDefines {
    let mut defines = ShaderDefines::new();

    if let Some(skin) = skinning_skin(params, gltf, node, primitive) {
        defines.flag("USE_SKINNING");
        defines.push("JOINT_COUNT", skin.joint_matrices.len());
    }

    if let Some(weights) = morph_weights(params, gltf, node, primitive) {
        defines.flag("USE_MORPHING");
        defines.push("WEIGHT_COUNT", weights.len().min(Primitive::MAX_MORPH_TARGETS));
    }

    defines
}

fn skinning_skin<'a>(
    params: &RenderingParameters,
    gltf: &'a Gltf,
    node: &Node,
    primitive: &Primitive,
) -> Option<&'a crate::scene::Skin> {
    if !(params.skinning && primitive.has_weights && primitive.has_joints) {
        return None;
    }
    node.skin.and_then(|skin| gltf.skins.get(skin))
}

fn morph_weights<'a>(
    params: &RenderingParameters,
    gltf: &'a Gltf,
    node: &Node,
    primitive: &Primitive,
) -> Option<&'a [f32]> {
    if !params.morphing || primitive.target_count == 0 {
        return None;
    }
    let weights = node.mesh.and_then(|mesh| gltf.meshes.get(mesh))?.current_weights();
    (!weights.is_empty()).then_some(weights)
}

fn apply_animation_uniforms(
    gpu: &mut dyn GpuContext,
    program: &mut ShaderProgram,
    params: &RenderingParameters,
    gltf: &Gltf,
    node: &Node,
    primitive: &Primitive,
) {
    if let Some(skin) = skinning_skin(params, gltf, node, primitive) {
        program.set_uniform(
            gpu,
            "u_jointMatrix",
            UniformValue::Mat4Array(skin.joint_matrices.clone()),
        );
        if primitive.has_normals {
            program.set_uniform(
                gpu,
                "u_jointNormalMatrix",
                UniformValue::Mat4Array(skin.joint_normal_matrices.clone()),
            );
        }
    }

    if let Some(weights) = morph_weights(params, gltf, node, primitive) {
        program.set_uniform(gpu, "u_morphWeights", UniformValue::FloatArray(weights.to_vec()));
    }
}

/// 绑定可选的采样器；位置缺失时跳过，绑定失败只记录
fn bind_texture(
    gpu: &mut dyn GpuContext,
    program: &mut ShaderProgram,
    name: &str,
    texture: TextureHandle,
    slot: u32,
) {
    let Some(location) = program.uniform_location(name) else {
        return;
    };
    if let Err(error) = gpu.set_texture(location, texture, slot) {
        tracing::warn!(target: "render", "{name}: {error}");
    }
}
