//! GPU 上下文抽象
//!
//! 渲染核心只通过 [`GpuContext`] 访问 GPU：着色器编译与程序链接、纹理/渲染缓冲/
//! 帧缓冲创建、顶点属性/索引/纹理绑定，其余状态以 [`RenderCommand`] 顺序提交。
//!
//! ## 设计目标
//!
//! - 渲染核心与具体图形 API 解耦
//! - 命令流可记录、可断言，便于测试
//! - 绑定失败以 `RenderResult` 返回，由调用方决定跳过图元

use crate::core::error::{RenderError, RenderResult};
use crate::scene::mesh::{Accessor, ComponentType, PrimitiveMode};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::collections::{HashMap, HashSet};

/// 着色器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u64);

/// 程序句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

/// 纹理句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// 渲染缓冲句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderbufferHandle(pub u64);

/// 帧缓冲句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferHandle(pub u64);

/// Uniform 位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// 由源码标识的后缀推断阶段：`.vert` 为顶点着色器，其余均为片元着色器
    pub fn from_identifier(identifier: &str) -> Self {
        if identifier.ends_with(".vert") {
            ShaderStage::Vertex
        } else {
            ShaderStage::Fragment
        }
    }
}

/// Uniform 值
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    IVec2([i32; 2]),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    Mat4Array(Vec<Mat4>),
    /// 按 std140 打包好的结构体数组
    Block(Vec<u8>),
}

/// 正面环绕方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Ccw,
    Cw,
}

/// 混合因子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// 分离式混合状态（混合方程固定为相加）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendState {
    /// 标准 alpha 混合
    pub const ALPHA_BLENDING: BlendState = BlendState {
        src_rgb: BlendFactor::SrcAlpha,
        dst_rgb: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };
}

/// 纹理格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Depth16,
}

/// 纹理描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// 标签
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// 是否使用 mipmap 过滤
    pub mipmapped: bool,
}

/// 渲染缓冲描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderbufferDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub format: TextureFormat,
}

/// 帧缓冲附件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Texture(TextureHandle),
    Renderbuffer(RenderbufferHandle),
}

/// 渲染命令
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// 绑定帧缓冲，`None` 为显示目标
    BindFramebuffer(Option<FramebufferHandle>),
    /// 设置视口
    Viewport { width: u32, height: u32 },
    /// 清除颜色与深度
    Clear { color: [f32; 4] },
    /// 使用程序
    UseProgram(ProgramHandle),
    /// 设置 uniform
    SetUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    /// 正面环绕方向
    FrontFace(FrontFace),
    /// 背面剔除开关
    SetCulling(bool),
    /// 混合状态，`None` 为关闭混合
    SetBlend(Option<BlendState>),
    /// 启用顶点属性
    EnableAttribute { location: u32 },
    /// 绑定索引缓冲
    BindIndices { index_type: ComponentType },
    /// 把纹理绑定到纹理单元，并可选地写入采样器 uniform
    BindTexture {
        slot: u32,
        texture: TextureHandle,
        location: Option<UniformLocation>,
    },
    /// 关闭顶点属性
    DisableAttribute { location: u32 },
    /// 把多重采样帧缓冲解析到单采样帧缓冲
    BlitFramebuffer {
        source: FramebufferHandle,
        destination: FramebufferHandle,
        width: u32,
        height: u32,
    },
    /// 生成 mipmap
    GenerateMipmap(TextureHandle),
    /// 非索引绘制
    Draw {
        mode: PrimitiveMode,
        vertex_count: usize,
    },
    /// 索引绘制
    DrawIndexed {
        mode: PrimitiveMode,
        index_count: usize,
        index_type: ComponentType,
    },
}

/// 链接后程序的接口
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    /// uniform 名称到位置
    pub uniforms: HashMap<String, UniformLocation>,
    /// 顶点属性名称到位置
    pub attributes: HashMap<String, u32>,
}

/// GPU 上下文能力
///
/// 渲染核心是单线程的，实现不需要 `Send`/`Sync`。
pub trait GpuContext {
    /// 获取后端名称
    fn name(&self) -> &str;

    /// 帧缓冲支持的最大采样数
    fn max_samples(&self) -> u32;

    /// 加载扩展，返回实际可用的扩展
    fn load_extensions(&mut self, extensions: &[&str]) -> Vec<String>;

    /// 编译单个阶段的着色器
    fn compile_shader(
        &mut self,
        identifier: &str,
        stage: ShaderStage,
        source: &str,
    ) -> RenderResult<ShaderHandle>;

    /// 链接程序
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> RenderResult<ProgramHandle>;

    /// 反射程序接口
    fn program_interface(&self, program: ProgramHandle) -> ProgramInterface;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn delete_program(&mut self, program: ProgramHandle);

    fn create_texture(&mut self, desc: &TextureDescriptor) -> TextureHandle;

    fn create_renderbuffer(&mut self, desc: &RenderbufferDescriptor) -> RenderbufferHandle;

    /// 重新分配渲染缓冲存储（例如采样数变化）
    fn resize_renderbuffer(
        &mut self,
        renderbuffer: RenderbufferHandle,
        desc: &RenderbufferDescriptor,
    );

    fn create_framebuffer(&mut self, color: Attachment, depth: Attachment) -> FramebufferHandle;

    /// 把访问器绑定到顶点属性位置
    fn enable_attribute(&mut self, location: u32, accessor: &Accessor) -> RenderResult<()>;

    /// 绑定索引缓冲
    fn set_indices(&mut self, accessor: &Accessor) -> RenderResult<()>;

    /// 绑定纹理和采样器到纹理单元
    fn set_texture(
        &mut self,
        location: UniformLocation,
        texture: TextureHandle,
        slot: u32,
    ) -> RenderResult<()>;

    /// 提交渲染命令
    fn submit(&mut self, command: RenderCommand);
}

/// 记录型后端（用于测试和离线检查）
///
/// 所有命令按顺序记录；程序接口通过扫描着色器源码中的
/// `uniform <type> <name>;` 与顶点阶段的 `in <type> <name>;` 声明得到。
/// 支持按标识注入编译失败、注入链接失败和注入纹理绑定失败。
#[derive(Debug)]
pub struct RecordingBackend {
    next_id: u64,
    max_samples: u32,
    commands: Vec<RenderCommand>,
    shaders: HashMap<ShaderHandle, (ShaderStage, String)>,
    programs: HashMap<ProgramHandle, ProgramInterface>,
    compiled: Vec<(String, String)>,
    deleted_shaders: Vec<ShaderHandle>,
    deleted_programs: Vec<ProgramHandle>,
    textures: HashMap<TextureHandle, TextureDescriptor>,
    renderbuffers: HashMap<RenderbufferHandle, RenderbufferDescriptor>,
    framebuffers: HashMap<FramebufferHandle, (Attachment, Attachment)>,
    loaded_extensions: Vec<String>,
    /// 编译时报错的源码标识
    pub fail_compile_for: HashSet<String>,
    /// 链接时报错
    pub fail_link: bool,
    /// 绑定时报错的纹理
    pub fail_textures: HashSet<TextureHandle>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::with_max_samples(4)
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定最大采样数
    pub fn with_max_samples(max_samples: u32) -> Self {
        Self {
            next_id: 1,
            max_samples,
            commands: Vec::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            compiled: Vec::new(),
            deleted_shaders: Vec::new(),
            deleted_programs: Vec::new(),
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            loaded_extensions: Vec::new(),
            fail_compile_for: HashSet::new(),
            fail_link: false,
            fail_textures: HashSet::new(),
        }
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// 已记录的命令
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// 取出并清空已记录的命令
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// 绘制调用次数
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Draw { .. } | RenderCommand::DrawIndexed { .. }))
            .count()
    }

    /// 所有成功编译的 (标识, 完整源码)
    pub fn compiled_sources(&self) -> &[(String, String)] {
        &self.compiled
    }

    /// 编译尝试次数（含失败）
    pub fn compile_count(&self) -> usize {
        self.compiled.len()
    }

    pub fn deleted_shaders(&self) -> &[ShaderHandle] {
        &self.deleted_shaders
    }

    pub fn deleted_programs(&self) -> &[ProgramHandle] {
        &self.deleted_programs
    }

    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&texture)
    }

    pub fn renderbuffer_descriptor(
        &self,
        renderbuffer: RenderbufferHandle,
    ) -> Option<&RenderbufferDescriptor> {
        self.renderbuffers.get(&renderbuffer)
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn loaded_extensions(&self) -> &[String] {
        &self.loaded_extensions
    }

    /// 扫描源码中的 uniform 与输入属性声明
    fn reflect(stage: ShaderStage, source: &str, interface: &mut ProgramInterface) {
        for line in source.lines() {
            let line = line.trim();
            let (is_uniform, rest) = if let Some(rest) = line.strip_prefix("uniform ") {
                (true, rest)
            } else if stage == ShaderStage::Vertex {
                match line
                    .strip_prefix("in ")
                    .or_else(|| line.strip_prefix("attribute "))
                {
                    Some(rest) => (false, rest),
                    None => continue,
                }
            } else {
                continue;
            };

            let Some(declaration) = rest.split(';').next() else {
                continue;
            };
            let Some(last) = declaration.split_whitespace().last() else {
                continue;
            };
            let name = last.split('[').next().unwrap_or(last).to_string();
            if name.is_empty() {
                continue;
            }

            if is_uniform {
                let next = interface.uniforms.len() as u32;
                interface
                    .uniforms
                    .entry(name)
                    .or_insert(UniformLocation(next));
            } else {
                let next = interface.attributes.len() as u32;
                interface.attributes.entry(name).or_insert(next);
            }
        }
    }
}

impl GpuContext for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn max_samples(&self) -> u32 {
        self.max_samples
    }

    fn load_extensions(&mut self, extensions: &[&str]) -> Vec<String> {
        for extension in extensions {
            if !self.loaded_extensions.iter().any(|e| e == extension) {
                self.loaded_extensions.push(extension.to_string());
            }
        }
        extensions.iter().map(|e| e.to_string()).collect()
    }

    fn compile_shader(
        &mut self,
        identifier: &str,
        stage: ShaderStage,
        source: &str,
    ) -> RenderResult<ShaderHandle> {
        self.compiled.push((identifier.to_string(), source.to_string()));

        if self.fail_compile_for.contains(identifier) {
            return Err(RenderError::ShaderCompilation {
                identifier: identifier.to_string(),
                log: "compilation failure injected".to_string(),
            });
        }

        let handle = ShaderHandle(self.next_handle());
        self.shaders.insert(handle, (stage, source.to_string()));
        Ok(handle)
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> RenderResult<ProgramHandle> {
        if self.fail_link {
            return Err(RenderError::ProgramLink(
                "link failure injected".to_string(),
            ));
        }

        let mut interface = ProgramInterface::default();
        for shader in [vertex, fragment] {
            let (stage, source) = self.shaders.get(&shader).ok_or_else(|| {
                RenderError::ProgramLink(format!("Unknown shader handle {}", shader.0))
            })?;
            Self::reflect(*stage, source, &mut interface);
        }

        let handle = ProgramHandle(self.next_handle());
        self.programs.insert(handle, interface);
        Ok(handle)
    }

    fn program_interface(&self, program: ProgramHandle) -> ProgramInterface {
        self.programs.get(&program).cloned().unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
        self.deleted_shaders.push(shader);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.deleted_programs.push(program);
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> TextureHandle {
        let handle = TextureHandle(self.next_handle());
        self.textures.insert(handle, desc.clone());
        handle
    }

    fn create_renderbuffer(&mut self, desc: &RenderbufferDescriptor) -> RenderbufferHandle {
        let handle = RenderbufferHandle(self.next_handle());
        self.renderbuffers.insert(handle, desc.clone());
        handle
    }

    fn resize_renderbuffer(
        &mut self,
        renderbuffer: RenderbufferHandle,
        desc: &RenderbufferDescriptor,
    ) {
        self.renderbuffers.insert(renderbuffer, desc.clone());
    }

    fn create_framebuffer(&mut self, color: Attachment, depth: Attachment) -> FramebufferHandle {
        let handle = FramebufferHandle(self.next_handle());
        self.framebuffers.insert(handle, (color, depth));
        handle
    }

    fn enable_attribute(&mut self, location: u32, accessor: &Accessor) -> RenderResult<()> {
        if accessor.buffer_view.is_none() {
            return Err(RenderError::AttributeBinding {
                location,
                reason: "accessor has no buffer view".to_string(),
            });
        }
        self.commands.push(RenderCommand::EnableAttribute { location });
        Ok(())
    }

    fn set_indices(&mut self, accessor: &Accessor) -> RenderResult<()> {
        if accessor.buffer_view.is_none() {
            return Err(RenderError::IndexBinding(
                "index accessor has no buffer view".to_string(),
            ));
        }
        self.commands.push(RenderCommand::BindIndices {
            index_type: accessor.component_type,
        });
        Ok(())
    }

    fn set_texture(
        &mut self,
        location: UniformLocation,
        texture: TextureHandle,
        slot: u32,
    ) -> RenderResult<()> {
        if self.fail_textures.contains(&texture) {
            return Err(RenderError::TextureBinding {
                slot,
                reason: format!("texture {} failure injected", texture.0),
            });
        }
        self.commands.push(RenderCommand::BindTexture {
            slot,
            texture,
            location: Some(location),
        });
        Ok(())
    }

    fn submit(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}
