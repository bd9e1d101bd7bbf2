//! 渲染模块
//!
//! - [`backend`]: GPU 能力接口与记录型后端
//! - [`defines`]: 着色器宏构建、色调映射与调试输出表
//! - [`shader_cache`]: 着色器排列缓存
//! - [`classifier`]: 可绘制对象分类
//! - [`targets`]: 透射采样渲染目标
//! - [`environment`]: 环境贴图背景
//! - [`renderer`]: 帧渲染器

pub mod backend;
pub mod classifier;
pub mod defines;
pub mod environment;
pub mod renderer;
pub mod shader_cache;
pub mod shaders;
pub mod targets;

pub use backend::{GpuContext, RecordingBackend, RenderCommand, UniformValue};
pub use classifier::{DrawableBuckets, DrawableClassifier};
pub use defines::{DebugOutput, ShaderDefines, ToneMap};
pub use environment::{CubemapEnvironmentRenderer, EnvironmentRenderer};
pub use renderer::{FrameRenderer, FrameStats, RenderPassKind};
pub use shader_cache::{ShaderCache, ShaderCacheStats, ShaderHash, ShaderProgram};
pub use targets::{RenderTargets, CAPTURE_SIZE};
