//! # glTF Viewer Core
//!
//! 基于物理的 glTF 帧渲染器与关键帧动画插值引擎。
//!
//! ## 功能特性
//!
//! - **帧渲染**: 图元分类、着色器排列缓存、透射捕获与最终合成两个通道
//! - **动画**: 阶梯、线性、三次样条与球面插值，属性指针写回
//! - **配置**: TOML/JSON 配置文件与环境变量覆盖
//!
//! ## 架构设计
//!
//! 沿用贫血模型：
//! - **State**: 纯数据结构（[`state::ViewerState`]、[`animation::AnimationTimer`]）
//! - **Service**: 静态方法封装业务逻辑（[`animation::AnimationService`]）
//!
//! GPU 通过 [`render::GpuContext`] 抽象；[`render::RecordingBackend`] 记录命令流，
//! 用于测试和离线检查。
//!
//! ### 示例
//!
//! ```rust
//! use gltf_viewer_core::config::ShaderCacheSettings;
//! use gltf_viewer_core::render::{FrameRenderer, RecordingBackend};
//! use gltf_viewer_core::scene::Gltf;
//! use gltf_viewer_core::state::ViewerState;
//!
//! let mut state = ViewerState::new(Gltf::new());
//! let mut renderer = FrameRenderer::new(RecordingBackend::new(), ShaderCacheSettings::default());
//! renderer.resize(1280, 720);
//!
//! state.advance_animations(1.0 / 60.0);
//! renderer.clear_frame(state.rendering_parameters.clear_color);
//! let stats = renderer.draw_scene(&mut state);
//! assert_eq!(stats.draw_calls, 0);
//! ```
//!
//! ## 模块
//!
//! - [`core`]: 错误类型、日志与宏
//! - [`config`]: 配置系统
//! - [`scene`]: glTF 文档模型与属性指针
//! - [`animation`]: 关键帧动画
//! - [`render`]: 帧渲染
//! - [`state`]: 查看器状态

/// 核心基础设施
pub mod core;
/// 配置系统
pub mod config;
/// glTF 文档模型
pub mod scene;
/// 关键帧动画
pub mod animation;
/// 帧渲染
pub mod render;
/// 查看器状态
pub mod state;
