//! 核心基础设施：错误类型、日志初始化与通用宏

pub mod error;
pub mod logging;
#[macro_use]
pub mod macros;

pub use error::{
    AnimationError, AnimationResult, PointerError, PointerResult, RenderError, RenderResult,
    ViewerError, ViewerResult,
};
pub use logging::init_logging;
