//! 统一错误处理模块
//!
//! 提供渲染核心范围内的错误类型定义。
//!
//! ## 错误分层
//!
//! - **渲染错误** (`RenderError`): 着色器编译、程序链接、顶点属性/索引/纹理绑定
//! - **动画错误** (`AnimationError`): 关键帧曲线与采样器数据问题
//! - **属性指针错误** (`PointerError`): 通过 JSON 指针访问场景属性失败
//! - **配置错误** (`config::ConfigError`): 配置文件读取、解析、验证
//!
//! 绝大多数错误在实时渲染中是非致命的：调用方记录日志并跳过受影响的图元，
//! 而不是中断整帧。`ViewerError` 只用于初始化等可以向上传播的路径。

use thiserror::Error;

use crate::config::ConfigError;

/// 查看器顶层错误类型
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Animation error: {0}")]
    Animation(#[from] AnimationError),

    #[error("Property pointer error: {0}")]
    Pointer(#[from] PointerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 渲染系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Shader source not registered: {0}")]
    MissingShaderSource(String),

    #[error("Failed to compile shader {identifier}: {log}")]
    ShaderCompilation { identifier: String, log: String },

    #[error("Failed to link program: {0}")]
    ProgramLink(String),

    #[error("Failed to bind vertex attribute at location {location}: {reason}")]
    AttributeBinding { location: u32, reason: String },

    #[error("Failed to bind index buffer: {0}")]
    IndexBinding(String),

    #[error("Failed to bind texture to slot {slot}: {reason}")]
    TextureBinding { slot: u32, reason: String },

    #[error("Invalid render state: {0}")]
    InvalidState(String),
}

/// 动画系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    #[error("Keyframe curve has no samples")]
    EmptyCurve,

    #[error("Output has {available} values, {required} required for stride {stride}")]
    StrideMismatch {
        stride: usize,
        available: usize,
        required: usize,
    },

    #[error("Accessor {0} not found")]
    MissingAccessor(usize),

    #[error("Sampler {0} not found")]
    MissingSampler(usize),

    #[error("Unknown interpolation mode: {0}")]
    UnknownInterpolation(String),
}

/// 场景属性指针错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointerError {
    #[error("Malformed pointer: {0}")]
    Malformed(String),

    #[error("Pointer target not found: {0}")]
    NotFound(String),

    #[error("Type mismatch for {pointer}: expected {expected} components, got {actual}")]
    TypeMismatch {
        pointer: String,
        expected: usize,
        actual: usize,
    },

    #[error("Pointer target is read-only: {0}")]
    ReadOnly(String),
}

/// 结果类型别名
pub type ViewerResult<T> = Result<T, ViewerError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type AnimationResult<T> = Result<T, AnimationError>;
pub type PointerResult<T> = Result<T, PointerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let pointer_err = PointerError::NotFound("/nodes/7/translation".to_string());
        let viewer_err: ViewerError = pointer_err.into();
        assert!(matches!(viewer_err, ViewerError::Pointer(_)));
    }

    #[test]
    fn test_error_display() {
        let err = RenderError::ShaderCompilation {
            identifier: "pbr.frag".to_string(),
            log: "syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to compile shader pbr.frag: syntax error"
        );

        let err = AnimationError::StrideMismatch {
            stride: 4,
            available: 6,
            required: 8,
        };
        assert_eq!(
            err.to_string(),
            "Output has 6 values, 8 required for stride 4"
        );
    }
}
