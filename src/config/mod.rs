//! 查看器配置系统
//!
//! 提供TOML/JSON配置文件、环境变量覆盖和配置验证
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub mod rendering;
pub mod shader_cache;

pub use rendering::{EnabledExtensions, RenderingParameters};
pub use shader_cache::{KeyMode, ShaderCacheSettings};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "GLTF_VIEWER_";

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.json` 之外的扩展名一律按 TOML 处理
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn parse(self, content: &str) -> ConfigResult<ViewerConfig> {
        let parsed = match self {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(ConfigError::ParseError)
    }

    fn render(self, config: &ViewerConfig) -> ConfigResult<String> {
        let rendered = match self {
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        };
        rendered.map_err(ConfigError::ParseError)
    }
}

/// 查看器主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// 渲染参数
    #[serde(default)]
    pub rendering: RenderingParameters,

    /// 着色器缓存设置
    #[serde(default)]
    pub shader_cache: ShaderCacheSettings,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ViewerConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 按扩展名选择格式加载配置文件
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        ConfigFormat::from_path(path).parse(&content)
    }

    /// 按扩展名选择格式写出配置文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = ConfigFormat::from_path(path).render(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        ConfigFormat::Toml.parse(&fs::read_to_string(path)?)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        ConfigFormat::Toml.parse(content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        ConfigFormat::Json.parse(content)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(format!("{ENV_PREFIX}{key}")).ok());
    }

    /// 使用任意键值来源覆盖配置
    ///
    /// `lookup` 接收不带前缀的键名（如 `EXPOSURE`），无法解析的值会被忽略。
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let rendering = &mut self.rendering;

        if let Some(val) = lookup("EXPOSURE") {
            if let Ok(exposure) = val.parse() {
                rendering.exposure = exposure;
            }
        }
        if let Some(val) = lookup("ENVIRONMENT_ROTATION") {
            if let Ok(rotation) = val.parse() {
                rendering.environment_rotation = rotation;
            }
        }
        if let Some(val) = lookup("MSAA") {
            if let Ok(samples) = val.parse() {
                rendering.internal_msaa = samples;
            }
        }
        if let Some(val) = lookup("USE_IBL") {
            rendering.use_ibl = val.parse().unwrap_or(rendering.use_ibl);
        }
        if let Some(val) = lookup("USE_PUNCTUAL") {
            rendering.use_punctual = val.parse().unwrap_or(rendering.use_punctual);
        }
        if let Some(val) = lookup("TONE_MAP") {
            match val.parse() {
                Ok(tone_map) => rendering.tone_map = tone_map,
                Err(err) => {
                    tracing::warn!(target: "config", "Ignoring {ENV_PREFIX}TONE_MAP: {err}")
                }
            }
        }
        if let Some(val) = lookup("DEBUG_OUTPUT") {
            match val.parse() {
                Ok(debug_output) => rendering.debug_output = debug_output,
                Err(err) => {
                    tracing::warn!(target: "config", "Ignoring {ENV_PREFIX}DEBUG_OUTPUT: {err}")
                }
            }
        }
        if let Some(val) = lookup("CANONICAL_SHADER_KEYS") {
            if let Ok(true) = val.parse::<bool>() {
                self.shader_cache.key_mode = KeyMode::Canonical;
            }
        }
        if let Some(val) = lookup("LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&val) {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.rendering.validate()?;
        self.shader_cache.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./gltf_viewer.toml
    /// 2. ./gltf_viewer.json
    /// 3. 使用默认配置
    ///
    /// 无论来源如何，最后都会应用环境变量覆盖。
    pub fn load_or_default() -> Self {
        let found = ["gltf_viewer.toml", "gltf_viewer.json"]
            .into_iter()
            .find_map(|path| Self::load(path).ok().map(|config| (path, config)));
        let mut config = match found {
            Some((path, config)) => {
                tracing::info!(target: "config", "Loaded config from {path}");
                config
            }
            None => {
                tracing::info!(target: "config", "Using default configuration");
                Self::default()
            }
        };

        config.apply_env_overrides();
        if let Err(err) = config.validate() {
            tracing::warn!(
                target: "config",
                "Invalid configuration, falling back to defaults: {err}"
            );
            config = Self::default();
        }
        config
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

use crate::impl_default;

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 大小写不敏感地解析级别名称
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}
