use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 排列键的生成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyMode {
    /// 宏定义按给定顺序参与哈希，顺序不同即视为不同排列
    #[default]
    OrderSensitive,
    /// 哈希前先对宏定义排序，语义相同的排列共享同一程序
    Canonical,
}

/// 着色器缓存设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderCacheSettings {
    /// 注入到每个着色器源码首行的版本指令
    pub version_directive: String,
    /// 排列键模式
    pub key_mode: KeyMode,
}

impl_default!(ShaderCacheSettings {
    version_directive: "#version 300 es".to_string(),
    key_mode: KeyMode::OrderSensitive,
});

impl ShaderCacheSettings {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.version_directive.trim_start().starts_with("#version") {
            return Err(ConfigError::ValidationError(format!(
                "Version directive must start with #version, got {:?}",
                self.version_directive
            )));
        }
        Ok(())
    }
}
