//! 重试参数配置（默认值 + 环境变量覆盖）。
//!
//! 环境变量：
//! - `TMPGUARD_MAX_RETRIES`：最大重试次数（默认 8）
//! - `TMPGUARD_BASE_DELAY_MS`：退避基数，毫秒（默认 150）
//! - `TMPGUARD_FORCE_INSTALL`：为 `1` 时在非 Windows 平台也安装拦截（测试用）
//!
//! 注意：
//! - 受管临时目录前缀不在此处配置，见 [`crate::paths`]
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};

pub const ENV_MAX_RETRIES: &str = "TMPGUARD_MAX_RETRIES";
pub const ENV_BASE_DELAY_MS: &str = "TMPGUARD_BASE_DELAY_MS";
pub const ENV_FORCE_INSTALL: &str = "TMPGUARD_FORCE_INSTALL";

/// 配置读取错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {name} 的值无效: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// 拦截层配置。
///
/// 字段说明：
/// - `max_retries`：最大重试次数 `R`
/// - `base_delay_ms`：线性退避基数 `D`（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
        }
    }
}

impl GuardConfig {
    /// 从进程环境变量读取配置；未设置的项使用默认值。
    ///
    /// 异常处理：
    /// - 变量存在但无法解析为非负整数时返回 [`ConfigError::InvalidNumber`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置（便于测试注入）。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            config.max_retries = parse_number(ENV_MAX_RETRIES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BASE_DELAY_MS) {
            config.base_delay_ms = parse_number(ENV_BASE_DELAY_MS, &raw)?;
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

/// 是否请求在非 Windows 平台强制安装拦截。
pub fn force_install_requested() -> bool {
    matches!(std::env::var(ENV_FORCE_INSTALL).as_deref(), Ok("1"))
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.to_string(),
    })
}
