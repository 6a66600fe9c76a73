//! 有界重试执行器（线性退避）。
//!
//! 语义：
//! - 执行操作；失败时按谓词判断是否可重试
//! - 不可重试，或已达到最大重试次数：原样交回最后一次的错误
//! - 否则等待 `base_delay × (attempt + 1)` 后重试（线性退避，不是指数退避）
//!
//! 执行形态：
//! - [`RetryPolicy::run_blocking_with`]：阻塞当前线程等待退避（用于同步调用点）
//! - [`RetryPolicy::run_with`]：退避通过 `tokio::time::sleep` 调度，只挂起当前任务
//!
//! 两种形态共用 [`RetryPolicy::next_step`] 作为唯一的决策核心，只在“如何等待”上不同。
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::fmt::Display;
use std::future::Future;
use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::error::is_transient_lock_error;

/// 默认最大重试次数。
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// 默认退避基数。
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(150);

/// 重试策略（最大重试次数 + 线性退避基数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

/// 一次重试的记录。
///
/// 字段说明：
/// - `index`：即将发起的尝试序号（首次执行为 0，因此重试记录从 1 开始）
/// - `delay`：发起该尝试前等待的时长，恒为 `base_delay × index`
///
/// 触发重试的失败码不存放在这里（执行器对错误类型是泛型的），而是随每次重试的
/// `debug!` 日志以 `error` 字段输出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    pub index: u32,
    pub delay: Duration,
}

/// 一次失败后的决策。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 等待后重试。
    Retry(RetryAttempt),
    /// 失败不可重试，立即放弃。
    Fatal,
    /// 可重试，但次数已用尽。
    Exhausted,
}

/// 重试最终失败。两种变体都携带最后一次的原始错误，不做任何改写。
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("不可重试的失败（共尝试 {attempts} 次）: {error}")]
    Fatal { error: E, attempts: u32 },
    #[error("重试次数已用尽（共尝试 {attempts} 次）: {error}")]
    Exhausted { error: E, attempts: u32 },
}

impl<E> RetryError<E> {
    /// 取回原始错误。
    pub fn into_inner(self) -> E {
        match self {
            Self::Fatal { error, .. } | Self::Exhausted { error, .. } => error,
        }
    }

    /// 原始错误的引用。
    pub fn error(&self) -> &E {
        match self {
            Self::Fatal { error, .. } | Self::Exhausted { error, .. } => error,
        }
    }

    /// 实际执行的总尝试次数（含首次）。
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Fatal { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// 第 `attempt` 次尝试（从 0 计）失败后、下一次尝试前的等待时长。
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }

    /// 全部重试用尽时的累计退避：`D × R × (R + 1) / 2`。
    pub fn worst_case_backoff(&self) -> Duration {
        (0..self.max_retries).map(|a| self.delay_after(a)).sum()
    }

    /// 决策核心：第 `attempt` 次尝试以 `error` 失败后应如何继续。
    ///
    /// 参数：
    /// - `attempt`：刚失败的尝试序号（从 0 计）
    /// - `error`：本次失败的错误
    /// - `is_retryable`：失败码谓词
    pub fn next_step<E>(
        &self,
        attempt: u32,
        error: &E,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Step {
        if !is_retryable(error) {
            return Step::Fatal;
        }
        if attempt >= self.max_retries {
            return Step::Exhausted;
        }
        Step::Retry(RetryAttempt {
            index: attempt + 1,
            delay: self.delay_after(attempt),
        })
    }

    /// 阻塞形态：在当前线程上执行，退避期间线程休眠。
    ///
    /// 参数：
    /// - `is_retryable`：失败码谓词
    /// - `op`：被重试的操作（每次尝试调用一次）
    ///
    /// 返回值：
    /// - `Ok(T)`：某次尝试成功
    /// - `Err(RetryError)`：不可重试或次数用尽，携带最后一次的原始错误
    pub fn run_blocking_with<T, E: Display>(
        &self,
        is_retryable: impl Fn(&E) -> bool,
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, RetryError<E>> {
        let mut attempt = 0;
        loop {
            let error = match op() {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match self.next_step(attempt, &error, &is_retryable) {
                Step::Retry(next) => {
                    debug!(
                        attempt = next.index,
                        delay_ms = next.delay.as_millis() as u64,
                        error = %error,
                        "删除失败，等待后重试"
                    );
                    std::thread::sleep(next.delay);
                    attempt = next.index;
                }
                Step::Fatal => {
                    return Err(RetryError::Fatal {
                        error,
                        attempts: attempt + 1,
                    })
                }
                Step::Exhausted => {
                    return Err(RetryError::Exhausted {
                        error,
                        attempts: attempt + 1,
                    })
                }
            }
        }
    }

    /// 异步形态：退避通过 `tokio::time::sleep` 调度，不阻塞运行时线程。
    ///
    /// 参数与返回值同 [`RetryPolicy::run_blocking_with`]；`op` 每次尝试返回一个新的 future。
    pub async fn run_with<T, E, F, Fut>(
        &self,
        is_retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match self.next_step(attempt, &error, &is_retryable) {
                Step::Retry(next) => {
                    debug!(
                        attempt = next.index,
                        delay_ms = next.delay.as_millis() as u64,
                        error = %error,
                        "删除失败，等待后重试"
                    );
                    tokio::time::sleep(next.delay).await;
                    attempt = next.index;
                }
                Step::Fatal => {
                    return Err(RetryError::Fatal {
                        error,
                        attempts: attempt + 1,
                    })
                }
                Step::Exhausted => {
                    return Err(RetryError::Exhausted {
                        error,
                        attempts: attempt + 1,
                    })
                }
            }
        }
    }

    /// [`RetryPolicy::run_blocking_with`] 的 IO 版本，谓词为瞬时锁争用。
    pub fn run_blocking<T>(
        &self,
        op: impl FnMut() -> io::Result<T>,
    ) -> Result<T, RetryError<io::Error>> {
        self.run_blocking_with(is_transient_lock_error, op)
    }

    /// [`RetryPolicy::run_with`] 的 IO 版本，谓词为瞬时锁争用。
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, RetryError<io::Error>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        self.run_with(is_transient_lock_error, op).await
    }
}
