//! 安装入口：进程启动时决定是否需要拦截，并把各组件装配到一起。
//!
//! 主要步骤：
//! 1) 平台判断：非 Windows 平台直接返回（除非设置了强制安装）
//! 2) 原生删除入口：经 [`PatchGuard`] 幂等地替换为 [`ResilientFs`]
//! 3) 二级工具库删除入口：按模块名尽力查找，找到且不同于原生入口时同样幂等替换
//!
//! 异常处理：
//! - 查找不到二级工具库属于正常情况，不报错
//! - 只有读取环境变量配置失败时 [`install_process_hook`] 才返回错误
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::sync::Arc;

use serde::Serialize;
use tmpguard_core::config::{force_install_requested, ConfigError, GuardConfig};
use tmpguard_core::paths::ManagedPathPrefix;
use tmpguard_core::retry::RetryPolicy;
use tracing::{debug, info};

use crate::guard::{PatchGuard, NATIVE_MARKER, SECONDARY_MARKER};
use crate::interceptor::ResilientFs;
use crate::platform::Platform;
use crate::slot::{native, FsSlot, SecondaryRegistry};

/// 默认查找的二级工具库模块名（上传管线自带的文件系统工具库）。
pub const DEFAULT_SECONDARY_MODULE: &str = "upload";

/// 安装所需的全部输入。
///
/// 字段说明：
/// - `platform`：运行平台
/// - `force`：非 Windows 平台也安装（测试用）
/// - `native`：原生删除入口
/// - `secondary`：二级工具库注册表
/// - `secondary_module`：要查找的模块名
/// - `prefix` / `policy`：拦截层使用的受管前缀与重试策略
#[derive(Debug, Clone)]
pub struct InstallContext<'a> {
    pub platform: Platform,
    pub force: bool,
    pub native: Arc<FsSlot>,
    pub secondary: &'a SecondaryRegistry,
    pub secondary_module: &'a str,
    pub prefix: ManagedPathPrefix,
    pub policy: RetryPolicy,
}

impl InstallContext<'static> {
    /// 基于当前进程的全局入口、临时目录与环境变量配置构造。
    ///
    /// 异常处理：
    /// - 重试参数环境变量无法解析时返回错误
    pub fn from_process() -> Result<Self, ConfigError> {
        let config = GuardConfig::from_env()?;
        Ok(Self {
            platform: Platform::current(),
            force: force_install_requested(),
            native: Arc::clone(native()),
            secondary: SecondaryRegistry::global(),
            secondary_module: DEFAULT_SECONDARY_MODULE,
            prefix: ManagedPathPrefix::process().clone(),
            policy: config.retry_policy(),
        })
    }
}

/// 二级工具库的安装结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryOutcome {
    /// 拦截未启用，未查找。
    Skipped,
    /// 未找到该模块。
    Missing,
    /// 与原生入口是同一个 slot，无需重复安装。
    SameAsNative,
    /// 本次完成安装。
    Patched,
    /// 之前已安装。
    AlreadyPatched,
}

/// 一次安装调用的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// 当前平台是否启用拦截。
    pub active: bool,
    /// 原生入口是否在本次调用中被替换。
    pub native_patched: bool,
    pub secondary: SecondaryOutcome,
}

impl InstallReport {
    fn inert() -> Self {
        Self {
            active: false,
            native_patched: false,
            secondary: SecondaryOutcome::Skipped,
        }
    }
}

/// 执行安装（可重复调用，只有首次真正替换入口）。
///
/// 参数：
/// - `ctx`：安装输入
///
/// 返回值：
/// - [`InstallReport`]：各目标的安装情况
pub fn install(ctx: &InstallContext<'_>) -> InstallReport {
    if !ctx.platform.has_transient_lock_contention() && !ctx.force {
        debug!(platform = ?ctx.platform, "当前平台无需删除重试保护，跳过安装");
        return InstallReport::inert();
    }

    let native_patched =
        PatchGuard::install_once(&ctx.native, NATIVE_MARKER, |slot| wrap(slot, ctx));

    let secondary = match ctx.secondary.resolve(ctx.secondary_module) {
        None => SecondaryOutcome::Missing,
        Some(slot) if Arc::ptr_eq(&slot, &ctx.native) => SecondaryOutcome::SameAsNative,
        Some(slot) => {
            if PatchGuard::install_once(&slot, SECONDARY_MARKER, |slot| wrap(slot, ctx)) {
                SecondaryOutcome::Patched
            } else {
                SecondaryOutcome::AlreadyPatched
            }
        }
    };

    let report = InstallReport {
        active: true,
        native_patched,
        secondary,
    };
    if native_patched || secondary == SecondaryOutcome::Patched {
        info!(
            prefix = ctx.prefix.as_str(),
            max_retries = ctx.policy.max_retries(),
            base_delay_ms = ctx.policy.base_delay().as_millis() as u64,
            secondary = ?secondary,
            "已安装上传临时文件删除重试保护"
        );
    }
    report
}

/// 进程生命周期钩子：使用进程级全局入口与环境配置执行 [`install`]。
pub fn install_process_hook() -> Result<InstallReport, ConfigError> {
    let ctx = InstallContext::from_process()?;
    Ok(install(&ctx))
}

fn wrap(slot: &FsSlot, ctx: &InstallContext<'_>) {
    slot.replace_with(|original| {
        Arc::new(ResilientFs::new(original, ctx.prefix.clone(), ctx.policy))
    });
}
