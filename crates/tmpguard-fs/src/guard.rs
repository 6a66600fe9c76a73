//! 补丁幂等标记：同一 `(目标, 标记)` 在进程生命周期内只安装一次。
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::sync::PoisonError;

use tracing::debug;

use crate::slot::FsSlot;

/// 原生删除入口使用的补丁标记。
pub const NATIVE_MARKER: &str = "tmp_unlink_patched";

/// 二级工具库删除入口使用的补丁标记。
pub const SECONDARY_MARKER: &str = "tmp_cleanup_patched";

/// 补丁幂等守卫。
pub struct PatchGuard;

impl PatchGuard {
    /// 仅在首次调用时执行安装。
    ///
    /// 参数：
    /// - `target`：被安装的删除入口
    /// - `marker`：补丁标记
    /// - `install`：安装动作
    ///
    /// 返回值：
    /// - `true`：本次执行了安装
    /// - `false`：该目标已带有此标记，什么也没做
    ///
    /// 并发：
    /// - 检查、安装、置位在同一把锁内完成，不会出现重复安装
    pub fn install_once(
        target: &FsSlot,
        marker: &'static str,
        install: impl FnOnce(&FsSlot),
    ) -> bool {
        let mut markers = target.markers.lock().unwrap_or_else(PoisonError::into_inner);
        if markers.contains(marker) {
            debug!(slot = target.name(), marker, "补丁已安装，跳过");
            return false;
        }
        install(target);
        markers.insert(marker);
        true
    }
}
