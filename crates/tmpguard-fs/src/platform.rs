//! 运行平台检测。
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use serde::Serialize;

/// 与删除锁争用相关的平台划分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Other,
}

impl Platform {
    /// 当前编译目标平台。
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }

    /// 是否存在“文件仍被占用”类瞬时删除失败（杀毒软件/索引服务短暂持有句柄）。
    ///
    /// 注意：
    /// - 目前仅 Windows 返回 `true`；其他平台删除已打开文件不会失败
    pub fn has_transient_lock_contention(self) -> bool {
        matches!(self, Self::Windows)
    }
}
