//! 删除失败码分类。
//!
//! 目的：
//! - 将 `std::io::Error` 归类为少量带标签的失败码（沿用 POSIX 名称，便于日志检索）
//! - 区分“瞬时锁争用”（可重试）与“真实的权限/存在性问题”（不可重试）
//!
//! 平台差异：
//! - Windows：优先按 Win32 错误码映射（共享冲突/锁冲突/拒绝访问/目录非空）
//! - Unix：`EPERM` 与 `EACCES` 按原始错误码区分，其余按 `io::ErrorKind` 归类
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::fmt;
use std::io;

use serde::Serialize;

/// 删除失败码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureCode {
    /// `EPERM`：文件句柄仍被占用时 Windows 报告的拒绝访问。
    PermissionDenied,
    /// `EBUSY`：资源忙（共享冲突/锁冲突）。
    Busy,
    /// `ENOTEMPTY`：目录内条目尚在释放中。
    DirectoryNotEmpty,
    /// `EACCES`：真实的访问权限不足。
    AccessDenied,
    /// `ENOENT`：目标不存在。
    NotFound,
    /// 无法识别的失败。
    Unknown,
}

impl FailureCode {
    /// 从 IO 错误推导失败码。
    ///
    /// 规则：
    /// - 有原始 OS 错误码且属于已知平台码时，按平台码映射
    /// - 否则按 `io::ErrorKind` 归类，无法归类时为 [`FailureCode::Unknown`]
    pub fn of(err: &io::Error) -> Self {
        if let Some(code) = err.raw_os_error().and_then(from_raw_os_error) {
            return code;
        }
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::ResourceBusy => Self::Busy,
            io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Unknown,
        }
    }

    /// 是否属于瞬时锁争用（`EPERM` / `EBUSY` / `ENOTEMPTY`）。
    pub fn is_transient_lock(self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::Busy | Self::DirectoryNotEmpty
        )
    }

    /// 日志中使用的短标签。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "EPERM",
            Self::Busy => "EBUSY",
            Self::DirectoryNotEmpty => "ENOTEMPTY",
            Self::AccessDenied => "EACCES",
            Self::NotFound => "ENOENT",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 判断 IO 错误是否属于可重试的瞬时锁争用。
pub fn is_transient_lock_error(err: &io::Error) -> bool {
    FailureCode::of(err).is_transient_lock()
}

#[cfg(windows)]
fn from_raw_os_error(code: i32) -> Option<FailureCode> {
    use windows::Win32::Foundation::{
        ERROR_ACCESS_DENIED, ERROR_DIR_NOT_EMPTY, ERROR_LOCK_VIOLATION, ERROR_SHARING_VIOLATION,
    };

    let code = u32::try_from(code).ok()?;
    if code == ERROR_ACCESS_DENIED.0 {
        Some(FailureCode::PermissionDenied)
    } else if code == ERROR_SHARING_VIOLATION.0 || code == ERROR_LOCK_VIOLATION.0 {
        Some(FailureCode::Busy)
    } else if code == ERROR_DIR_NOT_EMPTY.0 {
        Some(FailureCode::DirectoryNotEmpty)
    } else {
        None
    }
}

// EPERM/EACCES/EBUSY 在 Linux 与 macOS 上取值相同；ENOTEMPTY 不同，交给 ErrorKind。
#[cfg(unix)]
fn from_raw_os_error(code: i32) -> Option<FailureCode> {
    match code {
        1 => Some(FailureCode::PermissionDenied),
        13 => Some(FailureCode::AccessDenied),
        16 => Some(FailureCode::Busy),
        _ => None,
    }
}

#[cfg(not(any(unix, windows)))]
fn from_raw_os_error(_code: i32) -> Option<FailureCode> {
    None
}
