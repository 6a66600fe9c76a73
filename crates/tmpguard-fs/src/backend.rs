//! 删除类文件系统入口的抽象与标准实现。
//!
//! 入口一览（每种操作三种调用形态）：
//! - 单文件删除：`unlink_sync` / `unlink`（future）/ `unlink_callback`
//! - 递归删除：`rm_sync` / `rm`（future）/ `rm_callback`
//!
//! 回调形态：
//! - 有 tokio 运行时：在当前运行时上调度 future，完成后调用回调
//! - 无运行时：在独立线程上执行同步形态，完成后调用回调
//! - 未提供回调：照常执行删除，结果丢弃
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 回调形态的完成通知（`Ok(())` 表示删除成功）。
pub type DeleteCallback = Box<dyn FnOnce(io::Result<()>) + Send + 'static>;

/// 递归删除选项。
///
/// 字段说明：
/// - `recursive`：允许删除目录（及其内容）；关闭时删除目录直接失败
/// - `force`：目标不存在时视为成功
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOptions {
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub force: bool,
}

impl RemoveOptions {
    /// 整棵目录树删除且忽略不存在（工具库 `remove` 的语义）。
    pub const TREE: Self = Self {
        recursive: true,
        force: true,
    };
}

/// 删除类文件系统入口。
///
/// 实现方需保证同步形态与异步形态的成功/失败契约一致；回调形态默认基于前两者实现。
#[async_trait]
pub trait FileSystem: Send + Sync + 'static {
    /// 同步删除单个文件。
    fn unlink_sync(&self, path: &Path) -> io::Result<()>;

    /// 同步删除文件或目录（按 `options`）。
    fn rm_sync(&self, path: &Path, options: RemoveOptions) -> io::Result<()>;

    /// 异步删除单个文件。
    async fn unlink(&self, path: &Path) -> io::Result<()>;

    /// 异步删除文件或目录（按 `options`）。
    async fn rm(&self, path: &Path, options: RemoveOptions) -> io::Result<()>;

    /// 回调形态的单文件删除。
    fn unlink_callback(self: Arc<Self>, path: PathBuf, callback: Option<DeleteCallback>) {
        let blocking = Arc::clone(&self);
        let blocking_path = path.clone();
        complete_in_background(
            async move { self.unlink(&path).await },
            move || blocking.unlink_sync(&blocking_path),
            callback,
        );
    }

    /// 回调形态的递归删除；`options` 缺省时按 [`RemoveOptions::default`] 处理。
    fn rm_callback(
        self: Arc<Self>,
        path: PathBuf,
        options: Option<RemoveOptions>,
        callback: Option<DeleteCallback>,
    ) {
        let options = options.unwrap_or_default();
        let blocking = Arc::clone(&self);
        let blocking_path = path.clone();
        complete_in_background(
            async move { self.rm(&path, options).await },
            move || blocking.rm_sync(&blocking_path, options),
            callback,
        );
    }
}

/// 在后台完成一次删除并通知回调。
///
/// 参数：
/// - `future`：有 tokio 运行时时调度执行的异步形态
/// - `blocking`：无运行时时在独立线程上执行的同步形态
/// - `callback`：完成通知（可选）
pub(crate) fn complete_in_background<Fut, B>(
    future: Fut,
    blocking: B,
    callback: Option<DeleteCallback>,
) where
    Fut: Future<Output = io::Result<()>> + Send + 'static,
    B: FnOnce() -> io::Result<()> + Send + 'static,
{
    let finish = move |result: io::Result<()>| {
        if let Some(callback) = callback {
            callback(result);
        }
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { finish(future.await) });
        }
        Err(_) => {
            std::thread::spawn(move || finish(blocking()));
        }
    }
}

/// 基于 `std::fs` / `tokio::fs` 的真实文件系统。
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

#[async_trait]
impl FileSystem for StdFs {
    fn unlink_sync(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rm_sync(&self, path: &Path, options: RemoveOptions) -> io::Result<()> {
        let result = match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() && options.recursive => std::fs::remove_dir_all(path),
            Ok(meta) if meta.is_dir() => Err(directory_without_recursive(path)),
            Ok(_) => std::fs::remove_file(path),
            Err(e) => Err(e),
        };
        ignore_missing(result, options.force)
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn rm(&self, path: &Path, options: RemoveOptions) -> io::Result<()> {
        let result = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() && options.recursive => {
                tokio::fs::remove_dir_all(path).await
            }
            Ok(meta) if meta.is_dir() => Err(directory_without_recursive(path)),
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) => Err(e),
        };
        ignore_missing(result, options.force)
    }
}

/// 未开启 `recursive` 时删除目录的错误（不可重试，`force` 也不会忽略它）。
fn directory_without_recursive(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::IsADirectory,
        format!("{} 是目录，删除目录需要 recursive", path.display()),
    )
}

/// `force` 时把“不存在”视为成功。
fn ignore_missing(result: io::Result<()>, force: bool) -> io::Result<()> {
    match result {
        Err(e) if force && e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
