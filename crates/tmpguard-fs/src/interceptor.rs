//! 删除拦截层：对受管临时上传路径的删除施加有界重试，其余调用原样透传。
//!
//! 行为（每个入口一致）：
//! 1) 用 [`ManagedPathPrefix`] 对目标路径分类
//! 2) 非受管路径，或回调形态未提供回调：直接调用原始实现，不改变任何行为
//! 3) 受管路径：在 [`RetryPolicy`] 下执行原始实现（同步入口阻塞退避，future/回调入口调度退避）
//! 4) 重试用尽：吞掉错误并按成功返回，同时输出一条包含失败码与路径的警告
//! 5) 不可重试的失败：原样返回给调用方
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tmpguard_core::error::FailureCode;
use tmpguard_core::paths::ManagedPathPrefix;
use tmpguard_core::retry::{RetryError, RetryPolicy};
use tracing::warn;

use crate::backend::{complete_in_background, DeleteCallback, FileSystem, RemoveOptions};

/// 带重试保护的删除入口（包装原始实现）。
pub struct ResilientFs {
    original: Arc<dyn FileSystem>,
    prefix: ManagedPathPrefix,
    policy: RetryPolicy,
}

impl ResilientFs {
    /// 包装原始实现。
    ///
    /// 参数：
    /// - `original`：被包装的原始删除入口（非受管路径的调用全部转交给它）
    /// - `prefix`：受管路径前缀
    /// - `policy`：受管路径使用的重试策略
    pub fn new(
        original: Arc<dyn FileSystem>,
        prefix: ManagedPathPrefix,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            original,
            prefix,
            policy,
        }
    }
}

/// 将受管路径的重试结果收敛为调用方可见的结果。
///
/// 返回值：
/// - 成功或重试用尽：`Ok(())`（用尽时输出一条警告）
/// - 不可重试的失败：原始错误
fn settle(result: Result<(), RetryError<io::Error>>, path: &Path) -> io::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(RetryError::Exhausted { error, attempts }) => {
            warn!(
                code = %FailureCode::of(&error),
                path = %path.display(),
                attempts,
                "上传临时文件清理失败，文件保留在磁盘上"
            );
            Ok(())
        }
        Err(RetryError::Fatal { error, .. }) => Err(error),
    }
}

#[async_trait]
impl FileSystem for ResilientFs {
    fn unlink_sync(&self, path: &Path) -> io::Result<()> {
        if !self.prefix.is_managed(path) {
            return self.original.unlink_sync(path);
        }
        settle(
            self.policy.run_blocking(|| self.original.unlink_sync(path)),
            path,
        )
    }

    fn rm_sync(&self, path: &Path, options: RemoveOptions) -> io::Result<()> {
        if !self.prefix.is_managed(path) {
            return self.original.rm_sync(path, options);
        }
        settle(
            self.policy.run_blocking(|| self.original.rm_sync(path, options)),
            path,
        )
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        if !self.prefix.is_managed(path) {
            return self.original.unlink(path).await;
        }
        let result = self.policy.run(|| self.original.unlink(path)).await;
        settle(result, path)
    }

    async fn rm(&self, path: &Path, options: RemoveOptions) -> io::Result<()> {
        if !self.prefix.is_managed(path) {
            return self.original.rm(path, options).await;
        }
        let result = self.policy.run(|| self.original.rm(path, options)).await;
        settle(result, path)
    }

    fn unlink_callback(self: Arc<Self>, path: PathBuf, callback: Option<DeleteCallback>) {
        if callback.is_none() || !self.prefix.is_managed(&path) {
            Arc::clone(&self.original).unlink_callback(path, callback);
            return;
        }
        let blocking = Arc::clone(&self);
        let blocking_path = path.clone();
        complete_in_background(
            async move { self.unlink(&path).await },
            move || blocking.unlink_sync(&blocking_path),
            callback,
        );
    }

    fn rm_callback(
        self: Arc<Self>,
        path: PathBuf,
        options: Option<RemoveOptions>,
        callback: Option<DeleteCallback>,
    ) {
        if callback.is_none() || !self.prefix.is_managed(&path) {
            Arc::clone(&self.original).rm_callback(path, options, callback);
            return;
        }
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
