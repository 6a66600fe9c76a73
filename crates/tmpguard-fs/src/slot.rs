//! 进程级删除入口（slot）与二级工具库注册表。
//!
//! 说明：
//! - 应用代码统一通过 [`native()`] 返回的 slot 执行删除；安装拦截即替换 slot 中的实现
//! - 依赖方可把自己持有的独立入口注册到 [`SecondaryRegistry`]，安装时按模块名尽力查找
//! - 每个 slot 自带补丁标记集合，保证同一标记只安装一次（见 [`crate::guard`]）
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::backend::{DeleteCallback, FileSystem, RemoveOptions, StdFs};

/// 进程级原生删除入口。
static NATIVE: Lazy<Arc<FsSlot>> = Lazy::new(|| Arc::new(FsSlot::new("fs", Arc::new(StdFs))));

/// 进程级二级工具库注册表。
static SECONDARY: Lazy<SecondaryRegistry> = Lazy::new(SecondaryRegistry::new);

/// 返回进程级原生删除入口。
pub fn native() -> &'static Arc<FsSlot> {
    &NATIVE
}

/// 一组可被整体替换的删除入口。
pub struct FsSlot {
    name: String,
    current: RwLock<Arc<dyn FileSystem>>,
    pub(crate) markers: Mutex<HashSet<&'static str>>,
}

impl std::fmt::Debug for FsSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsSlot").field("name", &self.name).finish_non_exhaustive()
    }
}

impl FsSlot {
    /// 创建 slot。
    ///
    /// 参数：
    /// - `name`：用于日志的名称
    /// - `fs`：初始实现（通常为 [`StdFs`]）
    pub fn new(name: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            name: name.into(),
            current: RwLock::new(fs),
            markers: Mutex::new(HashSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前生效的实现。
    pub fn current(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&*self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// 用 `wrap(旧实现)` 替换当前实现。
    pub(crate) fn replace_with(
        &self,
        wrap: impl FnOnce(Arc<dyn FileSystem>) -> Arc<dyn FileSystem>,
    ) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let original = Arc::clone(&*current);
        *current = wrap(original);
    }

    /// 是否已设置指定补丁标记。
    pub fn is_marked(&self, marker: &str) -> bool {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(marker)
    }

    pub fn unlink_sync(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.current().unlink_sync(path.as_ref())
    }

    pub fn rm_sync(&self, path: impl AsRef<Path>, options: RemoveOptions) -> io::Result<()> {
        self.current().rm_sync(path.as_ref(), options)
    }

    pub async fn unlink(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let fs = self.current();
        fs.unlink(path.as_ref()).await
    }

    pub async fn rm(&self, path: impl AsRef<Path>, options: RemoveOptions) -> io::Result<()> {
        let fs = self.current();
        fs.rm(path.as_ref(), options).await
    }

    pub fn unlink_callback(&self, path: impl Into<PathBuf>, callback: Option<DeleteCallback>) {
        self.current().unlink_callback(path.into(), callback);
    }

    pub fn rm_callback(
        &self,
        path: impl Into<PathBuf>,
        options: Option<RemoveOptions>,
        callback: Option<DeleteCallback>,
    ) {
        self.current().rm_callback(path.into(), options, callback);
    }

    /// 工具库风格的整树删除（递归 + 忽略不存在）。
    pub async fn remove(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.rm(path, RemoveOptions::TREE).await
    }

    pub fn remove_sync(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.rm_sync(path, RemoveOptions::TREE)
    }
}

/// 二级文件系统工具库入口注册表（按模块名）。
#[derive(Debug, Default)]
pub struct SecondaryRegistry {
    slots: RwLock<HashMap<String, Arc<FsSlot>>>,
}

impl SecondaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级注册表。
    pub fn global() -> &'static Self {
        &SECONDARY
    }

    /// 注册（或覆盖）某模块持有的删除入口。
    pub fn register(&self, module: impl Into<String>, slot: Arc<FsSlot>) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.into(), slot);
    }

    /// 按模块名查找；找不到是正常情况，返回 `None`。
    pub fn resolve(&self, module: &str) -> Option<Arc<FsSlot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .cloned()
    }
}
