//! 上传临时文件删除保护（文件系统侧）。
//!
//! 目标：
//! - 在 Windows 上，杀毒软件/索引服务/迟关闭的句柄会短暂占用刚上传的临时文件，
//!   导致删除以 `EPERM`/`EBUSY`/`ENOTEMPTY` 失败；本 crate 为这些删除加上有界重试
//! - 对受管临时目录之外的删除完全透明
//!
//! 结构：
//! - [`backend`]：删除入口抽象与标准实现
//! - [`interceptor`]：带重试保护的包装层
//! - [`slot`]：进程级删除入口与二级工具库注册表
//! - [`guard`]：补丁幂等标记
//! - [`install`]：安装入口（进程启动时调用一次）
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

pub mod backend;
pub mod guard;
pub mod install;
pub mod interceptor;
pub mod platform;
pub mod slot;

pub use slot::native;
