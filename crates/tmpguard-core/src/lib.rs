//! tmpguard 核心库（与平台和文件系统实现无关）。
//!
//! 功能：
//! - 计算受管临时上传目录前缀并对删除目标路径分类
//! - 定义删除失败码分类（瞬时锁争用 vs 真实错误）
//! - 提供有界线性退避重试执行器（阻塞/异步两种形态）
//! - 定义重试参数配置与环境变量覆盖
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

pub mod config;
pub mod error;
pub mod paths;
pub mod retry;
