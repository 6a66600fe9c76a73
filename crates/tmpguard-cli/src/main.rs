//! tmpguard 运维命令行。
//!
//! 职责：
//! - 判断给定路径是否属于受管临时上传目录（classify）
//! - 通过已安装重试保护的删除入口删除文件/目录（remove）
//! - 清理临时目录中遗留的上传临时文件（sweep），即此前重试用尽、被吞掉的删除
//! - 输出平台、受管前缀与重试参数等自检信息（doctor）
//!
//! 输出约定：
//! - 结果输出到 stdout（`--json` 时为 JSON），日志输出到 stderr
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tmpguard_core::paths::{ManagedPathPrefix, UPLOAD_TMP_PREFIX};
use tmpguard_fs::backend::RemoveOptions;
use tmpguard_fs::install::{install, InstallContext, InstallReport};
use tmpguard_fs::platform::Platform;
use tracing::{info, warn};

/// 命令行参数。
///
/// 说明：
/// - `json`：以 JSON 输出结果（便于脚本/监控采集）
/// - `force_install`：非 Windows 平台也启用删除重试保护（排障/测试用）
#[derive(Debug, Parser)]
#[command(name = "tmpguard", version)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[arg(long, global = true, default_value_t = false)]
    force_install: bool,

    #[command(subcommand)]
    command: Commands,
}

/// 支持的子命令。
#[derive(Debug, Subcommand)]
enum Commands {
    /// 判断路径是否属于受管临时上传目录。
    Classify {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// 删除文件或目录（受管路径带重试保护）。
    Remove {
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        recursive: bool,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// 清理临时目录中遗留的上传临时文件。
    Sweep {
        #[arg(long, default_value_t = 3600)]
        older_than_secs: u64,
    },
    /// 环境自检。
    Doctor,
}

/// 程序入口：初始化日志、安装删除重试保护并分发子命令。
///
/// 异常处理：
/// - 配置读取失败或子命令执行失败会返回 `Err`（进程以非零码退出）
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut ctx = InstallContext::from_process().context("读取 tmpguard 配置失败")?;
    ctx.force |= cli.force_install;
    let report = install(&ctx);

    match &cli.command {
        Commands::Classify { paths } => classify(&cli, paths),
        Commands::Remove {
            path,
            recursive,
            force,
        } => {
            remove(
                path,
                RemoveOptions {
                    recursive: *recursive,
                    force: *force,
                },
            )
            .await
        }
        Commands::Sweep { older_than_secs } => {
            sweep(&cli, Duration::from_secs(*older_than_secs)).await
        }
        Commands::Doctor => doctor(&cli, &ctx, report),
    }
}

#[derive(Debug, Serialize)]
struct Classification {
    path: String,
    managed: bool,
}

/// 输出每个路径的分类结果。
fn classify(cli: &Cli, paths: &[PathBuf]) -> Result<()> {
    let prefix = ManagedPathPrefix::process();
    let results: Vec<Classification> = paths
        .iter()
        .map(|p| Classification {
            path: p.display().to_string(),
            managed: prefix.is_managed(p),
        })
        .collect();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for r in &results {
            println!("{} = {}", r.path, r.managed);
        }
    }
    Ok(())
}

/// 通过进程级删除入口删除目标。
///
/// 异常处理：
/// - 非受管路径的任何失败、受管路径的不可重试失败会返回错误
/// - 受管路径重试用尽时仅输出警告，按成功返回
async fn remove(path: &Path, options: RemoveOptions) -> Result<()> {
    tmpguard_fs::native()
        .rm(path, options)
        .await
        .with_context(|| format!("删除失败: {}", path.display()))?;
    info!("删除完成: {}", path.display());
    Ok(())
}

/// 清理结果。
///
/// 字段说明：
/// - `scanned`：匹配前缀且达到年龄阈值的条目数
/// - `removed`：已确认从磁盘消失的条目数
/// - `left_behind`：删除后仍存在（或删除失败）的条目
#[derive(Debug, Serialize)]
struct SweepReport {
    temp_dir: String,
    scanned: usize,
    removed: usize,
    left_behind: Vec<String>,
    finished_at: String,
}

/// 清理临时目录下以上传前缀命名、且早于阈值的条目。
///
/// 参数：
/// - `older_than`：最后修改时间距今超过该时长才会被清理（避免误删正在进行中的上传）
///
/// 说明：
/// - 各条目并发删除，互不影响各自的重试节奏
///
/// 异常处理：
/// - 临时目录无法读取时返回错误
/// - 单个条目删除失败只记入 `left_behind`，不终止清理
async fn sweep(cli: &Cli, older_than: Duration) -> Result<()> {
    let temp_dir = std::env::temp_dir();
    let candidates = stale_upload_entries(&temp_dir, older_than)?;
    let scanned = candidates.len();

    let mut tasks = tokio::task::JoinSet::new();
    for path in candidates {
        tasks.spawn(async move {
            if let Err(e) = tmpguard_fs::native().remove(&path).await {
                warn!("清理失败: {} ({e})", path.display());
            }
            path
        });
    }

    let mut removed = 0;
    let mut left_behind = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let path = joined.context("清理任务异常退出")?;
        if std::fs::symlink_metadata(&path).is_ok() {
            left_behind.push(path.display().to_string());
        } else {
            removed += 1;
        }
    }
    left_behind.sort();

    let report = SweepReport {
        temp_dir: temp_dir.display().to_string(),
        scanned,
        removed,
        left_behind,
        finished_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
    };
    info!("清理完成: 扫描 {} 项，删除 {} 项", report.scanned, report.removed);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("scanned = {}", report.scanned);
        println!("removed = {}", report.removed);
        for p in &report.left_behind {
            println!("left_behind = {p}");
        }
    }
    Ok(())
}

/// 列出 `temp_dir` 下名称以上传前缀开头且早于阈值的条目。
fn stale_upload_entries(temp_dir: &Path, older_than: Duration) -> Result<Vec<PathBuf>> {
    let now = SystemTime::now();
    let mut out = Vec::new();
    let entries = std::fs::read_dir(temp_dir)
        .with_context(|| format!("读取临时目录失败: {}", temp_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("遍历临时目录失败: {}", temp_dir.display()))?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(UPLOAD_TMP_PREFIX) {
            continue;
        }
        // 元数据读不到的条目（可能正被删除）跳过
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age >= older_than {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    platform: Platform,
    temp_dir: String,
    managed_prefix: String,
    max_retries: u32,
    base_delay_ms: u64,
    worst_case_backoff_ms: u64,
    install: InstallReport,
}

/// 环境自检（用于排障）。
///
/// 输出：
/// - 平台与是否启用删除重试保护
/// - 受管前缀
/// - 重试参数与最坏累计退避
fn doctor(cli: &Cli, ctx: &InstallContext<'_>, install_report: InstallReport) -> Result<()> {
    let report = DoctorReport {
        platform: ctx.platform,
        temp_dir: std::env::temp_dir().display().to_string(),
        managed_prefix: ctx.prefix.as_str().to_string(),
        max_retries: ctx.policy.max_retries(),
        base_delay_ms: ctx.policy.base_delay().as_millis() as u64,
        worst_case_backoff_ms: ctx.policy.worst_case_backoff().as_millis() as u64,
        install: install_report,
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("platform = {:?}", report.platform);
        println!("active = {}", report.install.active);
        println!("managed_prefix = {}", report.managed_prefix);
        println!("max_retries = {}", report.max_retries);
        println!("base_delay_ms = {}", report.base_delay_ms);
        println!("worst_case_backoff_ms = {}", report.worst_case_backoff_ms);
    }
    Ok(())
}
