#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tmpguard_core::paths::{ManagedPathPrefix, UPLOAD_TMP_PREFIX};
use tmpguard_fs::backend::{FileSystem, RemoveOptions};

pub const TEMP_ROOT: &str = "/sandbox/tmp";

pub fn prefix() -> ManagedPathPrefix {
    ManagedPathPrefix::under(Path::new(TEMP_ROOT))
}

pub fn managed_path(name: &str) -> PathBuf {
    Path::new(TEMP_ROOT)
        .join(format!("{UPLOAD_TMP_PREFIX}abc123"))
        .join(name)
}

pub fn unmanaged_path(name: &str) -> PathBuf {
    Path::new("/srv/data").join(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UnlinkSync(PathBuf),
    RmSync(PathBuf, RemoveOptions),
    Unlink(PathBuf),
    Rm(PathBuf, RemoveOptions),
}

/// 按脚本依次返回失败的假文件系统；脚本耗尽后按 `fallback` 返回。
pub struct ScriptedFs {
    script: Mutex<VecDeque<io::ErrorKind>>,
    fallback: Option<io::ErrorKind>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedFs {
    /// 先依次以 `failures` 失败，之后成功。
    pub fn failing_then_ok(failures: &[io::ErrorKind]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(failures.iter().copied().collect()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// 每次都以 `kind` 失败。
    pub fn always(kind: io::ErrorKind) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(kind),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::failing_then_ok(&[])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, call: Call) -> io::Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.script.lock().unwrap().pop_front().or(self.fallback) {
            Some(kind) => Err(io::Error::from(kind)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FileSystem for ScriptedFs {
    fn unlink_sync(&self, path: &Path) -> io::Result<()> {
        self.next(Call::UnlinkSync(path.to_path_buf()))
    }

    fn rm_sync(&self, path: &Path, options: RemoveOptions) -> io::Result<()> {
        self.next(Call::RmSync(path.to_path_buf(), options))
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        self.next(Call::Unlink(path.to_path_buf()))
    }

    async fn rm(&self, path: &Path, options: RemoveOptions) -> io::Result<()> {
        self.next(Call::Rm(path.to_path_buf(), options))
    }
}

/// 收集日志输出的 writer。
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 在当前线程上安装一个写入 [`LogBuffer`] 的订阅者，返回守卫与缓冲区。
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (tracing::subscriber::set_default(subscriber), buffer)
}
