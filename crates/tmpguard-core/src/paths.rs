//! 上传临时目录约定与路径分类。
//!
//! 目标：
//! - 将“受管临时上传目录”的前缀集中计算一次，避免散落在各模块中
//! - 提供路径分类函数，供删除拦截层在每次删除调用的热路径上判断是否需要重试保护
//!
//! 约定：
//! - 受管前缀 = 系统临时目录 + 固定子前缀 [`UPLOAD_TMP_PREFIX`]，不提供配置项
//! - 比较前统一把 `\` 归一化为 `/`，因此 Windows 与 POSIX 写法的同一路径分类结果一致
//!
//! 作者：tmpguard 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::Path;

use once_cell::sync::Lazy;

/// 上传管线在临时目录下创建临时文件/目录时使用的固定名称前缀。
///
/// 示例（Windows 默认）：
/// - `C:\Users\<user>\AppData\Local\Temp\strapi-upload-3f9a…\file.png`
pub const UPLOAD_TMP_PREFIX: &str = "strapi-upload-";

/// 进程级受管前缀（首次访问时根据当前临时目录计算，之后不再变化）。
static PROCESS_PREFIX: Lazy<ManagedPathPrefix> = Lazy::new(ManagedPathPrefix::from_temp_dir);

/// 归一化后的受管路径前缀。
///
/// 不变量：
/// - 内部字符串不含 `\`，所有分隔符均为 `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPathPrefix {
    normalized: String,
}

impl ManagedPathPrefix {
    /// 以当前进程的系统临时目录（`std::env::temp_dir()`）为根计算前缀。
    pub fn from_temp_dir() -> Self {
        Self::under(&std::env::temp_dir())
    }

    /// 以指定目录为临时根计算前缀。
    ///
    /// 参数：
    /// - `temp_root`：临时目录根（测试中通常是沙箱目录）
    ///
    /// 返回值：
    /// - `temp_root` 拼接 [`UPLOAD_TMP_PREFIX`] 并归一化分隔符后的前缀
    pub fn under(temp_root: &Path) -> Self {
        let joined = temp_root.join(UPLOAD_TMP_PREFIX);
        Self {
            normalized: normalize_separators(&joined.to_string_lossy()),
        }
    }

    /// 进程级前缀（只计算一次）。
    pub fn process() -> &'static Self {
        &PROCESS_PREFIX
    }

    /// 归一化后的前缀字符串。
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// 判断路径是否位于受管临时上传目录下。
    ///
    /// 参数：
    /// - `candidate`：删除调用的目标路径
    ///
    /// 返回值：
    /// - `true`：路径（归一化分隔符后）包含受管前缀
    /// - `false`：不包含，或路径无法表示为 UTF-8（未知形态一律按“非受管”处理，保持原行为）
    ///
    /// 性能：
    /// - 不分配内存，逐字节比较时就地归一化分隔符
    pub fn is_managed(&self, candidate: &Path) -> bool {
        match candidate.to_str() {
            Some(raw) => contains_normalized(raw.as_bytes(), self.normalized.as_bytes()),
            None => false,
        }
    }
}

/// 将路径字符串中的 `\` 统一替换为 `/`。
pub fn normalize_separators(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// 在 `haystack` 中查找已归一化的 `needle`，比较时把 `haystack` 的 `\` 视为 `/`。
fn contains_normalized(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| {
        window
            .iter()
            .zip(needle)
            .all(|(&h, &n)| canonical_separator(h) == n)
    })
}

fn canonical_separator(b: u8) -> u8 {
    if b == b'\\' {
        b'/'
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 验证前缀内部不含反斜杠。
    fn prefix_is_normalized() {
        let prefix = ManagedPathPrefix::under(Path::new(r"C:\Temp"));
        assert!(!prefix.as_str().contains('\\'));
        assert!(prefix.as_str().ends_with(UPLOAD_TMP_PREFIX));
    }

    #[test]
    fn contains_normalized_matches_mixed_separators() {
        assert!(contains_normalized(br"C:\Temp\strapi-upload-x", b"C:/Temp/strapi-upload-"));
        assert!(contains_normalized(b"C:/Temp/strapi-upload-x", b"C:/Temp/strapi-upload-"));
        assert!(!contains_normalized(b"C:/Temp/other", b"C:/Temp/strapi-upload-"));
        assert!(!contains_normalized(b"short", b"much longer needle"));
    }
}
