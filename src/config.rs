//! Scan configuration / 扫描配置
//!
//! Built once per run before any worker starts, then shared read-only by
//! all workers. Credential resolution (named profile vs anonymous) is a
//! configuration-time decision, not a per-bucket one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use s3::creds::Credentials;

use crate::filter::FilterPolicy;
use crate::sink::Category;

/// How requests are signed / 请求签名方式
#[derive(Debug, Clone)]
pub enum CredentialMode {
    /// Unsigned requests / 匿名模式
    Anonymous,
    /// Ambient named profile / 命名凭证配置
    Profile(String),
}

impl CredentialMode {
    /// Resolve a profile name once, falling back to anonymous with a
    /// warning when the profile cannot be loaded.
    pub fn resolve(profile: &str) -> Self {
        match Credentials::from_profile(Some(profile)) {
            Ok(_) => Self::Profile(profile.to_string()),
            Err(e) => {
                tracing::warn!("Profile '{}' not found ({}), all tests will run in anonymous mode", profile, e);
                Self::Anonymous
            }
        }
    }
}

/// Upload payload for the write probe / 写入探测的上传内容
#[derive(Debug, Clone)]
pub struct WriteProbe {
    /// Object key, the payload file's base name / 对象键名
    pub key: String,
    /// Payload bytes, uploaded verbatim / 原样上传的内容
    pub body: Arc<Vec<u8>>,
}

impl WriteProbe {
    /// Read the payload file. Unreadable payload is fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read(path)
            .with_context(|| format!("cannot read write-probe payload {:?}", path))?;
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("write-probe payload {:?} has no file name", path))?;
        Ok(Self {
            key,
            body: Arc::new(body),
        })
    }
}

/// Per-category output file paths / 分类输出文件路径
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub combined: PathBuf,
    pub listable: PathBuf,
    pub downloadable: PathBuf,
    pub non_downloadable: PathBuf,
    pub writable: PathBuf,
    pub non_writable: PathBuf,
    pub non_existent: PathBuf,
    pub inaccessible: PathBuf,
}

impl OutputPaths {
    /// Default detail file names next to the combined output path.
    pub fn new(combined: PathBuf) -> Self {
        let dir = combined
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::in_dir(&dir, combined)
    }

    /// All files under `dir` / 全部文件放在同一目录下
    pub fn in_dir(dir: &Path, combined: PathBuf) -> Self {
        Self {
            combined,
            listable: dir.join("listable.txt"),
            downloadable: dir.join("downloadable.txt"),
            non_downloadable: dir.join("nondownloadable.txt"),
            writable: dir.join("writable.txt"),
            non_writable: dir.join("nonwritable.txt"),
            non_existent: dir.join("nonexisting.txt"),
            inaccessible: dir.join("notaccesible.txt"),
        }
    }

    pub fn for_category(&self, category: Category) -> &Path {
        match category {
            Category::Combined => &self.combined,
            Category::Listable => &self.listable,
            Category::Downloadable => &self.downloadable,
            Category::NonDownloadable => &self.non_downloadable,
            Category::Writable => &self.writable,
            Category::NonWritable => &self.non_writable,
            Category::NonExistent => &self.non_existent,
            Category::Inaccessible => &self.inaccessible,
        }
    }
}

/// Immutable run configuration / 不可变运行配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Size and key filter (active mode) / 大小与键名过滤
    pub filter: FilterPolicy,
    /// Existence/readability probe only / 被动模式
    pub passive: bool,
    /// Split outcomes into per-category files / 详细输出模式
    pub detailed: bool,
    /// Worker task count / 工作任务数
    pub workers: usize,
    pub credentials: CredentialMode,
    /// Present when the write probe is enabled / 启用写入探测时存在
    pub probe: Option<WriteProbe>,
    pub outputs: OutputPaths,
}

impl ScanConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        min_size: u64,
        max_size: u64,
        pattern: &str,
        passive: bool,
        detailed: bool,
        workers: usize,
        credentials: CredentialMode,
        probe_path: Option<&Path>,
        output: PathBuf,
    ) -> Result<Self> {
        let filter = FilterPolicy::new(min_size, max_size, pattern)
            .with_context(|| format!("invalid filter pattern '{}'", pattern))?;
        let probe = probe_path.map(WriteProbe::load).transpose()?;
        Ok(Self {
            filter,
            passive,
            detailed,
            workers: workers.max(1),
            credentials,
            probe,
            outputs: OutputPaths::new(output),
        })
    }
}
