//! Categorized result files / 分类结果文件
//!
//! Append-only plain-text outputs, one fact per line. Each append opens the
//! file, writes, flushes and closes under a lock, so concurrent workers can
//! never interleave partial lines and no handle outlives the call.

use std::fs::OpenOptions;
use std::io::Write;

use parking_lot::Mutex;

use crate::config::OutputPaths;

/// Output taxonomy / 输出分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Collected URLs and probe URLs / 汇总输出
    Combined,
    Listable,
    Downloadable,
    NonDownloadable,
    Writable,
    NonWritable,
    NonExistent,
    Inaccessible,
}

/// Shared append-only sink / 共享追加输出
pub struct ResultSink {
    paths: OutputPaths,
    lock: Mutex<()>,
}

impl ResultSink {
    pub fn new(paths: OutputPaths) -> Self {
        Self {
            paths,
            lock: Mutex::new(()),
        }
    }

    /// Append pre-batched text to a category file. Empty text is a no-op so
    /// buckets without results do not create empty files.
    pub fn append(&self, category: Category, text: &str) -> std::io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let path = self.paths.for_category(category);
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        file.flush()
    }
}
