//! Error taxonomy for bucket probing / 存储桶探测错误分类
//!
//! Every variant is caught at the smallest enclosing scope (per-object,
//! per-bucket or per-probe) and converted into a categorized outcome.
//! None of them may terminate a worker or the run.

use thiserror::Error;

/// Failure modes surfaced by the object store / 对象存储失败类型
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bucket does not exist / 存储桶不存在
    #[error("bucket does not exist")]
    NotFound,

    /// Credentials rejected or insufficient / 凭证被拒绝
    #[error("credentials rejected: {0}")]
    Auth(String),

    /// Network, DNS or timeout failure / 网络传输失败
    #[error("transport failure: {0}")]
    Transport(String),

    /// A single object could not be read mid-enumeration / 单个对象不可读
    #[error("object not readable: {0}")]
    ObjectAccess(String),

    /// Upload rejected or failed / 上传被拒绝或失败
    #[error("write probe failed: {0}")]
    WriteProbe(String),
}
