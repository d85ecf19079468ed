pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod sink;
pub mod store;

pub use config::{CredentialMode, OutputPaths, ScanConfig, WriteProbe};
pub use engine::{BucketTarget, ScanEngine, ScanOutcome, ScanSummary};
pub use error::StoreError;
pub use filter::FilterPolicy;
pub use sink::{Category, ResultSink};
pub use store::{BucketHandle, ObjectStore, S3ObjectStore};
