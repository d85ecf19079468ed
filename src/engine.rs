//! Scan engine / 扫描引擎
//!
//! The concurrent core: a shared work queue of bucket names drained by a
//! fixed pool of worker tasks. Each worker resolves one bucket, runs the
//! active or passive scan, optionally runs the write probe, and dispatches
//! the categorized outcomes to the result sink. Per-bucket and per-object
//! failures are converted into outcomes at the smallest enclosing scope;
//! nothing short of a configuration error can stop the run.
//!
//! `run` returns only after every dequeued target has been fully processed,
//! including its write probe.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{ScanConfig, WriteProbe};
use crate::error::StoreError;
use crate::filter::human_size;
use crate::sink::{Category, ResultSink};
use crate::store::{object_url, BucketHandle, ObjectStore};

/// One bucket name to scan, consumed exactly once / 待扫描的存储桶名
#[derive(Debug, Clone)]
pub struct BucketTarget {
    pub name: String,
}

impl From<String> for BucketTarget {
    fn from(name: String) -> Self {
        Self { name }
    }
}

impl From<&str> for BucketTarget {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Per-bucket result facets / 单个存储桶的结果
///
/// A bucket can yield several facets in one pass, e.g. Listable +
/// Downloadable in passive mode, or Collected + Writable with the probe on.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    NonExistent(String),
    Inaccessible(String),
    Listable(String),
    Downloadable(String),
    NonDownloadable(String),
    /// Matching object URLs, pre-batched into one append / 预合并的URL批次
    Collected {
        bucket: String,
        lines: String,
        count: usize,
    },
    Writable {
        bucket: String,
        url: String,
    },
    NonWritable(String),
}

/// Aggregated run tallies / 运行汇总
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub buckets: usize,
    pub non_existent: usize,
    pub inaccessible: usize,
    pub listable: usize,
    pub downloadable: usize,
    pub non_downloadable: usize,
    pub collected_objects: usize,
    pub writable: usize,
    pub non_writable: usize,
}

impl ScanSummary {
    fn merge(&mut self, other: &ScanSummary) {
        self.buckets += other.buckets;
        self.non_existent += other.non_existent;
        self.inaccessible += other.inaccessible;
        self.listable += other.listable;
        self.downloadable += other.downloadable;
        self.non_downloadable += other.non_downloadable;
        self.collected_objects += other.collected_objects;
        self.writable += other.writable;
        self.non_writable += other.non_writable;
    }
}

/// Bounded worker pool over a shared queue / 共享队列上的有界工作池
pub struct ScanEngine {
    config: Arc<ScanConfig>,
    store: Arc<dyn ObjectStore>,
    sink: Arc<ResultSink>,
}

impl ScanEngine {
    pub fn new(config: Arc<ScanConfig>, store: Arc<dyn ObjectStore>, sink: Arc<ResultSink>) -> Self {
        Self {
            config,
            store,
            sink,
        }
    }

    /// Scan every target to completion and return the merged tallies.
    pub async fn run(&self, targets: Vec<BucketTarget>) -> ScanSummary {
        let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
        let mut handles = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let worker = Worker {
                config: self.config.clone(),
                store: self.store.clone(),
                sink: self.sink.clone(),
                queue: queue.clone(),
            };
            handles.push(tokio::spawn(async move { worker.run(id).await }));
        }
        let mut summary = ScanSummary::default();
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(worker_summary) => summary.merge(&worker_summary),
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }
        summary
    }
}

struct Worker {
    config: Arc<ScanConfig>,
    store: Arc<dyn ObjectStore>,
    sink: Arc<ResultSink>,
    queue: Arc<Mutex<VecDeque<BucketTarget>>>,
}

impl Worker {
    async fn run(self, id: usize) -> ScanSummary {
        let mut summary = ScanSummary::default();
        loop {
            // guard dropped before the await below
            let target = { self.queue.lock().pop_front() };
            let Some(target) = target else { break };
            tracing::debug!("worker {} picked up '{}'", id, target.name);
            let outcomes = self.process(&target).await;
            summary.buckets += 1;
            for outcome in &outcomes {
                self.dispatch(outcome, &mut summary);
            }
        }
        summary
    }

    /// Resolve → mode dispatch → optional write probe. / 单桶状态机
    async fn process(&self, target: &BucketTarget) -> Vec<ScanOutcome> {
        let bucket = target.name.as_str();
        let region = match self.store.resolve_region(bucket).await {
            Ok(region) => region,
            Err(StoreError::NotFound) => {
                tracing::info!("Bucket '{}' does not exist", bucket);
                return vec![ScanOutcome::NonExistent(bucket.to_string())];
            }
            Err(e) => {
                tracing::warn!("Error: couldn't connect to '{}' bucket. Details: {}", bucket, e);
                return vec![ScanOutcome::Inaccessible(bucket.to_string())];
            }
        };

        tracing::info!("Testing bucket '{}'...", bucket);
        let mut outcomes = match self.store.open_bucket(bucket, &region).await {
            Ok(handle) => {
                if self.config.passive {
                    self.passive_scan(handle.as_ref(), bucket).await
                } else {
                    self.active_scan(handle.as_ref(), bucket, &region).await
                }
            }
            Err(e) => {
                tracing::warn!("Error: couldn't access the '{}' bucket. Details: {}", bucket, e);
                vec![ScanOutcome::Inaccessible(bucket.to_string())]
            }
        };

        // The probe runs for every bucket that exists, populated or not,
        // and regardless of how the read scan went.
        if let Some(probe) = &self.config.probe {
            outcomes.push(self.write_probe(bucket, &region, probe).await);
        }
        outcomes
    }

    /// Full enumeration with size/key filtering / 主动模式：全量枚举过滤
    async fn active_scan(
        &self,
        handle: &dyn BucketHandle,
        bucket: &str,
        region: &str,
    ) -> Vec<ScanOutcome> {
        let keys = match handle.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Error: couldn't access the '{}' bucket. Details: {}", bucket, e);
                return vec![ScanOutcome::Inaccessible(bucket.to_string())];
            }
        };

        let mut lines = String::new();
        let mut count = 0;
        for key in keys {
            match handle.object_size(&key).await {
                Ok(size) => {
                    if self.config.filter.matches(size, &key) {
                        let url = object_url(region, bucket, &key);
                        tracing::info!("Collectable: {} {}", url, human_size(size));
                        lines.push_str(&url);
                        lines.push('\n');
                        count += 1;
                    }
                }
                // one unreadable object never aborts the rest
                Err(e) => {
                    tracing::warn!(
                        "Error: couldn't get '{}' object in '{}' bucket. Details: {}",
                        key,
                        bucket,
                        e
                    );
                }
            }
        }
        vec![ScanOutcome::Collected {
            bucket: bucket.to_string(),
            lines,
            count,
        }]
    }

    /// Readability probe, stops at the first object / 被动模式：首个对象即止
    async fn passive_scan(&self, handle: &dyn BucketHandle, bucket: &str) -> Vec<ScanOutcome> {
        let keys = match handle.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Error: couldn't access the '{}' bucket. Details: {}", bucket, e);
                return vec![ScanOutcome::Inaccessible(bucket.to_string())];
            }
        };

        let mut outcomes = Vec::new();
        if let Some(first) = keys.first() {
            tracing::info!("{} is listable!", bucket);
            outcomes.push(ScanOutcome::Listable(bucket.to_string()));
            match handle.object_size(first).await {
                Ok(_) => {
                    tracing::info!("{} is possible to download!!", bucket);
                    outcomes.push(ScanOutcome::Downloadable(bucket.to_string()));
                }
                Err(e) => {
                    tracing::warn!(
                        "Error: couldn't get '{}' object in '{}' bucket. Details: {}",
                        first,
                        bucket,
                        e
                    );
                    outcomes.push(ScanOutcome::NonDownloadable(bucket.to_string()));
                }
            }
        }
        outcomes
    }

    /// Upload the payload under its own file name / 以自身文件名上传探测内容
    async fn write_probe(&self, bucket: &str, region: &str, probe: &WriteProbe) -> ScanOutcome {
        let handle = match self.store.open_bucket(bucket, region).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    "Error: couldn't upload a {} file to {}. Details: {}",
                    probe.key,
                    bucket,
                    e
                );
                return ScanOutcome::NonWritable(bucket.to_string());
            }
        };
        match handle.put_object(&probe.key, &probe.body).await {
            Ok(()) => {
                tracing::info!(
                    "Success: bucket '{}' allows for uploading arbitrary files!!!",
                    bucket
                );
                ScanOutcome::Writable {
                    bucket: bucket.to_string(),
                    url: object_url(region, bucket, &probe.key),
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Error: couldn't upload a {} file to {}. Details: {}",
                    probe.key,
                    bucket,
                    e
                );
                ScanOutcome::NonWritable(bucket.to_string())
            }
        }
    }

    /// Route one outcome facet to the sink and the tallies / 结果分发
    ///
    /// In non-detailed mode only the combined output file is written;
    /// passive listable names fall back to it.
    fn dispatch(&self, outcome: &ScanOutcome, summary: &mut ScanSummary) {
        let detailed = self.config.detailed;
        match outcome {
            ScanOutcome::NonExistent(bucket) => {
                summary.non_existent += 1;
                if detailed {
                    self.emit(Category::NonExistent, &format!("{}\n", bucket));
                }
            }
            ScanOutcome::Inaccessible(bucket) => {
                summary.inaccessible += 1;
                if detailed {
                    self.emit(Category::Inaccessible, &format!("{}\n", bucket));
                }
            }
            ScanOutcome::Listable(bucket) => {
                summary.listable += 1;
                let category = if detailed {
                    Category::Listable
                } else {
                    Category::Combined
                };
                self.emit(category, &format!("{}\n", bucket));
            }
            ScanOutcome::Downloadable(bucket) => {
                summary.downloadable += 1;
                if detailed {
                    self.emit(Category::Downloadable, &format!("{}\n", bucket));
                }
            }
            ScanOutcome::NonDownloadable(bucket) => {
                summary.non_downloadable += 1;
                if detailed {
                    self.emit(Category::NonDownloadable, &format!("{}\n", bucket));
                }
            }
            ScanOutcome::Collected { lines, count, .. } => {
                summary.collected_objects += *count;
                self.emit(Category::Combined, lines);
            }
            ScanOutcome::Writable { bucket, url } => {
                summary.writable += 1;
                self.emit(Category::Combined, &format!("{}\n", url));
                if detailed {
                    self.emit(Category::Writable, &format!("{}\n", bucket));
                }
            }
            ScanOutcome::NonWritable(bucket) => {
                summary.non_writable += 1;
                if detailed {
                    self.emit(Category::NonWritable, &format!("{}\n", bucket));
                }
            }
        }
    }

    fn emit(&self, category: Category, text: &str) {
        if let Err(e) = self.sink.append(category, text) {
            tracing::error!("Error: couldn't write {:?} output. Details: {}", category, e);
        }
    }
}
