//! In-memory tracking stores.
//!
//! All gateway state lives in-process: dedup sets for webhook events,
//! the media path cache, and the daily-broadcast ledger. Entries are
//! swept lazily; nothing survives a restart.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// TTL-tracked set of message IDs.
///
/// Used twice, independently: IDs of messages we sent ourselves, and
/// IDs already processed. Locks are held only for map access.
#[derive(Default)]
pub struct TrackedIdStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl TrackedIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ID under a single lock, returning whether it was newly
    /// inserted. Re-marking refreshes its timestamp and returns false,
    /// so concurrent callers cannot both claim the same ID.
    pub async fn mark(&self, id: &str) -> bool {
        self.entries
            .lock()
            .await
            .insert(id.to_string(), Instant::now())
            .is_none()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.entries.lock().await.contains_key(id)
    }

    /// Drop entries older than `ttl`. Returns how many were removed.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, marked| marked.elapsed() < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Message ID → static file path, remembered from webhook payloads so a
/// later trigger can fetch media the bridge already saved.
#[derive(Default)]
pub struct MediaPathCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MediaPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, message_id: &str, file_path: &str) {
        self.entries.lock().await.insert(
            message_id.to_string(),
            (file_path.to_string(), Instant::now()),
        );
    }

    pub async fn get(&self, message_id: &str) -> Option<String> {
        self.entries
            .lock()
            .await
            .get(message_id)
            .map(|(path, _)| path.clone())
    }

    /// Drop entries older than `ttl`. Returns how many were removed.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, (_, cached)| cached.elapsed() < ttl);
        before - entries.len()
    }
}

/// Per-job set of recipients confirmed delivered.
///
/// Job keys embed an ISO date (`daily_passage_2026-08-30`), so retention
/// can purge by plain string comparison against a cutoff key.
#[derive(Default)]
pub struct SendLedger {
    jobs: Mutex<HashMap<String, HashSet<String>>>,
}

impl SendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful delivery for this job.
    pub async fn confirm(&self, job_key: &str, recipient: &str) {
        self.jobs
            .lock()
            .await
            .entry(job_key.to_string())
            .or_default()
            .insert(recipient.to_string());
    }

    /// Recipients already delivered for this job.
    pub async fn confirmed(&self, job_key: &str) -> HashSet<String> {
        self.jobs
            .lock()
            .await
            .get(job_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove every job whose key sorts before `cutoff_key`.
    /// Returns how many jobs were purged.
    pub async fn purge_before(&self, cutoff_key: &str) -> usize {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|key, _| key.as_str() >= cutoff_key);
        before - jobs.len()
    }
}
