//! Orphan cleanup: deletes check-ins and notes whose goal no longer exists.
//!
//! Each run examines at most `batch_size` records per collection, looks up the
//! referenced goal for each, and deletes the orphans in one atomic batch.
//! Records that are not reached in a run are left for the next scheduled run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::models::records::{ChildKey, ChildRecord};

pub mod postgres;

pub use postgres::PgChildRecordRepository;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// The child collections the job reconciles, in the order it visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildKind {
    CheckIns,
    Notes,
}

impl ChildKind {
    pub const ALL: [ChildKind; 2] = [ChildKind::CheckIns, ChildKind::Notes];

    pub fn collection(&self) -> &'static str {
        match self {
            ChildKind::CheckIns => "checkIns",
            ChildKind::Notes => "notes",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Storage capabilities the cleanup job needs, independent of the backing store.
#[async_trait]
pub trait ChildRecordRepository: Send + Sync {
    /// Returns up to `limit` records of `kind` across every principal, in store order.
    ///
    /// The scan always starts from the beginning of the collection. A record
    /// past the first `limit` is only reached by a later run once records ahead
    /// of it have been deleted.
    async fn scan_child_records(&self, kind: ChildKind, limit: usize) -> Result<Vec<ChildRecord>>;

    async fn goal_exists(&self, user_id: &str, goal_id: &str) -> Result<bool>;

    /// Deletes all `keys` atomically. Returns the number of records removed.
    async fn delete_child_records(&self, kind: ChildKind, keys: &[ChildKey]) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub kind: ChildKind,
    pub scanned: usize,
    pub skipped: usize,
    pub deleted: usize,
}

/// Sweeps one collection. Any lookup or delete failure aborts the sweep
/// before anything is deleted.
pub async fn cleanup_collection(
    repo: &dyn ChildRecordRepository,
    kind: ChildKind,
    batch_size: usize,
) -> Result<CleanupReport> {
    let records = repo
        .scan_child_records(kind, batch_size)
        .await
        .with_context(|| format!("Failed to scan {kind}"))?;

    let mut skipped = 0;
    let mut staged = Vec::new();

    for record in &records {
        let Some((user_id, goal_id)) = record.goal_ref() else {
            skipped += 1;
            continue;
        };

        let exists = repo
            .goal_exists(user_id, goal_id)
            .await
            .with_context(|| format!("Failed to look up goal {user_id}/{goal_id}"))?;
        if !exists {
            staged.push(record.key());
        }
    }

    let mut deleted = 0;
    if !staged.is_empty() {
        repo.delete_child_records(kind, &staged)
            .await
            .with_context(|| format!("Failed to delete {} orphaned {kind}", staged.len()))?;
        deleted = staged.len();
        info!("Orphan cleanup completed: collection={kind} deleted={deleted}");
    } else {
        debug!("Orphan cleanup found nothing to delete in {kind}");
    }

    Ok(CleanupReport {
        kind,
        scanned: records.len(),
        skipped,
        deleted,
    })
}

/// One full run: check-ins first, then notes. The first error fails the run.
pub async fn run_cleanup(
    repo: &dyn ChildRecordRepository,
    batch_size: usize,
) -> Result<Vec<CleanupReport>> {
    let mut reports = Vec::with_capacity(ChildKind::ALL.len());
    for kind in ChildKind::ALL {
        reports.push(cleanup_collection(repo, kind, batch_size).await?);
    }
    Ok(reports)
}

/// Spawns the periodic cleanup task. The first run happens one `interval`
/// after startup; a failed run is logged and retried on the next tick.
pub fn spawn_cleanup_task(
    repo: Arc<dyn ChildRecordRepository>,
    interval: Duration,
    batch_size: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match run_cleanup(repo.as_ref(), batch_size).await {
                Ok(reports) => {
                    let deleted: usize = reports.iter().map(|r| r.deleted).sum();
                    info!("Orphan cleanup run finished: {deleted} records deleted");
                }
                Err(e) => error!("Error in orphan cleanup run: {e:#}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    /// In-memory repository with per-user collections and failure injection.
    #[derive(Default)]
    struct MemoryRepo {
        goals: Mutex<HashSet<(String, String)>>,
        children: Mutex<HashMap<ChildKind, Vec<ChildRecord>>>,
        fail_lookup_for_goal: Option<String>,
        fail_scan_of: Option<ChildKind>,
        delete_commits: AtomicUsize,
        lookups: AtomicUsize,
    }

    impl MemoryRepo {
        fn add_goal(&self, user_id: &str, goal_id: &str) {
            self.goals
                .lock()
                .unwrap()
                .insert((user_id.to_string(), goal_id.to_string()));
        }

        fn remove_goal(&self, user_id: &str, goal_id: &str) {
            self.goals
                .lock()
                .unwrap()
                .remove(&(user_id.to_string(), goal_id.to_string()));
        }

        fn add_child(&self, kind: ChildKind, id: &str, user_id: Option<&str>, goal_id: Option<&str>) {
            self.children.lock().unwrap().entry(kind).or_default().push(ChildRecord {
                owner_id: user_id.unwrap_or("legacy").to_string(),
                id: id.to_string(),
                goal_id: goal_id.map(String::from),
                user_id: user_id.map(String::from),
                created_at: Utc::now(),
            });
        }

        fn ids(&self, kind: ChildKind) -> Vec<String> {
            self.children
                .lock()
                .unwrap()
                .get(&kind)
                .map(|v| v.iter().map(|c| c.id.clone()).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChildRecordRepository for MemoryRepo {
        async fn scan_child_records(
            &self,
            kind: ChildKind,
            limit: usize,
        ) -> Result<Vec<ChildRecord>> {
            if self.fail_scan_of == Some(kind) {
                anyhow::bail!("scan unavailable");
            }
            Ok(self
                .children
                .lock()
                .unwrap()
                .get(&kind)
                .map(|v| v.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        }

        async fn goal_exists(&self, user_id: &str, goal_id: &str) -> Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_lookup_for_goal.as_deref() == Some(goal_id) {
                anyhow::bail!("lookup timed out");
            }
            Ok(self
                .goals
                .lock()
                .unwrap()
                .contains(&(user_id.to_string(), goal_id.to_string())))
        }

        async fn delete_child_records(&self, kind: ChildKind, keys: &[ChildKey]) -> Result<u64> {
            self.delete_commits.fetch_add(1, Ordering::SeqCst);
            let doomed: HashSet<&ChildKey> = keys.iter().collect();
            let mut children = self.children.lock().unwrap();
            let list = children.entry(kind).or_default();
            let before = list.len();
            list.retain(|c| !doomed.contains(&c.key()));
            Ok((before - list.len()) as u64)
        }
    }

    #[tokio::test]
    async fn test_five_hundred_check_ins_with_three_orphans() {
        let repo = MemoryRepo::default();
        for g in 0..50 {
            repo.add_goal("u1", &format!("g{g}"));
        }
        for i in 0..500 {
            repo.add_child(ChildKind::CheckIns, &format!("c{i}"), Some("u1"), Some(&format!("g{}", i % 50)));
        }
        for orphan in ["c7", "c250", "c499"] {
            let mut children = repo.children.lock().unwrap();
            let record = children
                .get_mut(&ChildKind::CheckIns)
                .unwrap()
                .iter_mut()
                .find(|c| c.id == orphan)
                .unwrap();
            record.goal_id = Some(format!("deleted-{orphan}"));
        }

        let report = cleanup_collection(&repo, ChildKind::CheckIns, 500).await.unwrap();
        assert_eq!(report.scanned, 500);
        assert_eq!(report.deleted, 3);
        let remaining = repo.ids(ChildKind::CheckIns);
        assert_eq!(remaining.len(), 497);
        assert!(!remaining.contains(&"c7".to_string()));
        assert!(!remaining.contains(&"c250".to_string()));
        assert!(!remaining.contains(&"c499".to_string()));

        let again = cleanup_collection(&repo, ChildKind::CheckIns, 500).await.unwrap();
        assert_eq!(again.deleted, 0);
        assert_eq!(repo.ids(ChildKind::CheckIns).len(), 497);
        assert_eq!(repo.delete_commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_records_with_live_goals_survive_any_batch_size() {
        for batch_size in [1, 2, 3, 10] {
            let repo = MemoryRepo::default();
            repo.add_goal("u1", "g1");
            repo.add_goal("u2", "g2");
            repo.add_child(ChildKind::Notes, "n1", Some("u1"), Some("g1"));
            repo.add_child(ChildKind::Notes, "n2", Some("u2"), Some("g2"));
            repo.add_child(ChildKind::Notes, "n3", Some("u1"), Some("g1"));

            let report = cleanup_collection(&repo, ChildKind::Notes, batch_size).await.unwrap();
            assert_eq!(report.deleted, 0);
            assert_eq!(repo.ids(ChildKind::Notes).len(), 3);
        }
    }

    #[tokio::test]
    async fn test_goal_lookup_uses_owner_and_goal_pair() {
        let repo = MemoryRepo::default();
        repo.add_goal("u1", "g1");
        // Same goal id under a different user is not a match.
        repo.add_child(ChildKind::CheckIns, "c1", Some("u2"), Some("g1"));

        let report = cleanup_collection(&repo, ChildKind::CheckIns, 10).await.unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn test_records_missing_references_are_untouched() {
        let repo = MemoryRepo::default();
        repo.add_child(ChildKind::CheckIns, "no-goal", Some("u1"), None);
        repo.add_child(ChildKind::CheckIns, "no-user", None, Some("g1"));
        repo.add_child(ChildKind::CheckIns, "empty-goal", Some("u1"), Some(""));

        let report = cleanup_collection(&repo, ChildKind::CheckIns, 10).await.unwrap();
        assert_eq!(report.skipped, 3);
        assert_eq!(report.deleted, 0);
        assert_eq!(repo.ids(ChildKind::CheckIns).len(), 3);
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(repo.delete_commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_size_bounds_each_run() {
        let repo = MemoryRepo::default();
        for i in 0..5 {
            repo.add_child(ChildKind::Notes, &format!("n{i}"), Some("u1"), Some("gone"));
        }

        let first = cleanup_collection(&repo, ChildKind::Notes, 2).await.unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(first.deleted, 2);
        assert_eq!(repo.ids(ChildKind::Notes).len(), 3);

        cleanup_collection(&repo, ChildKind::Notes, 2).await.unwrap();
        cleanup_collection(&repo, ChildKind::Notes, 2).await.unwrap();
        assert!(repo.ids(ChildKind::Notes).is_empty());
    }

    #[tokio::test]
    async fn test_live_prefix_hides_later_orphans() {
        let repo = MemoryRepo::default();
        repo.add_goal("u1", "g1");
        repo.add_child(ChildKind::CheckIns, "c1", Some("u1"), Some("g1"));
        repo.add_child(ChildKind::CheckIns, "c2", Some("u1"), Some("g1"));
        repo.add_child(ChildKind::CheckIns, "c3", Some("u1"), Some("gone"));

        for _ in 0..3 {
            let report = cleanup_collection(&repo, ChildKind::CheckIns, 2).await.unwrap();
            assert_eq!(report.scanned, 2);
            assert_eq!(report.deleted, 0);
        }
        assert_eq!(repo.ids(ChildKind::CheckIns).len(), 3);

        let wider = cleanup_collection(&repo, ChildKind::CheckIns, 3).await.unwrap();
        assert_eq!(wider.deleted, 1);
        assert_eq!(repo.ids(ChildKind::CheckIns), vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_without_deleting() {
        let repo = MemoryRepo {
            fail_lookup_for_goal: Some("flaky".to_string()),
            ..Default::default()
        };
        repo.add_child(ChildKind::CheckIns, "c1", Some("u1"), Some("gone"));
        repo.add_child(ChildKind::CheckIns, "c2", Some("u1"), Some("flaky"));

        let err = cleanup_collection(&repo, ChildKind::CheckIns, 10).await.unwrap_err();
        assert!(format!("{err:#}").contains("lookup timed out"));
        assert_eq!(repo.ids(ChildKind::CheckIns).len(), 2);
        assert_eq!(repo.delete_commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_visits_check_ins_then_notes() {
        let repo = MemoryRepo::default();
        repo.add_goal("u1", "g1");
        repo.add_child(ChildKind::CheckIns, "c1", Some("u1"), Some("gone"));
        repo.add_child(ChildKind::Notes, "n1", Some("u1"), Some("gone"));
        repo.add_child(ChildKind::Notes, "n2", Some("u1"), Some("g1"));

        let reports = run_cleanup(&repo, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(reports[0].kind, ChildKind::CheckIns);
        assert_eq!(reports[1].kind, ChildKind::Notes);
        assert_eq!(reports[0].deleted, 1);
        assert_eq!(reports[1].deleted, 1);
        assert_eq!(repo.ids(ChildKind::Notes), vec!["n2".to_string()]);
    }

    #[tokio::test]
    async fn test_run_fails_entirely_when_a_collection_fails() {
        let repo = MemoryRepo {
            fail_scan_of: Some(ChildKind::CheckIns),
            ..Default::default()
        };
        repo.add_child(ChildKind::Notes, "n1", Some("u1"), Some("gone"));

        assert!(run_cleanup(&repo, DEFAULT_BATCH_SIZE).await.is_err());
        // Notes were never reached.
        assert_eq!(repo.ids(ChildKind::Notes).len(), 1);
    }

    #[tokio::test]
    async fn test_goal_deleted_between_runs_is_picked_up_next_run() {
        let repo = MemoryRepo::default();
        repo.add_goal("u1", "g1");
        repo.add_child(ChildKind::CheckIns, "c1", Some("u1"), Some("g1"));

        assert_eq!(run_cleanup(&repo, 10).await.unwrap()[0].deleted, 0);
        repo.remove_goal("u1", "g1");
        assert_eq!(run_cleanup(&repo, 10).await.unwrap()[0].deleted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_task_runs_after_each_interval() {
        let repo = Arc::new(MemoryRepo::default());
        repo.add_child(ChildKind::CheckIns, "c1", Some("u1"), Some("gone"));

        let handle = spawn_cleanup_task(repo.clone(), Duration::from_secs(3600), 10);

        tokio::time::sleep(Duration::from_secs(1800)).await;
        assert_eq!(repo.ids(ChildKind::CheckIns).len(), 1);

        tokio::time::sleep(Duration::from_secs(1801)).await;
        assert!(repo.ids(ChildKind::CheckIns).is_empty());

        handle.abort();
    }
}
