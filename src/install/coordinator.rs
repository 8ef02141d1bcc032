//! Install request deduplication
//!
//! [`InstallCoordinator`] makes sure that concurrent requests for the same
//! artifact share a single download. The first caller for a key becomes the
//! leader and runs the executor; everyone else gets a waiter ticket on the
//! same [`InstallHandle`] and observes the leader's result.
//!
//! The in-flight table is split into shards by key hash. A shard lock only
//! covers lookup and insert, never an `.await` or any download work, so
//! unrelated keys never serialize.

use crate::catalog::JdkItem;
use crate::error::InstallError;
use crate::history::HistoryStore;
use crate::install::executor::InstallExecutor;
use crate::install::handle::{InstallHandle, InstallState};
use crate::install::marker::{self, InstallMarker};
use crate::install::RequestKey;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fs;
use std::hash::BuildHasher;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SHARD_COUNT: usize = 16;

type Shard = HashMap<RequestKey, Arc<InstallHandle>>;

/// Sharded map of handles that are in flight or recently completed
struct InflightTable {
    shards: Vec<Mutex<Shard>>,
    hasher: RandomState,
}

impl InflightTable {
    fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn lock(&self, key: &RequestKey) -> MutexGuard<'_, Shard> {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `handle` if it is still the registered one for its key
    fn evict(&self, handle: &Arc<InstallHandle>) {
        let mut shard = self.lock(handle.key());
        if shard
            .get(handle.key())
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            shard.remove(handle.key());
            debug!("Evicted {} from the in-flight table", handle.key());
        }
    }

    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}

/// Whether a ticket owns the install or only observes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketRole {
    Leader,
    Waiter,
}

/// Result of [`InstallCoordinator::acquire`]: a shared handle plus the
/// caller's role for it.
///
/// Dropping a leader ticket whose handle never started fails the handle
/// with [`InstallError::Cancelled`], so waiters are released.
pub struct InstallTicket {
    handle: Arc<InstallHandle>,
    role: TicketRole,
    table: Arc<InflightTable>,
}

impl InstallTicket {
    pub fn handle(&self) -> &Arc<InstallHandle> {
        &self.handle
    }

    pub fn role(&self) -> TicketRole {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == TicketRole::Leader
    }
}

impl Drop for InstallTicket {
    fn drop(&mut self) {
        if self.role == TicketRole::Leader && self.handle.state() == InstallState::Pending {
            self.table.evict(&self.handle);
            if self.handle.abandon() {
                debug!("Leader for {} dropped before running", self.handle.key());
            }
        }
    }
}

impl std::fmt::Debug for InstallTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallTicket")
            .field("role", &self.role)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Fails a Running handle whose leader future is dropped before finishing,
/// so waiters are released and the key can be acquired again.
struct RunningGuard<'a> {
    table: &'a InflightTable,
    handle: &'a Arc<InstallHandle>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if !self.handle.is_terminal() {
            self.table.evict(self.handle);
            if self.handle.finish(Err(InstallError::Cancelled)) {
                warn!("Install of {} was dropped while running", self.handle.key());
            }
        }
    }
}

/// What is found at a requested install location
enum TargetState {
    /// Absent or empty; a fresh install may go there
    Fresh,
    /// Already holds an install of the requested key
    Installed,
}

/// Deduplicates install requests by [`RequestKey`]
pub struct InstallCoordinator {
    table: Arc<InflightTable>,
    history: Arc<dyn HistoryStore>,
}

impl InstallCoordinator {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            table: Arc::new(InflightTable::new()),
            history,
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Number of handles currently registered in the in-flight table
    pub fn in_flight(&self) -> usize {
        self.table.len()
    }

    fn ticket(&self, handle: Arc<InstallHandle>, role: TicketRole) -> InstallTicket {
        InstallTicket {
            handle,
            role,
            table: Arc::clone(&self.table),
        }
    }

    /// Resolve a request for `item` at `target` to a shared handle.
    ///
    /// Valid history short-circuits to a Done handle without any network
    /// access. Otherwise the caller either joins the attempt already in
    /// flight for the key or becomes the leader of a new one.
    pub async fn acquire(
        &self,
        item: &JdkItem,
        target: &Path,
    ) -> Result<InstallTicket, InstallError> {
        let key = &item.key;

        while let Some(dir) = self.history.lookup(key).await {
            if marker::matches_key(&dir, key) {
                debug!("{} found in history at {}", key, dir.display());
                return Ok(self.ticket(InstallHandle::done(item.clone(), dir), TicketRole::Waiter));
            }
            warn!(
                "History entry for {} at {} no longer matches, forgetting it",
                key,
                dir.display()
            );
            if let Err(e) = self.history.forget(key, &dir).await {
                warn!("Failed to forget stale history entry: {}", e);
                break;
            }
        }

        let adopted = {
            let mut shard = self.table.lock(key);

            if let Some(existing) = shard.get(key) {
                match existing.state() {
                    InstallState::Pending | InstallState::Running => {
                        debug!("Joining in-flight install of {}", key);
                        return Ok(self.ticket(Arc::clone(existing), TicketRole::Waiter));
                    }
                    InstallState::Done if marker::matches_key(existing.install_dir(), key) => {
                        return Ok(self.ticket(Arc::clone(existing), TicketRole::Waiter));
                    }
                    _ => {
                        debug!("Evicting stale handle for {}", key);
                        shard.remove(key);
                    }
                }
            }

            match inspect_target(target, key)? {
                TargetState::Fresh => {
                    let handle = InstallHandle::pending(item.clone(), target.to_path_buf());
                    shard.insert(key.clone(), Arc::clone(&handle));
                    debug!("Leading install of {} into {}", key, target.display());
                    return Ok(self.ticket(handle, TicketRole::Leader));
                }
                TargetState::Installed => {
                    let handle = InstallHandle::done(item.clone(), target.to_path_buf());
                    shard.insert(key.clone(), Arc::clone(&handle));
                    handle
                }
            }
        };

        info!("{} is already installed at {}", key, target.display());
        if let Err(e) = self.history.record(key, target).await {
            warn!("Failed to record existing install of {}: {}", key, e);
        }
        Ok(self.ticket(adopted, TicketRole::Waiter))
    }

    /// Drive a ticket to its terminal state.
    ///
    /// A leader whose handle is still Pending runs `executor` exactly once.
    /// Every other ticket waits on the shared handle; `cancel` then only
    /// abandons this caller's wait.
    pub async fn run(
        &self,
        ticket: &InstallTicket,
        executor: &dyn InstallExecutor,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let handle = ticket.handle();

        if !ticket.is_leader() || !handle.begin() {
            return handle.wait(cancel).await.map(|_| ());
        }
        let _running = RunningGuard {
            table: &self.table,
            handle,
        };

        let outcome = match executor.execute(handle.item(), handle.install_dir(), cancel).await {
            Ok(dir) if dir == handle.install_dir() => self.complete(handle),
            Ok(dir) => Err(InstallError::extraction(
                handle.install_dir(),
                format!("executor installed into {} instead", dir.display()),
            )),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = self.history.record(handle.key(), handle.install_dir()).await {
                    warn!("Failed to record install of {}: {}", handle.key(), e);
                }
                handle.finish(Ok(()));
                info!("Installed {} at {}", handle.key(), handle.install_dir().display());
                Ok(())
            }
            Err(e) => {
                self.table.evict(handle);
                warn!("Install of {} failed: {}", handle.key(), e);
                handle.finish(Err(e.clone()));
                Err(e)
            }
        }
    }

    fn complete(&self, handle: &InstallHandle) -> Result<(), InstallError> {
        let marker = InstallMarker::for_item(handle.key().clone(), handle.item());
        marker::write_marker(handle.install_dir(), &marker)
            .map_err(|e| InstallError::extraction(handle.install_dir(), e))
    }
}

/// Classify `target` for an install of `key`
fn inspect_target(target: &Path, key: &RequestKey) -> Result<TargetState, InstallError> {
    match fs::metadata(target) {
        Ok(meta) if !meta.is_dir() => {
            return Err(InstallError::invalid_target(target, "exists and is not a directory"))
        }
        Ok(_) => {
            let mut entries = fs::read_dir(target)
                .map_err(|e| InstallError::invalid_target(target, e.to_string()))?;
            if entries.next().is_some() {
                if marker::matches_key(target, key) {
                    return Ok(TargetState::Installed);
                }
                return Err(InstallError::invalid_target(
                    target,
                    "directory is not empty and belongs to a different artifact",
                ));
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(InstallError::invalid_target(target, e.to_string())),
    }

    let ancestor = closest_existing_ancestor(target);
    let readonly = fs::metadata(&ancestor)
        .map(|m| m.permissions().readonly())
        .unwrap_or(true);
    if readonly {
        return Err(InstallError::invalid_target(
            target,
            format!("{} is not writable", ancestor.display()),
        ));
    }

    Ok(TargetState::Fresh)
}

fn closest_existing_ancestor(target: &Path) -> PathBuf {
    target
        .ancestors()
        .skip(1)
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::item::tests::sample_item;
    use crate::history::FileHistoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::{Barrier, Notify};

    /// Executor that creates the target dir, optionally after a gate opens
    #[derive(Default)]
    struct FakeExecutor {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        fail_with: Option<InstallError>,
    }

    impl FakeExecutor {
        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn failing(error: InstallError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InstallExecutor for FakeExecutor {
        async fn execute(
            &self,
            _item: &JdkItem,
            target: &Path,
            cancel: &CancellationToken,
        ) -> Result<PathBuf, InstallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref gate) = self.gate {
                tokio::select! {
                    _ = gate.notified() => {}
                    _ = cancel.cancelled() => return Err(InstallError::Cancelled),
                }
            }
            if let Some(ref e) = self.fail_with {
                return Err(e.clone());
            }
            fs::create_dir_all(target.join("bin")).unwrap();
            Ok(target.to_path_buf())
        }
    }

    /// Executor that only finishes once two installs run at the same time
    struct BarrierExecutor {
        barrier: Barrier,
    }

    #[async_trait]
    impl InstallExecutor for BarrierExecutor {
        async fn execute(
            &self,
            _item: &JdkItem,
            target: &Path,
            _cancel: &CancellationToken,
        ) -> Result<PathBuf, InstallError> {
            self.barrier.wait().await;
            fs::create_dir_all(target).unwrap();
            Ok(target.to_path_buf())
        }
    }

    struct Fixture {
        dir: TempDir,
        history: Arc<FileHistoryStore>,
        coordinator: Arc<InstallCoordinator>,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let history = Arc::new(
                FileHistoryStore::open(dir.path().join("history.json"))
                    .await
                    .unwrap(),
            );
            let coordinator = Arc::new(InstallCoordinator::new(history.clone()));
            Self {
                dir,
                history,
                coordinator,
            }
        }

        fn target(&self, name: &str) -> PathBuf {
            self.dir.path().join("jdks").join(name)
        }
    }

    fn item(version: &str) -> JdkItem {
        let mut item = sample_item("temurin", version, 17);
        item.java_home_prefix = "Contents/Home".to_string();
        item
    }

    #[tokio::test]
    async fn concurrent_acquires_share_one_execution() {
        let fx = Fixture::new().await;
        let gate = Arc::new(Notify::new());
        let executor = Arc::new(FakeExecutor::gated(gate.clone()));
        let item = item("17.0.2");
        let target = fx.target("t17");

        let mut tickets = Vec::new();
        for _ in 0..8 {
            tickets.push(fx.coordinator.acquire(&item, &target).await.unwrap());
        }
        assert_eq!(tickets.iter().filter(|t| t.is_leader()).count(), 1);
        assert!(tickets
            .iter()
            .all(|t| Arc::ptr_eq(t.handle(), tickets[0].handle())));

        let tasks: Vec<_> = tickets
            .into_iter()
            .map(|ticket| {
                let coordinator = fx.coordinator.clone();
                let executor = executor.clone();
                tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    coordinator.run(&ticket, executor.as_ref(), &cancel).await?;
                    Ok::<_, InstallError>(ticket.handle().java_home().to_path_buf())
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.notify_one();

        for task in tasks {
            assert_eq!(
                task.await.unwrap().unwrap(),
                target.join("Contents/Home")
            );
        }
        assert_eq!(executor.calls(), 1);
        assert!(marker::matches_key(&target, &item.key));
    }

    #[tokio::test]
    async fn distinct_keys_run_simultaneously() {
        let fx = Fixture::new().await;
        let executor = Arc::new(BarrierExecutor {
            barrier: Barrier::new(2),
        });

        let a = fx.coordinator.acquire(&item("17.0.1"), &fx.target("a")).await.unwrap();
        let b = fx.coordinator.acquire(&item("17.0.2"), &fx.target("b")).await.unwrap();
        assert!(a.is_leader() && b.is_leader());

        let cancel = CancellationToken::new();
        let both = async {
            tokio::join!(
                fx.coordinator.run(&a, executor.as_ref(), &cancel),
                fx.coordinator.run(&b, executor.as_ref(), &cancel),
            )
        };
        let (ra, rb) = tokio::time::timeout(Duration::from_secs(5), both)
            .await
            .expect("installs of distinct keys serialized");
        assert!(ra.is_ok() && rb.is_ok());
    }

    #[tokio::test]
    async fn history_hit_skips_executor() {
        let fx = Fixture::new().await;
        let item = item("17.0.2");
        let target = fx.target("t17");
        fs::create_dir_all(&target).unwrap();
        marker::write_marker(&target, &InstallMarker::for_item(item.key.clone(), &item)).unwrap();
        fx.history.record(&item.key, &target).await.unwrap();

        let executor = FakeExecutor::default();
        let ticket = fx
            .coordinator
            .acquire(&item, &fx.target("elsewhere"))
            .await
            .unwrap();

        assert!(!ticket.is_leader());
        assert_eq!(ticket.handle().state(), InstallState::Done);
        assert_eq!(ticket.handle().install_dir(), target);
        fx.coordinator
            .run(&ticket, &executor, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(executor.calls(), 0);
        assert_eq!(fx.coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn stale_history_entry_is_forgotten() {
        let fx = Fixture::new().await;
        let item = item("17.0.2");
        let stale = fx.target("gone");
        fs::create_dir_all(&stale).unwrap();
        fx.history.record(&item.key, &stale).await.unwrap();

        let ticket = fx.coordinator.acquire(&item, &fx.target("t17")).await.unwrap();
        assert!(ticket.is_leader());
        assert!(fx.history.entries().await.is_empty());
    }

    #[tokio::test]
    async fn older_valid_history_entry_survives_stale_newer_one() {
        let fx = Fixture::new().await;
        let item = item("17.0.2");
        let valid = fx.target("valid");
        fs::create_dir_all(&valid).unwrap();
        marker::write_marker(&valid, &InstallMarker::for_item(item.key.clone(), &item)).unwrap();
        let stale = fx.target("stale");
        fs::create_dir_all(&stale).unwrap();
        fx.history.record(&item.key, &valid).await.unwrap();
        fx.history.record(&item.key, &stale).await.unwrap();

        let executor = FakeExecutor::default();
        let ticket = fx.coordinator.acquire(&item, &fx.target("new")).await.unwrap();

        assert!(!ticket.is_leader());
        assert_eq!(ticket.handle().state(), InstallState::Done);
        assert_eq!(ticket.handle().install_dir(), valid);
        fx.coordinator
            .run(&ticket, &executor, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(executor.calls(), 0);
        assert_eq!(fx.coordinator.in_flight(), 0);

        let entries = fx.history.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].install_dir, valid);
    }

    #[tokio::test]
    async fn acquire_after_run_returns_done_without_executing() {
        let fx = Fixture::new().await;
        let executor = FakeExecutor::default();
        let item = item("17.0.2");
        let target = fx.target("t17");

        let first = fx.coordinator.acquire(&item, &target).await.unwrap();
        fx.coordinator
            .run(&first, &executor, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fx.history.lookup(&item.key).await, Some(target.clone()));

        let second = fx.coordinator.acquire(&item, &target).await.unwrap();
        assert!(!second.is_leader());
        assert_eq!(second.handle().state(), InstallState::Done);
        assert_eq!(second.handle().install_dir(), target);
        fx.coordinator
            .run(&second, &executor, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn checksum_failure_evicts_and_allows_retry() {
        let fx = Fixture::new().await;
        let item = item("17.0.2");
        let target = fx.target("t17");
        let failure = InstallError::ChecksumMismatch {
            url: item.url().to_string(),
            expected: item.key.sha256().to_string(),
            actual: "00".repeat(32),
        };
        let executor = FakeExecutor::failing(failure.clone());

        let leader = fx.coordinator.acquire(&item, &target).await.unwrap();
        let waiter = fx.coordinator.acquire(&item, &target).await.unwrap();
        let result = fx
            .coordinator
            .run(&leader, &executor, &CancellationToken::new())
            .await;

        assert_eq!(result, Err(failure.clone()));
        assert_eq!(leader.handle().state(), InstallState::Failed(failure.clone()));
        assert_eq!(
            fx.coordinator
                .run(&waiter, &executor, &CancellationToken::new())
                .await,
            Err(failure)
        );
        assert_eq!(fx.coordinator.in_flight(), 0);
        assert!(fx.history.entries().await.is_empty());

        let retry = fx.coordinator.acquire(&item, &target).await.unwrap();
        assert!(retry.is_leader());
        assert_eq!(retry.handle().state(), InstallState::Pending);
        assert!(!Arc::ptr_eq(retry.handle(), leader.handle()));
    }

    #[tokio::test]
    async fn file_target_is_invalid() {
        let fx = Fixture::new().await;
        let target = fx.target("file");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "x").unwrap();

        let err = fx.coordinator.acquire(&item("17.0.2"), &target).await.unwrap_err();
        assert!(matches!(err, InstallError::InvalidTargetPath { .. }));
        assert_eq!(fx.coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn foreign_directory_is_invalid() {
        let fx = Fixture::new().await;
        let target = fx.target("t17");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("README"), "someone else's").unwrap();

        let err = fx.coordinator.acquire(&item("17.0.2"), &target).await.unwrap_err();
        assert!(matches!(err, InstallError::InvalidTargetPath { .. }));
    }

    #[tokio::test]
    async fn existing_install_is_adopted() {
        let fx = Fixture::new().await;
        let item = item("17.0.2");
        let target = fx.target("t17");
        fs::create_dir_all(&target).unwrap();
        marker::write_marker(&target, &InstallMarker::for_item(item.key.clone(), &item)).unwrap();

        let ticket = fx.coordinator.acquire(&item, &target).await.unwrap();
        assert!(!ticket.is_leader());
        assert_eq!(ticket.handle().state(), InstallState::Done);
        assert_eq!(fx.history.lookup(&item.key).await, Some(target));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_only_parent_is_invalid() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new().await;
        let parent = fx.dir.path().join("locked");
        fs::create_dir(&parent).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

        let err = fx
            .coordinator
            .acquire(&item("17.0.2"), &parent.join("a/b"))
            .await
            .unwrap_err();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(err, InstallError::InvalidTargetPath { .. }));
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_affect_leader() {
        let fx = Fixture::new().await;
        let gate = Arc::new(Notify::new());
        let executor = Arc::new(FakeExecutor::gated(gate.clone()));
        let item = item("17.0.2");
        let target = fx.target("t17");

        let leader = fx.coordinator.acquire(&item, &target).await.unwrap();
        let waiter = fx.coordinator.acquire(&item, &target).await.unwrap();

        let leader_task = {
            let coordinator = fx.coordinator.clone();
            let executor = executor.clone();
            tokio::spawn(async move {
                coordinator
                    .run(&leader, executor.as_ref(), &CancellationToken::new())
                    .await
            })
        };

        let mine = CancellationToken::new();
        mine.cancel();
        assert_eq!(
            fx.coordinator.run(&waiter, executor.as_ref(), &mine).await,
            Err(InstallError::Cancelled)
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.notify_one();
        assert_eq!(leader_task.await.unwrap(), Ok(()));
        assert_eq!(waiter.handle().state(), InstallState::Done);
    }

    #[tokio::test]
    async fn cancelled_leader_fails_everyone() {
        let fx = Fixture::new().await;
        let executor = FakeExecutor::gated(Arc::new(Notify::new()));
        let item = item("17.0.2");
        let target = fx.target("t17");

        let leader = fx.coordinator.acquire(&item, &target).await.unwrap();
        let waiter = fx.coordinator.acquire(&item, &target).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            fx.coordinator.run(&leader, &executor, &cancel).await,
            Err(InstallError::Cancelled)
        );
        assert_eq!(
            waiter.handle().wait(&CancellationToken::new()).await,
            Err(InstallError::Cancelled)
        );
        assert_eq!(fx.coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn dropped_leader_releases_waiters() {
        let fx = Fixture::new().await;
        let item = item("17.0.2");
        let target = fx.target("t17");

        let leader = fx.coordinator.acquire(&item, &target).await.unwrap();
        let waiter = fx.coordinator.acquire(&item, &target).await.unwrap();
        drop(leader);

        assert_eq!(
            waiter.handle().wait(&CancellationToken::new()).await,
            Err(InstallError::Cancelled)
        );
        assert_eq!(fx.coordinator.in_flight(), 0);

        let next = fx.coordinator.acquire(&item, &target).await.unwrap();
        assert!(next.is_leader());
    }

    #[tokio::test]
    async fn dropped_run_releases_waiters_and_key() {
        let fx = Fixture::new().await;
        let executor = FakeExecutor::gated(Arc::new(Notify::new()));
        let item = item("17.0.2");
        let target = fx.target("t17");

        let leader = fx.coordinator.acquire(&item, &target).await.unwrap();
        let waiter = fx.coordinator.acquire(&item, &target).await.unwrap();

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            fx.coordinator.run(&leader, &executor, &CancellationToken::new()),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(executor.calls(), 1);

        let released = tokio::time::timeout(
            Duration::from_secs(5),
            waiter.handle().wait(&CancellationToken::new()),
        )
        .await
        .expect("waiter stuck on a dropped install");
        assert_eq!(released, Err(InstallError::Cancelled));
        assert_eq!(fx.coordinator.in_flight(), 0);
        drop(leader);

        let retry = fx.coordinator.acquire(&item, &target).await.unwrap();
        assert!(retry.is_leader());
        assert_eq!(retry.handle().state(), InstallState::Pending);
    }
}
