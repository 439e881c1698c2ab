use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use planmark_shared::Annotation;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::SyncResult;

/// Quiet period after the last change before the list is saved.
pub const SAVE_QUIET_PERIOD: Duration = Duration::from_millis(1000);

/// Who is editing which floor plan. Without both there is nothing to sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncTarget {
    pub user_id: String,
    pub floor_plan_id: String,
}

impl SyncTarget {
    pub fn new(user_id: Option<&str>, floor_plan_id: Option<&str>) -> Option<Self> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty())?;
        let floor_plan_id = floor_plan_id.map(str::trim).filter(|id| !id.is_empty())?;
        Some(Self {
            user_id: user_id.to_string(),
            floor_plan_id: floor_plan_id.to_string(),
        })
    }
}

/// Durable home of a floor plan's annotation list. `save` replaces the
/// whole stored list.
#[async_trait]
pub trait AnnotationBackend: Send + Sync {
    async fn load(&self, target: &SyncTarget) -> SyncResult<Vec<Annotation>>;
    async fn save(&self, target: &SyncTarget, annotations: &[Annotation]) -> SyncResult<()>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// The stored list; the viewer replaces its model with it.
    Loaded(Vec<Annotation>),
    LoadFailed(String),
    Saved { count: usize },
    SaveFailed(String),
}

#[derive(Debug)]
enum Command {
    Changed {
        epoch: u64,
        annotations: Vec<Annotation>,
    },
    Shutdown {
        flush: bool,
    },
}

/// Handle to the background task that loads once and then saves the
/// annotation list after each burst of changes.
///
/// Changes carry the number of `Loaded` events the sender had applied when
/// it made them; changes made against a list that a load has since replaced
/// are dropped.
#[derive(Debug)]
pub struct SyncHandle {
    target: SyncTarget,
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        backend: Arc<dyn AnnotationBackend>,
        target: SyncTarget,
        quiet_period: Duration,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_sync(
            backend,
            target.clone(),
            quiet_period,
            command_rx,
            event_tx,
        ));
        Self {
            target,
            commands: command_tx,
            events: event_rx,
            task,
        }
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    pub fn annotations_changed(&self, epoch: u64, annotations: Vec<Annotation>) {
        let command = Command::Changed { epoch, annotations };
        if self.commands.send(command).is_err() {
            tracing::debug!(floor_plan = %self.target.floor_plan_id, "synchronizer already stopped");
        }
    }

    pub fn try_next_event(&mut self) -> Option<SyncEvent> {
        self.events.try_recv().ok()
    }

    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Stops the task, saving a pending change first when `flush` is set.
    pub async fn shutdown(self, flush: bool) {
        let _ = self.commands.send(Command::Shutdown { flush });
        if let Err(err) = self.task.await {
            tracing::warn!(%err, "synchronizer task ended abnormally");
        }
    }
}

/// Starts synchronizing when both identities are known and a tokio runtime
/// is available; otherwise annotations stay local to the session.
pub fn connect(
    backend: Arc<dyn AnnotationBackend>,
    user_id: Option<&str>,
    floor_plan_id: Option<&str>,
    quiet_period: Duration,
) -> Option<SyncHandle> {
    let Some(target) = SyncTarget::new(user_id, floor_plan_id) else {
        tracing::debug!("no user or floor plan id; annotations stay local");
        return None;
    };
    if tokio::runtime::Handle::try_current().is_err() {
        tracing::warn!(floor_plan = %target.floor_plan_id, "no async runtime; annotations stay local");
        return None;
    }
    Some(SyncHandle::spawn(backend, target, quiet_period))
}

async fn run_sync(
    backend: Arc<dyn AnnotationBackend>,
    target: SyncTarget,
    quiet_period: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    let mut epoch = 0u64;
    match backend.load(&target).await {
        Ok(annotations) => {
            tracing::debug!(
                floor_plan = %target.floor_plan_id,
                count = annotations.len(),
                "loaded annotations"
            );
            epoch += 1;
            let _ = events.send(SyncEvent::Loaded(annotations));
        }
        Err(err) => {
            tracing::warn!(floor_plan = %target.floor_plan_id, %err, "failed to load annotations");
            let _ = events.send(SyncEvent::LoadFailed(err.to_string()));
        }
    }

    let mut pending: Option<Vec<Annotation>> = None;
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Changed { epoch: seen, annotations }) => {
                    if seen < epoch {
                        tracing::debug!(
                            floor_plan = %target.floor_plan_id,
                            "dropping change made before the stored list arrived"
                        );
                        continue;
                    }
                    if annotations.is_empty() {
                        // An empty list is never saved, and it supersedes any pending save.
                        pending = None;
                        deadline = None;
                    } else {
                        pending = Some(annotations);
                        deadline = Some(Instant::now() + quiet_period);
                    }
                }
                Some(Command::Shutdown { flush }) => {
                    if let Some(annotations) = pending.take().filter(|_| flush) {
                        save_now(backend.as_ref(), &target, annotations, &events).await;
                    }
                    break;
                }
                None => {
                    if pending.is_some() {
                        tracing::debug!(
                            floor_plan = %target.floor_plan_id,
                            "handle dropped; pending save abandoned"
                        );
                    }
                    break;
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Some(annotations) = pending.take() {
                    save_now(backend.as_ref(), &target, annotations, &events).await;
                }
            }
        }
    }
}

async fn save_now(
    backend: &dyn AnnotationBackend,
    target: &SyncTarget,
    annotations: Vec<Annotation>,
    events: &mpsc::UnboundedSender<SyncEvent>,
) {
    let count = annotations.len();
    match backend.save(target, &annotations).await {
        Ok(()) => {
            tracing::debug!(floor_plan = %target.floor_plan_id, count, "saved annotations");
            let _ = events.send(SyncEvent::Saved { count });
        }
        Err(err) => {
            tracing::warn!(floor_plan = %target.floor_plan_id, %err, "failed to save annotations");
            let _ = events.send(SyncEvent::SaveFailed(err.to_string()));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use planmark_shared::{AnnotationKind, Point};

    use super::*;
    use crate::error::SyncError;

    /// In-memory backend that records every save and when it happened.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub stored: Vec<Annotation>,
        pub load_delay: Duration,
        pub fail_load: bool,
        pub fail_save: bool,
        pub saves: Mutex<Vec<(Instant, Vec<Annotation>)>>,
    }

    impl RecordingBackend {
        pub(crate) fn saves(&self) -> Vec<(Instant, Vec<Annotation>)> {
            self.saves.lock().expect("saves lock").clone()
        }
    }

    #[async_trait]
    impl AnnotationBackend for RecordingBackend {
        async fn load(&self, _target: &SyncTarget) -> SyncResult<Vec<Annotation>> {
            tokio::time::sleep(self.load_delay).await;
            if self.fail_load {
                return Err(SyncError::Rejected("offline".to_string()));
            }
            Ok(self.stored.clone())
        }

        async fn save(&self, _target: &SyncTarget, annotations: &[Annotation]) -> SyncResult<()> {
            self.saves
                .lock()
                .expect("saves lock")
                .push((Instant::now(), annotations.to_vec()));
            if self.fail_save {
                return Err(SyncError::Rejected("disk full".to_string()));
            }
            Ok(())
        }
    }

    pub(crate) fn marker(x: f64) -> Annotation {
        Annotation::point(AnnotationKind::Marker, Point::new(x, 0.0), "#8B0000")
    }

    fn target() -> SyncTarget {
        SyncTarget::new(Some("user-1"), Some("plan-1")).expect("target")
    }

    async fn spawn_loaded(backend: Arc<RecordingBackend>) -> SyncHandle {
        let mut handle = SyncHandle::spawn(backend, target(), SAVE_QUIET_PERIOD);
        assert!(matches!(handle.next_event().await, Some(SyncEvent::Loaded(_))));
        handle
    }

    #[test]
    fn target_requires_both_ids() {
        assert!(SyncTarget::new(None, Some("plan")).is_none());
        assert!(SyncTarget::new(Some("user"), None).is_none());
        assert!(SyncTarget::new(Some("  "), Some("plan")).is_none());
        assert_eq!(
            SyncTarget::new(Some(" user "), Some("plan")),
            Some(SyncTarget {
                user_id: "user".to_string(),
                floor_plan_id: "plan".to_string(),
            })
        );
    }

    #[test]
    fn connect_without_identity_stays_local() {
        let backend = Arc::new(RecordingBackend::default());
        assert!(connect(backend, None, Some("plan-1"), SAVE_QUIET_PERIOD).is_none());
    }

    #[test]
    fn connect_outside_runtime_stays_local() {
        let backend = Arc::new(RecordingBackend::default());
        assert!(connect(backend, Some("u"), Some("plan-1"), SAVE_QUIET_PERIOD).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_is_saved_once_after_quiet_period() {
        let backend = Arc::new(RecordingBackend::default());
        let mut handle = spawn_loaded(backend.clone()).await;

        handle.annotations_changed(1, vec![marker(1.0)]);
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.annotations_changed(1, vec![marker(1.0), marker(2.0)]);
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.annotations_changed(1, vec![marker(1.0), marker(2.0), marker(3.0)]);
        let last_change = Instant::now();

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(backend.saves().is_empty());

        assert_eq!(handle.next_event().await, Some(SyncEvent::Saved { count: 3 }));
        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0 - last_change, SAVE_QUIET_PERIOD);
        assert_eq!(saves[0].1.len(), 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_is_never_saved_and_cancels_pending_save() {
        let backend = Arc::new(RecordingBackend::default());
        let handle = spawn_loaded(backend.clone()).await;

        handle.annotations_changed(1, vec![marker(1.0)]);
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.annotations_changed(1, Vec::new());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(backend.saves().is_empty());

        handle.shutdown(true).await;
        assert!(backend.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn changes_made_before_load_completes_are_dropped() {
        let backend = Arc::new(RecordingBackend {
            stored: vec![marker(10.0), marker(20.0)],
            load_delay: Duration::from_millis(500),
            ..RecordingBackend::default()
        });
        let mut handle = SyncHandle::spawn(backend.clone(), target(), SAVE_QUIET_PERIOD);
        handle.annotations_changed(0, vec![marker(99.0)]);

        assert_eq!(
            handle.next_event().await,
            Some(SyncEvent::Loaded(vec![marker(10.0), marker(20.0)]))
        );
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(backend.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_keeps_local_changes_flowing() {
        let backend = Arc::new(RecordingBackend {
            fail_load: true,
            ..RecordingBackend::default()
        });
        let mut handle = SyncHandle::spawn(backend.clone(), target(), SAVE_QUIET_PERIOD);
        assert!(matches!(handle.next_event().await, Some(SyncEvent::LoadFailed(_))));

        handle.annotations_changed(0, vec![marker(1.0)]);
        assert_eq!(handle.next_event().await, Some(SyncEvent::Saved { count: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_reported_without_retry() {
        let backend = Arc::new(RecordingBackend {
            fail_save: true,
            ..RecordingBackend::default()
        });
        let mut handle = spawn_loaded(backend.clone()).await;

        handle.annotations_changed(1, vec![marker(1.0)]);
        assert!(matches!(handle.next_event().await, Some(SyncEvent::SaveFailed(_))));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_change() {
        let backend = Arc::new(RecordingBackend::default());
        let handle = spawn_loaded(backend.clone()).await;

        handle.annotations_changed(1, vec![marker(1.0), marker(2.0)]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown(true).await;

        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_without_flush_abandons_pending_change() {
        let backend = Arc::new(RecordingBackend::default());
        let handle = spawn_loaded(backend.clone()).await;

        handle.annotations_changed(1, vec![marker(1.0)]);
        handle.shutdown(false).await;
        assert!(backend.saves().is_empty());
    }
}
