use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tracing::debug;

/// Delay before a fresh toast transitions to its shown state.
pub const SHOW_TRANSITION: Duration = Duration::from_millis(100);
/// Delay between the dismiss transition starting and the toast being removed.
pub const DISMISS_TRANSITION: Duration = Duration::from_millis(300);
/// Default on-screen time.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);
/// Errors stay up longer.
pub const ERROR_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Shown,
    Dismissing,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub duration: Duration,
}

/// Receives toast lifecycle events; the presentation layer draws and removes
/// the visual element from these.
pub trait NotificationSink: Send + Sync {
    fn phase_changed(&self, notification: &Notification, phase: Phase);
    fn removed(&self, notification: &Notification);
}

#[derive(Debug, Default)]
pub struct SilentSink;

impl NotificationSink for SilentSink {
    fn phase_changed(&self, _notification: &Notification, _phase: Phase) {}
    fn removed(&self, _notification: &Notification) {}
}

/// Transient toast notifier. Each notification is independently timed:
/// created, shown after 100ms, dismissing after its duration, removed 300ms
/// later. Any number may be live at once.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    next_id: AtomicU64,
    phases: Arc<Mutex<HashMap<u64, Phase>>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Arc::new(SilentSink))
    }
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            next_id: AtomicU64::new(1),
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn notify(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> u64 {
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: title.into(),
            message: message.into(),
            severity,
            duration,
        };
        let id = notification.id;
        debug!(id, severity = severity.label(), "toast created");

        self.set_phase(&notification, Phase::Created);

        let sink = self.sink.clone();
        let phases = self.phases.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHOW_TRANSITION).await;
            phases
                .lock()
                .expect("phase lock should not be poisoned")
                .insert(id, Phase::Shown);
            sink.phase_changed(&notification, Phase::Shown);

            tokio::time::sleep(notification.duration).await;
            phases
                .lock()
                .expect("phase lock should not be poisoned")
                .insert(id, Phase::Dismissing);
            sink.phase_changed(&notification, Phase::Dismissing);

            tokio::time::sleep(DISMISS_TRANSITION).await;
            phases
                .lock()
                .expect("phase lock should not be poisoned")
                .remove(&id);
            sink.removed(&notification);
        });

        id
    }

    pub fn notify_error(&self, title: impl Into<String>, message: impl Into<String>) -> u64 {
        self.notify(title, message, Severity::Error, ERROR_DURATION)
    }

    /// Current phase of a live toast; `None` once removed.
    pub fn phase(&self, id: u64) -> Option<Phase> {
        self.phases
            .lock()
            .expect("phase lock should not be poisoned")
            .get(&id)
            .copied()
    }

    pub fn live_count(&self) -> usize {
        self.phases
            .lock()
            .expect("phase lock should not be poisoned")
            .len()
    }

    fn set_phase(&self, notification: &Notification, phase: Phase) {
        self.phases
            .lock()
            .expect("phase lock should not be poisoned")
            .insert(notification.id, phase);
        self.sink.phase_changed(notification, phase);
    }
}
