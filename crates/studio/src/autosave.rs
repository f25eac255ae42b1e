// Debounced autosave.
//
// Rapid edits coalesce into one pending save. Every edit re-arms the quiet
// period; when it elapses only the latest content is written. A save that is
// already running is never cancelled.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default quiet period.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 500;
/// Minimum allowed quiet period.
const MIN_QUIET_PERIOD_MS: u64 = 50;
/// Maximum allowed quiet period.
const MAX_QUIET_PERIOD_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub quiet_period: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { quiet_period: Duration::from_millis(DEFAULT_QUIET_PERIOD_MS) }
    }
}

impl AutosaveConfig {
    /// Create a config with the given quiet period, clamped to [50, 10000] ms.
    pub fn with_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_QUIET_PERIOD_MS, MAX_QUIET_PERIOD_MS);
        Self { quiet_period: Duration::from_millis(clamped) }
    }
}

/// Coalescing policy over explicit instants: at most one pending deadline.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    config: AutosaveConfig,
    deadline: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(config: AutosaveConfig) -> Self {
        Self { config, deadline: None }
    }

    /// Record an edit now.
    pub fn schedule(&mut self) {
        self.schedule_at(Instant::now());
    }

    /// Record an edit at `now`, replacing any pending deadline.
    pub fn schedule_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.config.quiet_period);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn fire_ready(&mut self) -> bool {
        self.fire_ready_at(Instant::now())
    }

    /// True once per edit burst, when the quiet period has elapsed by `now`.
    pub fn fire_ready_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

enum Command {
    Edit(String),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running autosave task.
///
/// Dropping the handle closes the channel; the task then saves any pending
/// content and exits.
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Replace the pending content and re-arm the quiet period. Returns false
    /// if the task has stopped.
    pub fn edit(&self, content: impl Into<String>) -> bool {
        self.tx.send(Command::Edit(content.into())).is_ok()
    }

    /// Save pending content now and wait for it.
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.await.is_ok()
    }

    /// Save pending content and wait for the task to exit.
    pub async fn shutdown(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(error) = task.await {
            warn!(error = %error, "autosave task ended abnormally");
        }
    }
}

/// Spawn the autosave task on the current tokio runtime.
///
/// `save` runs on the blocking pool, one call at a time in edit order, with
/// the latest content only. Failures are logged and the next edit tries
/// again.
pub fn spawn_autosave<F, E>(config: AutosaveConfig, save: F) -> AutosaveHandle
where
    F: FnMut(&str) -> Result<(), E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(autosave_loop(config, rx, save));
    AutosaveHandle { tx, task }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn autosave_loop<F, E>(
    config: AutosaveConfig,
    mut rx: mpsc::UnboundedReceiver<Command>,
    mut save: F,
) where
    F: FnMut(&str) -> Result<(), E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let mut scheduler = AutosaveScheduler::new(config);
    let mut latest: Option<String> = None;

    loop {
        let wake = scheduler.deadline().map(tokio::time::Instant::from_std);

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Edit(content)) => {
                    latest = Some(content);
                    scheduler.schedule_at(now());
                }
                Some(Command::Flush(done)) => {
                    scheduler.cancel();
                    let Some(next) = persist(latest.take(), save).await else { break };
                    save = next;
                    let _ = done.send(());
                }
                None => {
                    let _ = persist(latest.take(), save).await;
                    debug!("autosave channel closed, exiting");
                    break;
                }
            },

            _ = tokio::time::sleep_until(wake.unwrap_or_else(tokio::time::Instant::now)), if wake.is_some() => {
                if scheduler.fire_ready_at(now()) {
                    let Some(next) = persist(latest.take(), save).await else { break };
                    save = next;
                }
            }
        }
    }
}

/// Run one save off the async workers and hand `save` back. `None` means
/// the save panicked and the task must stop.
async fn persist<F, E>(content: Option<String>, mut save: F) -> Option<F>
where
    F: FnMut(&str) -> Result<(), E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let Some(content) = content else {
        return Some(save);
    };
    let bytes = content.len();
    let worker = tokio::task::spawn_blocking(move || {
        let result = save(&content);
        (save, result)
    });
    match worker.await {
        Ok((save, Ok(()))) => {
            debug!(bytes, "autosaved");
            Some(save)
        }
        Ok((save, Err(error))) => {
            warn!(error = %error, "autosave failed");
            Some(save)
        }
        Err(error) => {
            warn!(error = %error, "autosave worker panicked, stopping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    // ── AutosaveConfig ─────────────────────────────────────────────

    #[test]
    fn default_config_is_500ms() {
        assert_eq!(AutosaveConfig::default().quiet_period, Duration::from_millis(500));
    }

    #[test]
    fn config_clamps_to_range() {
        assert_eq!(AutosaveConfig::with_millis(10).quiet_period, Duration::from_millis(50));
        assert_eq!(AutosaveConfig::with_millis(60_000).quiet_period, Duration::from_millis(10_000));
        assert_eq!(AutosaveConfig::with_millis(750).quiet_period, Duration::from_millis(750));
    }

    // ── AutosaveScheduler ──────────────────────────────────────────

    #[test]
    fn not_ready_before_quiet_period() {
        let mut scheduler = AutosaveScheduler::new(AutosaveConfig::default());
        let now = Instant::now();

        scheduler.schedule_at(now);

        assert!(!scheduler.fire_ready_at(now + Duration::from_millis(499)));
        assert!(scheduler.is_pending());
        assert!(scheduler.fire_ready_at(now + Duration::from_millis(500)));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn each_edit_resets_the_deadline() {
        let mut scheduler = AutosaveScheduler::new(AutosaveConfig::default());
        let now = Instant::now();

        scheduler.schedule_at(now);
        scheduler.schedule_at(now + Duration::from_millis(300));

        assert_eq!(scheduler.deadline(), Some(now + Duration::from_millis(800)));
        assert!(!scheduler.fire_ready_at(now + Duration::from_millis(600)));
        assert!(scheduler.fire_ready_at(now + Duration::from_millis(800)));
    }

    #[test]
    fn fires_once_per_burst() {
        let mut scheduler = AutosaveScheduler::new(AutosaveConfig::default());
        let now = Instant::now();

        scheduler.schedule_at(now);

        assert!(scheduler.fire_ready_at(now + Duration::from_secs(1)));
        assert!(!scheduler.fire_ready_at(now + Duration::from_secs(2)));
    }

    #[test]
    fn cancel_clears_pending() {
        let mut scheduler = AutosaveScheduler::new(AutosaveConfig::default());
        scheduler.schedule();
        scheduler.cancel();

        assert!(scheduler.deadline().is_none());
        assert!(!scheduler.fire_ready());
    }

    // ── Autosave task ──────────────────────────────────────────────

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) -> Result<(), String> + Send) {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        let save = move |content: &str| {
            sink.lock().unwrap().push(content.to_string());
            Ok(())
        };
        (saved, save)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_to_latest() {
        let (saved, save) = recorder();
        let handle = spawn_autosave(AutosaveConfig::default(), save);

        handle.edit("a");
        tokio::time::sleep(ms(100)).await;
        handle.edit("ab");
        tokio::time::sleep(ms(100)).await;
        handle.edit("abc");

        tokio::time::sleep(ms(499)).await;
        assert!(saved.lock().unwrap().is_empty());

        tokio::time::sleep(ms(2)).await;
        assert_eq!(*saved.lock().unwrap(), vec!["abc".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_save_separately() {
        let (saved, save) = recorder();
        let handle = spawn_autosave(AutosaveConfig::with_millis(100), save);

        handle.edit("one");
        tokio::time::sleep(ms(150)).await;
        handle.edit("two");
        tokio::time::sleep(ms(150)).await;

        assert_eq!(*saved.lock().unwrap(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_immediately_and_disarms() {
        let (saved, save) = recorder();
        let handle = spawn_autosave(AutosaveConfig::default(), save);

        handle.edit("draft");
        assert!(handle.flush().await);
        assert_eq!(*saved.lock().unwrap(), vec!["draft".to_string()]);

        tokio::time::sleep(ms(1_000)).await;
        assert_eq!(saved.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_without_edits_saves_nothing() {
        let (saved, save) = recorder();
        let handle = spawn_autosave(AutosaveConfig::default(), save);

        assert!(handle.flush().await);
        assert!(saved.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_saves_pending_content() {
        let (saved, save) = recorder();
        let handle = spawn_autosave(AutosaveConfig::default(), save);

        handle.edit("last words");
        handle.shutdown().await;

        assert_eq!(*saved.lock().unwrap(), vec!["last words".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_saves_pending_content() {
        let (saved, save) = recorder();
        let handle = spawn_autosave(AutosaveConfig::default(), save);

        handle.edit("unsaved");
        drop(handle);
        tokio::time::sleep(ms(1)).await;

        assert_eq!(*saved.lock().unwrap(), vec!["unsaved".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_logged_and_later_edits_still_save() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let sink = attempts.clone();
        let handle = spawn_autosave(AutosaveConfig::with_millis(100), move |content: &str| {
            sink.lock().unwrap().push(content.to_string());
            if content == "bad" {
                Err("disk full")
            } else {
                Ok(())
            }
        });

        handle.edit("bad");
        tokio::time::sleep(ms(150)).await;
        handle.edit("good");
        handle.shutdown().await;

        assert_eq!(*attempts.lock().unwrap(), vec!["bad".to_string(), "good".to_string()]);
    }

    #[tokio::test]
    async fn slow_saves_do_not_stall_the_runtime() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel();
        let mut started_tx = Some(started_tx);
        let handle = spawn_autosave(AutosaveConfig::default(), move |_: &str| {
            if let Some(started) = started_tx.take() {
                let _ = started.send(());
            }
            release_rx.recv().map_err(|error| error.to_string())
        });

        handle.edit("draft");
        let flushed = tokio::spawn(async move { handle.flush().await });

        // Only reachable while the save is parked off this single-threaded runtime.
        started_rx.await.unwrap();
        release_tx.send(()).unwrap();
        assert!(flushed.await.unwrap());
    }
}
