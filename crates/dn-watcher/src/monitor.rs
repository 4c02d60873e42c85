//! The monitor lifecycle state machine and its blocking event loop.
//!
//! [`Monitor`] ties the pieces together: it snapshots the [`WatchConfig`] at
//! `start`/`restart`, subscribes through an [`EventSource`], and runs a
//! blocking loop on a dedicated thread that coalesces raw change
//! notifications into batched [`ChangeHandler::on_change`] callbacks.
//!
//! # Lifecycle
//!
//! ```text
//! state     start()                  stop()                   restart()
//! -------   ----------------------   ----------------------   -------------------
//! Idle      -> Running (subscribe)   no-op                    stop skipped, -> Running
//! Running   no-op                    -> Stopped (release)     -> Stopped -> Running
//! Stopped   -> Running (subscribe)   no-op                    stop skipped, -> Running
//! ```
//!
//! Configuration edits made through [`watch`](Monitor::watch) or
//! [`set_latency`](Monitor::set_latency) while the monitor is running are
//! safe but only take effect at the next (re)start; `restart` is the
//! sanctioned way to apply them while monitoring is active.
//!
//! # The occupying loop
//!
//! One thread per monitor blocks in the event loop; it is the only place
//! `on_change` is invoked, and invocations are strictly sequential. The loop
//! wakes for raw change notifications, for the coalescing-window deadline,
//! and for control messages (an exit intent from `stop`, or a signal to be
//! routed through the [`SignalRegistry`]). Signals with no registered
//! handler, and handlers returning [`SignalFlow::Shutdown`], exit the loop.
//!
//! # Examples
//!
//! ```no_run
//! use dn_watcher::Monitor;
//! use camino::Utf8PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut monitor = Monitor::new(|dirs: &[Utf8PathBuf]| {
//!     tracing::info!(?dirs, "detected change");
//! });
//!
//! monitor.set_latency(0.2)?;
//! monitor.watch(vec!["/tmp".to_owned()]);
//! monitor.start().await?;
//!
//! // ... later, apply a configuration change:
//! monitor.watch("/var/log");
//! monitor.restart().await?;
//!
//! monitor.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use crossbeam_channel::{Receiver, Sender, at, never, unbounded};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use dn_core::{ConfigError, DirectorySpec, SignalFlow, SignalRegistry, WatchConfig};

use crate::dispatch::CallbackDispatcher;
use crate::error::WatchError;
use crate::events::PendingChangeSet;
use crate::handler::ChangeHandler;
use crate::source::{EventSource, NotifySource, Subscription, changed_directory};

/// Lifecycle states of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    /// Constructed, never started.
    Idle,
    /// The occupying loop is live and a native subscription is registered.
    Running,
    /// The loop has exited (or been told to); re-enterable via `start`.
    Stopped,
}

/// State shared between the monitor handle and the occupying loop.
struct Shared {
    state: Mutex<MonitorState>,
    last_error: Mutex<Option<WatchError>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(MonitorState::Idle),
            last_error: Mutex::new(None),
        }
    }

    fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    fn set_state(&self, state: MonitorState) {
        *self.state.lock() = state;
    }

    fn record_error(&self, err: WatchError) {
        *self.last_error.lock() = Some(err);
    }

    fn take_error(&self) -> Option<WatchError> {
        self.last_error.lock().take()
    }
}

/// Messages from the monitor handle (and signal forwarders) to the loop.
#[derive(Debug, Clone, Copy)]
enum Control {
    /// Exit intent from `stop` or drop.
    Stop,
    /// A signal to route through the registry at the loop's safe point.
    Signal(i32),
}

/// Why the occupying loop exited.
#[derive(Debug)]
enum LoopExit {
    /// `stop` (or drop) asked the loop to exit.
    Requested,
    /// The native subscription went away.
    Detached,
    /// A signal shut the loop down.
    Signal(i32),
    /// The change handler returned an error.
    Failed,
}

/// A directory monitor delivering batched change callbacks.
///
/// See the [module documentation](self) for the lifecycle contract.
pub struct Monitor<H: ChangeHandler> {
    /// Source of truth for directories and latency, snapshotted at (re)start.
    config: WatchConfig,

    /// The caller's handler; locked for the duration of each dispatch so
    /// there is exactly one in-flight `on_change` per monitor.
    handler: Arc<Mutex<H>>,

    /// Registry consulted by the loop when a signal arrives.
    signals: Arc<SignalRegistry>,

    /// Native event source; kept across restarts.
    source: Arc<dyn EventSource>,

    /// State and loop-error slot shared with the occupying loop.
    shared: Arc<Shared>,

    /// Active native subscription. Dropping it deregisters the watch.
    subscription: Option<Box<dyn Subscription>>,

    /// Control channel into the loop. `None` unless started.
    control_tx: Option<Sender<Control>>,

    /// Handle to the occupying loop task.
    loop_task: Option<JoinHandle<()>>,

    /// OS signal forwarder tasks, aborted on stop.
    signal_tasks: Vec<JoinHandle<()>>,
}

impl<H: ChangeHandler> std::fmt::Debug for Monitor<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

impl<H: ChangeHandler> Monitor<H> {
    /// Creates an idle monitor around the given handler.
    ///
    /// Uses the platform event source ([`NotifySource`]) and the
    /// process-wide [`SignalRegistry`]; see [`with_source`](Self::with_source)
    /// and [`with_signals`](Self::with_signals) to substitute either.
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self {
            config: WatchConfig::default(),
            handler: Arc::new(Mutex::new(handler)),
            signals: SignalRegistry::global(),
            source: Arc::new(NotifySource),
            shared: Arc::new(Shared::new()),
            subscription: None,
            control_tx: None,
            loop_task: None,
            signal_tasks: Vec::new(),
        }
    }

    /// Creates a monitor from an existing configuration.
    #[must_use]
    pub fn with_config(handler: H, config: WatchConfig) -> Self {
        let mut monitor = Self::new(handler);
        monitor.config = config;
        monitor
    }

    /// Replaces the native event source (for tests or alternative backends).
    #[must_use]
    pub fn with_source(mut self, source: impl EventSource) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Replaces the signal registry with an isolated instance.
    #[must_use]
    pub fn with_signals(mut self, signals: Arc<SignalRegistry>) -> Self {
        self.signals = signals;
        self
    }

    /// Sets the directories to watch; callable in any lifecycle state.
    ///
    /// Returns the normalized directory list (or `None` when cleared).
    /// Takes effect at the next `start`/`restart`.
    pub fn watch(&mut self, spec: impl Into<DirectorySpec>) -> Option<&[Utf8PathBuf]> {
        self.config.set_directories(spec)
    }

    /// Sets the directories from a loosely-typed value.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError::InvalidDirectories`] for values that are
    /// not a string, an array of strings, or null.
    pub fn watch_value(&mut self, value: &Value) -> Result<Option<&[Utf8PathBuf]>, ConfigError> {
        self.config.set_directories_value(value)
    }

    /// Sets the coalescing latency in seconds; callable in any state.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError::NegativeLatency`] for negative values.
    pub fn set_latency(&mut self, latency: f64) -> Result<(), ConfigError> {
        self.config.set_latency(latency)
    }

    /// Returns the configured directories, or `None` when unset.
    #[inline]
    #[must_use]
    pub fn directories(&self) -> Option<&[Utf8PathBuf]> {
        self.config.directories()
    }

    /// Returns the configured latency in seconds.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.config.latency()
    }

    /// Returns the current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Returns the configuration for direct mutation.
    #[inline]
    pub fn config_mut(&mut self) -> &mut WatchConfig {
        &mut self.config
    }

    /// Returns `true` while the occupying loop is live.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state() == MonitorState::Running
    }

    /// Starts monitoring; a no-op when already running.
    ///
    /// Snapshots the configuration, registers the native subscription, and
    /// spawns the occupying loop on a blocking thread. The monitor only
    /// transitions to running once the subscription succeeded; a failed
    /// `start` leaves the state machine untouched.
    ///
    /// # Errors
    ///
    /// Fails with [`WatchError::NoDirectories`] when no directories were
    /// configured (an empty-but-set list is allowed), or with the
    /// subscription errors from the event source.
    #[allow(clippy::unused_async)] // Async for API consistency with stop()
    pub async fn start(&mut self) -> Result<(), WatchError> {
        if self.is_running() {
            debug!("start called while running; ignoring");
            return Ok(());
        }

        let directories: Vec<Utf8PathBuf> = self
            .config
            .directories()
            .ok_or(WatchError::NoDirectories)?
            .to_vec();
        let latency = self.config.latency_duration();

        let (event_tx, event_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();

        let subscription = self.source.subscribe(&directories, latency, event_tx)?;
        self.subscription = Some(subscription);
        self.shared.set_state(MonitorState::Running);
        self.handler.lock().on_start(&directories);

        self.signal_tasks = spawn_signal_forwarders(&control_tx);
        self.control_tx = Some(control_tx);

        let handler = Arc::clone(&self.handler);
        let signals = Arc::clone(&self.signals);
        let shared = Arc::clone(&self.shared);
        self.loop_task = Some(tokio::task::spawn_blocking(move || {
            run_event_loop(&event_rx, &control_rx, latency, &handler, &signals, &shared);
        }));

        info!(
            directories = directories.len(),
            latency_ms = latency.as_millis(),
            "monitor started"
        );
        Ok(())
    }

    /// Stops monitoring; a no-op when not running.
    ///
    /// Deregisters the native subscription, signals the loop to exit, and
    /// waits for it to finish. A dispatch already in flight completes; no
    /// further coalescing window opens. Safe to call from any context other
    /// than `on_change` itself, and safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Surfaces an error the loop recorded while this call was stopping it.
    pub async fn stop(&mut self) -> Result<(), WatchError> {
        let was_running = self.is_running();
        if was_running {
            self.shared.set_state(MonitorState::Stopped);
        }

        // Release the native subscription and make the exit intent visible;
        // the loop drains whatever it was doing and finishes.
        self.subscription = None;
        if let Some(tx) = self.control_tx.take() {
            let _ = tx.send(Control::Stop);
        }
        for task in self.signal_tasks.drain(..) {
            task.abort();
        }
        if let Some(task) = self.loop_task.take() {
            if task.await.is_err() {
                warn!("monitor loop task panicked");
            }
        }

        if was_running {
            info!("monitor stopped");
            if let Some(err) = self.shared.take_error() {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Stops (when running) and starts again, applying configuration edits
    /// made since the last `start`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`stop`](Self::stop) and
    /// [`start`](Self::start).
    pub async fn restart(&mut self) -> Result<(), WatchError> {
        self.stop().await?;
        self.start().await
    }

    /// Injects a signal into the running loop's control channel.
    ///
    /// The loop consults the [`SignalRegistry`] at its next safe point,
    /// exactly as for a signal delivered by the OS. Returns `false` when the
    /// monitor is not running.
    pub fn deliver_signal(&self, signal: i32) -> bool {
        self.control_tx
            .as_ref()
            .is_some_and(|tx| tx.send(Control::Signal(signal)).is_ok())
    }

    /// Takes the error recorded by a loop that exited on its own (for
    /// example a failed dispatch).
    #[must_use]
    pub fn last_error(&self) -> Option<WatchError> {
        self.shared.take_error()
    }
}

impl<H: ChangeHandler> Drop for Monitor<H> {
    fn drop(&mut self) {
        // Make the exit intent visible; Drop is sync so the loop is not
        // awaited, it winds down once it sees the message.
        self.subscription = None;
        if let Some(tx) = self.control_tx.take() {
            let _ = tx.send(Control::Stop);
        }
        for task in self.signal_tasks.drain(..) {
            task.abort();
        }
    }
}

/// Runs the occupying event loop on its blocking thread.
///
/// Wakes for raw events (folded into the pending set), the coalescing
/// deadline (dispatch), and control messages (exit intent or signal). The
/// window deadline is fixed at `latency` after the first event of the
/// window.
fn run_event_loop<H: ChangeHandler>(
    events: &Receiver<Utf8PathBuf>,
    control: &Receiver<Control>,
    latency: Duration,
    handler: &Arc<Mutex<H>>,
    signals: &Arc<SignalRegistry>,
    shared: &Arc<Shared>,
) {
    let mut pending = PendingChangeSet::new();
    let mut dispatcher = CallbackDispatcher::new();

    let exit = loop {
        let deadline = match pending.opened_at() {
            Some(opened) => at(opened + latency),
            None => never(),
        };

        crossbeam_channel::select! {
            recv(events) -> message => match message {
                Ok(path) => {
                    pending.record(changed_directory(path));
                }
                // The subscription was released out from under us.
                Err(_) => break LoopExit::Detached,
            },
            recv(control) -> message => match message {
                Ok(Control::Signal(signal)) => match signals.handle(signal) {
                    Ok(Some(SignalFlow::Continue)) => {
                        debug!(signal, "signal handled; continuing");
                    }
                    Ok(Some(SignalFlow::Shutdown)) => {
                        info!(signal, "signal handler requested shutdown");
                        break LoopExit::Signal(signal);
                    }
                    Ok(None) => {
                        info!(signal, "no handler for signal; shutting down");
                        break LoopExit::Signal(signal);
                    }
                    Err(err) => {
                        warn!(signal, %err, "unknown signal; shutting down");
                        break LoopExit::Signal(signal);
                    }
                },
                Ok(Control::Stop) | Err(_) => break LoopExit::Requested,
            },
            recv(deadline) -> _ => {
                let mut handler = handler.lock();
                if let Err(err) = dispatcher.dispatch(&mut pending, &mut *handler) {
                    error!(%err, "change handler failed; stopping monitor");
                    shared.record_error(err);
                    break LoopExit::Failed;
                }
            },
        }
    };

    // A detach that nobody requested means the native watcher died under a
    // running monitor.
    if matches!(exit, LoopExit::Detached) && shared.state() == MonitorState::Running {
        shared.record_error(WatchError::ChannelClosed);
    }

    shared.set_state(MonitorState::Stopped);
    handler.lock().on_stop();
    debug!(?exit, batches = dispatcher.dispatched(), "monitor loop exited");
}

/// Forwards SIGINT and SIGTERM into the loop's control channel so handler
/// dispatch happens synchronously inside the loop instead of in an async
/// signal context.
#[cfg(unix)]
fn spawn_signal_forwarders(control: &Sender<Control>) -> Vec<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut tasks = Vec::new();
    for (kind, number) in [(SignalKind::interrupt(), 2), (SignalKind::terminate(), 15)] {
        match signal(kind) {
            Ok(mut stream) => {
                let tx = control.clone();
                tasks.push(tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        if tx.send(Control::Signal(number)).is_err() {
                            break;
                        }
                    }
                }));
            }
            Err(error) => warn!(%error, number, "could not install signal forwarder"),
        }
    }
    tasks
}

#[cfg(not(unix))]
fn spawn_signal_forwarders(_control: &Sender<Control>) -> Vec<JoinHandle<()>> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::time::sleep;

    /// Deterministic in-memory event source: records the directories of
    /// every subscription and exposes the event sender so tests can inject
    /// raw changes.
    #[derive(Clone, Default)]
    struct ScriptedSource {
        subscribed: Arc<Mutex<Vec<Vec<Utf8PathBuf>>>>,
        taps: Arc<Mutex<Vec<Sender<Utf8PathBuf>>>>,
        active: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn tap(&self) -> Sender<Utf8PathBuf> {
            self.taps.lock().last().expect("a subscription exists").clone()
        }

        fn active(&self) -> usize {
            self.active.load(Ordering::SeqCst)
        }

        fn last_directories(&self) -> Vec<Utf8PathBuf> {
            self.subscribed.lock().last().expect("a subscription exists").clone()
        }
    }

    struct ScriptedSubscription {
        active: Arc<AtomicUsize>,
    }

    impl Subscription for ScriptedSubscription {}

    impl Drop for ScriptedSubscription {
        fn drop(&mut self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl EventSource for ScriptedSource {
        fn subscribe(
            &self,
            directories: &[Utf8PathBuf],
            _latency: Duration,
            events: Sender<Utf8PathBuf>,
        ) -> Result<Box<dyn Subscription>, WatchError> {
            self.subscribed.lock().push(directories.to_vec());
            self.taps.lock().push(events);
            self.active.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSubscription {
                active: Arc::clone(&self.active),
            }))
        }
    }

    /// Handler that records every batch it receives.
    #[derive(Clone, Default)]
    struct Collector {
        batches: Arc<Mutex<Vec<Vec<Utf8PathBuf>>>>,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    impl Collector {
        fn batches(&self) -> Vec<Vec<Utf8PathBuf>> {
            self.batches.lock().clone()
        }
    }

    impl ChangeHandler for Collector {
        fn on_change(&mut self, directories: &[Utf8PathBuf]) -> Result<(), HandlerError> {
            self.batches.lock().push(directories.to_vec());
            Ok(())
        }

        fn on_start(&mut self, _directories: &[Utf8PathBuf]) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stop(&mut self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Handler whose first dispatch fails.
    struct Failing;

    impl ChangeHandler for Failing {
        fn on_change(&mut self, _directories: &[Utf8PathBuf]) -> Result<(), HandlerError> {
            Err("boom".into())
        }
    }

    fn scripted_monitor<H: ChangeHandler>(handler: H) -> (Monitor<H>, ScriptedSource) {
        let source = ScriptedSource::default();
        let monitor = Monitor::new(handler)
            .with_source(source.clone())
            .with_signals(Arc::new(SignalRegistry::new()));
        (monitor, source)
    }

    async fn wait_until_stopped<H: ChangeHandler>(monitor: &Monitor<H>) {
        for _ in 0..100 {
            if !monitor.is_running() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("monitor did not stop in time");
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (mut monitor, _source) = scripted_monitor(Collector::default());
        monitor.watch("/watched");
        monitor.set_latency(0.05).expect("valid latency");

        assert!(!monitor.is_running());
        monitor.start().await.expect("start succeeds");
        assert!(monitor.is_running());
        monitor.stop().await.expect("stop succeeds");
        assert!(!monitor.is_running());
        monitor.start().await.expect("start again succeeds");
        assert!(monitor.is_running());
        monitor.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn test_start_without_directories_fails_and_keeps_state() {
        let (mut monitor, source) = scripted_monitor(Collector::default());
        let err = monitor.start().await.unwrap_err();
        assert!(matches!(err, WatchError::NoDirectories));
        assert!(!monitor.is_running());
        assert_eq!(source.active(), 0);

        // An empty-but-set list is allowed.
        monitor.watch(Vec::<Utf8PathBuf>::new());
        monitor.start().await.expect("empty list is valid");
        assert!(monitor.is_running());
        assert_eq!(source.last_directories(), Vec::<Utf8PathBuf>::new());
        monitor.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (mut monitor, source) = scripted_monitor(Collector::default());
        monitor.watch("/watched");
        monitor.start().await.expect("start succeeds");
        monitor.start().await.expect("second start is a no-op");
        assert_eq!(source.active(), 1);
        monitor.stop().await.expect("stop succeeds");
        assert_eq!(source.active(), 0);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_a_noop() {
        let (mut monitor, _source) = scripted_monitor(Collector::default());
        monitor.stop().await.expect("idle stop is fine");
        monitor.stop().await.expect("repeated stop is fine");
    }

    #[tokio::test]
    async fn test_events_coalesce_into_one_ordered_batch() {
        let handler = Collector::default();
        let (mut monitor, source) = scripted_monitor(handler.clone());
        monitor.watch("/watched");
        monitor.set_latency(0.05).expect("valid latency");
        monitor.start().await.expect("start succeeds");

        let tap = source.tap();
        tap.send(Utf8PathBuf::from("/watched/two/b.txt")).expect("loop alive");
        tap.send(Utf8PathBuf::from("/watched/one/a.txt")).expect("loop alive");
        tap.send(Utf8PathBuf::from("/watched/two/c.txt")).expect("loop alive");

        sleep(Duration::from_millis(300)).await;
        monitor.stop().await.expect("stop succeeds");

        let batches = handler.batches();
        assert_eq!(batches.len(), 1, "one window, one callback");
        assert_eq!(
            batches[0],
            [
                Utf8PathBuf::from("/watched/two"),
                Utf8PathBuf::from("/watched/one"),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_dispatch_while_stopped_and_one_after_restart() {
        let handler = Collector::default();
        let (mut monitor, source) = scripted_monitor(handler.clone());
        monitor.watch("/watched");
        monitor.set_latency(0.05).expect("valid latency");

        monitor.start().await.expect("start succeeds");
        let first_tap = source.tap();
        monitor.stop().await.expect("stop succeeds");

        // Raw events after stop go nowhere.
        let _ = first_tap.send(Utf8PathBuf::from("/watched/x/f.txt"));
        sleep(Duration::from_millis(150)).await;
        assert!(handler.batches().is_empty());

        monitor.start().await.expect("start again succeeds");
        source
            .tap()
            .send(Utf8PathBuf::from("/watched/x/f.txt"))
            .expect("loop alive");
        sleep(Duration::from_millis(300)).await;
        monitor.stop().await.expect("stop succeeds");

        assert_eq!(handler.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_applies_configuration_edits() {
        let (mut monitor, source) = scripted_monitor(Collector::default());
        monitor.watch("/before");
        monitor.start().await.expect("start succeeds");
        assert_eq!(source.last_directories(), [Utf8PathBuf::from("/before")]);

        // Edits while running do not retroactively alter the subscription.
        monitor.watch("/after");
        assert_eq!(source.last_directories(), [Utf8PathBuf::from("/before")]);

        monitor.restart().await.expect("restart succeeds");
        assert_eq!(source.last_directories(), [Utf8PathBuf::from("/after")]);
        assert_eq!(source.active(), 1);
        monitor.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn test_restart_when_idle_skips_stop() {
        let (mut monitor, source) = scripted_monitor(Collector::default());
        monitor.watch("/watched");
        monitor.restart().await.expect("restart from idle succeeds");
        assert!(monitor.is_running());
        assert_eq!(source.active(), 1);
        monitor.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn test_unhandled_signal_stops_the_loop() {
        let (mut monitor, _source) = scripted_monitor(Collector::default());
        monitor.watch("/watched");
        monitor.start().await.expect("start succeeds");

        assert!(monitor.deliver_signal(15));
        wait_until_stopped(&monitor).await;
        monitor.stop().await.expect("reap is fine");
    }

    #[tokio::test]
    async fn test_signal_handler_decides_continue_or_shutdown() {
        let signals = Arc::new(SignalRegistry::new());
        signals
            .trap("INT", || SignalFlow::Continue)
            .expect("valid signal");
        signals
            .trap("TERM", || SignalFlow::Shutdown)
            .expect("valid signal");

        let source = ScriptedSource::default();
        let mut monitor = Monitor::new(Collector::default())
            .with_source(source.clone())
            .with_signals(Arc::clone(&signals));
        monitor.watch("/watched");
        monitor.start().await.expect("start succeeds");

        assert!(monitor.deliver_signal(2));
        sleep(Duration::from_millis(100)).await;
        assert!(monitor.is_running(), "Continue keeps the loop alive");

        assert!(monitor.deliver_signal(15));
        wait_until_stopped(&monitor).await;
        monitor.stop().await.expect("reap is fine");
    }

    #[tokio::test]
    async fn test_handler_error_stops_and_is_recorded() {
        let (mut monitor, source) = scripted_monitor(Failing);
        monitor.watch("/watched");
        monitor.set_latency(0.02).expect("valid latency");
        monitor.start().await.expect("start succeeds");

        source
            .tap()
            .send(Utf8PathBuf::from("/watched/f.txt"))
            .expect("loop alive");
        wait_until_stopped(&monitor).await;

        let err = monitor.last_error().expect("loop recorded the failure");
        assert!(matches!(err, WatchError::Handler(_)));
        monitor.stop().await.expect("reap is fine");
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_fire() {
        let handler = Collector::default();
        let (mut monitor, _source) = scripted_monitor(handler.clone());
        monitor.watch("/watched");

        monitor.start().await.expect("start succeeds");
        monitor.stop().await.expect("stop succeeds");

        assert_eq!(handler.started.load(Ordering::SeqCst), 1);
        assert_eq!(handler.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_round_trips_through_the_monitor() {
        let (mut monitor, _source) = scripted_monitor(Collector::default());

        let dirs = monitor.watch("/tmp").expect("set");
        assert_eq!(dirs, [Utf8PathBuf::from("/tmp")]);

        assert!(monitor.watch(DirectorySpec::Unset).is_none());
        assert!(monitor.directories().is_none());

        let err = monitor.watch_value(&serde_json::json!(42)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDirectories));
    }

    /// End-to-end through the real platform watcher. Timing-dependent, so
    /// the assertion tolerates a missed event but verifies the payload when
    /// one arrives.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_real_filesystem_change_dispatches_directory() {
        let temp_dir = TempDir::new().expect("temp directory");
        let path = camino::Utf8Path::from_path(temp_dir.path())
            .expect("temp path is UTF-8")
            .to_path_buf();

        let handler = Collector::default();
        let mut monitor = Monitor::new(handler.clone())
            .with_signals(Arc::new(SignalRegistry::new()));
        monitor.watch(path.clone());
        monitor.set_latency(0.1).expect("valid latency");
        monitor.start().await.expect("start succeeds");

        fs::write(temp_dir.path().join("probe.txt"), b"hello").expect("write probe");
        sleep(Duration::from_millis(600)).await;
        monitor.stop().await.expect("stop succeeds");

        let canonical = path.canonicalize_utf8().expect("canonicalizable");
        for batch in handler.batches() {
            assert!(
                batch.iter().all(|dir| dir.starts_with(&canonical)),
                "batch {batch:?} outside {canonical}"
            );
        }
    }
}
