//! Hybrid progress estimator
//!
//! Blends a client-side time simulation (early phase) with server-pushed
//! progress (late phase) into one monotonic percentage per session.

use std::future::pending;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use shared::ProgressStatus;
use crate::config::ProgressConfig;
use crate::core::progress::{UploadProgressState, simulated_value};
use crate::error::{RealtimeError, RealtimeResult};
use crate::traits::ProgressSource;

type UpdateFn = Box<dyn FnMut(u8) + Send>;
type FinishFn = Box<dyn FnOnce(Option<serde_json::Value>) + Send>;
type ErrorFn = Box<dyn FnOnce(RealtimeError) + Send>;

/// Callbacks for the server phase of a session
pub struct StreamCallbacks {
    on_update: UpdateFn,
    on_finish: FinishFn,
    on_error: ErrorFn,
}

impl Default for StreamCallbacks {
    fn default() -> Self {
        Self {
            on_update: Box::new(|_| {}),
            on_finish: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
        }
    }
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_update(mut self, f: impl FnMut(u8) + Send + 'static) -> Self {
        self.on_update = Box::new(f);
        self
    }

    /// Called once with the metadata of the `finished` event
    pub fn on_finish(mut self, f: impl FnOnce(Option<serde_json::Value>) + Send + 'static) -> Self {
        self.on_finish = Box::new(f);
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(RealtimeError) + Send + 'static) -> Self {
        self.on_error = Box::new(f);
        self
    }
}

/// Cancels a session. Safe to call any number of times.
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    pub fn stop(&self) {
        self.0.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Creates estimation sessions sharing one progress source and configuration
pub struct ProgressEstimator<S: ?Sized> {
    config: ProgressConfig,
    source: Arc<S>,
}

impl<S> ProgressEstimator<S>
where
    S: ProgressSource + ?Sized + 'static,
{
    pub fn new(config: ProgressConfig, source: Arc<S>) -> RealtimeResult<Self> {
        config.validate()?;
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Begin tracking one operation
    pub fn session(&self) -> EstimationSession<S> {
        let (progress, _) = watch::channel(0);
        EstimationSession {
            config: self.config.clone(),
            source: Arc::clone(&self.source),
            state: Arc::new(Mutex::new(UploadProgressState::new(self.config.ceiling))),
            progress: Arc::new(progress),
            server_started: CancellationToken::new(),
            stop: CancellationToken::new(),
        }
    }
}

/// Progress tracking for a single operation
pub struct EstimationSession<S: ?Sized> {
    config: ProgressConfig,
    source: Arc<S>,
    state: Arc<Mutex<UploadProgressState>>,
    progress: Arc<watch::Sender<u8>>,
    server_started: CancellationToken,
    stop: CancellationToken,
}

impl<S> EstimationSession<S>
where
    S: ProgressSource + ?Sized + 'static,
{
    /// Run the simulated phase: rise toward the ceiling over the estimate
    /// scaled by the configured multiplier. Ends with `on_complete` as soon as
    /// the server phase starts. A session runs at most one simulation; while
    /// one is running further calls only return its stop handle.
    pub fn start_estimation<U, C>(&self, estimated: Duration, on_update: U, on_complete: C) -> StopHandle
    where
        U: FnMut(u8) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let already_running = {
            let mut state = lock(&self.state);
            let running = state.is_simulating();
            state.start_simulation();
            running
        };
        if already_running {
            debug!("Simulation already running for this session");
            return self.stop_handle();
        }

        let simulation = Simulation {
            total: self.config.simulation_duration(estimated),
            tick: self.config.tick_interval,
            state: Arc::clone(&self.state),
            progress: Arc::clone(&self.progress),
            server_started: self.server_started.clone(),
            stop: self.stop.clone(),
        };
        debug!("⏱️ Simulating progress over {:?}", simulation.total);
        tokio::spawn(simulation.run(on_update, on_complete));
        self.stop_handle()
    }

    /// Follow the server's progress stream. The first event takes over from
    /// the simulation; `finished` sets 100 and closes the stream. Errors close
    /// the stream and are reported once, without retry.
    pub fn attach_server_stream(&self, url: Url, callbacks: StreamCallbacks) -> JoinHandle<()> {
        let follower = StreamFollower {
            source: Arc::clone(&self.source),
            url,
            timeout: self.config.stream_timeout,
            state: Arc::clone(&self.state),
            progress: Arc::clone(&self.progress),
            server_started: self.server_started.clone(),
            stop: self.stop.clone(),
        };
        tokio::spawn(follower.run(callbacks))
    }

    /// Monotonic view of the displayed percentage
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn displayed(&self) -> u8 {
        lock(&self.state).displayed()
    }

    pub fn server_started(&self) -> bool {
        self.server_started.is_cancelled()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// Abandon the session. Idempotent.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}

fn lock(state: &Mutex<UploadProgressState>) -> MutexGuard<'_, UploadProgressState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Raise the shared display, never lowering it. Returns whether it moved.
fn publish(progress: &watch::Sender<u8>, value: u8) -> bool {
    progress.send_if_modified(|current| {
        if value > *current {
            *current = value;
            true
        } else {
            false
        }
    })
}

struct Simulation {
    total: Duration,
    tick: Duration,
    state: Arc<Mutex<UploadProgressState>>,
    progress: Arc<watch::Sender<u8>>,
    server_started: CancellationToken,
    stop: CancellationToken,
}

impl Simulation {
    async fn run<U, C>(self, mut on_update: U, on_complete: C)
    where
        U: FnMut(u8) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let ceiling = lock(&self.state).ceiling();
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut at_ceiling = false;
        loop {
            tokio::select! {
                biased;
                // A server that finishes at once cancels both; the handoff wins
                _ = self.server_started.cancelled() => {
                    on_complete();
                    break;
                }
                _ = self.stop.cancelled() => break,
                _ = ticker.tick(), if !at_ceiling => {
                    let value = simulated_value(ceiling, started.elapsed(), self.total);
                    let applied = {
                        let mut state = lock(&self.state);
                        state.apply_simulated(value).filter(|v| publish(&self.progress, *v))
                    };
                    if let Some(shown) = applied {
                        on_update(shown);
                    }
                    // Hold at the ceiling until the server takes over
                    at_ceiling = value >= ceiling;
                }
            }
        }

        lock(&self.state).stop_simulation();
    }
}

struct StreamFollower<S: ?Sized> {
    source: Arc<S>,
    url: Url,
    timeout: Option<Duration>,
    state: Arc<Mutex<UploadProgressState>>,
    progress: Arc<watch::Sender<u8>>,
    server_started: CancellationToken,
    stop: CancellationToken,
}

impl<S> StreamFollower<S>
where
    S: ProgressSource + ?Sized + 'static,
{
    async fn run(self, callbacks: StreamCallbacks) {
        let StreamCallbacks { mut on_update, on_finish, on_error } = callbacks;

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        let opened = tokio::select! {
            biased;
            _ = self.stop.cancelled() => return,
            _ = &mut expired => Err(self.timeout_error()),
            opened = self.source.open(&self.url) => opened,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(e) => {
                warn!("Progress stream could not be opened: {}", e);
                self.stop.cancel();
                on_error(e);
                return;
            }
        };

        let failure = loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => return,
                _ = &mut expired => break self.timeout_error(),
                item = events.recv() => match item {
                    None => break RealtimeError::StreamEnded,
                    Some(Err(e)) => break e,
                    Some(Ok(event)) => {
                        if event.status == ProgressStatus::Error {
                            break RealtimeError::ServerError {
                                message: event.message.unwrap_or_else(|| "processing failed".to_string()),
                            };
                        }
                        let finished = event.status == ProgressStatus::Finished;
                        let shown = {
                            let mut state = lock(&self.state);
                            let shown = if finished { state.finish() } else { state.apply_server(event.percentage) };
                            publish(&self.progress, shown);
                            shown
                        };
                        self.server_started.cancel();
                        on_update(shown);

                        if finished {
                            info!("✅ Processing finished");
                            drop(events);
                            self.stop.cancel();
                            on_finish(event.metadata);
                            return;
                        }
                    }
                },
            }
        };

        warn!("Progress stream failed: {}", failure);
        drop(events);
        self.stop.cancel();
        on_error(failure);
    }

    fn timeout_error(&self) -> RealtimeError {
        RealtimeError::StreamTimeout { seconds: self.timeout.map(|t| t.as_secs()).unwrap_or_default() }
    }
}
