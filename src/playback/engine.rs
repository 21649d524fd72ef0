use crate::error::PlayerError;
use crate::playback::overrides::{resolve, OverrideSource};
use crate::playback::swap::{Collaborators, SwapStrategy};
use crate::playback::timer::{self, PendingTick, TickWait};
use crate::playback::{FrameErrorPolicy, PlaybackConfig, PlaybackState, PlayerStatus};
use crate::scene::{BoxFuture, RenderRequester, SceneResult};
use crate::ui::{ControlAction, ControlIds, ControlReflector, ControlRegistry};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Mutable playback state, owned by one player
#[derive(Debug, Default)]
struct PlayerState {
    state: PlaybackState,
    /// Next frame to request
    current_frame: i64,
    /// At most one scheduled tick, only while playing
    pending_tick: Option<PendingTick>,
    /// Bumped on every start; a control loop only acts for its own run
    run: u64,
    started_at: Option<DateTime<Utc>>,
}

impl PlayerState {
    fn is_current(&self, run: u64) -> bool {
        self.state == PlaybackState::Playing && self.run == run
    }

    fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.state,
            current_frame: self.current_frame,
            tick_pending: self.pending_tick.is_some(),
            started_at: self.started_at,
        }
    }
}

/// A frame whose load has been dispatched
struct InFlight {
    frame: i64,
    url: String,
    load: BoxFuture<'static, SceneResult<()>>,
}

/// State shared between the player handle and its control loop
struct Shared {
    config: Mutex<PlaybackConfig>,
    state: Mutex<PlayerState>,
    strategy: SwapStrategy,
    renderer: Option<Arc<dyn RenderRequester>>,
    controls: ControlReflector,
    error_policy: FrameErrorPolicy,
    status_tx: watch::Sender<PlayerStatus>,
}

/// Neither lock is held across an await, so a poisoned guard still holds consistent data
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn config(&self) -> PlaybackConfig {
        lock(&self.config).clone()
    }

    fn publish(&self) {
        let status = lock(&self.state).status();
        self.status_tx.send_replace(status);
    }

    /// Stop playback. With `Some(run)`, only if that run is still the active one.
    fn halt(&self, run: Option<u64>) -> bool {
        let (was_playing, pending) = {
            let mut state = lock(&self.state);
            if run.is_some_and(|run| !state.is_current(run)) {
                return false;
            }
            let was_playing = state.state == PlaybackState::Playing;
            state.state = PlaybackState::Stopped;
            (was_playing, state.pending_tick.take())
        };

        if let Some(tick) = pending {
            tick.cancel();
        }
        self.controls.set_playing_state(false);
        self.publish();

        if was_playing {
            info!("Sequence playback stopped");
        }
        was_playing
    }

    /// Drive ticks for one run, starting from the already dispatched first
    /// frame, until it stops, is cancelled or is superseded
    async fn run_loop(self: Arc<Self>, run: u64, mut in_flight: InFlight) {
        loop {
            let outcome = in_flight.load.await;

            let Some(wait) = self.finish_tick(run, in_flight.frame, &in_flight.url, outcome) else {
                break;
            };
            if !wait.fired().await {
                debug!("Pending tick cancelled");
                break;
            }

            let Some((frame, url)) = self.begin_tick(run) else {
                break;
            };
            in_flight = self.dispatch(frame, url);
        }
        debug!("Control loop for run {} exited", run);
    }

    fn dispatch(&self, frame: i64, url: String) -> InFlight {
        let load = self.strategy.dispatch(url.clone());
        InFlight { frame, url, load }
    }

    /// Entry half of the advance step. Returns the frame and URL to load.
    fn begin_tick(&self, run: u64) -> Option<(i64, String)> {
        let config = self.config();
        let frame = {
            let mut state = lock(&self.state);
            if !state.is_current(run) {
                return None;
            }
            // The tick that got us here has fired
            state.pending_tick = None;
            state.current_frame
        };

        if frame > config.end_frame {
            info!("Reached end of sequence (end frame {})", config.end_frame);
            self.halt(Some(run));
            return None;
        }

        Some((frame, config.frame_url(frame)))
    }

    /// Completion half of the advance step. Advances past `target_frame` and
    /// schedules the next tick if this run is still playing.
    fn finish_tick(
        &self,
        run: u64,
        target_frame: i64,
        url: &str,
        outcome: SceneResult<()>,
    ) -> Option<TickWait> {
        if !lock(&self.state).is_current(run) {
            debug!("Playback stopped while frame {} was loading", target_frame);
            return None;
        }

        if let Err(e) = outcome {
            warn!("Frame {} failed to load from {}: {}", target_frame, url, e);
            if self.error_policy == FrameErrorPolicy::StopPlayback {
                self.halt(Some(run));
                return None;
            }
        }

        let delay = self.config().frame_delay();
        let wait = {
            let mut state = lock(&self.state);
            if !state.is_current(run) {
                debug!("Playback stopped while frame {} was loading", target_frame);
                return None;
            }
            debug_assert!(state.pending_tick.is_none());
            state.current_frame = target_frame + 1;
            let (pending, wait) = timer::schedule(delay);
            state.pending_tick = Some(pending);
            wait
        };

        if let Some(renderer) = &self.renderer {
            renderer.request_render();
        }
        self.publish();
        Some(wait)
    }
}

/// Builder for [`SequencePlayer`]
pub struct SequencePlayerBuilder {
    config: PlaybackConfig,
    collaborators: Collaborators,
    controls: ControlReflector,
    error_policy: FrameErrorPolicy,
    runtime: Option<Handle>,
}

impl SequencePlayerBuilder {
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Merge overrides into the configuration
    pub fn overrides(mut self, source: &dyn OverrideSource) -> Self {
        self.config = resolve(&self.config, source);
        self
    }

    /// Reflect playback state onto the controls named by `ids`
    pub fn controls(mut self, ids: ControlIds, registry: Arc<dyn ControlRegistry>) -> Self {
        self.controls = ControlReflector::new(ids, registry);
        self
    }

    pub fn error_policy(mut self, policy: FrameErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Runtime the control loop is spawned on. Defaults to the runtime
    /// `build` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<SequencePlayer, PlayerError> {
        let strategy = SwapStrategy::from_collaborators(&self.collaborators)?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| PlayerError::NoRuntime)?,
        };
        debug!("Sequence player using {:?} swap", strategy);

        let state = PlayerState {
            current_frame: self.config.start_frame,
            ..Default::default()
        };
        let (status_tx, _) = watch::channel(state.status());

        Ok(SequencePlayer {
            runtime,
            shared: Arc::new(Shared {
                config: Mutex::new(self.config),
                state: Mutex::new(state),
                strategy,
                renderer: self.collaborators.renderer,
                controls: self.controls,
                error_policy: self.error_policy,
                status_tx,
            }),
        })
    }
}

/// Steps through a numbered series of model frames at a fixed rate
///
/// Each tick loads one frame through the swap strategy picked at construction,
/// then schedules the next tick once the load has resolved. Load failures are
/// handled by the [`FrameErrorPolicy`] and never surface to the caller.
///
/// `start` dispatches the first frame before returning and spawns the control
/// loop on the runtime captured at build time, so it can be called from any
/// thread. Dropping the player stops playback.
pub struct SequencePlayer {
    runtime: Handle,
    shared: Arc<Shared>,
}

impl SequencePlayer {
    pub fn builder(config: PlaybackConfig) -> SequencePlayerBuilder {
        SequencePlayerBuilder {
            config,
            collaborators: Collaborators::default(),
            controls: ControlReflector::detached(),
            error_policy: FrameErrorPolicy::default(),
            runtime: None,
        }
    }

    /// Start playback from the configured start frame. No-op if already playing.
    pub fn start(&self) {
        let start_frame = self.shared.config().start_frame;
        let run = {
            let mut state = lock(&self.shared.state);
            if state.state == PlaybackState::Playing {
                debug!("Ignoring start, already playing");
                return;
            }
            state.state = PlaybackState::Playing;
            state.current_frame = start_frame;
            state.run += 1;
            state.started_at = Some(Utc::now());
            state.run
        };

        info!("Sequence playback started at frame {}", start_frame);
        self.shared.controls.set_playing_state(true);
        self.shared.publish();

        // First advance step runs now; an empty range stops here
        let Some((frame, url)) = self.shared.begin_tick(run) else {
            return;
        };
        let first = self.shared.dispatch(frame, url);
        self.runtime.spawn(Arc::clone(&self.shared).run_loop(run, first));
    }

    /// Stop playback and cancel the pending tick. Safe to call when stopped.
    ///
    /// A load already in flight is left to finish; its result is discarded.
    pub fn stop(&self) {
        self.shared.halt(None);
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.shared.state).state == PlaybackState::Playing
    }

    /// Next frame the player will request
    pub fn current_frame(&self) -> i64 {
        lock(&self.shared.state).current_frame
    }

    pub fn status(&self) -> PlayerStatus {
        lock(&self.shared.state).status()
    }

    pub fn is_flicker_free(&self) -> bool {
        self.shared.strategy.is_flicker_free()
    }

    /// Snapshot of the live configuration
    pub fn config(&self) -> PlaybackConfig {
        self.shared.config()
    }

    /// Edit the live configuration. Ticks read it fresh, so edits apply to the
    /// running sequence; `start_frame` takes effect on the next start.
    pub fn update_config(&self, edit: impl FnOnce(&mut PlaybackConfig)) {
        let mut config = lock(&self.shared.config);
        edit(&mut *config);
    }

    pub fn set_config(&self, config: PlaybackConfig) {
        *lock(&self.shared.config) = config;
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<PlayerStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Wait until playback is stopped
    pub async fn wait_stopped(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|status| !status.is_playing()).await;
    }

    /// Route a control action to the player. Returns false for actions the
    /// player does not own.
    pub fn handle_control(&self, action: ControlAction) -> bool {
        match action {
            ControlAction::Play => self.start(),
            ControlAction::Stop => self.stop(),
            ControlAction::Next => return false,
        }
        true
    }
}

impl Drop for SequencePlayer {
    fn drop(&mut self) {
        self.shared.halt(None);
    }
}
