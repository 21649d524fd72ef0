use async_trait::async_trait;
use crate::error::SceneError;
use crate::scene::collaborator::{
    ModelDisposer, ModelLoader, ModelPreparer, PreparedModel, RenderRequester, SceneResult, SceneSwap,
};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// A call made against the mock scene, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCall {
    Dispose,
    Load(String),
    Prepare(String),
    Swap(String),
    Render,
}

/// Model handed out by [`MockScene`] when preparing
#[derive(Debug, Clone, PartialEq)]
pub struct MockModel {
    pub url: String,
}

/// Mock scene for running a player without a renderer
///
/// Implements every collaborator trait, records each call, and tracks which
/// model is on screen so tests can check for blank frames.
pub struct MockScene {
    latency: Duration,
    calls: Mutex<Vec<SceneCall>>,
    displayed: Mutex<Option<String>>,
    history: Mutex<Vec<Option<String>>>,
    failing: Mutex<HashSet<String>>,
}

impl Default for MockScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScene {
    /// Create an empty scene with instant loads
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            displayed: Mutex::new(None),
            history: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Simulated load latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Start with a model already on screen
    pub fn with_displayed(self, url: &str) -> Self {
        *lock(&self.displayed) = Some(url.to_string());
        self
    }

    /// Make loads of this URL fail with `NotFound`
    pub fn fail_url(&self, url: &str) {
        lock(&self.failing).insert(url.to_string());
    }

    /// All calls recorded so far
    pub fn calls(&self) -> Vec<SceneCall> {
        lock(&self.calls).clone()
    }

    /// URLs requested through load or prepare, in order
    pub fn requested_urls(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                SceneCall::Load(url) | SceneCall::Prepare(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Model currently on screen
    pub fn displayed(&self) -> Option<String> {
        lock(&self.displayed).clone()
    }

    /// Every value the displayed model has taken, oldest first
    pub fn display_history(&self) -> Vec<Option<String>> {
        lock(&self.history).clone()
    }

    fn record(&self, call: SceneCall) {
        debug!("Mock scene call: {:?}", call);
        lock(&self.calls).push(call);
    }

    fn set_displayed(&self, model: Option<String>) {
        *lock(&self.displayed) = model.clone();
        lock(&self.history).push(model);
    }

    async fn fetch(&self, url: &str) -> SceneResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if lock(&self.failing).contains(url) {
            return Err(SceneError::NotFound(url.to_string()));
        }
        Ok(())
    }
}

/// Mock state is plain data, so a poisoned lock is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ModelLoader for MockScene {
    async fn load_model(&self, url: &str) -> SceneResult<()> {
        self.record(SceneCall::Load(url.to_string()));
        self.fetch(url).await?;
        self.set_displayed(Some(url.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ModelPreparer for MockScene {
    async fn load_prepared(&self, url: &str) -> SceneResult<PreparedModel> {
        self.record(SceneCall::Prepare(url.to_string()));
        self.fetch(url).await?;
        Ok(PreparedModel::new(url, MockModel { url: url.to_string() }))
    }
}

impl ModelDisposer for MockScene {
    fn dispose_current_model(&self) {
        self.record(SceneCall::Dispose);
        self.set_displayed(None);
    }
}

impl SceneSwap for MockScene {
    fn queue_for_swap(&self, prepared: PreparedModel) {
        self.record(SceneCall::Swap(prepared.url().to_string()));
        let url = match prepared.downcast::<MockModel>() {
            Ok(model) => model.url,
            Err(other) => other.url().to_string(),
        };
        // Insert and dispose in one step
        self.set_displayed(Some(url));
    }
}

impl RenderRequester for MockScene {
    fn request_render(&self) {
        self.record(SceneCall::Render);
    }
}
