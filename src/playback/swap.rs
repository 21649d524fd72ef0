use crate::error::PlayerError;
use crate::scene::{BoxFuture, ModelDisposer, ModelLoader, ModelPreparer, RenderRequester, SceneResult, SceneSwap};
use std::fmt;
use std::sync::Arc;

/// Scene collaborators supplied by the embedding application
///
/// Which fields are present decides the swap strategy, see
/// [`SwapStrategy::from_collaborators`].
#[derive(Clone, Default)]
pub struct Collaborators {
    pub loader: Option<Arc<dyn ModelLoader>>,
    pub preparer: Option<Arc<dyn ModelPreparer>>,
    pub disposer: Option<Arc<dyn ModelDisposer>>,
    pub swap: Option<Arc<dyn SceneSwap>>,
    pub renderer: Option<Arc<dyn RenderRequester>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn preparer(mut self, preparer: Arc<dyn ModelPreparer>) -> Self {
        self.preparer = Some(preparer);
        self
    }

    pub fn disposer(mut self, disposer: Arc<dyn ModelDisposer>) -> Self {
        self.disposer = Some(disposer);
        self
    }

    pub fn swap(mut self, swap: Arc<dyn SceneSwap>) -> Self {
        self.swap = Some(swap);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn RenderRequester>) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

/// How the displayed model is replaced on each tick
pub enum SwapStrategy {
    /// Dispose the current model, then load the next one into the scene.
    /// Leaves a gap with nothing on screen while the load runs.
    Simple {
        loader: Arc<dyn ModelLoader>,
        disposer: Option<Arc<dyn ModelDisposer>>,
    },
    /// Build the next model off-screen and hand it to the scene's atomic
    /// swap once ready. The old model stays visible until then.
    FlickerFree {
        preparer: Arc<dyn ModelPreparer>,
        swap: Arc<dyn SceneSwap>,
    },
}

impl SwapStrategy {
    /// Pick the strategy once, from which collaborators are present
    pub fn from_collaborators(collaborators: &Collaborators) -> Result<Self, PlayerError> {
        if let (Some(preparer), Some(swap)) = (&collaborators.preparer, &collaborators.swap) {
            return Ok(Self::FlickerFree {
                preparer: Arc::clone(preparer),
                swap: Arc::clone(swap),
            });
        }

        let loader = collaborators.loader.clone().ok_or(PlayerError::MissingLoader)?;
        Ok(Self::Simple {
            loader,
            disposer: collaborators.disposer.clone(),
        })
    }

    pub fn is_flicker_free(&self) -> bool {
        matches!(self, Self::FlickerFree { .. })
    }

    /// Start replacing the displayed model with the one at `url`.
    ///
    /// The synchronous part of the swap (disposal in simple mode) happens
    /// before this returns; the returned future carries the load itself.
    pub fn dispatch(&self, url: String) -> BoxFuture<'static, SceneResult<()>> {
        match self {
            Self::Simple { loader, disposer } => {
                if let Some(disposer) = disposer {
                    disposer.dispose_current_model();
                }
                let loader = Arc::clone(loader);
                Box::pin(async move { loader.load_model(&url).await })
            }
            Self::FlickerFree { preparer, swap } => {
                let preparer = Arc::clone(preparer);
                let swap = Arc::clone(swap);
                Box::pin(async move {
                    let prepared = preparer.load_prepared(&url).await?;
                    swap.queue_for_swap(prepared);
                    SceneResult::<()>::Ok(())
                })
            }
        }
    }
}

impl fmt::Debug for SwapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { disposer, .. } => f
                .debug_struct("Simple")
                .field("disposes", &disposer.is_some())
                .finish(),
            Self::FlickerFree { .. } => f.write_str("FlickerFree"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MockScene, SceneCall};

    #[test]
    fn test_strategy_selection() {
        let scene = Arc::new(MockScene::new());

        let simple = Collaborators::new().loader(scene.clone()).disposer(scene.clone());
        assert!(!SwapStrategy::from_collaborators(&simple).unwrap().is_flicker_free());

        let flicker_free = simple.clone().preparer(scene.clone()).swap(scene.clone());
        assert!(SwapStrategy::from_collaborators(&flicker_free).unwrap().is_flicker_free());

        // Half of the prepare/swap pair falls back to the simple strategy
        let half = Collaborators::new().loader(scene.clone()).preparer(scene.clone());
        assert!(!SwapStrategy::from_collaborators(&half).unwrap().is_flicker_free());
    }

    #[test]
    fn test_missing_loader() {
        let scene = Arc::new(MockScene::new());
        let collaborators = Collaborators::new().preparer(scene.clone()).disposer(scene);
        assert_eq!(
            SwapStrategy::from_collaborators(&collaborators).unwrap_err(),
            PlayerError::MissingLoader
        );
    }

    #[tokio::test]
    async fn test_simple_disposes_before_load() {
        let scene = Arc::new(MockScene::new().with_displayed("/old.glb"));
        let collaborators = Collaborators::new().loader(scene.clone()).disposer(scene.clone());
        let strategy = SwapStrategy::from_collaborators(&collaborators).unwrap();

        let load = strategy.dispatch("/new.glb".to_string());
        // Disposal does not wait for the load to be polled
        assert_eq!(scene.calls(), vec![SceneCall::Dispose]);

        load.await.unwrap();
        assert_eq!(
            scene.calls(),
            vec![SceneCall::Dispose, SceneCall::Load("/new.glb".to_string())]
        );
        assert_eq!(
            scene.display_history(),
            vec![None, Some("/new.glb".to_string())]
        );
    }

    #[tokio::test]
    async fn test_flicker_free_failure_skips_swap() {
        let scene = Arc::new(MockScene::new().with_displayed("/old.glb"));
        scene.fail_url("/bad.glb");
        let collaborators = Collaborators::new()
            .disposer(scene.clone())
            .preparer(scene.clone())
            .swap(scene.clone());
        let strategy = SwapStrategy::from_collaborators(&collaborators).unwrap();

        assert!(strategy.dispatch("/bad.glb".to_string()).await.is_err());
        assert_eq!(scene.calls(), vec![SceneCall::Prepare("/bad.glb".to_string())]);
        assert_eq!(scene.displayed().as_deref(), Some("/old.glb"));
    }
}
