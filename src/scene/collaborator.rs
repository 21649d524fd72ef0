use async_trait::async_trait;
use crate::error::SceneError;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future type for loads handed off to the control loop
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for scene collaborator operations
pub type SceneResult<T> = Result<T, SceneError>;

/// A fully constructed model that has not been inserted into the scene yet
///
/// The player never looks inside; it only carries the value from the
/// preparer to the swap queue.
pub struct PreparedModel {
    url: String,
    model: Box<dyn Any + Send>,
}

impl PreparedModel {
    pub fn new<T: Any + Send>(url: impl Into<String>, model: T) -> Self {
        Self {
            url: url.into(),
            model: Box::new(model),
        }
    }

    /// URL the model was loaded from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Recover the concrete model, or get the prepared model back on type mismatch
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.model.downcast::<T>() {
            Ok(model) => Ok(*model),
            Err(model) => Err(Self { url: self.url, model }),
        }
    }
}

impl fmt::Debug for PreparedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedModel").field("url", &self.url).finish_non_exhaustive()
    }
}

/// Loads a model and inserts it into the live scene
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_model(&self, url: &str) -> SceneResult<()>;
}

/// Loads and builds a model without inserting it into the scene
#[async_trait]
pub trait ModelPreparer: Send + Sync {
    async fn load_prepared(&self, url: &str) -> SceneResult<PreparedModel>;
}

/// Releases the currently displayed model
pub trait ModelDisposer: Send + Sync {
    fn dispose_current_model(&self);
}

/// Atomically replaces the displayed model with a prepared one
///
/// Implementations insert the new model and dispose the old one as a single
/// observable scene mutation.
pub trait SceneSwap: Send + Sync {
    fn queue_for_swap(&self, prepared: PreparedModel);
}

/// Asks the host to redraw after a frame change
pub trait RenderRequester: Send + Sync {
    fn request_render(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mesh(u32);

    #[test]
    fn test_prepared_model_downcast() {
        let prepared = PreparedModel::new("/seq/frame_0001.glb", Mesh(12));
        assert_eq!(prepared.url(), "/seq/frame_0001.glb");

        // Wrong type hands the model back intact
        let prepared = prepared.downcast::<String>().unwrap_err();
        assert_eq!(prepared.url(), "/seq/frame_0001.glb");
        assert_eq!(prepared.downcast::<Mesh>().unwrap(), Mesh(12));
    }
}
