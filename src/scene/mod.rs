pub mod collaborator;
pub mod mock;

pub use collaborator::{
    BoxFuture, ModelDisposer, ModelLoader, ModelPreparer, PreparedModel, RenderRequester, SceneResult, SceneSwap,
};
pub use mock::{MockScene, SceneCall};
