mod model_loaders;

pub use model_loaders::{ModelLoaderDeps, load_organisation_middleware, load_task_middleware};
