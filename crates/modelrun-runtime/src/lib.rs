pub mod app;
pub mod input_binder;
pub mod interpreter;
pub mod loader;
pub mod main_context;
pub mod model;
pub mod output_binder;
pub mod request;
pub mod resolver;
pub mod stats;

pub use app::*;
pub use interpreter::*;
pub use loader::*;
pub use main_context::*;
pub use model::*;
pub use request::*;
pub use stats::*;
