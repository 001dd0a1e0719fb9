mod app;
mod beacon;
mod completions;
mod global;
mod maybe_env;
mod sync;

pub use app::*;
pub use beacon::*;
pub use completions::*;
pub use global::*;
pub use maybe_env::*;
pub use sync::*;
