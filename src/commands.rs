mod beacon;
mod command;
mod completions;
mod global_options;
mod sync;

pub use command::*;
