// Data models

mod shortcut;
mod snapshot;

pub use shortcut::*;
pub use snapshot::*;
