//! Terminal detection and progress rendering

mod context;
mod progress;

pub use context::UiContext;
pub use progress::{ProgressMode, RenderMode, StatusDisplay};
