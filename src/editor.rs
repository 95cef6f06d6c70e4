pub mod edit_log;
pub mod reconciler;
pub mod route_index;
pub mod stop_locator;

pub use edit_log::*;
pub use reconciler::*;
pub use route_index::*;
pub use stop_locator::*;
