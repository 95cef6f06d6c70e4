pub mod edit_entry;
pub mod stop;

pub use edit_entry::*;
pub use stop::*;
