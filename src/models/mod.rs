pub mod part;
pub mod usage;

pub use part::*;
pub use usage::*;
