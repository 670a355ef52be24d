mod constants;
mod types;

pub use constants::*;
pub use types::*;
