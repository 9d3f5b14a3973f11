pub mod constants;
pub mod entry;
pub mod error;
pub mod types;
pub mod transaction;

pub use constants::*;
pub use entry::*;
pub use error::{ErrorClass, TidemarkError};
pub use types::*;
pub use transaction::*;
