pub mod record;
pub mod table;

pub use record::{MODERATE_TOKEN, TokenRecord};
pub use table::{LookupError, TokenTable, TokenTableError};
