//! HTTP handlers

mod account;
mod health;
mod transfer;

pub use account::{__path_create_account, __path_get_account, create_account, get_account};
pub use health::{__path_health_check, health_check};
pub use transfer::{__path_create_transaction, create_transaction};
