pub mod history;
pub mod ledger;
pub mod lookup;
pub mod relay;
pub mod writer;

pub use crate::domain::model::{Product, ProductKey, Record};
pub use crate::domain::ports::{ConfigProvider, ListStore, TokenProvider};
pub use crate::utils::error::Result;
