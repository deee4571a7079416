use crate::domain::filter::Filter;
use crate::domain::model::{ListName, Record};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Remote tabular store holding the three lists.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Every item of `list` matching `filter`. A missing list or an empty
    /// match is an empty vector, never an error.
    async fn query(&self, list: ListName, filter: &Filter) -> Result<Vec<Record>>;

    /// Durable write of one item; returns the item as the store created it.
    async fn insert(&self, list: ListName, record: Record) -> Result<Record>;
}

/// Source of the short-lived request digest required for writes.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn request_digest(&self) -> Result<String>;

    /// Drops any cached digest so the next write fetches a fresh one.
    fn invalidate(&self) {}
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Box<T> {
    async fn request_digest(&self) -> Result<String> {
        (**self).request_digest().await
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }
}

pub trait ConfigProvider: Send + Sync {
    fn site_url(&self) -> &str;
    fn list_title(&self, list: ListName) -> &str;
    /// `__metadata.type` override for inserts into `list`.
    fn entity_type(&self, _list: ListName) -> Option<&str> {
        None
    }
    fn headers(&self) -> &HashMap<String, String>;
    fn timeout(&self) -> Option<Duration>;
}
