use crate::domain::filter::Filter;
use crate::domain::model::{columns, ListName, Record};
use crate::domain::ports::ListStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Process-local list store. Stamps `Id` and, unless the caller supplied
/// one, `Created` on insert the way the remote store does, and evaluates
/// filters locally.
#[derive(Clone, Default)]
pub struct InMemoryListStore {
    lists: Arc<Mutex<HashMap<ListName, Vec<Record>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, list: ListName) -> usize {
        let lists = self.lists.lock().await;
        lists.get(&list).map(Vec::len).unwrap_or(0)
    }

    pub async fn is_empty(&self, list: ListName) -> bool {
        self.len(list).await == 0
    }
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn query(&self, list: ListName, filter: &Filter) -> Result<Vec<Record>> {
        let lists = self.lists.lock().await;
        Ok(lists
            .get(&list)
            .map(|items| items.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, list: ListName, record: Record) -> Result<Record> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut created = record.with("Id", id);
        created
            .data
            .entry(columns::CREATED.to_string())
            .or_insert_with(|| Utc::now().to_rfc3339().into());

        let mut lists = self.lists.lock().await;
        lists.entry(list).or_default().push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_stamps_id_and_created() {
        let store = InMemoryListStore::new();
        let created = store
            .insert(ListName::Products, Record::new().with(columns::TITLE, "A1"))
            .await
            .unwrap();

        assert_eq!(created.get_f64("Id"), Some(1.0));
        assert!(created.get_datetime(columns::CREATED).is_some());
        assert_eq!(store.len(ListName::Products).await, 1);
        assert!(store.is_empty(ListName::InboundMovements).await);
    }

    #[tokio::test]
    async fn test_query_applies_filter_per_list() {
        let store = InMemoryListStore::new();
        for code in ["A1", "B2", "A1"] {
            store
                .insert(
                    ListName::InboundMovements,
                    Record::new().with(columns::TITLE, code),
                )
                .await
                .unwrap();
        }

        let a1 = store
            .query(ListName::InboundMovements, &Filter::eq(columns::TITLE, "A1"))
            .await
            .unwrap();
        assert_eq!(a1.len(), 2);

        let none = store
            .query(ListName::OutboundMovements, &Filter::All)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
