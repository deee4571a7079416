use crate::domain::filter::Filter;
use crate::domain::model::{columns, ListName, Product, ProductKey};
use crate::domain::ports::ListStore;
use crate::utils::error::Result;
use std::sync::Arc;

/// Resolves products by exactly one key against the products list.
///
/// Codes are matched with literal equality; callers are expected to pass
/// them in the upper-case form the writer stores.
pub struct ProductDirectory<S: ListStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ListStore + ?Sized> Clone for ProductDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: ListStore + ?Sized> ProductDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn filter_for(key: &ProductKey) -> Filter {
        match key {
            ProductKey::FactoryCode(code) => Filter::eq(columns::TITLE, code.as_str()),
            ProductKey::SupplierCode(code) => Filter::eq(columns::SUPPLIER_CODE, code.as_str()),
            ProductKey::DescriptionContains(text) => {
                Filter::substring_of(columns::DESCRIPTION, text.as_str())
            }
        }
    }

    /// Every product matching `key`, in whatever order the store returns.
    pub async fn find_products(&self, key: &ProductKey) -> Result<Vec<Product>> {
        let records = self
            .store
            .query(ListName::Products, &Self::filter_for(key))
            .await?;
        records.iter().map(Product::from_record).collect()
    }

    /// First match. Supplier codes and description fragments are not
    /// unique, so which product wins among several is up to the store.
    pub async fn find_product(&self, key: &ProductKey) -> Result<Option<Product>> {
        let mut products = self.find_products(key).await?;
        if products.len() > 1 {
            tracing::debug!(key = %key, matches = products.len(), "Lookup is ambiguous, taking the first match");
        }
        Ok(if products.is_empty() {
            None
        } else {
            Some(products.swap_remove(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryListStore;

    async fn seeded() -> ProductDirectory<InMemoryListStore> {
        let store = InMemoryListStore::new();
        for (code, supplier, description) in [
            ("A1", "SUP-9", "Hex bolt M8"),
            ("B2", "SUP-9", "Hex nut M8"),
            ("C3", "SUP-1", "Flat washer"),
        ] {
            let product = Product {
                factory_code: code.to_string(),
                supplier_code: supplier.to_string(),
                description: description.to_string(),
                supplier_name: "Acme".to_string(),
                unit_of_measure: "UN".to_string(),
            };
            store
                .insert(ListName::Products, product.to_record())
                .await
                .unwrap();
        }
        ProductDirectory::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_find_by_each_key() {
        let directory = seeded().await;

        let by_code = directory
            .find_product(&ProductKey::FactoryCode("C3".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.description, "Flat washer");

        let by_supplier = directory
            .find_product(&ProductKey::SupplierCode("SUP-1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_supplier.factory_code, "C3");

        let by_text = directory
            .find_product(&ProductKey::DescriptionContains("washer".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_text.factory_code, "C3");
    }

    #[tokio::test]
    async fn test_ambiguous_supplier_code_returns_one_of_them() {
        let directory = seeded().await;
        let key = ProductKey::SupplierCode("SUP-9".to_string());

        assert_eq!(directory.find_products(&key).await.unwrap().len(), 2);
        let found = directory.find_product(&key).await.unwrap().unwrap();
        assert!(["A1", "B2"].contains(&found.factory_code.as_str()));
    }

    #[tokio::test]
    async fn test_lookup_is_literal() {
        let directory = seeded().await;
        let missing = directory
            .find_product(&ProductKey::FactoryCode("a1".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
