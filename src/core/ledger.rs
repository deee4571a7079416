use crate::core::lookup::ProductDirectory;
use crate::domain::filter::Filter;
use crate::domain::model::{
    columns, InboundMovement, ListName, OutboundMovement, Product, ProductKey,
};
use crate::domain::ports::ListStore;
use crate::utils::error::{LedgerError, Result};
use std::sync::Arc;

/// Derives stock balances from movement history.
///
/// Nothing is cached: every call re-reads both movement lists in full, so
/// two callers can observe the same balance while a write is in flight.
pub struct MovementLedger<S: ListStore + ?Sized> {
    store: Arc<S>,
    directory: ProductDirectory<S>,
}

impl<S: ListStore + ?Sized> Clone for MovementLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            directory: self.directory.clone(),
        }
    }
}

impl<S: ListStore + ?Sized> MovementLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            directory: ProductDirectory::new(store.clone()),
            store,
        }
    }

    pub async fn inbound_movements(&self, factory_code: &str) -> Result<Vec<InboundMovement>> {
        let records = self
            .store
            .query(
                ListName::InboundMovements,
                &Filter::eq(columns::TITLE, factory_code),
            )
            .await?;
        records.iter().map(InboundMovement::from_record).collect()
    }

    pub async fn outbound_movements(&self, factory_code: &str) -> Result<Vec<OutboundMovement>> {
        let records = self
            .store
            .query(
                ListName::OutboundMovements,
                &Filter::eq(columns::TITLE, factory_code),
            )
            .await?;
        records.iter().map(OutboundMovement::from_record).collect()
    }

    /// Σ inbound quantities − Σ outbound quantities for `factory_code`.
    pub async fn get_balance(&self, factory_code: &str) -> Result<f64> {
        let (inbound, outbound) = tokio::try_join!(
            self.inbound_movements(factory_code),
            self.outbound_movements(factory_code)
        )?;

        let received: f64 = inbound.iter().map(|m| m.quantity).sum();
        let issued: f64 = outbound.iter().map(|m| m.quantity).sum();
        tracing::debug!(factory_code, received, issued, "Balance computed");

        Ok(received - issued)
    }

    /// Resolves the product first, then its balance.
    pub async fn balance_for(&self, key: &ProductKey) -> Result<(Product, f64)> {
        let product = self
            .directory
            .find_product(key)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound {
                key: key.to_string(),
            })?;
        let balance = self.get_balance(&product.factory_code).await?;
        Ok((product, balance))
    }
}
