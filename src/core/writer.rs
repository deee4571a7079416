use crate::core::ledger::MovementLedger;
use crate::core::lookup::ProductDirectory;
use crate::domain::model::{InboundMovement, ListName, OutboundMovement, Product, ProductKey};
use crate::domain::ports::ListStore;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{require_field, validate_quantity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which balance an outbound submission is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// The balance read when the factory code was entered.
    #[default]
    Captured,
    /// A fresh balance read right before inserting. Narrows the window in
    /// which concurrent outbounds can over-issue but does not close it.
    Recheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Validating,
    CheckingDuplicate,
    CheckingBalance,
    Inserting,
    Done,
    RejectedIncomplete,
    RejectedDuplicate,
    RejectedInsufficientBalance,
}

fn enter(submission: &'static str, state: SubmissionState) {
    tracing::debug!(submission, state = ?state, "Submission state");
}

/// Terminal state for a failed submission.
fn rejected(submission: &'static str, err: LedgerError) -> LedgerError {
    let state = match &err {
        LedgerError::DuplicateKey { .. } => SubmissionState::RejectedDuplicate,
        LedgerError::InsufficientBalance { .. } => SubmissionState::RejectedInsufficientBalance,
        _ => SubmissionState::RejectedIncomplete,
    };
    enter(submission, state);
    err
}

/// Inbound form after the product lookup succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundForm {
    pub product: Product,
}

/// Outbound form after the factory code was entered: the product plus the
/// balance observed at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundForm {
    pub product: Product,
    pub balance: f64,
}

/// Validates and writes products and stock movements.
pub struct MovementWriter<S: ListStore + ?Sized> {
    store: Arc<S>,
    directory: ProductDirectory<S>,
    ledger: MovementLedger<S>,
    policy: BalancePolicy,
}

impl<S: ListStore + ?Sized> MovementWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            directory: ProductDirectory::new(store.clone()),
            ledger: MovementLedger::new(store.clone()),
            store,
            policy: BalancePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BalancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a product after trimming every field and upper-casing the
    /// codes. The duplicate check and the insert are separate requests; a
    /// concurrent registration of the same code between them is not caught.
    pub async fn register_product(&self, product: Product) -> Result<Product> {
        const KIND: &str = "product";
        enter(KIND, SubmissionState::Validating);
        let product = normalize_product(product).map_err(|e| rejected(KIND, e))?;

        enter(KIND, SubmissionState::CheckingDuplicate);
        let existing = self
            .directory
            .find_product(&ProductKey::FactoryCode(product.factory_code.clone()))
            .await?;
        if existing.is_some() {
            return Err(rejected(
                KIND,
                LedgerError::DuplicateKey {
                    factory_code: product.factory_code,
                },
            ));
        }

        enter(KIND, SubmissionState::Inserting);
        self.store
            .insert(ListName::Products, product.to_record())
            .await?;

        enter(KIND, SubmissionState::Done);
        tracing::info!(factory_code = %product.factory_code, "Product registered");
        Ok(product)
    }

    pub async fn prepare_inbound(&self, key: &ProductKey) -> Result<InboundForm> {
        let product = self
            .directory
            .find_product(key)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound {
                key: key.to_string(),
            })?;
        Ok(InboundForm { product })
    }

    /// Records an inbound movement; the total is computed here, at
    /// submission time. The product is not looked up again.
    pub async fn submit_inbound(
        &self,
        form: &InboundForm,
        quantity: f64,
        unit_value: f64,
        invoice_ref: &str,
    ) -> Result<InboundMovement> {
        const KIND: &str = "inbound";
        enter(KIND, SubmissionState::Validating);
        let invoice_ref = require_field("invoice_ref", invoice_ref)
            .and_then(|invoice| {
                validate_quantity("quantity", quantity, true)?;
                validate_quantity("unit_value", unit_value, true)?;
                Ok(invoice)
            })
            .map_err(|e| rejected(KIND, e))?;

        let movement = InboundMovement {
            factory_code: form.product.factory_code.clone(),
            description: form.product.description.clone(),
            quantity,
            unit_value,
            total_value: quantity * unit_value,
            invoice_ref,
            recorded_at: None,
        };

        enter(KIND, SubmissionState::Inserting);
        let created = self
            .store
            .insert(ListName::InboundMovements, movement.to_record())
            .await?;

        enter(KIND, SubmissionState::Done);
        tracing::info!(factory_code = %movement.factory_code, quantity, "Inbound recorded");
        Ok(InboundMovement {
            recorded_at: InboundMovement::from_record(&created)
                .ok()
                .and_then(|m| m.recorded_at),
            ..movement
        })
    }

    pub async fn prepare_outbound(&self, factory_code: &str) -> Result<OutboundForm> {
        let code = require_field("factory_code", factory_code)?.to_uppercase();
        let key = ProductKey::FactoryCode(code);
        let (product, balance) = self.ledger.balance_for(&key).await?;
        tracing::debug!(factory_code = %product.factory_code, balance, "Outbound form prepared");
        Ok(OutboundForm { product, balance })
    }

    /// Records an outbound movement if `quantity` fits the balance.
    ///
    /// With [`BalancePolicy::Captured`] the check uses `form.balance`, so two
    /// submissions prepared from the same balance can both pass.
    pub async fn submit_outbound(
        &self,
        form: &OutboundForm,
        quantity: f64,
        truck_plate: &str,
        recipient: &str,
    ) -> Result<OutboundMovement> {
        const KIND: &str = "outbound";
        enter(KIND, SubmissionState::Validating);
        let (truck_plate, recipient) = validate_quantity("quantity", quantity, false)
            .and_then(|_| {
                Ok((
                    require_field("truck_plate", truck_plate)?.to_uppercase(),
                    require_field("recipient", recipient)?,
                ))
            })
            .map_err(|e| rejected(KIND, e))?;

        enter(KIND, SubmissionState::CheckingBalance);
        let balance = match self.policy {
            BalancePolicy::Captured => form.balance,
            BalancePolicy::Recheck => self.ledger.get_balance(&form.product.factory_code).await?,
        };
        if quantity > balance {
            return Err(rejected(
                KIND,
                LedgerError::InsufficientBalance {
                    factory_code: form.product.factory_code.clone(),
                    requested: quantity,
                    balance,
                },
            ));
        }

        let movement = OutboundMovement {
            factory_code: form.product.factory_code.clone(),
            description: form.product.description.clone(),
            quantity,
            truck_plate,
            recipient,
            recorded_at: None,
        };

        enter(KIND, SubmissionState::Inserting);
        let created = self
            .store
            .insert(ListName::OutboundMovements, movement.to_record())
            .await?;

        enter(KIND, SubmissionState::Done);
        tracing::info!(factory_code = %movement.factory_code, quantity, "Outbound recorded");
        Ok(OutboundMovement {
            recorded_at: OutboundMovement::from_record(&created)
                .ok()
                .and_then(|m| m.recorded_at),
            ..movement
        })
    }
}

/// Trims all five fields, upper-cases the two codes and rejects blanks.
pub fn normalize_product(product: Product) -> Result<Product> {
    Ok(Product {
        factory_code: require_field("factory_code", &product.factory_code)?.to_uppercase(),
        supplier_code: require_field("supplier_code", &product.supplier_code)?.to_uppercase(),
        description: require_field("description", &product.description)?,
        supplier_name: require_field("supplier_name", &product.supplier_name)?,
        unit_of_measure: require_field("unit_of_measure", &product.unit_of_measure)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryListStore;
    use tokio_test::{assert_err, assert_ok};

    fn product(code: &str) -> Product {
        Product {
            factory_code: code.to_string(),
            supplier_code: "sup-9".to_string(),
            description: " Hex bolt M8 ".to_string(),
            supplier_name: "Acme".to_string(),
            unit_of_measure: "UN".to_string(),
        }
    }

    fn writer() -> (Arc<InMemoryListStore>, MovementWriter<InMemoryListStore>) {
        let store = Arc::new(InMemoryListStore::new());
        (store.clone(), MovementWriter::new(store))
    }

    #[test]
    fn test_normalize_product() {
        let normalized = normalize_product(product(" a1 ")).unwrap();
        assert_eq!(normalized.factory_code, "A1");
        assert_eq!(normalized.supplier_code, "SUP-9");
        assert_eq!(normalized.description, "Hex bolt M8");

        let mut blank = product("A1");
        blank.unit_of_measure = "  ".to_string();
        assert!(matches!(
            normalize_product(blank),
            Err(LedgerError::MissingField { field }) if field == "unit_of_measure"
        ));
    }

    #[tokio::test]
    async fn test_incomplete_registration_writes_nothing() {
        let (store, writer) = writer();
        let mut incomplete = product("A1");
        incomplete.supplier_name = String::new();

        assert_err!(writer.register_product(incomplete).await);
        assert!(store.is_empty(ListName::Products).await);
    }

    #[tokio::test]
    async fn test_duplicate_is_case_insensitive() {
        let (store, writer) = writer();
        assert_ok!(writer.register_product(product("A1")).await);

        let result = writer.register_product(product("a1")).await;
        assert!(matches!(result, Err(LedgerError::DuplicateKey { .. })));
        assert_eq!(store.len(ListName::Products).await, 1);
    }

    #[tokio::test]
    async fn test_inbound_computes_total() {
        let (_store, writer) = writer();
        writer.register_product(product("A1")).await.unwrap();

        let form = writer
            .prepare_inbound(&ProductKey::SupplierCode("SUP-9".to_string()))
            .await
            .unwrap();
        let movement = writer
            .submit_inbound(&form, 4.0, 2.5, " NF-100 ")
            .await
            .unwrap();

        assert_eq!(movement.factory_code, "A1");
        assert_eq!(movement.description, "Hex bolt M8");
        assert_eq!(movement.total_value, 10.0);
        assert_eq!(movement.invoice_ref, "NF-100");
        assert!(movement.recorded_at.is_some());
    }

    #[tokio::test]
    async fn test_inbound_requires_known_product_and_valid_numbers() {
        let (store, writer) = writer();
        assert!(matches!(
            writer
                .prepare_inbound(&ProductKey::FactoryCode("A1".to_string()))
                .await,
            Err(LedgerError::ProductNotFound { .. })
        ));

        writer.register_product(product("A1")).await.unwrap();
        let form = writer
            .prepare_inbound(&ProductKey::FactoryCode("A1".to_string()))
            .await
            .unwrap();
        assert_err!(writer.submit_inbound(&form, -1.0, 2.0, "NF-1").await);
        assert_err!(writer.submit_inbound(&form, 1.0, 2.0, "").await);
        assert!(store.is_empty(ListName::InboundMovements).await);
    }

    #[tokio::test]
    async fn test_outbound_checks_captured_balance() {
        let (store, writer) = writer();
        writer.register_product(product("A1")).await.unwrap();
        let inbound = writer
            .prepare_inbound(&ProductKey::FactoryCode("A1".to_string()))
            .await
            .unwrap();
        writer
            .submit_inbound(&inbound, 10.0, 1.0, "NF-1")
            .await
            .unwrap();

        let form = writer.prepare_outbound(" a1 ").await.unwrap();
        assert_eq!(form.balance, 10.0);

        let result = writer.submit_outbound(&form, 11.0, "abc1d23", "Site 4").await;
        match result {
            Err(LedgerError::InsufficientBalance { balance, .. }) => assert_eq!(balance, 10.0),
            other => panic!("expected insufficient balance, got {:?}", other),
        }
        assert!(store.is_empty(ListName::OutboundMovements).await);

        let movement = writer
            .submit_outbound(&form, 10.0, "abc1d23", "Site 4")
            .await
            .unwrap();
        assert_eq!(movement.truck_plate, "ABC1D23");
        assert_err!(writer.submit_outbound(&form, 0.0, "abc1d23", "Site 4").await);
    }

    #[tokio::test]
    async fn test_captured_balance_allows_over_issue_but_recheck_does_not() {
        let (store, captured) = writer();
        captured.register_product(product("A1")).await.unwrap();
        let inbound = captured
            .prepare_inbound(&ProductKey::FactoryCode("A1".to_string()))
            .await
            .unwrap();
        captured
            .submit_inbound(&inbound, 5.0, 1.0, "NF-1")
            .await
            .unwrap();

        // two operators prepare their forms against the same balance
        let first = captured.prepare_outbound("A1").await.unwrap();
        let second = captured.prepare_outbound("A1").await.unwrap();
        captured.submit_outbound(&first, 4.0, "AAA0001", "X").await.unwrap();
        captured.submit_outbound(&second, 4.0, "AAA0002", "Y").await.unwrap();
        assert_eq!(captured.ledger.get_balance("A1").await.unwrap(), -3.0);

        let recheck = MovementWriter::new(store).with_policy(BalancePolicy::Recheck);
        let stale = OutboundForm {
            balance: 5.0,
            ..first
        };
        assert!(matches!(
            recheck.submit_outbound(&stale, 1.0, "AAA0003", "Z").await,
            Err(LedgerError::InsufficientBalance { balance, .. }) if balance == -3.0
        ));
    }
}
