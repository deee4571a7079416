use crate::utils::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Column names of the three lists. The item title carries the factory code
/// in every list.
pub mod columns {
    pub const TITLE: &str = "Title";
    pub const CREATED: &str = "Created";
    pub const SUPPLIER_CODE: &str = "CodigoFornecedor";
    pub const DESCRIPTION: &str = "DescricaoProduto";
    pub const SUPPLIER_NAME: &str = "NomeFornecedor";
    pub const UNIT_OF_MEASURE: &str = "UnidadeMedida";
    pub const QUANTITY: &str = "Quantidade";
    pub const UNIT_VALUE: &str = "ValorUnitario";
    pub const TOTAL_VALUE: &str = "ValorTotal";
    pub const INVOICE_REF: &str = "NotaFiscal";
    pub const TRUCK_PLATE: &str = "PlacaCaminhao";
    pub const RECIPIENT: &str = "Destinatario";
}

/// One list item as exchanged with the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(field.to_string(), value.into());
        self
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }

    /// Reads a numeric column. Number columns come back as JSON numbers,
    /// currency columns sometimes as strings.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.data.get(field)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_datetime(&self, field: &str) -> Option<DateTime<Utc>> {
        let raw = self.get_str(field)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn text(&self, field: &str) -> String {
        self.get_str(field).unwrap_or_default().to_string()
    }

    fn title(&self) -> Result<String> {
        self.get_str(columns::TITLE)
            .map(str::to_string)
            .ok_or_else(|| LedgerError::MalformedResponse {
                message: "list item has no Title".to_string(),
            })
    }

    fn quantity(&self) -> f64 {
        match self.get_f64(columns::QUANTITY) {
            Some(q) => q,
            None => {
                tracing::warn!(item = ?self.get_str(columns::TITLE), "movement without a numeric quantity counted as 0");
                0.0
            }
        }
    }
}

/// The named collections this system reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListName {
    Products,
    InboundMovements,
    OutboundMovements,
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListName::Products => write!(f, "products"),
            ListName::InboundMovements => write!(f, "inbound"),
            ListName::OutboundMovements => write!(f, "outbound"),
        }
    }
}

/// Serialized in camelCase; deserialization also accepts the keys the
/// registration page posts (`codigoFabrica`, `unidadeMedida`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "codigoFabrica")]
    pub factory_code: String,
    #[serde(alias = "codigoFornecedor")]
    pub supplier_code: String,
    #[serde(alias = "descricaoProduto")]
    pub description: String,
    #[serde(alias = "nomeFornecedor")]
    pub supplier_name: String,
    #[serde(alias = "unidadeMedida")]
    pub unit_of_measure: String,
}

impl Product {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with(columns::TITLE, self.factory_code.as_str())
            .with(columns::SUPPLIER_CODE, self.supplier_code.as_str())
            .with(columns::DESCRIPTION, self.description.as_str())
            .with(columns::SUPPLIER_NAME, self.supplier_name.as_str())
            .with(columns::UNIT_OF_MEASURE, self.unit_of_measure.as_str())
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            factory_code: record.title()?,
            supplier_code: record.text(columns::SUPPLIER_CODE),
            description: record.text(columns::DESCRIPTION),
            supplier_name: record.text(columns::SUPPLIER_NAME),
            unit_of_measure: record.text(columns::UNIT_OF_MEASURE),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMovement {
    pub factory_code: String,
    pub description: String,
    pub quantity: f64,
    pub unit_value: f64,
    pub total_value: f64,
    pub invoice_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl InboundMovement {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with(columns::TITLE, self.factory_code.as_str())
            .with(columns::DESCRIPTION, self.description.as_str())
            .with(columns::QUANTITY, self.quantity)
            .with(columns::UNIT_VALUE, self.unit_value)
            .with(columns::TOTAL_VALUE, self.total_value)
            .with(columns::INVOICE_REF, self.invoice_ref.as_str())
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            factory_code: record.title()?,
            description: record.text(columns::DESCRIPTION),
            quantity: record.quantity(),
            unit_value: record.get_f64(columns::UNIT_VALUE).unwrap_or(0.0),
            total_value: record.get_f64(columns::TOTAL_VALUE).unwrap_or(0.0),
            invoice_ref: record.text(columns::INVOICE_REF),
            recorded_at: record.get_datetime(columns::CREATED),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMovement {
    pub factory_code: String,
    pub description: String,
    pub quantity: f64,
    pub truck_plate: String,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl OutboundMovement {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with(columns::TITLE, self.factory_code.as_str())
            .with(columns::DESCRIPTION, self.description.as_str())
            .with(columns::QUANTITY, self.quantity)
            .with(columns::TRUCK_PLATE, self.truck_plate.as_str())
            .with(columns::RECIPIENT, self.recipient.as_str())
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            factory_code: record.title()?,
            description: record.text(columns::DESCRIPTION),
            quantity: record.quantity(),
            truck_plate: record.text(columns::TRUCK_PLATE),
            recipient: record.text(columns::RECIPIENT),
            recorded_at: record.get_datetime(columns::CREATED),
        })
    }
}

/// Exactly one way of identifying a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKey {
    FactoryCode(String),
    SupplierCode(String),
    DescriptionContains(String),
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKey::FactoryCode(code) => write!(f, "factory code {}", code),
            ProductKey::SupplierCode(code) => write!(f, "supplier code {}", code),
            ProductKey::DescriptionContains(text) => write!(f, "description containing '{}'", text),
        }
    }
}

/// Loosely filled search form; converts into a [`ProductKey`] only when
/// exactly one field holds something other than whitespace.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub factory_code: Option<String>,
    pub supplier_code: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<ProductQuery> for ProductKey {
    type Error = LedgerError;

    fn try_from(query: ProductQuery) -> Result<Self> {
        fn filled(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let mut keys: Vec<ProductKey> = [
            filled(query.factory_code).map(ProductKey::FactoryCode),
            filled(query.supplier_code).map(ProductKey::SupplierCode),
            filled(query.description).map(ProductKey::DescriptionContains),
        ]
        .into_iter()
        .flatten()
        .collect();

        match keys.len() {
            1 => Ok(keys.remove(0)),
            0 => Err(LedgerError::MissingField {
                field: "factory code, supplier code or description".to_string(),
            }),
            n => Err(LedgerError::InvalidInput {
                field: "product key".to_string(),
                value: n.to_string(),
                reason: "supply exactly one of factory code, supplier code or description"
                    .to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_product() -> Product {
        Product {
            factory_code: "A1".to_string(),
            supplier_code: "SUP-9".to_string(),
            description: "Hex bolt M8".to_string(),
            supplier_name: "Acme".to_string(),
            unit_of_measure: "UN".to_string(),
        }
    }

    #[test]
    fn test_product_record_columns() {
        let record = sample_product().to_record();
        assert_eq!(record.get_str("Title"), Some("A1"));
        assert_eq!(record.get_str("CodigoFornecedor"), Some("SUP-9"));
        assert_eq!(Product::from_record(&record).unwrap(), sample_product());
    }

    #[test]
    fn test_record_without_title_is_malformed() {
        let record = Record::new().with(columns::DESCRIPTION, "orphan");
        assert!(matches!(
            Product::from_record(&record),
            Err(LedgerError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_numeric_columns_accept_strings() {
        let record = Record::new()
            .with(columns::TITLE, "A1")
            .with(columns::QUANTITY, "12.5")
            .with(columns::UNIT_VALUE, json!(2))
            .with(columns::CREATED, "2024-03-01T10:15:00Z");
        let movement = InboundMovement::from_record(&record).unwrap();
        assert_eq!(movement.quantity, 12.5);
        assert_eq!(movement.unit_value, 2.0);
        assert!(movement.recorded_at.is_some());
    }

    #[test]
    fn test_missing_quantity_counts_as_zero() {
        let record = Record::new().with(columns::TITLE, "A1");
        let movement = OutboundMovement::from_record(&record).unwrap();
        assert_eq!(movement.quantity, 0.0);
        assert_eq!(movement.recorded_at, None);
    }

    #[test]
    fn test_product_query_requires_exactly_one_key() {
        let key = ProductKey::try_from(ProductQuery {
            supplier_code: Some(" SUP-9 ".to_string()),
            description: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(key, ProductKey::SupplierCode("SUP-9".to_string()));

        assert!(matches!(
            ProductKey::try_from(ProductQuery::default()),
            Err(LedgerError::MissingField { .. })
        ));
        assert!(matches!(
            ProductKey::try_from(ProductQuery {
                factory_code: Some("A1".to_string()),
                supplier_code: Some("SUP-9".to_string()),
                description: None,
            }),
            Err(LedgerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_product_accepts_registration_page_keys() {
        let product: Product = serde_json::from_value(json!({
            "codigoFabrica": "A1",
            "codigoFornecedor": "SUP-9",
            "descricaoProduto": "Hex bolt M8",
            "nomeFornecedor": "Acme",
            "unidadeMedida": "UN"
        }))
        .unwrap();
        assert_eq!(product, sample_product());
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let value = serde_json::to_value(sample_product()).unwrap();
        assert_eq!(value["factoryCode"], "A1");
        assert_eq!(value["unitOfMeasure"], "UN");
    }
}
