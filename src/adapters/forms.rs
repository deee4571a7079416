use crate::domain::model::Product;
use crate::utils::error::{LedgerError, Result};
use reqwest::Client;

/// Question labels of the registration form, in submission order.
pub const FORM_FIELD_LABELS: [&str; 5] = [
    "Código de Fábrica",
    "Código do Fornecedor",
    "Descrição do Produto",
    "Nome do Fornecedor",
    "Unidade de Medida",
];

/// Posts product registrations to a Microsoft Forms endpoint.
#[derive(Debug, Clone)]
pub struct FormsRelay {
    client: Client,
    form_url: String,
}

impl FormsRelay {
    pub fn new(form_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), form_url)
    }

    pub fn with_client(client: Client, form_url: impl Into<String>) -> Self {
        Self {
            client,
            form_url: form_url.into(),
        }
    }

    pub fn form_fields(product: &Product) -> [(&'static str, &str); 5] {
        [
            (FORM_FIELD_LABELS[0], product.factory_code.as_str()),
            (FORM_FIELD_LABELS[1], product.supplier_code.as_str()),
            (FORM_FIELD_LABELS[2], product.description.as_str()),
            (FORM_FIELD_LABELS[3], product.supplier_name.as_str()),
            (FORM_FIELD_LABELS[4], product.unit_of_measure.as_str()),
        ]
    }

    /// Fire-and-forget: the response body is never read and a non-success
    /// status is only logged. Transport failures are errors.
    pub async fn submit(&self, product: &Product) -> Result<()> {
        tracing::info!(factory_code = %product.factory_code, "Relaying product to form");

        let response = self
            .client
            .post(&self.form_url)
            .form(&Self::form_fields(product))
            .send()
            .await
            .map_err(|e| LedgerError::Relay {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Form endpoint answered with a non-success status");
        }
        Ok(())
    }
}
