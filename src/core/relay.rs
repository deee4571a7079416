use crate::adapters::forms::FormsRelay;
use crate::domain::model::Product;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// HTTP request as delivered by the function host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RelayResponse {
    fn json(status_code: u16, body: serde_json::Value) -> Self {
        Self {
            status_code,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            body: body.to_string(),
        }
    }
}

/// Serverless endpoint forwarding product registrations to the form.
pub struct ProductRelay {
    forms: FormsRelay,
}

impl ProductRelay {
    pub fn new(forms: FormsRelay) -> Self {
        Self { forms }
    }

    pub async fn handle(&self, request: RelayRequest) -> RelayResponse {
        if !request.http_method.eq_ignore_ascii_case("POST") {
            tracing::warn!(method = %request.http_method, "Rejected non-POST relay request");
            return RelayResponse::json(405, json!({ "error": "Method not allowed" }));
        }

        let product: Product = match serde_json::from_str(request.body.as_deref().unwrap_or("")) {
            Ok(product) => product,
            Err(e) => {
                tracing::warn!(error = %e, "Relay body is not a product");
                return RelayResponse::json(
                    400,
                    json!({ "error": format!("Invalid product payload: {}", e) }),
                );
            }
        };

        match self.forms.submit(&product).await {
            Ok(()) => RelayResponse::json(200, json!({ "success": true })),
            Err(e) => {
                tracing::error!(error = %e, "Failed to relay product to form");
                RelayResponse::json(500, json!({ "error": "Failed to send to the form" }))
            }
        }
    }
}
