use crate::domain::filter::Filter;
use crate::domain::model::{ListName, Record};
use crate::domain::ports::{ConfigProvider, ListStore, TokenProvider};
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::HashSet;

pub const ODATA_VERBOSE: &str = "application/json;odata=verbose";

/// Builds the HTTP client shared by the list client and the context-info
/// token provider, so both send the same ambient headers.
pub fn build_http_client<C: ConfigProvider>(config: &C) -> Result<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in config.headers() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            LedgerError::InvalidConfigValueError {
                field: "store.headers".to_string(),
                value: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| LedgerError::InvalidConfigValueError {
                field: format!("store.headers.{}", name),
                value: "<redacted>".to_string(),
                reason: e.to_string(),
            })?;
        headers.insert(header_name, header_value);
    }

    let mut builder = Client::builder().default_headers(headers);
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// List client speaking the SharePoint REST dialect.
pub struct SharePointClient<C: ConfigProvider, T: TokenProvider> {
    config: C,
    tokens: T,
    client: Client,
}

impl<C: ConfigProvider, T: TokenProvider> SharePointClient<C, T> {
    pub fn new(config: C, tokens: T) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self::with_client(config, tokens, client))
    }

    pub fn with_client(config: C, tokens: T, client: Client) -> Self {
        Self {
            config,
            tokens,
            client,
        }
    }

    fn items_url(&self, list: ListName) -> String {
        format!(
            "{}/_api/web/lists/getbytitle('{}')/items",
            self.config.site_url(),
            self.config.list_title(list).replace('\'', "''")
        )
    }

    /// `SP.Data.<Title>ListItem`, the default entity type name SharePoint
    /// derives from a list title.
    fn entity_type(&self, list: ListName) -> String {
        match self.config.entity_type(list) {
            Some(explicit) => explicit.to_string(),
            None => format!(
                "SP.Data.{}ListItem",
                self.config.list_title(list).replace(' ', "_x0020_")
            ),
        }
    }

    async fn get_page(&self, url: &str, filter: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url).header(ACCEPT, ODATA_VERBOSE);
        if let Some(expr) = filter {
            request = request.query(&[("$filter", expr)]);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl<C: ConfigProvider, T: TokenProvider> ListStore for SharePointClient<C, T> {
    async fn query(&self, list: ListName, filter: &Filter) -> Result<Vec<Record>> {
        let odata = filter.to_odata();
        tracing::debug!(list = %list, filter = ?odata, "Querying list items");

        let first_url = self.items_url(list);
        let mut records = Vec::new();
        let mut visited = HashSet::from([first_url.clone()]);
        let mut response = self.get_page(&first_url, odata.as_deref()).await?;

        loop {
            let status = response.status();
            // only the first page may signal a missing list
            if status == StatusCode::NOT_FOUND && visited.len() == 1 {
                tracing::debug!(list = %list, "List or items not found, treating as empty");
                return Ok(records);
            }
            if !status.is_success() {
                return Err(status_error(response).await);
            }

            let page = normalize_envelope(response.json().await?)?;
            records.extend(page.items);

            match page.next {
                Some(next) => {
                    if !visited.insert(next.clone()) {
                        return Err(LedgerError::MalformedResponse {
                            message: format!("continuation link repeats an earlier page: {}", next),
                        });
                    }
                    tracing::debug!(list = %list, fetched = records.len(), "Following continuation link");
                    response = self.get_page(&next, None).await?;
                }
                None => break,
            }
        }

        tracing::debug!(list = %list, count = records.len(), "List query finished");
        Ok(records)
    }

    async fn insert(&self, list: ListName, record: Record) -> Result<Record> {
        let digest = self.tokens.request_digest().await?;

        let mut body = serde_json::Map::new();
        body.insert(
            "__metadata".to_string(),
            serde_json::json!({ "type": self.entity_type(list) }),
        );
        for (field, value) in &record.data {
            body.insert(field.clone(), value.clone());
        }

        tracing::debug!(list = %list, "Inserting list item");
        let response = self
            .client
            .post(self.items_url(list))
            .header(ACCEPT, ODATA_VERBOSE)
            .header(CONTENT_TYPE, ODATA_VERBOSE)
            .header("X-RequestDigest", digest)
            .body(serde_json::to_vec(&Value::Object(body))?)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            // an expired digest is indistinguishable from a missing permission
            self.tokens.invalidate();
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(record);
        }
        let page = normalize_envelope(serde_json::from_str(&text)?)?;
        Ok(page.items.into_iter().next().unwrap_or(record))
    }
}

async fn status_error(response: Response) -> LedgerError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status, "Remote store rejected the request");
    LedgerError::StoreStatus { status, body }
}

/// One page of items with the continuation link, if any.
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<Record>,
    pub next: Option<String>,
}

/// Accepts the verbose (`d.results`, `d`) and minimal (`value`) OData
/// envelopes, as well as a bare array.
pub fn normalize_envelope(body: Value) -> Result<Page> {
    let malformed = |message: &str| LedgerError::MalformedResponse {
        message: message.to_string(),
    };

    match body {
        Value::Object(mut root) => {
            if let Some(d) = root.remove("d") {
                let Value::Object(mut d) = d else {
                    return Err(malformed("'d' is not an object"));
                };
                let next = d.get("__next").and_then(Value::as_str).map(str::to_string);
                match d.remove("results") {
                    Some(Value::Array(items)) => Ok(Page {
                        items: to_records(items)?,
                        next,
                    }),
                    Some(_) => Err(malformed("'d.results' is not an array")),
                    None => Ok(Page {
                        items: vec![to_record(Value::Object(d))?],
                        next: None,
                    }),
                }
            } else if let Some(value) = root.remove("value") {
                let Value::Array(items) = value else {
                    return Err(malformed("'value' is not an array"));
                };
                let next = root
                    .get("@odata.nextLink")
                    .or_else(|| root.get("odata.nextLink"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Page {
                    items: to_records(items)?,
                    next,
                })
            } else {
                Ok(Page {
                    items: vec![to_record(Value::Object(root))?],
                    next: None,
                })
            }
        }
        Value::Array(items) => Ok(Page {
            items: to_records(items)?,
            next: None,
        }),
        _ => Err(malformed("response body is not a JSON object")),
    }
}

fn to_records(items: Vec<Value>) -> Result<Vec<Record>> {
    items.into_iter().map(to_record).collect()
}

fn to_record(item: Value) -> Result<Record> {
    match item {
        Value::Object(map) => Ok(Record {
            data: map
                .into_iter()
                .filter(|(key, _)| key != "__metadata")
                .collect(),
        }),
        _ => Err(LedgerError::MalformedResponse {
            message: "list item is not a JSON object".to_string(),
        }),
    }
}
