//! Firestore REST adapter.
//!
//! # Responsibilities
//! - Fetch a document by path (`GET .../documents/{collection}/{id}`)
//! - Run equality queries (`POST .../documents:runQuery`)
//! - Decode Firestore typed values into plain JSON
//! - Map HTTP and transport failures onto `StoreError`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Number, Value};
use url::Url;

use crate::config::schema::StoreConfig;
use crate::store::{Document, DocumentStore, FieldFilter, StoreError, StoreResult};

/// Firestore client over the public REST API.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    /// `{base}/v1/projects/{project}/databases/{database}/documents`
    documents_root: String,
    api_key: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
}

impl FirestoreStore {
    /// Create a client from store configuration.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            StoreError::Unavailable(format!("invalid Firestore URL '{}': {}", config.base_url, e))
        })?;
        if config.project_id.is_empty() {
            return Err(StoreError::Unavailable("Firestore project_id is empty".to_string()));
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let documents_root = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            base.as_str().trim_end_matches('/'),
            config.project_id,
            config.database
        );

        tracing::info!(root = %documents_root, "Firestore store initialized");

        Ok(Self {
            client,
            documents_root,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
            timeout,
        })
    }

    fn document_url(&self, collection: &str, id: &str) -> StoreResult<Url> {
        let mut url = Url::parse(&self.documents_root).map_err(|e| StoreError::Decode(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Decode("Firestore URL cannot be a base".to_string()))?
            .push(collection)
            .push(id);
        Ok(url)
    }

    fn run_query_url(&self) -> StoreResult<Url> {
        Url::parse(&format!("{}:runQuery", self.documents_root)).map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn map_transport(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let url = self.document_url(collection, id)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        decode_document(&body).map(Some)
    }

    async fn query_eq(&self, collection: &str, filters: &[FieldFilter]) -> StoreResult<Vec<Document>> {
        let url = self.run_query_url()?;
        let response = self
            .authorize(self.client.post(url))
            .json(&structured_query(collection, filters))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        decode_query_response(&body)
    }
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("documents_root", &self.documents_root)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Request body for `documents:runQuery`.
pub fn structured_query(collection: &str, filters: &[FieldFilter]) -> Value {
    let field_filters: Vec<Value> = filters
        .iter()
        .map(|f| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": f.field },
                    "op": "EQUAL",
                    "value": encode_value(&f.value),
                }
            })
        })
        .collect();

    let mut query = json!({ "from": [{ "collectionId": collection }] });
    let where_clause = match field_filters.len() {
        0 => None,
        1 => field_filters.into_iter().next(),
        _ => Some(json!({ "compositeFilter": { "op": "AND", "filters": field_filters } })),
    };
    if let (Some(clause), Some(obj)) = (where_clause, query.as_object_mut()) {
        obj.insert("where".to_string(), clause);
    }

    json!({ "structuredQuery": query })
}

/// Plain JSON → Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Firestore typed value → plain JSON.
pub fn decode_value(value: &Value) -> StoreResult<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Decode(format!("expected typed value object, got {}", value)))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::Decode("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| StoreError::Decode(format!("bad booleanValue: {}", inner))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| StoreError::Decode(format!("bad integerValue: {}", inner)))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            let number = parsed.ok_or_else(|| StoreError::Decode(format!("bad doubleValue: {}", inner)))?;
            Ok(Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| StoreError::Decode(format!("bad {}: {}", kind, inner))),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values.iter().map(decode_value).collect::<StoreResult<Vec<_>>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => decode_fields(inner.get("fields")).map(Value::Object),
        other => Err(StoreError::Decode(format!("unsupported Firestore value type '{}'", other))),
    }
}

fn decode_fields(fields: Option<&Value>) -> StoreResult<Map<String, Value>> {
    match fields.and_then(Value::as_object) {
        Some(fields) => fields
            .iter()
            .map(|(k, v)| decode_value(v).map(|decoded| (k.clone(), decoded)))
            .collect(),
        None => Ok(Map::new()),
    }
}

/// Decode a REST `Document` resource.
pub fn decode_document(body: &Value) -> StoreResult<Document> {
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("document without name".to_string()))?;
    let id = name.rsplit('/').next().unwrap_or(name);
    let fields = decode_fields(body.get("fields"))?;
    Ok(Document::new(id, fields))
}

/// Decode a `runQuery` response stream (array of results; entries without a
/// `document` only carry read progress).
pub fn decode_query_response(body: &Value) -> StoreResult<Vec<Document>> {
    let results = body
        .as_array()
        .ok_or_else(|| StoreError::Decode("runQuery response is not an array".to_string()))?;

    results
        .iter()
        .filter_map(|entry| entry.get("document"))
        .map(decode_document)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            project_id: "gallery-prod".to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_document_url_encodes_segments() {
        let store = FirestoreStore::new(&config()).unwrap();
        let url = store.document_url("artworks", "art 123").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/gallery-prod/databases/(default)/documents/artworks/art%20123"
        );
        assert!(store.run_query_url().unwrap().as_str().ends_with("/documents:runQuery"));
    }

    #[test]
    fn test_missing_project_rejected() {
        let err = FirestoreStore::new(&StoreConfig::default()).unwrap_err();
        assert!(err.to_string().contains("project_id"));
    }

    #[test]
    fn test_decode_item_document() {
        let body = json!({
            "name": "projects/gallery-prod/databases/(default)/documents/artworks/art-123",
            "fields": {
                "sold": { "booleanValue": true },
                "paymentIntentId": { "stringValue": "pi_abc" },
                "price": { "integerValue": "4200" },
                "tags": { "arrayValue": { "values": [{ "stringValue": "oil" }] } },
                "dims": { "mapValue": { "fields": { "w": { "doubleValue": 40.5 } } } },
                "soldAt": { "timestampValue": "2024-03-01T10:00:00Z" },
                "note": { "nullValue": null }
            },
            "createTime": "2024-01-01T00:00:00Z"
        });

        let doc = decode_document(&body).unwrap();
        assert_eq!(doc.id, "art-123");
        assert_eq!(doc.get_bool("sold"), Some(true));
        assert_eq!(doc.get_str("paymentIntentId"), Some("pi_abc"));
        assert_eq!(doc.get("price"), Some(&json!(4200)));
        assert_eq!(doc.get("tags"), Some(&json!(["oil"])));
        assert_eq!(doc.get("dims"), Some(&json!({ "w": 40.5 })));
        assert_eq!(doc.get_str("soldAt"), Some("2024-03-01T10:00:00Z"));
        assert_eq!(doc.get("note"), Some(&Value::Null));
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let err = decode_value(&json!({ "mysteryValue": 1 })).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn test_decode_query_response_skips_progress_entries() {
        let body = json!([
            { "readTime": "2024-03-01T10:00:00Z" },
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/purchases/rec-1",
                    "fields": { "buyerId": { "stringValue": "u1" } }
                },
                "readTime": "2024-03-01T10:00:00Z"
            }
        ]);

        let docs = decode_query_response(&body).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "rec-1");
        assert_eq!(docs[0].get_str("buyerId"), Some("u1"));
    }

    #[test]
    fn test_structured_query_shapes() {
        let single = structured_query("purchases", &[FieldFilter::eq("buyerId", "u1")]);
        assert_eq!(
            single["structuredQuery"]["where"]["fieldFilter"]["value"],
            json!({ "stringValue": "u1" })
        );

        let composite = structured_query(
            "purchases",
            &[
                FieldFilter::eq("productId", "p1"),
                FieldFilter::eq("paymentIntentId", "pi_xyz"),
                FieldFilter::eq("buyerId", "u1"),
            ],
        );
        let filter = &composite["structuredQuery"]["where"]["compositeFilter"];
        assert_eq!(filter["op"], "AND");
        assert_eq!(filter["filters"].as_array().map(Vec::len), Some(3));
        assert_eq!(composite["structuredQuery"]["from"][0]["collectionId"], "purchases");

        let unfiltered = structured_query("purchases", &[]);
        assert!(unfiltered["structuredQuery"].get("where").is_none());
    }

    #[test]
    fn test_encode_values() {
        assert_eq!(encode_value(&json!(true)), json!({ "booleanValue": true }));
        assert_eq!(encode_value(&json!(7)), json!({ "integerValue": "7" }));
        assert_eq!(encode_value(&Value::Null), json!({ "nullValue": null }));
    }
}
