use crate::config::EntityStoreSettings;
use crate::models::{Investor, Startup};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when reading from the entity store
#[derive(Debug, Error)]
pub enum EntityStoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or project")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Read access to the startup and investor rosters
///
/// A missing record is `Ok(None)`, never an error.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_startup(&self, id: &str) -> Result<Option<Startup>, EntityStoreError>;

    async fn get_investor(&self, id: &str) -> Result<Option<Investor>, EntityStoreError>;

    async fn list_startups(&self) -> Result<Vec<Startup>, EntityStoreError>;

    async fn list_investors(&self) -> Result<Vec<Investor>, EntityStoreError>;

    /// Drop any cached roster so the next scan reads the source
    async fn invalidate_rosters(&self) {}
}

/// Document database REST client
///
/// Each roster lives in its own collection. Bulk reads page through the
/// collection with `limit`/`offset` queries until a short page comes back.
pub struct HttpEntityStore {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    startups_collection: String,
    investors_collection: String,
    page_size: u32,
    client: Client,
}

impl HttpEntityStore {
    pub fn new(settings: &EntityStoreSettings) -> Result<Self, EntityStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            project_id: settings.project_id.clone(),
            database_id: settings.database_id.clone(),
            startups_collection: settings.startups_collection.clone(),
            investors_collection: settings.investors_collection.clone(),
            page_size: settings.page_size.max(1),
            client,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url, self.database_id, collection
        )
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, EntityStoreError> {
        let url = format!("{}/{}", self.documents_url(collection), urlencoding::encode(id));

        tracing::debug!("Fetching {} document {}", collection, id);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(EntityStoreError::Unauthorized)
            }
            status if !status.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Failed to fetch {} {}: {} - {}", collection, id, status, body);
                return Err(EntityStoreError::ApiError(format!(
                    "Failed to fetch document: {}",
                    status
                )));
            }
            _ => {}
        }

        let doc: Value = response.json().await?;
        let data = doc.get("data").cloned().unwrap_or(doc);

        serde_json::from_value(data)
            .map(Some)
            .map_err(|e| EntityStoreError::InvalidResponse(format!("Failed to parse {}: {}", collection, e)))
    }

    async fn list_documents<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, EntityStoreError> {
        let url = self.documents_url(collection);
        let mut items = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let limit_query = format!("limit({})", self.page_size);
            let offset_query = format!("offset({})", offset);
            let full_url = format!(
                "{}?queries[]={}&queries[]={}",
                url,
                urlencoding::encode(&limit_query),
                urlencoding::encode(&offset_query)
            );

            let response = self
                .client
                .get(&full_url)
                .header("X-Appwrite-Key", &self.api_key)
                .header("X-Appwrite-Project", &self.project_id)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(EntityStoreError::Unauthorized);
            }
            if !status.is_success() {
                return Err(EntityStoreError::ApiError(format!(
                    "Failed to list {}: {}",
                    collection, status
                )));
            }

            let json: Value = response.json().await?;

            let total = json.get("total").and_then(|t| t.as_u64());
            let documents = json
                .get("documents")
                .and_then(|d| d.as_array())
                .ok_or_else(|| EntityStoreError::InvalidResponse("Missing documents array".into()))?;

            let page_len = documents.len() as u64;
            let before = items.len();

            items.extend(documents.iter().filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                match serde_json::from_value::<T>(data.clone()) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!("Skipping malformed {} document: {}", collection, e);
                        None
                    }
                }
            }));

            tracing::debug!(
                "Read {} {} documents at offset {} (total: {:?})",
                items.len() - before,
                collection,
                offset,
                total
            );

            offset += page_len;
            if page_len < u64::from(self.page_size) || total.is_some_and(|t| offset >= t) {
                break;
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn get_startup(&self, id: &str) -> Result<Option<Startup>, EntityStoreError> {
        self.get_document(&self.startups_collection, id).await
    }

    async fn get_investor(&self, id: &str) -> Result<Option<Investor>, EntityStoreError> {
        self.get_document(&self.investors_collection, id).await
    }

    async fn list_startups(&self) -> Result<Vec<Startup>, EntityStoreError> {
        self.list_documents(&self.startups_collection).await
    }

    async fn list_investors(&self) -> Result<Vec<Investor>, EntityStoreError> {
        self.list_documents(&self.investors_collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings(endpoint: String, page_size: u32) -> EntityStoreSettings {
        EntityStoreSettings {
            endpoint,
            api_key: "test_key".to_string(),
            project_id: "test_project".to_string(),
            database_id: "db".to_string(),
            page_size,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_startup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/databases/db/collections/startups/documents/s1")
            .match_header("x-appwrite-key", "test_key")
            .match_header("x-appwrite-project", "test_project")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"$id":"s1","name":"Acme","sectors":["Fintech"],"stage":2,"total_god_score":81}"#)
            .create_async()
            .await;

        let store = HttpEntityStore::new(&settings(server.url(), 100)).unwrap();
        let startup = store.get_startup("s1").await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(startup.id, "s1");
        assert_eq!(startup.stage_label(), Some("Seed"));
        assert_eq!(startup.total_god_score, Some(81.0));
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/db/collections/investors/documents/nope")
            .with_status(404)
            .with_body(r#"{"message":"Document not found"}"#)
            .create_async()
            .await;

        let store = HttpEntityStore::new(&settings(server.url(), 100)).unwrap();
        assert!(store.get_investor("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/db/collections/investors/documents/i1")
            .with_status(500)
            .create_async()
            .await;

        let store = HttpEntityStore::new(&settings(server.url(), 100)).unwrap();
        let err = store.get_investor("i1").await.unwrap_err();
        assert!(matches!(err, EntityStoreError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_list_pages_through_collection() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/databases/db/collections/investors/documents")
            .match_query(Matcher::UrlEncoded("queries[]".into(), "offset(0)".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total":3,"documents":[
                    {"$id":"i1","name":"A","stage":"Seed"},
                    {"$id":"i2","name":"B","stages":["Seed","Series A"]}
                ]}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/databases/db/collections/investors/documents")
            .match_query(Matcher::UrlEncoded("queries[]".into(), "offset(2)".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total":3,"documents":[{"$id":"i3","name":"C"},{"broken":true}]}"#)
            .create_async()
            .await;

        let store = HttpEntityStore::new(&settings(server.url(), 2)).unwrap();
        let investors = store.list_investors().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<&str> = investors.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i2", "i3"]);
        assert_eq!(investors[0].stages, vec!["Seed"]);
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/db/collections/startups/documents")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let store = HttpEntityStore::new(&settings(server.url(), 100)).unwrap();
        assert!(matches!(store.list_startups().await, Err(EntityStoreError::Unauthorized)));
    }
}
