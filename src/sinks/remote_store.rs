use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::session::{ExtractionRun, Listing};

use super::{PersistenceSink, SinkError};

const RUNS_COLLECTION: &str = "extraction_runs";
const LISTINGS_COLLECTION: &str = "listings";


#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {message}")]
    Api {
        status: u16,
        message: String
    },

    #[error("store is unavailable: {0}")]
    Unavailable(String)
}


/// A document database organised in collections.
///
/// Clients are built once by the caller and lent to [`RemoteStoreSink`], which never
/// opens or closes them.
#[async_trait]
pub(crate) trait DocumentStore: Send + Sync {
    /// Inserts `document` into `collection` and returns the id it was stored under.
    /// Nested collections are addressed as `parent_collection/parent_id/child_collection`.
    async fn insert(&self, collection: &str, document: serde_json::Value) -> Result<String, StoreError>;
}


#[derive(Deserialize)]
struct InsertResponse {
    id: String
}


/// A document store reached over a JSON REST API, where `POST {endpoint}/{collection}`
/// creates a document and answers with `{"id": "..."}`
pub(crate) struct HttpDocumentStore {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>
}


impl HttpDocumentStore {
    pub(crate) fn new(endpoint: Url, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, token)
    }

    pub(crate) fn with_client(client: reqwest::Client, endpoint: Url, token: Option<String>) -> Self {
        Self { client, endpoint, token }
    }
}


#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn insert(&self, collection: &str, document: serde_json::Value) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), collection);
        let mut request = self.client.post(&url).json(&document);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await.map_err(|e| {
            if e.is_connect() {
                StoreError::Unavailable(e.to_string())
            } else {
                StoreError::Http(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body
            });
        }

        let created: InsertResponse = resp.json().await?;
        Ok(created.id)
    }
}


/// Writes one parent document per run, then one child document per listing beneath it
pub(crate) struct RemoteStoreSink<'a> {
    store: &'a dyn DocumentStore
}


impl<'a> RemoteStoreSink<'a> {
    pub(crate) const NAME: &'static str = "remote_store";

    pub(crate) fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }
}


#[async_trait]
impl<'a> PersistenceSink for RemoteStoreSink<'a> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn persist(&self, run: &ExtractionRun, listings: &[Listing]) -> Result<(), SinkError> {
        let run_id = self.store.insert(RUNS_COLLECTION, serde_json::to_value(run)?).await?;
        tracing::debug!(%run_id, "Stored run record");

        let children = format!("{RUNS_COLLECTION}/{run_id}/{LISTINGS_COLLECTION}");
        for listing in listings {
            self.store.insert(&children, serde_json::to_value(listing)?).await?;
        }
        tracing::info!(%run_id, listings = listings.len(), "Stored listings under run");
        Ok(())
    }
}


/// Keeps documents in memory, ids are taken from an `id` field when the document has one
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryDocumentStore {
    documents: std::sync::RwLock<Vec<(String, String, serde_json::Value)>>
}


#[cfg(test)]
impl MemoryDocumentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn collection(&self, collection: &str) -> Vec<serde_json::Value> {
        self.documents
            .read()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| c == collection)
            .map(|(_, _, document)| document.clone())
            .collect()
    }

    pub(crate) fn children_of(&self, run_id: &str) -> Vec<serde_json::Value> {
        self.collection(&format!("{RUNS_COLLECTION}/{run_id}/{LISTINGS_COLLECTION}"))
    }
}


#[cfg(test)]
#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, document: serde_json::Value) -> Result<String, StoreError> {
        let mut documents = self.documents.write().unwrap();
        let id = document
            .get("id")
            .and_then(|id| id.as_str())
            .map_or_else(|| documents.len().to_string(), String::from);
        documents.push((collection.to_string(), id.clone(), document));
        Ok(id)
    }
}


#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use crate::locators::NOT_AVAILABLE;
    use crate::sinks::tests::sample_listings;

    use super::*;

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                line.to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .map(|value| value.trim().parse::<usize>().unwrap_or(0))
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn local_store(endpoint: Url, token: Option<String>) -> HttpDocumentStore {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpDocumentStore::with_client(client, endpoint, token)
    }

    /// Answers exactly one request with `status` and `body`, and hands back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Url::parse(&format!("http://{}/v1/", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![];
            let mut buf = [0u8; 4096];
            loop {
                let read = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..read]);
                if read == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (endpoint, handle)
    }

    #[tokio::test]
    async fn http_store_posts_to_the_collection_and_returns_the_id() {
        let (endpoint, server) = serve_once("201 Created", r#"{"id":"run-42"}"#).await;
        let store = local_store(endpoint, Some("secret".into()));

        let id = store
            .insert("extraction_runs/7/listings", serde_json::json!({ "title": "Analista" }))
            .await
            .unwrap();

        assert_eq!(id, "run-42");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/extraction_runs/7/listings HTTP/1.1\r\n"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.ends_with(r#"{"title":"Analista"}"#));
    }

    #[tokio::test]
    async fn http_store_reports_error_statuses() {
        let (endpoint, server) = serve_once("503 Service Unavailable", "busy").await;
        let store = local_store(endpoint, None);

        let result = store.insert(RUNS_COLLECTION, serde_json::json!({})).await;

        assert!(matches!(result, Err(StoreError::Api { status: 503, ref message }) if message == "busy"));
        assert!(!server.await.unwrap().to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn unreachable_http_store_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        drop(listener);
        let store = local_store(endpoint, None);

        let result = store.insert(RUNS_COLLECTION, serde_json::json!({})).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn run_is_written_before_its_listings() {
        let store = MemoryDocumentStore::new();
        let sink = RemoteStoreSink::new(&store);
        let mut listings = sample_listings(3);
        listings[2].company = NOT_AVAILABLE.to_string();
        let run = ExtractionRun::new("bumeran-practicante", 2, listings.len(), true);

        sink.persist(&run, &listings).await.unwrap();

        let runs = store.collection(RUNS_COLLECTION);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["sourceLabel"], "bumeran-practicante");
        assert_eq!(runs[0]["totalListings"], 3);
        assert_eq!(runs[0]["usedAutomation"], true);

        let children = store.children_of(&run.id.to_string());
        assert_eq!(children.len(), 3);
        assert_eq!(children[2]["company"], NOT_AVAILABLE);
        assert_eq!(store.documents.read().unwrap()[0].0, RUNS_COLLECTION);
    }
}
