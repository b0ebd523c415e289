//! HTTP client for a single store endpoint.
//!
//! Thin one-shot wrappers over the store's REST surface. A 404 becomes
//! [`Error::NotFound`], any other non-success status [`Error::Status`], and a
//! request that never got a response [`Error::Transport`].

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bulk::{BulkAction, BulkRequest, BulkResponse, BulkTarget, NDJSON_CONTENT_TYPE};
use crate::config::duration_format::format_duration;
use crate::error::{Error, Result};
use crate::scroll::{self, Hit, Page, Scroll, ScrollOptions, SearchResponse};

/// Keep-alive used when a generic scroll is opened.
pub const DEFAULT_SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Creates the HTTP client shared by all requests of one endpoint.
///
/// No request timeout is set: a hung call blocks its caller.
#[must_use]
pub fn create_http_client() -> Client {
    Client::builder()
        .user_agent(concat!("docshift/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client bound to one store base URL.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
}

impl StoreClient {
    /// Creates a client for the store at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(create_http_client(), base_url)
    }

    /// Creates a client reusing an existing HTTP client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// The base URL, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request and maps non-success statuses to errors.
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(context.to_string()));
        }

        Err(Error::Status {
            status: status.as_u16(),
            context: context.to_string(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = self.send(request, context).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| Error::Decode {
            context: context.to_string(),
            source,
        })
    }

    /// Creates a document with a store-generated id and returns that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has no `_id`.
    pub async fn create_doc(&self, index: &str, doc_type: &str, doc: &Value) -> Result<String> {
        let url = self.url(&format!("{}/{}/", index, doc_type));
        let context = format!("create document in {}/{}", index, doc_type);
        let body: Value = self
            .send_json(self.client.post(&url).json(doc), &context)
            .await?;
        document_id(&body)
    }

    /// Creates (or replaces) a document under an explicit id and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has no `_id`.
    pub async fn create_doc_with_id(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        doc: &Value,
    ) -> Result<String> {
        let url = self.url(&format!("{}/{}/{}", index, doc_type, id));
        let context = format!("create document {}/{}/{}", index, doc_type, id);
        let body: Value = self
            .send_json(self.client.post(&url).json(doc), &context)
            .await?;
        document_id(&body)
    }

    /// Fetches a single document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the document does not exist.
    pub async fn get_doc(&self, index: &str, doc_type: &str, id: &str) -> Result<Hit> {
        let url = self.url(&format!("{}/{}/{}", index, doc_type, id));
        let context = format!("document {}/{}/{}", index, doc_type, id);
        self.send_json(self.client.get(&url), &context).await
    }

    /// Deletes a single document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the document does not exist.
    pub async fn delete_doc(&self, index: &str, doc_type: &str, id: &str) -> Result<()> {
        let url = self.url(&format!("{}/{}/{}", index, doc_type, id));
        let context = format!("delete document {}/{}/{}", index, doc_type, id);
        self.send(self.client.delete(&url), &context).await?;
        debug!("Deleted document {}/{}/{}", index, doc_type, id);
        Ok(())
    }

    /// Creates an index and returns the store's acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, including when the index exists.
    pub async fn create_index(&self, index: &str) -> Result<Value> {
        let context = format!("create index {}", index);
        self.send_json(self.client.put(self.url(index)), &context)
            .await
    }

    /// Deletes an index and returns the store's acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the index does not exist.
    pub async fn delete_index(&self, index: &str) -> Result<Value> {
        let context = format!("delete index {}", index);
        self.send_json(self.client.delete(self.url(index)), &context)
            .await
    }

    /// Creates or updates the mapping of `doc_type` in `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the mapping.
    pub async fn create_mapping(&self, index: &str, doc_type: &str, mapping: &Value) -> Result<Value> {
        let url = self.url(&format!("{}/_mapping/{}", index, doc_type));
        let context = format!("mapping {}/{}", index, doc_type);
        self.send_json(self.client.put(&url).json(mapping), &context)
            .await
    }

    /// Runs a query-string search and returns the matching hits.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn query(&self, index: &str, q: &str) -> Result<Vec<Hit>> {
        let url = self.url(&format!("{}/_search", index));
        let context = format!("query {}", index);
        let response: SearchResponse = self
            .send_json(self.client.get(&url).query(&[("q", q)]), &context)
            .await?;
        Ok(response.into_hits())
    }

    /// Runs a search with a request body and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn search(&self, index: &str, body: &Value) -> Result<Value> {
        let url = self.url(&format!("{}/_search", index));
        let context = format!("search {}", index);
        self.send_json(self.client.post(&url).json(body), &context)
            .await
    }

    /// Dispatches an encoded bulk request to `{index}/{doc_type}/_bulk`.
    ///
    /// A response reporting per-item failures is still `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    pub async fn bulk(&self, index: &str, doc_type: &str, request: &BulkRequest) -> Result<BulkResponse> {
        let url = self.url(&format!("{}/{}/_bulk", index, doc_type));
        let context = format!("bulk write to {}/{}", index, doc_type);
        let builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(request.as_str().to_owned());

        let response: BulkResponse = self.send_json(builder, &context).await?;
        debug!(
            "Bulk of {} operations to {}/{}: errors={}",
            request.len(),
            index,
            doc_type,
            response.errors
        );
        Ok(response)
    }

    /// Indexes `docs` in one bulk request, overwriting existing ids.
    ///
    /// `ids[i]`, when present, becomes the id of `docs[i]`; documents past the
    /// end of `ids` get store-generated ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    pub async fn bulk_index(
        &self,
        index: &str,
        doc_type: &str,
        ids: &[String],
        docs: &[Value],
    ) -> Result<BulkResponse> {
        let mut request = BulkRequest::new();
        for (i, doc) in docs.iter().enumerate() {
            let target = BulkTarget {
                index,
                doc_type,
                id: ids.get(i).map(String::as_str),
            };
            request.push(BulkAction::Index, &target, doc)?;
        }

        let response = self.bulk(index, doc_type, &request).await?;
        info!(
            "Bulk index of {} documents, errors: {}",
            request.len(),
            response.errors
        );
        for item in response.failed_items() {
            warn!("Bulk item failed: {:?}", item);
        }
        Ok(response)
    }

    /// Runs the cursor-opening search at `path` (e.g. `idx/_search`).
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn open_scroll(&self, path: &str, body: &Value, keep_alive: Duration) -> Result<SearchResponse> {
        let url = self.url(path);
        let context = format!("open scroll on {}", path);
        let request = self
            .client
            .post(&url)
            .query(&[("scroll", format_duration(keep_alive))])
            .json(body);
        self.send_json(request, &context).await
    }

    /// Advances a cursor by one page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn continue_scroll(&self, cursor: &str, keep_alive: Duration) -> Result<SearchResponse> {
        let body = json!({
            "scroll": format_duration(keep_alive),
            "scroll_id": cursor,
        });
        let request = self.client.post(self.url("_search/scroll")).json(&body);
        self.send_json(request, "advance scroll").await
    }

    /// Releases a cursor's server-side context.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the cursor already expired.
    pub async fn clear_scroll(&self, cursor: &str) -> Result<()> {
        let body = json!({ "scroll_id": [cursor] });
        let request = self.client.delete(self.url("_search/scroll")).json(&body);
        self.send(request, "clear scroll").await?;
        Ok(())
    }

    /// Pages through every hit of a search on `index`.
    ///
    /// The body is sorted by `_id` unless it carries its own `sort`.
    ///
    /// # Errors
    ///
    /// Returns an error if a page fetch fails or `on_page` fails.
    pub async fn search_scroll<F, Fut>(
        &self,
        index: &str,
        body: &Value,
        delay: Duration,
        on_page: F,
    ) -> Result<()>
    where
        F: FnMut(Page) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut body = body.clone();
        if let Value::Object(map) = &mut body {
            map.entry("sort")
                .or_insert_with(|| json!([{ "_id": "asc" }]));
        }

        let options = ScrollOptions {
            keep_alive: DEFAULT_SCROLL_KEEP_ALIVE,
            delay,
        };
        let path = format!("{}/_search", index);
        let scroll = Scroll::open(self, &path, &body, DEFAULT_SCROLL_KEEP_ALIVE, options).await?;
        scroll::drain(scroll, on_page).await?;

        info!("Finished getting all documents from {}", index);
        Ok(())
    }
}

fn document_id(body: &Value) -> Result<String> {
    body.get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(Error::MissingField("_id"))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
