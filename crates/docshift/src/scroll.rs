//! Cursor-driven pagination over a store-held result snapshot.
//!
//! [`Scroll`] yields pages lazily: each call to [`Scroll::next_page`] advances
//! the cursor once, using the most recent token the store returned. The walk
//! ends the first time the store answers with an empty page or without a
//! page of hits at all, and it cannot be restarted afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::StoreClient;
use crate::error::{Error, Result};

/// One document as returned by a search or get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Index the document lives in.
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Type of the document.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Document identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Document payload.
    #[serde(rename = "_source", default)]
    pub source: Value,
    /// Sort values of this hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}

impl Hit {
    /// Creates a hit carrying only an id and a payload.
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            index: None,
            doc_type: None,
            id: id.into(),
            source,
            sort: None,
        }
    }

    fn sort_key(&self) -> Option<&Value> {
        self.sort.as_ref().and_then(|s| s.first())
    }
}

/// Search or scroll response from the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Cursor for the next page, present when a scroll is open.
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
    /// Hits envelope.
    #[serde(default)]
    pub hits: Option<HitsEnvelope>,
}

/// The `hits` object of a search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitsEnvelope {
    /// Total matches: a number on older stores, `{"value": n}` on newer ones.
    #[serde(default)]
    pub total: Option<Value>,
    /// The page of hits.
    #[serde(default)]
    pub hits: Option<Vec<Hit>>,
}

impl SearchResponse {
    /// Total number of matches, if the store reported it.
    #[must_use]
    pub fn total_hits(&self) -> Option<u64> {
        let total = self.hits.as_ref()?.total.as_ref()?;
        total
            .as_u64()
            .or_else(|| total.get("value").and_then(Value::as_u64))
    }

    /// Consumes the response, returning its hits (empty when absent).
    #[must_use]
    pub fn into_hits(self) -> Vec<Hit> {
        self.hits.and_then(|h| h.hits).unwrap_or_default()
    }
}

/// One cursor advance worth of hits, in store order.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position of this page in the walk.
    pub number: u64,
    /// Hits in store order.
    pub hits: Vec<Hit>,
}

impl Page {
    /// Number of hits on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Pages handed out are never empty; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// First and last sort key of the page, for logging its span.
    #[must_use]
    pub fn sort_span(&self) -> Option<(&Value, &Value)> {
        let first = self.hits.first()?.sort_key()?;
        let last = self.hits.last()?.sort_key()?;
        Some((first, last))
    }
}

/// Scroll tuning.
#[derive(Debug, Clone, Copy)]
pub struct ScrollOptions {
    /// Keep-alive sent with each cursor advance.
    pub keep_alive: Duration,
    /// Pause between handing out a page and fetching the next one.
    pub delay: Duration,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(60),
            delay: Duration::ZERO,
        }
    }
}

/// A single in-flight walk over a cursor.
pub struct Scroll<'a> {
    client: &'a StoreClient,
    options: ScrollOptions,
    cursor: Option<String>,
    pending: Option<Vec<Hit>>,
    total: Option<u64>,
    pages: u64,
    finished: bool,
}

impl<'a> Scroll<'a> {
    /// Opens a scroll by running the cursor-opening search at `path`.
    ///
    /// The hits of the opening search are handed out as the first page.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails or the store returns no cursor.
    pub async fn open(
        client: &'a StoreClient,
        path: &str,
        body: &Value,
        open_keep_alive: Duration,
        options: ScrollOptions,
    ) -> Result<Scroll<'a>> {
        let response = client.open_scroll(path, body, open_keep_alive).await?;
        let total = response.total_hits();
        let cursor = response
            .scroll_id
            .clone()
            .ok_or(Error::MissingField("_scroll_id"))?;
        let pending = response.hits.and_then(|h| h.hits).unwrap_or_default();

        info!(
            "Opened scroll on {} ({} total hits)",
            path,
            total.map_or("unknown".to_string(), |t| t.to_string())
        );

        Ok(Self {
            client,
            options,
            cursor: Some(cursor),
            pending: Some(pending),
            total,
            pages: 0,
            finished: false,
        })
    }

    /// Resumes a walk from a cursor obtained elsewhere.
    pub fn resume(client: &'a StoreClient, cursor: impl Into<String>, options: ScrollOptions) -> Self {
        Self {
            client,
            options,
            cursor: Some(cursor.into()),
            pending: None,
            total: None,
            pages: 0,
            finished: false,
        }
    }

    /// Total matches reported by the opening search.
    #[must_use]
    pub fn total_hits(&self) -> Option<u64> {
        self.total
    }

    /// Pages handed out so far.
    #[must_use]
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// Whether the walk has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetches the next page, or `None` once the store is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the page request fails. The cursor is released and
    /// every later call returns `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.finished {
            return Ok(None);
        }

        if let Some(hits) = self.pending.take() {
            return Ok(self.accept(Some(hits)).await);
        }

        if self.pages > 0 {
            info!(
                "Waiting for {} ms before next page",
                self.options.delay.as_millis()
            );
            if !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }
        }

        let Some(cursor) = self.cursor.clone() else {
            self.finished = true;
            return Err(Error::MissingField("_scroll_id"));
        };

        let response = match self
            .client
            .continue_scroll(&cursor, self.options.keep_alive)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.finished = true;
                self.release().await;
                return Err(e);
            }
        };

        if let Some(next) = response.scroll_id {
            self.cursor = Some(next);
        }

        Ok(self.accept(response.hits.and_then(|h| h.hits)).await)
    }

    async fn accept(&mut self, hits: Option<Vec<Hit>>) -> Option<Page> {
        match hits {
            None => {
                info!("No more hits found");
                self.finish().await;
                None
            }
            Some(hits) if hits.is_empty() => {
                info!("Empty page, scroll exhausted");
                self.finish().await;
                None
            }
            Some(hits) => {
                self.pages += 1;
                info!("Scroll page {}: {} hits", self.pages, hits.len());
                Some(Page {
                    number: self.pages,
                    hits,
                })
            }
        }
    }

    /// Ends the walk early and releases the store-side cursor.
    ///
    /// Release is best-effort: a failure is logged, not returned. Closing a
    /// finished walk does nothing.
    pub async fn close(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        info!("Closing scroll after {} pages", self.pages);
        self.release().await;
    }

    async fn finish(&mut self) {
        self.finished = true;
        info!("Finished scroll after {} pages", self.pages);
        self.release().await;
    }

    async fn release(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            if let Err(e) = self.client.clear_scroll(&cursor).await {
                warn!("Failed to release scroll context: {}", e);
            }
        }
    }
}

/// Hands every page of `scroll` to `on_page`, one at a time.
///
/// `on_page` is awaited before the next page is requested.
///
/// # Errors
///
/// Returns the first error from a page fetch or from `on_page`.
pub async fn drain<F, Fut>(mut scroll: Scroll<'_>, mut on_page: F) -> Result<()>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    while let Some(page) = scroll.next_page().await? {
        if let Err(e) = on_page(page).await {
            scroll.close().await;
            return Err(e);
        }
    }
    Ok(())
}

/// Walks a cursor to exhaustion, pausing `delay` between pages.
///
/// # Errors
///
/// Returns an error if a page fetch fails or `on_page` fails. Pages handled
/// before the failure stay handled.
pub async fn walk<F, Fut>(
    client: &StoreClient,
    initial_cursor: impl Into<String>,
    delay: Duration,
    on_page: F,
) -> Result<()>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let options = ScrollOptions {
        delay,
        ..ScrollOptions::default()
    };
    drain(Scroll::resume(client, initial_cursor, options), on_page).await
}

#[cfg(test)]
#[path = "scroll_tests.rs"]
mod tests;
