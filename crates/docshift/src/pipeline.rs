//! Migration pipeline orchestration.

use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::bulk::{BulkAction, BulkRequest, BulkTarget};
use crate::client::StoreClient;
use crate::config::{EndpointConfig, MigrationConfig, MigrationOptions};
use crate::error::Result;
use crate::scroll::{Page, Scroll, ScrollOptions};
use crate::transform::DocumentTransform;

/// Migration statistics.
#[derive(Debug, Default, Clone)]
pub struct MigrationStats {
    /// Documents read from the source.
    pub extracted: u64,
    /// Documents the destination accepted.
    pub created: u64,
    /// Documents the destination rejected inside a successful bulk call.
    pub failed: u64,
    /// Pages processed.
    pub pages: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationStats {
    /// Calculate throughput (documents per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.created as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Migration pipeline.
pub struct Pipeline {
    config: MigrationConfig,
    source: StoreClient,
    destination: StoreClient,
    show_progress: bool,
}

impl Pipeline {
    /// Create a new migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        let source = StoreClient::new(&config.source.url);
        let destination = StoreClient::new(&config.destination.url);

        Ok(Self {
            config,
            source,
            destination,
            show_progress: false,
        })
    }

    /// Enables a progress bar on stderr.
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Cursor-opening search body: stable store-internal order.
    fn open_body(&self) -> Value {
        let options = &self.config.options;
        let mut body = json!({
            "sort": ["_doc"],
            "size": options.page_size,
        });
        if let Some(query) = &options.query {
            body["query"] = query.clone();
        }
        body
    }

    /// Run the migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if a page fetch, a transform, or a bulk dispatch
    /// fails. Pages written before the failure stay written.
    pub async fn run<T>(&self, transform: &T) -> Result<MigrationStats>
    where
        T: DocumentTransform + ?Sized,
    {
        let start = std::time::Instant::now();
        let mut stats = MigrationStats::default();
        let source = &self.config.source;
        let options = &self.config.options;

        info!(
            "Starting migration {}/{}/{} -> {}/{}/{}",
            source.url,
            source.index,
            source.doc_type,
            self.config.destination.url,
            self.config.destination.index,
            self.config.destination.doc_type
        );
        if options.dry_run {
            info!("Dry run mode - not writing to destination");
        }

        let path = format!("{}/{}/_search", source.index, source.doc_type);
        let scroll_options = ScrollOptions {
            keep_alive: options.keep_alive,
            delay: options.scroll_delay,
        };
        let mut scroll = Scroll::open(
            &self.source,
            &path,
            &self.open_body(),
            options.open_keep_alive,
            scroll_options,
        )
        .await?;

        let progress = self.progress_bar(scroll.total_hits().unwrap_or(0));

        while let Some(page) = scroll.next_page().await? {
            let len = page.len() as u64;
            stats.extracted += len;
            stats.pages += 1;

            if let Err(e) = self.write_page(page, transform, &mut stats).await {
                progress.abandon();
                scroll.close().await;
                return Err(e);
            }
            progress.inc(len);
        }

        progress.finish_with_message("Migration complete");
        stats.duration_secs = start.elapsed().as_secs_f64();

        info!(
            "Migration complete: {} extracted, {} created, {} failed in {} pages, {:.2}s ({:.0} docs/sec)",
            stats.extracted,
            stats.created,
            stats.failed,
            stats.pages,
            stats.duration_secs,
            stats.throughput()
        );

        Ok(stats)
    }

    /// Transforms a page, then writes it as one bulk `create` request.
    async fn write_page<T>(&self, page: Page, transform: &T, stats: &mut MigrationStats) -> Result<()>
    where
        T: DocumentTransform + ?Sized,
    {
        let destination = &self.config.destination;
        let span = page
            .sort_span()
            .map(|(first, last)| format!("{} to {}", first, last));
        let number = page.number;

        // Every transform of the page must finish before anything is sent.
        let docs = try_join_all(page.hits.into_iter().map(|hit| transform.transform(hit))).await?;

        let mut request = BulkRequest::new();
        for doc in &docs {
            let target = BulkTarget {
                index: &destination.index,
                doc_type: &destination.doc_type,
                id: Some(&doc.id),
            };
            request.push(BulkAction::Create, &target, &doc.source)?;
        }

        info!(
            "Sending page {} ({}) to index {}...",
            number,
            span.as_deref().unwrap_or("unsorted"),
            destination.index
        );

        if self.config.options.dry_run {
            stats.created += request.len() as u64;
            return Ok(());
        }

        let response = self
            .destination
            .bulk(&destination.index, &destination.doc_type, &request)
            .await?;
        info!("Page {} written, errors: {}", number, response.errors);

        let mut failed = 0u64;
        for item in response.failed_items() {
            failed += 1;
            let detail = item
                .error
                .as_ref()
                .map_or_else(|| "no error details".to_string(), |e| e.to_string());
            warn!(
                "Document {} rejected with status {}: {}",
                item.id.as_deref().unwrap_or("?"),
                item.status,
                detail
            );
        }

        stats.failed += failed;
        stats.created += (request.len() as u64).saturating_sub(failed);
        Ok(())
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        create_progress_bar(total)
    }
}

/// Moves every document of `source` to `destination` through `transform`.
///
/// Uses default options apart from the inter-page `delay`.
///
/// # Errors
///
/// Returns an error if the endpoints are invalid, or if a page fetch, a
/// transform, or a bulk dispatch fails.
pub async fn migrate<T>(
    source: EndpointConfig,
    destination: EndpointConfig,
    transform: &T,
    delay: Duration,
) -> Result<MigrationStats>
where
    T: DocumentTransform + ?Sized,
{
    let config = MigrationConfig {
        source,
        destination,
        options: MigrationOptions {
            scroll_delay: delay,
            ..MigrationOptions::default()
        },
    };
    Pipeline::new(config)?.run(transform).await
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}
