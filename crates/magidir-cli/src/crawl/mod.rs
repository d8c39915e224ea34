//! Crawl orchestration for the `crawl` command.
//!
//! Listing and profile fetches are tasks on one work queue. Completed
//! listing pages enqueue their profile pages and the next listing page;
//! completed profile pages are cleaned and upserted into the store. The
//! loop below is the only writer to the store, and the dataset is written
//! once, after the queue drains.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use anyhow::Context;
use futures::stream::{FuturesUnordered, StreamExt};
use magidir_core::{AppConfig, SourceConfig, SourceKind};
use magidir_scraper::{
    clean_record, extractor_for, BasicInfo, FetchOptions, ListingPage, Page, PageClient,
    PageClientConfig, RawRecord, RetryPolicy, ScraperError,
};
use magidir_store::{DatasetStore, UpsertOutcome};

/// Listing pages followed per source before pagination is cut off.
pub(crate) const MAX_LISTING_PAGES: usize = 200;

#[derive(Debug, Clone, Copy)]
pub(crate) struct CrawlLimits {
    /// Fetches in flight across all domains.
    pub max_concurrent: usize,
    /// Errors at which the crawl stops without writing. `0` disables.
    pub max_errors: usize,
}

impl CrawlLimits {
    pub(crate) fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent: config.scraper_max_concurrent_requests,
            max_errors: config.scraper_max_errors,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CrawlSummary {
    pub pages: usize,
    pub merged: usize,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    /// URLs skipped because robots.txt disallows them.
    pub skipped: usize,
    pub errors: usize,
}

pub(crate) fn build_page_client(
    config: &AppConfig,
    sources: &[SourceConfig],
) -> anyhow::Result<PageClient> {
    let domain_delays = sources
        .iter()
        .filter_map(|s| {
            s.domain()
                .map(|domain| (domain, Duration::from_millis(s.effective_delay_ms())))
        })
        .collect();

    PageClient::new(PageClientConfig {
        user_agent: config.scraper_user_agent.clone(),
        timeout_secs: config.scraper_request_timeout_secs,
        retry: RetryPolicy::new(
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_ms,
            &config.scraper_retry_http_codes,
        ),
        default_delay: Duration::from_millis(config.scraper_default_delay_ms),
        domain_delays,
        max_per_domain: config.scraper_max_concurrent_per_domain,
        obey_robots: config.scraper_obey_robots,
    })
    .map_err(|e| anyhow::anyhow!("failed to build page client: {e}"))
}

enum Task {
    Listing { source: SourceKind, url: String },
    Detail { basic: BasicInfo },
}

enum TaskOutcome {
    Listing {
        source: SourceKind,
        url: String,
        result: Result<ListingPage, ScraperError>,
    },
    Detail {
        id: String,
        source: SourceKind,
        result: Result<RawRecord, ScraperError>,
    },
}

async fn fetch_ok(client: &PageClient, url: &str) -> Result<Page, ScraperError> {
    client
        .fetch(url, FetchOptions::default())
        .await?
        .error_for_status()
}

async fn run_task(client: &PageClient, task: Task) -> TaskOutcome {
    match task {
        Task::Listing { source, url } => {
            let result = fetch_ok(client, &url)
                .await
                .map(|page| extractor_for(source).parse_listing_page(&page));
            TaskOutcome::Listing {
                source,
                url,
                result,
            }
        }
        Task::Detail { basic } => {
            let id = basic.id.clone();
            let source = basic.source;
            let result = match fetch_ok(client, &basic.profile_url).await {
                Ok(page) => extractor_for(source).parse_detail_page(&page, basic),
                Err(e) => Err(e),
            };
            TaskOutcome::Detail { id, source, result }
        }
    }
}

/// Queue and bookkeeping for one crawl. Owns the store.
struct Crawl {
    store: DatasetStore,
    queue: VecDeque<Task>,
    /// Every URL ever enqueued, so pagination cycles and profiles listed on
    /// several pages are fetched once.
    seen: HashSet<String>,
    listing_pages: HashMap<SourceKind, usize>,
    summary: CrawlSummary,
}

impl Crawl {
    fn new(store: DatasetStore) -> Self {
        Self {
            store,
            queue: VecDeque::new(),
            seen: HashSet::new(),
            listing_pages: HashMap::new(),
            summary: CrawlSummary::default(),
        }
    }

    fn enqueue_listing(&mut self, source: SourceKind, url: String) {
        let pages = self.listing_pages.entry(source).or_insert(0);
        if *pages >= MAX_LISTING_PAGES {
            tracing::warn!(source = %source, url, "listing page limit reached, not following");
            return;
        }
        if self.seen.insert(url.clone()) {
            *pages += 1;
            self.queue.push_back(Task::Listing { source, url });
        }
    }

    fn enqueue_detail(&mut self, basic: BasicInfo) {
        if self.seen.insert(basic.profile_url.clone()) {
            self.queue.push_back(Task::Detail { basic });
        }
    }

    fn handle(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Listing {
                source,
                url,
                result: Ok(listing),
            } => {
                self.summary.pages += 1;
                tracing::info!(
                    source = %source,
                    url,
                    cards = listing.items.len(),
                    "listing page parsed"
                );
                for item in listing.items {
                    match item {
                        Ok(basic) => self.enqueue_detail(basic),
                        Err(e) => self.record_error(source, &url, &e),
                    }
                }
                if let Some(next) = listing.next_page {
                    self.enqueue_listing(source, next);
                }
            }
            TaskOutcome::Detail {
                source,
                result: Ok(raw),
                ..
            } => {
                self.summary.pages += 1;
                self.merge(source, raw);
            }
            TaskOutcome::Listing {
                source,
                url,
                result: Err(e),
            } => self.record_error(source, &url, &e),
            TaskOutcome::Detail {
                id,
                source,
                result: Err(e),
            } => self.record_error(source, &id, &e),
        }
    }

    fn merge(&mut self, source: SourceKind, raw: RawRecord) {
        match clean_record(raw) {
            Ok(record) => {
                let id = record.id.clone();
                match self.store.upsert(record) {
                    UpsertOutcome::Inserted => self.summary.inserted += 1,
                    UpsertOutcome::Updated => self.summary.updated += 1,
                }
                self.summary.merged += 1;
                tracing::debug!(source = %source, id, "record merged");
            }
            Err(e) => {
                self.summary.rejected += 1;
                tracing::warn!(source = %source, error = %e, "record rejected");
            }
        }
    }

    /// `item` is the listing URL or record id the error belongs to.
    fn record_error(&mut self, source: SourceKind, item: &str, error: &ScraperError) {
        if let ScraperError::RobotsDisallowed { url } = error {
            self.summary.skipped += 1;
            tracing::warn!(source = %source, url, "skipping URL disallowed by robots.txt");
            return;
        }
        self.summary.errors += 1;
        tracing::error!(source = %source, item, error = %error, "crawl error");
    }
}

/// Crawls `sources` to exhaustion, merging into `store`, then writes the
/// dataset once.
///
/// # Errors
///
/// Returns an error when the error count reaches `limits.max_errors` (the
/// dataset file is left as it was) or when the final write fails.
pub(crate) async fn crawl(
    client: &PageClient,
    sources: &[SourceConfig],
    store: DatasetStore,
    limits: CrawlLimits,
) -> anyhow::Result<CrawlSummary> {
    let max_concurrent = limits.max_concurrent.max(1);
    let mut run = Crawl::new(store);
    for source in sources {
        run.enqueue_listing(source.tag, source.start_url.clone());
    }

    tracing::info!(
        sources = sources.len(),
        existing = run.store.dataset().len(),
        "crawl started"
    );

    let mut in_flight = FuturesUnordered::new();
    loop {
        while in_flight.len() < max_concurrent {
            let Some(task) = run.queue.pop_front() else {
                break;
            };
            in_flight.push(run_task(client, task));
        }

        let Some(outcome) = in_flight.next().await else {
            break;
        };
        run.handle(outcome);

        if limits.max_errors > 0 && run.summary.errors >= limits.max_errors {
            tracing::error!(
                errors = run.summary.errors,
                max_errors = limits.max_errors,
                merged = run.summary.merged,
                "error threshold reached, stopping crawl without writing"
            );
            anyhow::bail!(
                "crawl stopped after {} errors; dataset not written",
                run.summary.errors
            );
        }
    }

    let Crawl { store, summary, .. } = run;
    let dataset = store.finalize().context("failed to write dataset")?;

    tracing::info!(
        pages = summary.pages,
        merged = summary.merged,
        inserted = summary.inserted,
        updated = summary.updated,
        rejected = summary.rejected,
        skipped = summary.skipped,
        errors = summary.errors,
        total_count = dataset.total_count,
        "crawl complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
