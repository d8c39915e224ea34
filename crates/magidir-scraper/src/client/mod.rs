//! HTTP page client: every outbound fetch goes through robots, per-domain
//! concurrency slots, pacing, and the retry policy.

mod origin;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;

use crate::error::ScraperError;
use crate::rate_limit::{DomainPacer, RetryPolicy, RetryReason};
use crate::robots::RobotsCache;
use crate::types::Page;

use origin::parse_target;

/// Settings for [`PageClient::new`].
#[derive(Debug, Clone)]
pub struct PageClientConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    pub default_delay: Duration,
    /// Per-domain pacing overrides, e.g. `("www.thebash.com", 3s)`.
    pub domain_delays: Vec<(String, Duration)>,
    /// In-flight requests allowed per domain.
    pub max_per_domain: usize,
    pub obey_robots: bool,
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip the retry policy: the first response or failure is final.
    pub dont_retry: bool,
}

#[derive(Debug)]
pub struct PageClient {
    client: Client,
    pacer: DomainPacer,
    retry: RetryPolicy,
    robots: Option<RobotsCache>,
    max_per_domain: usize,
    slots: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl PageClient {
    /// Builds the client with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ClientBuild`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(config: PageClientConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()
            .map_err(ScraperError::ClientBuild)?;

        let pacer = config
            .domain_delays
            .iter()
            .fold(DomainPacer::new(config.default_delay), |pacer, (domain, delay)| {
                pacer.with_delay(domain, *delay)
            });

        Ok(Self {
            client,
            pacer,
            retry: config.retry,
            robots: config
                .obey_robots
                .then(|| RobotsCache::new(&config.user_agent)),
            max_per_domain: config.max_per_domain.max(1),
            slots: Mutex::new(HashMap::new()),
        })
    }

    fn slot(&self, domain: &str) -> Arc<Semaphore> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(domain.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_domain))),
        )
    }

    /// Fetches `url`, honouring robots.txt, pacing, and the retry policy.
    ///
    /// A response that still matches the retry policy after all attempts is
    /// returned as `Ok`; the caller inspects [`Page::status`].
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if `url` is not an http(s) URL.
    /// - [`ScraperError::RobotsDisallowed`] if robots.txt forbids `url`.
    /// - [`ScraperError::Http`] on transport failure after all attempts.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> Result<Page, ScraperError> {
        let target = parse_target(url)?;

        if let Some(robots) = &self.robots {
            let robots_url = format!("{}/robots.txt", target.origin);
            let allowed = robots
                .allowed(&target.origin, url, || self.fetch_robots(&robots_url))
                .await;
            if !allowed {
                return Err(ScraperError::RobotsDisallowed {
                    url: url.to_owned(),
                });
            }
        }

        let slot = self.slot(&target.domain);
        let _permit = slot.acquire_owned().await.ok();

        self.fetch_with_retries(url, &target.domain, options).await
    }

    async fn fetch_robots(&self, robots_url: &str) -> Option<String> {
        let domain = parse_target(robots_url).ok()?.domain;
        match self
            .fetch_with_retries(robots_url, &domain, FetchOptions { dont_retry: true })
            .await
        {
            Ok(page) if page.is_success() => Some(page.body),
            Ok(page) => {
                tracing::debug!(url = robots_url, status = page.status, "no robots.txt");
                None
            }
            Err(e) => {
                tracing::warn!(url = robots_url, error = %e, "robots.txt fetch failed, allowing all");
                None
            }
        }
    }

    async fn fetch_with_retries(
        &self,
        url: &str,
        domain: &str,
        options: FetchOptions,
    ) -> Result<Page, ScraperError> {
        let max_retries = if options.dont_retry {
            0
        } else {
            self.retry.max_retries
        };
        let mut attempt = 0u32;

        loop {
            self.pacer.wait(domain).await;

            let reason = match self.send(url).await {
                Ok(page) => match self.retry.retry_reason(page.status, &page.body) {
                    Some(reason) if !options.dont_retry && attempt < max_retries => reason,
                    Some(reason) => {
                        if !options.dont_retry {
                            tracing::warn!(
                                url,
                                attempts = attempt + 1,
                                reason = %reason,
                                "giving up after retries"
                            );
                        }
                        return Ok(page);
                    }
                    None => return Ok(page),
                },
                Err(source) => {
                    if attempt >= max_retries {
                        tracing::error!(url, error = %source, "request failed");
                        return Err(ScraperError::Http {
                            url: url.to_owned(),
                            source,
                        });
                    }
                    RetryReason::Transport(source.to_string())
                }
            };

            attempt += 1;
            let delay = self.retry.backoff_delay(attempt);
            tracing::warn!(
                url,
                attempt,
                max_retries,
                delay_ms = delay.as_millis(),
                reason = %reason,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send(&self, url: &str) -> Result<Page, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(Page {
            url: final_url,
            status,
            body,
        })
    }
}
