//! Per-origin robots.txt cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use texting_robots::Robot;
use tokio::sync::OnceCell;

type Entry = Arc<OnceCell<Option<Arc<Robot>>>>;

/// Parsed robots.txt rules keyed by origin (`scheme://host[:port]`).
///
/// Each origin's file is fetched at most once. An origin whose file could
/// not be fetched or parsed allows everything.
pub struct RobotsCache {
    agent: String,
    entries: Mutex<HashMap<String, Entry>>,
}

impl std::fmt::Debug for RobotsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotsCache")
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}

impl RobotsCache {
    /// `user_agent` is reduced to its product token (`"MagicianDirectory"`
    /// for `"MagicianDirectory Bot (+https://…)"`) for group matching.
    #[must_use]
    pub fn new(user_agent: &str) -> Self {
        let agent = user_agent
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("*")
            .to_owned();
        Self {
            agent,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, origin: &str) -> Entry {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(origin.to_owned()).or_default())
    }

    /// Whether `url` may be fetched. `fetch_robots` is awaited only the
    /// first time `origin` is seen and returns the robots.txt body, if any.
    pub async fn allowed<F, Fut>(&self, origin: &str, url: &str, fetch_robots: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        let entry = self.entry(origin);
        let robot = entry
            .get_or_init(|| async move {
                let body = fetch_robots().await?;
                match Robot::new(&self.agent, body.as_bytes()) {
                    Ok(robot) => Some(Arc::new(robot)),
                    Err(e) => {
                        tracing::warn!(origin, error = %e, "unparseable robots.txt, allowing all");
                        None
                    }
                }
            })
            .await;

        robot.as_ref().is_none_or(|r| r.allowed(url))
    }
}
