pub mod clean;
pub mod client;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod rate_limit;
pub mod robots;
pub mod types;

pub use clean::clean_record;
pub use client::{FetchOptions, PageClient, PageClientConfig};
pub use error::ScraperError;
pub use extract::{extractor_for, SourceExtractor};
pub use rate_limit::{DomainPacer, RetryPolicy};
pub use types::{BasicInfo, ListingPage, Page, RawRecord};
