use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

/// No pacing, no retries, no robots: the crawl logic is what is under test.
fn test_client() -> PageClient {
    PageClient::new(PageClientConfig {
        user_agent: "magidir-test/0.1".to_string(),
        timeout_secs: 5,
        retry: RetryPolicy::new(0, 0, &[500, 502, 503, 504, 408, 429]),
        default_delay: Duration::ZERO,
        domain_delays: Vec::new(),
        max_per_domain: 4,
        obey_robots: false,
    })
    .expect("failed to build test PageClient")
}

fn limits(max_errors: usize) -> CrawlLimits {
    CrawlLimits {
        max_concurrent: 4,
        max_errors,
    }
}

fn source(tag: SourceKind, server: &MockServer, listing_path: &str) -> SourceConfig {
    SourceConfig {
        tag,
        start_url: format!("{}{listing_path}", server.uri()),
        delay_ms: Some(0),
        enabled: true,
    }
}

/// A thebash listing page. Each card is `(vendor id, name, rating)`.
fn bash_listing(cards: &[(u32, &str, &str)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for (id, name, rating) in cards {
        html.push_str(&format!(
            r#"<div class="vendor-card" data-vendor-id="{id}">
                 <a class="vendor-card__link" href="/thebash/vendor/{id}"><h3 class="vendor-card__name">{name}</h3></a>
                 <span class="vendor-card__categories">close up magic</span>
                 <span class="vendor-card__location">Austin, TX</span>
                 <span class="vendor-card__rating-score">{rating}</span>
                 <span class="vendor-card__rating-count">(10 reviews)</span>
               </div>"#
        ));
    }
    if let Some(next) = next {
        html.push_str(&format!(r#"<a class="pagination__next" href="{next}">Next</a>"#));
    }
    html.push_str("</body></html>");
    html
}

const BASH_PROFILE: &str = r#"<html><body>
  <div class="vendor-bio">Close-up and stage magic.</div>
  <span class="contact-phone">512.555.0100</span>
  <div class="starting-price">From $300</div>
</body></html>"#;

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_bash_profiles(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/thebash/vendor/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BASH_PROFILE))
        .mount(server)
        .await;
}

#[tokio::test]
async fn second_crawl_updates_changed_record_and_adds_new_one() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("magicians.json");
    let client = test_client();

    // First run: two thebash pages plus one gigsalad page.
    mount_html(
        &server,
        "/thebash/magicians",
        bash_listing(&[(1, "Amazing Al", "4.5")], Some("/thebash/magicians?page=2")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/thebash/magicians"))
        .and(wiremock::matchers::query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(bash_listing(&[(2, "Bea Bright", "4.0")], None)),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    mount_bash_profiles(&server).await;
    mount_html(
        &server,
        "/gigsalad/magicians",
        r#"<html><body><div class="performer-card" data-performer-id="77">
             <a class="performer-link" href="/gigsalad/sammy"><span class="performer-name">Sammy Sleight</span></a>
             <div class="performer-location">Denver, CO</div>
           </div></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(
        &server,
        "/gigsalad/sammy",
        r#"<html><body><div class="bio-content">Kids shows.</div></body></html>"#.to_string(),
    )
    .await;

    let sources = vec![
        source(SourceKind::TheBash, &server, "/thebash/magicians"),
        source(SourceKind::GigSalad, &server, "/gigsalad/magicians"),
    ];
    let first = crawl(&client, &sources, DatasetStore::load(&data).unwrap(), limits(5))
        .await
        .expect("first crawl should complete");
    assert_eq!(first.inserted, 3);
    assert_eq!(first.errors, 0);

    let before = DatasetStore::load(&data).unwrap().dataset().clone();
    assert_eq!(before.total_count, 3);
    let names: Vec<&str> = before.magicians.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Amazing Al", "Bea Bright", "Sammy Sleight"]);

    let al = &before.magicians[0];
    assert_eq!(al.id, "tb_1");
    assert_eq!(al.source.as_deref(), Some("thebash"));
    assert_eq!(al.services, vec!["Close-up Magic"]);
    assert_eq!(
        al.contact.as_ref().and_then(|c| c.phone.as_deref()),
        Some("(512) 555-0100")
    );
    assert_eq!(al.details["description"], "Close-up and stage magic.");

    // Second run: Al's rating changed and Cal is new.
    server.reset().await;
    mount_html(
        &server,
        "/thebash/magicians",
        bash_listing(&[(1, "Amazing Al", "4.9"), (3, "Cal Cardini", "5.0")], None),
    )
    .await;
    mount_bash_profiles(&server).await;

    let second = crawl(
        &client,
        &sources[..1],
        DatasetStore::load(&data).unwrap(),
        limits(5),
    )
    .await
    .expect("second crawl should complete");
    assert_eq!(second.updated, 1);
    assert_eq!(second.inserted, 1);

    let after = DatasetStore::load(&data).unwrap().dataset().clone();
    assert_eq!(after.total_count, before.total_count + 1);
    let al = after.magicians.iter().find(|r| r.id == "tb_1").unwrap();
    assert_eq!(al.rating, Some(4.9));
}

#[tokio::test]
async fn bad_card_is_skipped_without_stopping_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("magicians.json");

    let mut listing = bash_listing(&[(1, "Amazing Al", "4.5")], None);
    listing = listing.replace(
        "</body>",
        r#"<div class="vendor-card" data-vendor-id="9"><a class="vendor-card__link" href="/thebash/vendor/9"></a></div></body>"#,
    );
    mount_html(&server, "/thebash/magicians", listing).await;
    mount_bash_profiles(&server).await;

    let summary = crawl(
        &test_client(),
        &[source(SourceKind::TheBash, &server, "/thebash/magicians")],
        DatasetStore::load(&data).unwrap(),
        limits(5),
    )
    .await
    .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.merged, 1);
    assert_eq!(DatasetStore::load(&data).unwrap().dataset().total_count, 1);
}

#[tokio::test]
async fn error_threshold_stops_crawl_without_writing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("magicians.json");

    mount_html(
        &server,
        "/thebash/magicians",
        bash_listing(&[(1, "A", "1"), (2, "B", "2"), (3, "C", "3")], None),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/thebash/vendor/\d+$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = crawl(
        &test_client(),
        &[source(SourceKind::TheBash, &server, "/thebash/magicians")],
        DatasetStore::load(&data).unwrap(),
        limits(2),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("not written"), "got: {err}");
    assert!(!data.exists());
}

#[tokio::test]
async fn pagination_cycle_is_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("magicians.json");

    // Page 1 links to page 2, which links back to page 1.
    Mock::given(method("GET"))
        .and(path("/thebash/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(bash_listing(&[(1, "Al", "4")], Some("/thebash/b"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thebash/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(bash_listing(&[(1, "Al", "4")], Some("/thebash/a"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thebash/vendor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BASH_PROFILE))
        .expect(1)
        .mount(&server)
        .await;

    let summary = crawl(
        &test_client(),
        &[source(SourceKind::TheBash, &server, "/thebash/a")],
        DatasetStore::load(&data).unwrap(),
        limits(5),
    )
    .await
    .unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.merged, 1);
}

#[test]
fn listing_pages_are_capped_per_source() {
    let mut run = Crawl::new(DatasetStore::with_dataset(
        "unused.json",
        magidir_core::Dataset::default(),
    ));
    for n in 0..MAX_LISTING_PAGES + 5 {
        run.enqueue_listing(SourceKind::Bark, format!("https://www.bark.com/m?page={n}"));
    }
    run.enqueue_listing(SourceKind::GigSalad, "https://www.gigsalad.com/m".to_string());

    assert_eq!(run.queue.len(), MAX_LISTING_PAGES + 1);
}

#[test]
fn robots_skips_are_not_errors() {
    let mut run = Crawl::new(DatasetStore::with_dataset(
        "unused.json",
        magidir_core::Dataset::default(),
    ));
    run.record_error(
        SourceKind::Bark,
        "bark_1",
        &ScraperError::RobotsDisallowed {
            url: "https://www.bark.com/private".to_string(),
        },
    );
    assert_eq!(run.summary.skipped, 1);
    assert_eq!(run.summary.errors, 0);
}
