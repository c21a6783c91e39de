//! Static engine against a local listing page, end to end through persistence

mod common;

use common::{Reply, TestServer, listing_html};
use gettio::extractors::StaticExtractor;
use gettio::{AppConfig, ExtractionError, Extractor, PersistOutcome, Persister, scrape_and_persist};

fn extractor() -> StaticExtractor {
    StaticExtractor::new(&AppConfig::default()).unwrap()
}

#[tokio::test]
async fn test_extracts_fields_from_served_html() {
    let html = listing_html(
        "Vintage Camera Lens",
        Some("$49.99"),
        &[
            ("/img/1/s-l500.jpg", Some("/img/1/s-l1600.jpg")),
            ("/img/1/s-l500.jpg", Some("/img/1/s-l1600.jpg")),
            ("/img/2/s-l140.jpg", None),
        ],
    );
    let site = TestServer::start(vec![("/item/123", Reply::Html(html))]);

    let result = extractor().extract(&site.url("/item/123")).await.unwrap();

    assert_eq!(result.title, "Vintage Camera Lens");
    assert_eq!(result.price, "$49.99");
    assert_eq!(
        result.image_urls.iter().collect::<Vec<_>>(),
        vec![
            site.url("/img/1/s-l1600.jpg").as_str(),
            site.url("/img/2/s-l140.jpg").as_str()
        ]
    );
}

#[tokio::test]
async fn test_absent_price_is_empty() {
    let html = listing_html("Lens Cap", None, &[]);
    let site = TestServer::start(vec![("/item/7", Reply::Html(html))]);

    let result = extractor().extract(&site.url("/item/7")).await.unwrap();

    assert_eq!(result.title, "Lens Cap");
    assert_eq!(result.price, "");
    assert!(result.image_urls.is_empty());
}

#[tokio::test]
async fn test_error_status_is_fatal() {
    let site = TestServer::start(vec![]);

    let err = extractor().extract(&site.url("/item/404")).await.unwrap_err();

    assert!(matches!(err, ExtractionError::Status { .. }));
}

#[tokio::test]
async fn test_malformed_url_is_fatal() {
    let err = extractor().extract("not a url").await.unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_scrape_and_persist_pipeline() {
    let html = listing_html(
        "Vintage Camera Lens",
        Some("$49.99"),
        &[
            ("/img/a/s-l500.jpg", Some("/img/a/s-l1600.jpg")),
            ("/img/b/s-l500.jpg", Some("/img/b/s-l1600.jpg")),
            ("/img/c/s-l140.jpg", None),
        ],
    );
    let site = TestServer::start(vec![
        ("/item/123", Reply::Html(html)),
        ("/img/a/s-l1600.jpg", Reply::Bytes(b"a".to_vec())),
        ("/img/b/s-l1600.jpg", Reply::Status(404)),
        ("/img/c/s-l140.jpg", Reply::Bytes(b"c".to_vec())),
    ]);
    let out = tempfile::tempdir().expect("tempdir");
    let persister = Persister::from_config(&AppConfig::default()).unwrap();

    let run = scrape_and_persist(&extractor(), &persister, &site.url("/item/123"), out.path())
        .await
        .unwrap();

    // The listing reports every discovered URL regardless of what was saved
    assert_eq!(run.listing.image_urls.len(), 3);

    let report = run.persisted.unwrap();
    assert_eq!(report.outcome(), PersistOutcome::Partial);
    assert_eq!(report.folder, out.path().join("Vintage_Camera"));
    assert_eq!(std::fs::read(report.folder.join("image_0.jpg")).unwrap(), b"a");
    assert!(!report.folder.join("image_1.jpg").exists());
    assert_eq!(site.hits("/img/c/s-l140.jpg"), 0);
}
