//! Integration tests for the wayfinder-adapters crate.
//!
//! Providers are pointed at canned local HTTP servers so parsing, caching and
//! error mapping run end-to-end without touching the public APIs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wayfinder_adapters::{
    KnowledgeBase, OpenMeteoWeather, OverpassPoi, PoiProvider, ProviderError, RetrievalService,
    WeatherProvider,
};

/// Serve `body` with `status` to every connection; returns the base URL and
/// a hit counter.
async fn canned_server(status: u16, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), hits)
}

/// Consume headers and any declared body so the socket closes cleanly.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}

const GEOCODING: &str =
    r#"{"results":[{"name":"Barcelona","latitude":41.38879,"longitude":2.15899}]}"#;
const FORECAST: &str = r#"{"daily":{
    "time":["2026-05-01","2026-05-02","2026-05-03"],
    "weathercode":[1,61,2],
    "temperature_2m_max":[21.4,18.2,22.0],
    "temperature_2m_min":[14.1,12.3,15.0],
    "precipitation_probability_max":[10,80,20]}}"#;
const OVERPASS: &str = r#"{"elements":[
    {"type":"node","lat":41.4036,"lon":2.1744,"tags":{"name":"Sagrada Familia","tourism":"attraction"}},
    {"type":"node","lat":41.3853,"lon":2.1809,"tags":{"name":"Museu Picasso","tourism":"museum"}},
    {"type":"node","lat":41.39,"lon":2.17,"tags":{"tourism":"attraction"}}]}"#;

// ═══════════════════════════════════════════════════════════════════════
//  Weather
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn weather_fetch_parses_and_caches() {
    let (geo_url, geo_hits) = canned_server(200, GEOCODING).await;
    let (forecast_url, forecast_hits) = canned_server(200, FORECAST).await;
    let weather = OpenMeteoWeather::new().with_endpoints(geo_url, forecast_url);

    let record = weather.fetch("Barcelona").await.unwrap();
    assert_eq!(weather.id(), "open-meteo");
    assert_eq!(record.location, "Barcelona");
    assert_eq!(record.days.len(), 3);
    assert!(record.days[1].is_wet());
    assert_eq!(
        record.summary(),
        "Temp range next days: 12-22°C, 1 of 3 days wet"
    );

    // Same location, different case: served from cache.
    let again = weather.fetch("  barcelona ").await.unwrap();
    assert_eq!(again, record);
    assert_eq!(geo_hits.load(Ordering::SeqCst), 1);
    assert_eq!(forecast_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn weather_unknown_location() {
    let (geo_url, _) = canned_server(200, r#"{"generationtime_ms":0.3}"#).await;
    let (forecast_url, forecast_hits) = canned_server(200, FORECAST).await;
    let weather = OpenMeteoWeather::new().with_endpoints(geo_url, forecast_url);

    let err = weather.fetch("Atlantis").await.unwrap_err();
    assert!(matches!(err, ProviderError::LocationNotFound { .. }));
    assert_eq!(forecast_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn weather_server_error_is_retried_then_reported() {
    let (geo_url, geo_hits) = canned_server(503, "{}").await;
    let weather = OpenMeteoWeather::new()
        .with_endpoints(geo_url, "http://127.0.0.1:9")
        .with_max_retries(1);

    let err = weather.fetch("Barcelona").await.unwrap_err();
    assert!(matches!(err, ProviderError::BadStatus { status: 503, .. }));
    assert_eq!(geo_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn weather_unreachable_endpoint() {
    let weather = OpenMeteoWeather::new()
        .with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9")
        .with_max_retries(0);
    let err = weather.fetch("Barcelona").await.unwrap_err();
    assert!(matches!(err, ProviderError::RequestFailed { .. }));
}

// ═══════════════════════════════════════════════════════════════════════
//  Points of interest
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn poi_fetch_returns_named_places() {
    let (url, hits) = canned_server(200, OVERPASS).await;
    let poi = OverpassPoi::new().with_endpoint(url);

    let places = poi.fetch("Barcelona").await.unwrap();
    assert_eq!(poi.id(), "openstreetmap");
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].name, "Sagrada Familia");
    assert!(places[1].is_indoor());

    poi.fetch("BARCELONA").await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn poi_client_error_is_not_retried() {
    let (url, hits) = canned_server(400, r#"{"remark":"bad query"}"#).await;
    let poi = OverpassPoi::new().with_endpoint(url).with_max_retries(3);

    let err = poi.fetch("Barcelona").await.unwrap_err();
    assert!(matches!(err, ProviderError::BadStatus { status: 400, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Knowledge base
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn knowledge_base_loads_directory_recursively() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("barcelona.md"),
        "# Barcelona\n\n## Food\n\nTapas and vermouth in Gracia.\n\n## Art\n\nPicasso Museum in El Born.\n",
    )
    .unwrap();
    std::fs::create_dir(dir.path().join("asia")).unwrap();
    std::fs::write(
        dir.path().join("asia").join("tokyo.md"),
        "# Tokyo\n\nStay near Shinjuku for rail connections. Business hotels are compact.\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored tapas").unwrap();

    let kb = KnowledgeBase::from_dir(dir.path()).unwrap();
    assert_eq!(kb.file_count(), 2);
    assert_eq!(kb.len(), 4);

    let hits = kb.search("tapas Barcelona", 5).await.unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].source_id, "barcelona.md");
    assert!(hits.iter().all(|s| s.source_id != "notes.txt"));

    let tokyo = kb.search("hotel Tokyo", 2).await.unwrap();
    assert_eq!(tokyo[0].source_id, "tokyo.md");
    assert!(tokyo.len() <= 2);
}

#[tokio::test]
async fn knowledge_base_missing_directory() {
    let err = KnowledgeBase::from_dir("/definitely/not/here").unwrap_err();
    assert!(matches!(err, ProviderError::Knowledge { .. }));
}

#[tokio::test]
async fn empty_knowledge_base_returns_no_snippets() {
    let dir = tempfile::tempdir().unwrap();
    let kb = KnowledgeBase::from_dir(dir.path()).unwrap();
    assert!(kb.is_empty());
    assert!(kb.search("Barcelona", 5).await.unwrap().is_empty());
}
