#![cfg(feature = "cdp")]

//! Live-browser tests. They need a local Chrome, so run them explicitly:
//! `cargo test --test cdp_integration -- --ignored`

use pagesnap::host::{MemoryPreferences, MemorySink, ViewportProber};
use pagesnap::{Browser, CaptureConfig, CaptureService, Viewport};
use std::sync::{Arc, Once};
use tiny_http::{Response, Server};

static INIT_SERVER: Once = Once::new();

const TALL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Tall Page</title>
<style>
  body { margin: 0; }
  .band { height: 500px; }
  .band:nth-child(odd) { background: #c03030; }
  .band:nth-child(even) { background: #3030c0; }
</style>
</head>
<body>
<div class="band"></div><div class="band"></div>
<div class="band"></div><div class="band"></div>
</body>
</html>"#;

fn start_server() -> String {
    INIT_SERVER.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18093").unwrap();
            for request in server.incoming_requests() {
                let response = match request.url() {
                    "/tall" => Response::from_string(TALL_PAGE).with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<tiny_http::Header>()
                            .unwrap(),
                    ),
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18093".to_string()
}

fn service(sink: Arc<MemorySink>) -> CaptureService {
    CaptureService::new(
        CaptureConfig::default(),
        sink,
        Arc::new(MemoryPreferences::new()),
    )
}

#[tokio::test]
#[ignore]
async fn probe_reports_the_full_document_height() {
    let base = start_server();
    let browser = Browser::new(Viewport { width: 400, height: 300 })
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.unwrap();
    page.goto(&format!("{}/tall", base)).await.unwrap();

    let dims = page.probe_dimensions().await.unwrap();
    assert!(dims.total_height >= 2000, "{:?}", dims);
    assert!(dims.viewport_height > 0 && dims.viewport_height < dims.total_height);
    assert!(dims.viewport_width > 0 && dims.viewport_width <= 400);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn full_page_capture_of_a_tall_page() {
    let base = start_server();
    let browser = Browser::new(Viewport { width: 400, height: 300 })
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.unwrap();
    page.goto(&format!("{}/tall", base)).await.unwrap();
    let dims = page.probe_dimensions().await.unwrap();

    let sink = Arc::new(MemorySink::new());
    let target = page.target().await.unwrap();
    let saved = service(Arc::clone(&sink))
        .capture_full_page(&target, &page, &page)
        .await
        .expect("full-page capture failed");

    assert!(saved.filename.starts_with("full-page-screenshot-"));
    let (_, payload) = &sink.saved()[0];
    let decoded = image::load_from_memory(payload).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (dims.viewport_width, dims.total_height));

    // top band is red, second band is blue
    let top = decoded.get_pixel(10, 10);
    let second = decoded.get_pixel(10, 600);
    assert!(top[0] > 150 && top[2] < 100, "{:?}", top);
    assert!(second[2] > 150 && second[0] < 100, "{:?}", second);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn visible_capture_returns_a_png() {
    let base = start_server();
    let browser = Browser::new(Viewport { width: 320, height: 240 })
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.unwrap();
    page.goto(&format!("{}/tall", base)).await.unwrap();

    let sink = Arc::new(MemorySink::new());
    let target = page.target().await.unwrap();
    service(Arc::clone(&sink))
        .capture_visible(target.window, &page)
        .await
        .unwrap();

    let (name, payload) = &sink.saved()[0];
    assert!(name.ends_with(".png"));
    assert_eq!(&payload[0..8], b"\x89PNG\r\n\x1a\n");

    browser.close().await.unwrap();
}
