use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use sitemirror::clone::{CloneConfig, clone_all};

static LOGO_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

const MAIN_PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <link rel="stylesheet" href="theme/site.css?v=3">
    <script src="/static/app.js"></script>
  </head>
  <body>
    <img src="assets/logo.png">
    <img src="data:image/png;base64,xx">
  </body>
</html>
"#;

const SITE_CSS: &str = "body { margin: 0; }\n";
const APP_JS: &str = "console.log('app');\n";

fn spawn_origin_server() -> (String, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let addr = server.server_addr();
    let base_url = format!("http://{addr}");

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            let path = url.split('?').next().unwrap_or(&url);

            enum Body {
                Text(&'static str),
                Bytes(&'static [u8]),
            }

            let (status, body, content_type) = match path {
                "/" => (200, Body::Text(MAIN_PAGE), "text/html; charset=utf-8"),
                "/theme/site.css" => (200, Body::Text(SITE_CSS), "text/css"),
                "/static/app.js" => (200, Body::Text(APP_JS), "application/javascript"),
                "/assets/logo.png" => (200, Body::Bytes(LOGO_PNG), "image/png"),
                _ => (404, Body::Text("not found"), "text/plain"),
            };

            let mut response = match body {
                Body::Text(text) => tiny_http::Response::from_string(text),
                Body::Bytes(bytes) => tiny_http::Response::from_data(bytes.to_vec()),
            }
            .with_status_code(status);
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                    .expect("content-type header");
            response.add_header(header);
            let _ = request.respond(response);
        }
    });

    (base_url, shutdown_tx, handle)
}

#[tokio::test(flavor = "multi_thread")]
async fn clone_mirrors_assets_and_rewrites_links() {
    let (base_url, shutdown_tx, handle) = spawn_origin_server();
    let out = tempfile::tempdir().unwrap();

    let config = CloneConfig {
        urls: vec![base_url.clone()],
        project_id: Some("proj".to_string()),
        out_dir: out.path().to_path_buf(),
        ..CloneConfig::default()
    };
    let report = clone_all(&config).await.unwrap();

    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
    let project = out.path().join("proj");
    assert_eq!(report.project_paths, vec![project.clone()]);

    assert_eq!(
        std::fs::read_to_string(project.join("css").join("site.css")).unwrap(),
        SITE_CSS
    );
    assert_eq!(
        std::fs::read_to_string(project.join("js").join("app.js")).unwrap(),
        APP_JS
    );
    assert_eq!(
        std::fs::read(project.join("imgs").join("logo.png")).unwrap(),
        LOGO_PNG
    );

    // The inlined data: image must not produce a file.
    let img_count = std::fs::read_dir(project.join("imgs")).unwrap().count();
    assert_eq!(img_count, 1);

    let index = std::fs::read_to_string(project.join("index.html")).unwrap();
    assert!(index.contains(r#"href="css/site.css""#));
    assert!(index.contains(r#"src="js/app.js""#));
    assert!(index.contains(r#"src="imgs/logo.png""#));
    assert!(index.contains("data:image/png;base64,xx"));
    assert!(!index.contains("theme/site.css"));

    let _ = shutdown_tx.send(());
    let _ = handle.join();
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_budget_skips_assets_but_keeps_the_page() {
    let (base_url, shutdown_tx, handle) = spawn_origin_server();
    let out = tempfile::tempdir().unwrap();

    let config = CloneConfig {
        urls: vec![base_url.clone()],
        project_id: Some("proj".to_string()),
        max_folder_size: Some(1),
        out_dir: out.path().to_path_buf(),
        ..CloneConfig::default()
    };
    let report = clone_all(&config).await.unwrap();
    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);

    let project = out.path().join("proj");
    assert!(!std::fs::read_to_string(project.join("index.html")).unwrap().is_empty());
    assert_eq!(std::fs::read_dir(project.join("css")).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(project.join("js")).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(project.join("imgs")).unwrap().count(), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.join();
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_target_does_not_abort_the_batch() {
    let (base_url, shutdown_tx, handle) = spawn_origin_server();
    let out = tempfile::tempdir().unwrap();

    let config = CloneConfig {
        urls: vec!["".to_string(), base_url.clone()],
        project_id: Some("proj".to_string()),
        out_dir: out.path().to_path_buf(),
        ..CloneConfig::default()
    };
    let report = clone_all(&config).await.unwrap();

    assert_eq!(report.project_paths, vec![out.path().join("proj")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "");

    let _ = shutdown_tx.send(());
    let _ = handle.join();
}
