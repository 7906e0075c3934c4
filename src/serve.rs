use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::post;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::project::{CSS_DIR, IMG_DIR, INDEX_FILE, JS_DIR};

pub const SUBMIT_PATH: &str = "/submit";
pub const NO_DATA_MARKER: &str = "no_data";

const BIND_HOST: &str = "127.0.0.1";
const FIRST_PORT: u16 = 8080;
const STARTUP_GRACE: Duration = Duration::from_millis(100);

/// Interception behavior injected into every served HTML page: forms are
/// re-pointed at the submission endpoint, buttons outside a form collect
/// every visible field on the page, and a redirected response from the
/// endpoint is followed as a navigation.
const INTERCEPT_SCRIPT: &str = r#"<script>
document.addEventListener('DOMContentLoaded', function () {
    var FIELD_QUERY = 'input[type="text"], input[type="email"], input[type="password"], input[type="number"], textarea, select';

    function collectFields(root) {
        var payload = new URLSearchParams();
        root.querySelectorAll(FIELD_QUERY).forEach(function (field) {
            var key = field.name || field.id;
            if (key) {
                payload.append(key, field.value);
            }
        });
        return payload;
    }

    function post(payload) {
        fetch('/submit', {
            method: 'POST',
            headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
            body: payload.toString()
        })
            .then(function (response) {
                if (response.redirected) {
                    window.location.href = response.url;
                    return null;
                }
                return response.text();
            })
            .then(function (result) {
                if (result) {
                    console.log('submit result:', result);
                }
            })
            .catch(function (error) {
                console.error('submit failed:', error);
            });
    }

    document.querySelectorAll('form').forEach(function (form) {
        form.action = '/submit';
        form.method = 'POST';
        form.addEventListener('submit', function (event) {
            event.preventDefault();
            var payload = new URLSearchParams();
            new FormData(form).forEach(function (value, key) {
                if (typeof value === 'string') {
                    payload.append(key, value);
                }
            });
            collectFields(form).forEach(function (value, key) {
                if (!payload.has(key)) {
                    payload.append(key, value);
                }
            });
            post(payload);
        });
    });

    document.querySelectorAll('button, input[type="submit"]').forEach(function (button) {
        button.addEventListener('click', function (event) {
            if (button.closest('form')) {
                return;
            }
            event.preventDefault();
            post(collectFields(document));
        });
    });
});
</script>"#;

/// Immutable serving configuration captured once at startup and handed to
/// every request handler.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub project_path: PathBuf,
    pub redirect_target: Option<String>,
}

/// Binds the first free port at or above `FIRST_PORT`, then serves the
/// project in a background task. Returns once the listener has had a short
/// grace period; the server then lives for the rest of the process.
pub async fn start(
    project_path: &Path,
    redirect_target: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let (listener, port) = bind_first_free_port().await?;
    let config = ServerConfig {
        host: BIND_HOST.to_string(),
        port,
        project_path: project_path.to_path_buf(),
        redirect_target,
    };

    let app = router(Arc::new(config.clone()));
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(%err, "preview server terminated");
        }
    });
    tokio::time::sleep(STARTUP_GRACE).await;

    tracing::info!(
        host = %config.host,
        port = config.port,
        path = %config.project_path.display(),
        "preview server listening"
    );
    Ok(config)
}

/// Foreground variant for the `serve` subcommand: starts the server and
/// parks until ctrl-c.
pub async fn run(project_path: &Path, redirect_target: Option<String>) -> anyhow::Result<()> {
    let config = start(project_path, redirect_target).await?;
    tracing::info!("serving http://{}:{} until ctrl-c", config.host, config.port);
    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    Ok(())
}

async fn bind_first_free_port() -> anyhow::Result<(TcpListener, u16)> {
    for port in FIRST_PORT..=u16::MAX {
        match TcpListener::bind((BIND_HOST, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) => tracing::debug!(port, %err, "port unavailable"),
        }
    }
    anyhow::bail!("no free port between {FIRST_PORT} and {}", u16::MAX)
}

fn router(config: Arc<ServerConfig>) -> Router {
    Router::new()
        .nest_service("/css", ServeDir::new(config.project_path.join(CSS_DIR)))
        .nest_service("/js", ServeDir::new(config.project_path.join(JS_DIR)))
        .nest_service("/imgs", ServeDir::new(config.project_path.join(IMG_DIR)))
        .route(SUBMIT_PATH, post(handle_submit))
        .fallback(serve_page)
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

/// Resolves a request path to a file under the project root. Any component
/// that would escape the root is rejected.
fn resolve_page_path(project_path: &Path, request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let relative = if trimmed.is_empty() { INDEX_FILE } else { trimmed };

    let mut resolved = project_path.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

/// Splices the interception script in front of the closing body tag, or
/// appends it when the document has none.
fn inject_script(html: &str) -> String {
    match html.find("</body>") {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + INTERCEPT_SCRIPT.len() + 1);
            out.push_str(&html[..index]);
            out.push_str(INTERCEPT_SCRIPT);
            out.push('\n');
            out.push_str(&html[index..]);
            out
        }
        None => format!("{html}{INTERCEPT_SCRIPT}"),
    }
}

async fn serve_page(State(config): State<Arc<ServerConfig>>, uri: Uri) -> Response {
    let Some(file_path) = resolve_page_path(&config.project_path, uri.path()) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let content = match tokio::fs::read_to_string(&file_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return (StatusCode::NOT_FOUND, "not found").into_response();
        }
        Err(err) => {
            tracing::warn!(path = %file_path.display(), %err, "cannot read page file");
            return (StatusCode::INTERNAL_SERVER_ERROR, "cannot read file").into_response();
        }
    };

    Html(inject_script(&content)).into_response()
}

/// Decodes URL-encoded fields, keeping the first non-empty value per name in
/// encounter order.
fn decode_form_fields(input: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for (name, value) in url::form_urlencoded::parse(input.as_bytes()).into_owned() {
        if value.is_empty() {
            continue;
        }
        if fields.iter().any(|(seen, _)| *seen == name) {
            continue;
        }
        fields.push((name, value));
    }
    fields
}

/// Keeps only the non-empty string values of a flat JSON object, in the
/// object's own field order.
fn decode_json_fields(object: &serde_json::Map<String, serde_json::Value>) -> Vec<(String, String)> {
    object
        .iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::String(text) if !text.is_empty() => {
                Some((name.clone(), text.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Renders decoded fields as the canonical `[name]:value/...` line.
fn canonical_line(fields: &[(String, String)]) -> String {
    if fields.is_empty() {
        return NO_DATA_MARKER.to_string();
    }
    fields
        .iter()
        .map(|(name, value)| format!("[{name}]:{value}"))
        .collect::<Vec<_>>()
        .join("/")
}

async fn handle_submit(
    State(config): State<Arc<ServerConfig>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let fields = if content_type.starts_with("application/json") {
        let mut fields = decode_form_fields(query.as_deref().unwrap_or_default());
        if fields.is_empty() {
            match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&body) {
                Ok(object) => fields = decode_json_fields(&object),
                Err(err) => {
                    tracing::debug!(%err, "submission body is not a flat json object");
                }
            }
        }
        fields
    } else {
        decode_form_fields(&body)
    };

    let line = canonical_line(&fields);
    tracing::info!(submission = %line, "form submission received");

    if let Some(target) = config.redirect_target.as_deref() {
        tracing::info!(target, "redirecting submission");
        return (
            StatusCode::FOUND,
            [(header::LOCATION, target.to_string())],
        )
            .into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        line,
    )
        .into_response()
}
