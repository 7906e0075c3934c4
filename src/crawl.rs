use anyhow::Context as _;
use tokio::task::JoinSet;
use url::Url;

use crate::budget;
use crate::extract;
use crate::project::ProjectDirs;

/// Trailing-slash differences do not distinguish targets.
fn url_match_key(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}

/// Scans a fetched document for stylesheet, script, and image references and
/// resolves them against the page's own absolute URL.
fn discover_assets(html: &str, base: &Url) -> anyhow::Result<Vec<(&'static str, Url)>> {
    const QUERIES: [(&str, &str, &str); 3] = [
        ("link[rel=\"stylesheet\"]", "href", "css"),
        ("script[src]", "src", "js"),
        ("img[src]", "src", "img"),
    ];

    let document = scraper::Html::parse_document(html);
    let mut assets: Vec<(&'static str, Url)> = Vec::new();

    for (query, attr, kind) in QUERIES {
        let selector = scraper::Selector::parse(query)
            .map_err(|err| anyhow::anyhow!("parse selector {query}: {err}"))?;
        for element in document.select(&selector) {
            let Some(reference) = element.attr(attr) else {
                continue;
            };
            if kind == "img" && (reference.starts_with("data:") || reference.starts_with("blob:"))
            {
                tracing::debug!(reference, "inline image reference; skipping");
                continue;
            }
            match base.join(reference) {
                Ok(resolved) => assets.push((kind, resolved)),
                Err(err) => {
                    tracing::warn!(reference, %err, "cannot resolve asset reference");
                }
            }
        }
    }

    Ok(assets)
}

/// Visits the target page once: captures its raw body as the project's root
/// HTML file when the response matches the requested URL, and mirrors every
/// referenced stylesheet, script, and image into the asset directories.
///
/// Asset downloads run as one task each; the call returns only after all of
/// them have finished. A failed asset is logged and dropped, a failed page
/// fetch aborts the whole visit.
pub async fn visit_page(
    client: &reqwest::Client,
    target: &Url,
    dirs: &ProjectDirs,
    max_folder_size: Option<u64>,
) -> anyhow::Result<()> {
    let response = client
        .get(target.clone())
        .send()
        .await
        .with_context(|| format!("GET {target}"))?;
    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let body = response
        .bytes()
        .await
        .with_context(|| format!("read page body: {target}"))?;

    if !content_type.starts_with("text/html") {
        tracing::info!(url = %final_url, content_type = %content_type, "response is not html; nothing to mirror");
        return Ok(());
    }

    if url_match_key(&final_url) == url_match_key(target) {
        let index_file = dirs.index_file();
        tokio::fs::write(&index_file, &body)
            .await
            .with_context(|| format!("write main page: {}", index_file.display()))?;
        tracing::info!(url = %final_url, bytes = body.len(), "captured main page");
    } else {
        tracing::info!(
            requested = %target,
            received = %final_url,
            "response url does not match target; main page not captured"
        );
    }

    let html = String::from_utf8_lossy(&body);
    let assets = discover_assets(&html, &final_url)?;

    let mut downloads = JoinSet::new();
    for (kind, asset_url) in assets {
        tracing::info!(kind, url = %asset_url, "asset found");
        let client = client.clone();
        let dirs = dirs.clone();
        downloads.spawn(async move {
            let check = budget::within_budget(dirs.root(), max_folder_size)?;
            if !check.ok {
                tracing::info!(
                    url = %asset_url,
                    current_size = check.current_size,
                    "folder size budget exceeded; skipping asset"
                );
                return Ok(None);
            }
            extract::download_asset(&client, &asset_url, &dirs).await
        });
    }

    while let Some(joined) = downloads.join_next().await {
        match joined {
            Ok(Ok(Some(path))) => tracing::debug!(path = %path.display(), "asset stored"),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => tracing::warn!(error = %format!("{err:#}"), "asset download failed"),
            Err(err) => tracing::warn!(%err, "asset task failed to run"),
        }
    }

    Ok(())
}
