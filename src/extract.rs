use std::path::PathBuf;

use anyhow::Context as _;
use url::Url;

use crate::project::{CSS_DIR, IMG_DIR, JS_DIR, ProjectDirs};

const FALLBACK_NAME: &str = "unnamed_file";

/// Maps a recognized asset extension to its directory inside the project.
fn extension_dir(extension: &str) -> Option<&'static str> {
    match extension {
        "css" => Some(CSS_DIR),
        "js" => Some(JS_DIR),
        "jpg" | "jpeg" | "gif" | "png" | "svg" => Some(IMG_DIR),
        _ => None,
    }
}

/// Strips any query suffix and replaces characters that are illegal in
/// filenames, so a remote-controlled name can never escape the asset
/// directory or fail the write.
pub fn sanitize_filename(name: &str) -> String {
    let name = name.split('?').next().unwrap_or_default();

    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Predicts where an asset URL lands inside the project, or `None` when its
/// extension is not a kind we mirror (e.g. extension-less CDN URLs).
pub fn local_asset_path(url: &Url, dirs: &ProjectDirs) -> Option<PathBuf> {
    let base = url.path().rsplit('/').next().unwrap_or_default();
    let base = sanitize_filename(base);

    let (_, extension) = base.rsplit_once('.')?;
    let dir = extension_dir(&extension.to_ascii_lowercase())?;
    Some(dirs.subdir(dir).join(base))
}

/// Fetches one asset and writes it under the matching class directory.
/// Returns the written path, or `None` when the extension is unsupported.
pub async fn download_asset(
    client: &reqwest::Client,
    url: &Url,
    dirs: &ProjectDirs,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(dest) = local_asset_path(url, dirs) else {
        tracing::debug!(url = %url, "unsupported asset extension; skipping");
        return Ok(None);
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("GET {url}"))?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("read asset body: {url}"))?;

    tokio::fs::write(&dest, &bytes)
        .await
        .with_context(|| format!("write asset: {}", dest.display()))?;

    Ok(Some(dest))
}
