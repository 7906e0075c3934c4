use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::cookie::Jar;
use url::Url;

use crate::budget;
use crate::crawl;
use crate::project::ProjectDirs;
use crate::rewrite;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs for one clone batch.
#[derive(Debug, Clone, Default)]
pub struct CloneConfig {
    /// Target URLs; bare domains are upgraded to https.
    pub urls: Vec<String>,
    pub user_agent: Option<String>,
    /// Proxy for all requests, e.g. `http://127.0.0.1:8080`.
    pub proxy: Option<String>,
    /// Pre-seeded `name=value` cookie strings, applied per target origin.
    pub cookies: Vec<String>,
    /// Folder name for the clone output; a random UUID when empty.
    pub project_id: Option<String>,
    /// Byte ceiling for each project directory; `None` or 0 is unlimited.
    pub max_folder_size: Option<u64>,
    /// Directory that receives the project folders.
    pub out_dir: PathBuf,
}

impl CloneConfig {
    fn budget(&self) -> Option<u64> {
        self.max_folder_size.filter(|limit| *limit > 0)
    }
}

/// Result of one clone batch. A failed target does not abort the rest, so
/// both lists can be populated at once.
#[derive(Debug, Default)]
pub struct CloneReport {
    pub project_paths: Vec<PathBuf>,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl CloneReport {
    pub fn first_project(&self) -> Option<&Path> {
        self.project_paths.first().map(PathBuf::as_path)
    }
}

/// Accepts an absolute http/https URL, or upgrades a bare domain into one.
pub fn normalize_target(input: &str) -> anyhow::Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("target url is empty");
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let parsed =
        Url::parse(&candidate).with_context(|| format!("parse target url: {input}"))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("target url must be http/https: {parsed}");
    }
    if parsed.host_str().is_none() {
        anyhow::bail!("target url must have a host: {parsed}");
    }
    Ok(parsed)
}

/// Parses whitespace-separated `name=value` cookie pairs; a trailing `;` on
/// a value is tolerated. A field without `=` is an input error.
fn parse_cookie_pairs(cookies: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for entry in cookies {
        for field in entry.split_whitespace() {
            let Some((name, value)) = field.split_once('=') else {
                anyhow::bail!("cookie is missing '=': {entry:?}");
            };
            pairs.push((name.to_string(), value.trim_end_matches(';').to_string()));
        }
    }
    Ok(pairs)
}

fn origin_url(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

/// Builds the shared HTTP client: cookie jar seeded for every target origin,
/// plus the optional proxy and user agent.
fn build_client(config: &CloneConfig, targets: &[Url]) -> anyhow::Result<reqwest::Client> {
    let jar = Arc::new(Jar::default());
    let pairs = parse_cookie_pairs(&config.cookies)?;
    for target in targets {
        let origin = origin_url(target);
        for (name, value) in &pairs {
            jar.add_cookie_str(&format!("{name}={value}"), &origin);
        }
    }

    let mut builder = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .cookie_provider(jar);
    if let Some(user_agent) = config.user_agent.as_deref() {
        builder = builder.user_agent(user_agent);
    }
    if let Some(proxy) = config.proxy.as_deref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("configure proxy")?);
    }
    builder.build().context("build http client")
}

/// Clones every configured URL: validate, create the project directory,
/// crawl the page and its assets, then rewrite the saved page's references.
/// Per-target failures are recorded in the report and do not abort the rest
/// of the batch.
pub async fn clone_all(config: &CloneConfig) -> anyhow::Result<CloneReport> {
    if config.urls.is_empty() {
        anyhow::bail!("no target urls configured");
    }

    let mut report = CloneReport::default();
    let mut targets: Vec<(String, Url)> = Vec::new();
    for raw in &config.urls {
        match normalize_target(raw) {
            Ok(url) => targets.push((raw.clone(), url)),
            Err(err) => {
                tracing::error!(url = %raw, error = %format!("{err:#}"), "invalid clone target");
                report.failures.push((raw.clone(), err));
            }
        }
    }

    let target_urls: Vec<Url> = targets.iter().map(|(_, url)| url.clone()).collect();
    let client = build_client(config, &target_urls)?;

    let project_id = config
        .project_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(project_id = %project_id, targets = targets.len(), "starting clone batch");

    for (index, (raw, target)) in targets.iter().enumerate() {
        // Later targets in a batch get their own suffixed directory so the
        // clones do not overwrite one another.
        let dir_name = if index == 0 {
            project_id.clone()
        } else {
            format!("{project_id}-{index}")
        };

        match clone_one(&client, target, &config.out_dir, &dir_name, config.budget()).await {
            Ok(path) => {
                tracing::info!(url = %raw, path = %path.display(), "clone finished");
                report.project_paths.push(path);
            }
            Err(err) => {
                tracing::error!(url = %raw, error = %format!("{err:#}"), "clone failed");
                report.failures.push((raw.clone(), err));
            }
        }
    }

    Ok(report)
}

async fn clone_one(
    client: &reqwest::Client,
    target: &Url,
    out_dir: &Path,
    dir_name: &str,
    max_folder_size: Option<u64>,
) -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::create(out_dir, dir_name)?;

    if let Some(limit) = max_folder_size {
        let check = budget::within_budget(dirs.root(), Some(limit))?;
        if !check.ok {
            anyhow::bail!(
                "folder size budget already exceeded: {} > {limit} bytes",
                check.current_size
            );
        }
    }

    crawl::visit_page(client, target, &dirs, max_folder_size)
        .await
        .context("crawl page")?;
    rewrite::rewrite_links(&dirs).context("rewrite links")?;

    Ok(dirs.root().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_http_urls_pass_through() {
        let url = normalize_target("http://example.com/login?next=1").unwrap();
        assert_eq!(url.as_str(), "http://example.com/login?next=1");
    }

    #[test]
    fn bare_domains_are_upgraded_to_https() {
        let url = normalize_target("example.com/login").unwrap();
        assert_eq!(url.as_str(), "https://example.com/login");
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(normalize_target("ftp://example.com").is_err());
        assert!(normalize_target("").is_err());
    }

    #[test]
    fn cookie_pairs_split_on_whitespace_and_drop_trailing_semicolon() {
        let pairs = parse_cookie_pairs(&[
            "session=abc123; user=test".to_string(),
            "theme=dark".to_string(),
        ])
        .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("session".to_string(), "abc123".to_string()),
                ("user".to_string(), "test".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }

    #[test]
    fn cookie_without_equals_is_an_input_error() {
        let err = parse_cookie_pairs(&["not-a-cookie".to_string()]).unwrap_err();
        assert!(err.to_string().contains("missing '='"));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let config = CloneConfig::default();
        assert!(clone_all(&config).await.is_err());
    }
}
