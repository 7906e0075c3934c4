use anyhow::Context as _;

use crate::extract::sanitize_filename;
use crate::project::{CSS_DIR, IMG_DIR, JS_DIR, ProjectDirs};

/// One attribute rewrite computed from the parsed document.
#[derive(Debug, PartialEq, Eq)]
struct Replacement {
    attr: &'static str,
    from: String,
    to: String,
}

/// Rewrites every stylesheet, script, and image reference in the project's
/// root HTML file to its local `{css|js|imgs}/<basename>` location.
///
/// The plan is computed on the fully-parsed document and applied to the
/// in-memory text, so the file is only ever overwritten with a complete
/// rewrite. Running twice is a no-op: already-prefixed references are left
/// alone.
pub fn rewrite_links(dirs: &ProjectDirs) -> anyhow::Result<()> {
    let index_file = dirs.index_file();
    let content = std::fs::read_to_string(&index_file)
        .with_context(|| format!("read main page: {}", index_file.display()))?;

    let replacements = plan_replacements(&content)?;
    let mut rewritten = content;
    for replacement in &replacements {
        rewritten = apply_replacement(&rewritten, replacement);
    }
    tracing::debug!(
        path = %index_file.display(),
        count = replacements.len(),
        "rewrote asset references"
    );

    std::fs::write(&index_file, rewritten)
        .with_context(|| format!("write main page: {}", index_file.display()))?;
    Ok(())
}

fn local_reference(dir: &str, reference: &str) -> String {
    let base = reference.rsplit('/').next().unwrap_or_default();
    format!("{dir}/{}", sanitize_filename(base))
}

fn plan_replacements(html: &str) -> anyhow::Result<Vec<Replacement>> {
    const QUERIES: [(&str, &str, &str); 3] = [
        ("link[rel=\"stylesheet\"]", "href", CSS_DIR),
        ("script[src]", "src", JS_DIR),
        ("img[src]", "src", IMG_DIR),
    ];

    let document = scraper::Html::parse_document(html);
    let mut replacements = Vec::new();

    for (query, attr, dir) in QUERIES {
        let selector = scraper::Selector::parse(query)
            .map_err(|err| anyhow::anyhow!("parse selector {query}: {err}"))?;
        let local_prefix = format!("{dir}/");

        for element in document.select(&selector) {
            let Some(reference) = element.attr(attr) else {
                continue;
            };
            if reference.starts_with(&local_prefix) {
                continue;
            }
            if dir == IMG_DIR && reference.starts_with("data:") {
                continue;
            }
            replacements.push(Replacement {
                attr,
                from: reference.to_string(),
                to: local_reference(dir, reference),
            });
        }
    }

    Ok(replacements)
}

/// Applies one rewrite textually so the rest of the document stays
/// byte-identical. The parser decodes entities, so the raw text may carry
/// `&amp;` where the parsed attribute value has `&`.
fn apply_replacement(content: &str, replacement: &Replacement) -> String {
    let Replacement { attr, from, to } = replacement;
    let encoded = from.replace('&', "&amp;");

    for candidate in [from.as_str(), encoded.as_str()] {
        for quote in ['"', '\''] {
            let needle = format!("{attr}={quote}{candidate}{quote}");
            if content.contains(&needle) {
                let local = format!("{attr}={quote}{to}{quote}");
                return content.replace(&needle, &local);
            }
        }
    }

    content.to_string()
}
