use std::path::Path;

use anyhow::Context as _;

/// Outcome of one folder-size check.
#[derive(Debug, Clone, Copy)]
pub struct BudgetCheck {
    pub ok: bool,
    pub current_size: u64,
}

/// Sums the size of every regular file under `path`.
pub fn folder_size(path: &Path) -> anyhow::Result<u64> {
    let mut total = 0u64;
    let mut pending = vec![path.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("read dir: {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read dir entry: {}", dir.display()))?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("stat: {}", entry.path().display()))?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                let metadata = entry
                    .metadata()
                    .with_context(|| format!("stat: {}", entry.path().display()))?;
                total += metadata.len();
            }
        }
    }

    Ok(total)
}

/// Checks a fresh measurement of `path` against the byte ceiling. `None`
/// means unlimited and skips the filesystem walk entirely.
///
/// Not atomic with respect to concurrent writers: downloads already in
/// flight can still land after an over-budget verdict (soft limit).
pub fn within_budget(path: &Path, budget: Option<u64>) -> anyhow::Result<BudgetCheck> {
    let Some(limit) = budget else {
        return Ok(BudgetCheck {
            ok: true,
            current_size: 0,
        });
    };

    let current_size = folder_size(path)?;
    Ok(BudgetCheck {
        ok: current_size <= limit,
        current_size,
    })
}
