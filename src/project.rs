use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub const INDEX_FILE: &str = "index.html";
pub const CSS_DIR: &str = "css";
pub const JS_DIR: &str = "js";
pub const IMG_DIR: &str = "imgs";

/// Fixed locations inside one clone's output directory: the root HTML file
/// and the `css/`, `js/`, `imgs/` asset subdirectories.
#[derive(Debug, Clone)]
pub struct ProjectDirs {
    root: PathBuf,
}

impl ProjectDirs {
    /// Creates `<base_dir>/<project_id>/` with its asset subdirectories and
    /// an empty root HTML file. Re-running on an existing project truncates
    /// the root HTML file and leaves downloaded assets in place.
    pub fn create(base_dir: &Path, project_id: &str) -> anyhow::Result<Self> {
        let root = base_dir.join(project_id);
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create project dir: {}", root.display()))?;

        for subdir in [CSS_DIR, JS_DIR, IMG_DIR] {
            let path = root.join(subdir);
            std::fs::create_dir_all(&path)
                .with_context(|| format!("create asset dir: {}", path.display()))?;
        }

        let index_file = root.join(INDEX_FILE);
        std::fs::write(&index_file, b"")
            .with_context(|| format!("create main page file: {}", index_file.display()))?;

        tracing::debug!(path = %root.display(), "project directory ready");
        Ok(Self { root })
    }

    /// Opens an existing project directory, e.g. for serving a previous clone.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("project directory does not exist: {}", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_file(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn subdir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
