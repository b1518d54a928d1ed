//! Project artifacts written by agents: the plan, the page, its stylesheet.

pub mod plan;

pub use plan::{Milestone, Plan};

use std::path::PathBuf;
use strum::{EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ArtifactKind {
    Plan,
    Page,
    Stylesheet,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Plan => "plan.md",
            ArtifactKind::Page => "index.html",
            ArtifactKind::Stylesheet => "styles.css",
        }
    }

    /// Accepts a bare file name or one prefixed with `artifacts/`
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix("artifacts/").unwrap_or(name);
        ArtifactKind::iter().find(|kind| kind.file_name() == name)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Directory-backed artifact storage
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Read an artifact. A file that does not exist yet reads as `None`.
    pub async fn read(&self, kind: ArtifactKind) -> Result<Option<String>, String> {
        match tokio::fs::read_to_string(self.path_of(kind)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Failed to read {}: {}", kind, e)),
        }
    }

    pub async fn write(&self, kind: ArtifactKind, contents: &str) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("Failed to create {}: {}", self.root.display(), e))?;
        tokio::fs::write(self.path_of(kind), contents)
            .await
            .map_err(|e| format!("Failed to write {}: {}", kind, e))?;
        log::info!(
            "[ARTIFACT] Saved {} ({} bytes) under {}",
            kind,
            contents.len(),
            self.root.display()
        );
        Ok(())
    }

    /// All artifacts that currently exist, in a fixed order
    pub async fn snapshot(&self) -> Result<Vec<(ArtifactKind, String)>, String> {
        let mut present = Vec::new();
        for kind in ArtifactKind::iter() {
            if let Some(contents) = self.read(kind).await? {
                present.push((kind, contents));
            }
        }
        Ok(present)
    }

    pub async fn plan(&self) -> Result<Option<Plan>, String> {
        Ok(self.read(ArtifactKind::Plan).await?.map(|md| Plan::parse(&md)))
    }

    /// Check off one milestone in `plan.md` and save it.
    /// Returns false if there is no plan or no such pending milestone.
    pub async fn complete_milestone(&self, number: u32) -> Result<bool, String> {
        let Some(mut plan) = self.plan().await? else {
            return Ok(false);
        };
        if !plan.mark_complete(number) {
            return Ok(false);
        }
        self.write(ArtifactKind::Plan, &plan.to_markdown()).await?;
        Ok(true)
    }
}
