//! Template catalog: read-only `<id>.tex` files in one directory.
//!
//! `template_id` arrives from the client, so it is validated before it ever
//! touches a path: no separators, no `..`, no empties.

use std::path::{Path, PathBuf};

use crate::errors::AppError;

const TEMPLATE_EXTENSION: &str = "tex";
const MAX_ID_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    dir: PathBuf,
}

/// A template's id and its LaTeX source, exactly as stored on disk.
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub source: String,
}

impl TemplateCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads a template by id. Unknown and malformed ids are both `TemplateNotFound`.
    pub async fn load(&self, id: &str) -> Result<Template, AppError> {
        if !is_valid_template_id(id) {
            return Err(AppError::TemplateNotFound(id.to_string()));
        }

        let path = self.dir.join(format!("{id}.{TEMPLATE_EXTENSION}"));
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(Template {
                id: id.to_string(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::TemplateNotFound(id.to_string()))
            }
            Err(e) => Err(AppError::Internal(
                anyhow::Error::new(e).context(format!("reading template {}", path.display())),
            )),
        }
    }

    /// Sorted ids of every valid template in the catalog directory.
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_template_id(id) {
                    ids.push(id.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// Accepts short ids made of ASCII letters, digits, `-` and `_`.
pub fn is_valid_template_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog_with(files: &[(&str, &str)]) -> (TempDir, TemplateCatalog) {
        let dir = TempDir::new().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let catalog = TemplateCatalog::new(dir.path());
        (dir, catalog)
    }

    #[test]
    fn test_template_id_validation() {
        assert!(is_valid_template_id("1"));
        assert!(is_valid_template_id("jakes-resume_v2"));
        assert!(!is_valid_template_id(""));
        assert!(!is_valid_template_id(".."));
        assert!(!is_valid_template_id("../secrets"));
        assert!(!is_valid_template_id("a/b"));
        assert!(!is_valid_template_id("a\\b"));
        assert!(!is_valid_template_id("1.tex"));
        assert!(!is_valid_template_id(&"x".repeat(65)));
    }

    #[tokio::test]
    async fn test_load_returns_source_unmodified() {
        let source = "\\documentclass{article}\n% keep # & $ as-is\n";
        let (_dir, catalog) = catalog_with(&[("1.tex", source)]);
        let template = catalog.load("1").await.unwrap();
        assert_eq!(template.id, "1");
        assert_eq!(template.source, source);
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let (_dir, catalog) = catalog_with(&[("1.tex", "x")]);
        let err = catalog.load("nonexistent").await.unwrap_err();
        assert!(matches!(err, AppError::TemplateNotFound(id) if id == "nonexistent"));
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let outer = TempDir::new().unwrap();
        std::fs::write(outer.path().join("secret.tex"), "secret").unwrap();
        let inner = outer.path().join("templates");
        std::fs::create_dir(&inner).unwrap();
        let catalog = TemplateCatalog::new(&inner);

        let err = catalog.load("../secret").await.unwrap_err();
        assert!(matches!(err, AppError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_sorted_and_filtered() {
        let (dir, catalog) = catalog_with(&[
            ("3.tex", "c"),
            ("1.tex", "a"),
            ("2.tex", "b"),
            ("notes.txt", "ignored"),
            ("bad.name.tex", "ignored"),
        ]);
        std::fs::create_dir(dir.path().join("dir.tex")).unwrap();
        let ids = catalog.list().await.unwrap();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
