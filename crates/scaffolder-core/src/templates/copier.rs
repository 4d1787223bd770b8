//! Reading template sources into a file collection and writing the result

use crate::metadata::FileCollection;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

/// Read every file under `source_dir` keyed by its `/`-separated relative path
pub async fn read_template_files(source_dir: &Path) -> Result<FileCollection> {
    if !source_dir.is_dir() {
        anyhow::bail!("Template source directory not found: {}", source_dir.display());
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(source_dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", source_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .with_context(|| format!("Unexpected path: {}", entry.path().display()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let content = fs::read(entry.path())
            .await
            .with_context(|| format!("Failed to read file: {}", entry.path().display()))?;
        entries.push((key, content));
    }

    Ok(entries.into_iter().collect())
}

/// Write every file in the collection under `target_dir`
pub async fn write_files(files: &FileCollection, target_dir: &Path) -> Result<Vec<String>> {
    // Ensure target directory exists
    fs::create_dir_all(target_dir)
        .await
        .context("Failed to create target directory")?;

    let mut written = Vec::new();

    for (file_path, content) in files.iter() {
        // Ensure parent directories exist
        let target_path = target_dir.join(file_path);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(&target_path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", target_path.display()))?;

        written.push(file_path.to_string());
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_uses_relative_slash_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/components")).unwrap();
        std::fs::write(dir.path().join("README.md"), "# {{name}}").unwrap();
        std::fs::write(dir.path().join("src/components/Hello.vue"), "<template/>").unwrap();
        std::fs::write(dir.path().join(".gitignore"), "node_modules").unwrap();

        let files = read_template_files(dir.path()).await.unwrap();

        let paths: Vec<&str> = files.paths().collect();
        assert_eq!(
            paths,
            vec![".gitignore", "README.md", "src/components/Hello.vue"]
        );
        assert_eq!(files.get("README.md"), Some(&b"# {{name}}"[..]));
    }

    #[tokio::test]
    async fn test_read_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_template_files(&dir.path().join("template")).await.is_err());
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let files: FileCollection = [("a/b/c.txt", "deep"), ("top.txt", "top")]
            .into_iter()
            .collect();

        let written = write_files(&files, &target).await.unwrap();

        assert_eq!(written, vec!["a/b/c.txt", "top.txt"]);
        assert_eq!(
            std::fs::read_to_string(target.join("a/b/c.txt")).unwrap(),
            "deep"
        );
    }
}
