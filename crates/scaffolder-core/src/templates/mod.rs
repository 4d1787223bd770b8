//! Template loading and project generation
//!
//! This module provides:
//! - Template options (prompts, filters, completion message)
//! - Template path resolution
//! - Reading template sources and writing the generated project
//! - Version checking against the published CLI

pub mod copier;
pub mod options;
pub mod version;

use crate::metadata::{FileCollection, Metadata};
use crate::pipeline::{Generator, Presenter, Renderer, RunStats};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

pub use copier::{read_template_files, write_files};
pub use options::{git_user, load_options, TemplateOptions};
pub use version::{check_compatibility, check_latest};

/// Directory inside a template that holds the files to generate
pub const TEMPLATE_SOURCE_DIR: &str = "template";

/// Whether a template argument names a local path: it starts with `.` or `/`,
/// or with a Windows drive letter.
pub fn is_local_path(template: &str) -> bool {
    let mut chars = template.chars();
    match (chars.next(), chars.next()) {
        (Some('.' | '/'), _) => true,
        (Some(drive), Some(':')) => drive.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Resolve a template path against `cwd` unless it is already absolute
pub fn template_path(template: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(template);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        normalize(&cwd.join(path))
    }
}

fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Project name, used as the default answer to the `name` prompt
    pub name: String,
    /// Template root (contains the options file and `template/`)
    pub template_dir: PathBuf,
    /// Output directory
    pub destination: PathBuf,
    /// Working directory the CLI was started from
    pub cwd: PathBuf,
}

impl GenerateRequest {
    /// Metadata available before any question is asked
    pub fn seed_metadata(&self) -> Metadata {
        let dest_dir_name = self
            .destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());

        let mut metadata = Metadata::new();
        metadata.insert("destDirName".to_string(), Value::String(dest_dir_name));
        metadata.insert(
            "inPlace".to_string(),
            Value::Bool(self.destination == self.cwd),
        );
        metadata.insert("noEscape".to_string(), Value::Bool(true));
        metadata
    }
}

/// What a successful generation produced
#[derive(Debug, Clone)]
pub struct Generated {
    pub metadata: Metadata,
    pub files: FileCollection,
    pub written: Vec<String>,
    pub stats: RunStats,
    pub complete_message: Option<String>,
}

/// Generate a project: load options, run the pipeline, write the surviving
/// files to the destination.
///
/// The destination is not cleaned first. Generated files overwrite existing
/// files at the same path; any other file already in the destination is left
/// in place, including stale output from an earlier run.
pub async fn generate<P, R>(
    request: &GenerateRequest,
    presenter: &mut P,
    renderer: &R,
    cancel: &CancellationToken,
) -> Result<Generated>
where
    P: Presenter + ?Sized,
    R: Renderer + ?Sized,
{
    let options = load_options(&request.name, &request.template_dir)?;
    let files = read_template_files(&request.template_dir.join(TEMPLATE_SOURCE_DIR)).await?;
    tracing::info!(
        template = %request.template_dir.display(),
        files = files.len(),
        prompts = options.prompts.len(),
        "loaded template"
    );

    let mut generator = Generator::new(request.seed_metadata(), files);
    let stats = generator
        .run(
            &options.prompts,
            &options.filters,
            presenter,
            renderer,
            cancel,
        )
        .await
        .context("Failed to generate project")?;

    let (metadata, files) = generator.into_parts();
    let written = write_files(&files, &request.destination).await?;

    Ok(Generated {
        metadata,
        files,
        written,
        stats,
        complete_message: options.complete_message,
    })
}

/// Render the template's completion message with the final metadata
pub async fn render_complete_message<R>(
    generated: &Generated,
    renderer: &R,
) -> Option<Result<String>>
where
    R: Renderer + ?Sized,
{
    let message = generated.complete_message.as_deref()?;
    Some(
        renderer
            .render(message, &generated.metadata)
            .await
            .context("Error when rendering template complete message"),
    )
}
