//! Template options (`meta.json` / `meta.yaml`) and their defaults

use crate::pipeline::{FilterRules, PromptSpec, Prompts};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

/// Options files looked up in the template root, in order of preference
const OPTIONS_FILES: &[&str] = &["meta.json", "meta.yaml", "meta.yml"];

/// Options declared by a template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOptions {
    /// Questions to ask, in declaration order
    #[serde(default, alias = "schema")]
    pub prompts: Prompts,

    /// Glob-keyed conditional file rules
    #[serde(default)]
    pub filters: FilterRules,

    /// Message rendered with the final metadata after generation
    #[serde(default)]
    pub complete_message: Option<String>,
}

impl TemplateOptions {
    /// Parse options from file content, choosing the format by extension
    pub fn parse(content: &str, file_name: &str) -> Result<Self> {
        if file_name.ends_with(".json") {
            serde_json::from_str(content).with_context(|| format!("Failed to parse {}", file_name))
        } else {
            serde_yaml::from_str(content).with_context(|| format!("Failed to parse {}", file_name))
        }
    }

    /// Set the default of prompt `key`, declaring a text prompt if the
    /// template did not.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.prompts.get_mut(key) {
            Some(spec) => spec.default = Some(value),
            None => {
                self.prompts.insert(key.to_string(), PromptSpec::text(value));
            }
        }
    }
}

/// Load a template's options and seed the `name` and `author` defaults
pub fn load_options(name: &str, template_dir: &Path) -> Result<TemplateOptions> {
    let mut options = read_options(template_dir)?;
    options.set_default("name", name);

    if let Some(author) = git_user() {
        options.set_default("author", author);
    }

    Ok(options)
}

fn read_options(template_dir: &Path) -> Result<TemplateOptions> {
    for file_name in OPTIONS_FILES {
        let path = template_dir.join(file_name);
        if path.is_file() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return TemplateOptions::parse(&content, file_name);
        }
    }

    tracing::debug!(dir = %template_dir.display(), "template has no options file");
    Ok(TemplateOptions::default())
}

/// `Name <email>` from the local git configuration, if any part is set
pub fn git_user() -> Option<String> {
    let name = git_config("user.name");
    let email = git_config("user.email");

    match (name, email) {
        (Some(name), Some(email)) => Some(format!("{} <{}>", name, email)),
        (Some(name), None) => Some(name),
        (None, Some(email)) => Some(format!("<{}>", email)),
        (None, None) => None,
    }
}

fn git_config(key: &str) -> Option<String> {
    let output = Command::new("git")
        .args(["config", "--get", key])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}
