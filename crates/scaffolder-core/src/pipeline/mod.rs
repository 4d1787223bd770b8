//! The generation pipeline: ask, then filter, then render
//!
//! Each stage gets exclusive access to what it mutates and only shared access
//! to the rest, so ownership passes strictly in phase order:
//!
//! | stage  | metadata | files    |
//! |--------|----------|----------|
//! | ask    | `&mut`   | -        |
//! | filter | `&`      | `&mut`   |
//! | render | `&`      | `&mut`   |

pub mod condition;
pub mod filter;
pub mod prompt;
pub mod render;
pub mod sequence;

use crate::error::GenerateError;
use crate::metadata::{FileCollection, Metadata};
use tokio_util::sync::CancellationToken;

pub use condition::{Condition, Literal};
pub use filter::{FilterRule, FilterRules};
pub use prompt::{
    Answer, Choice, DefaultsPresenter, PromptKind, PromptSpec, Prompts, Presenter, Question,
    Validation,
};
pub use render::{has_marker, HandlebarsRenderer, Renderer};
pub use sequence::{fan_out, sequence, FanOutError, SequenceError};

/// Summary of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub filtered: usize,
    pub rendered: usize,
}

/// Owns the metadata and file collection for one generation run
#[derive(Debug, Clone, Default)]
pub struct Generator {
    metadata: Metadata,
    files: FileCollection,
}

impl Generator {
    pub fn new(metadata: Metadata, files: FileCollection) -> Self {
        Self { metadata, files }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn files(&self) -> &FileCollection {
        &self.files
    }

    pub fn into_parts(self) -> (Metadata, FileCollection) {
        (self.metadata, self.files)
    }

    /// Run the three stages in order, each awaited before the next starts.
    ///
    /// On failure the generator keeps whatever state the failing stage left:
    /// answers collected before a presentation failure stay in metadata, and a
    /// render failure leaves the (filtered) files unrendered.
    pub async fn run<P, R>(
        &mut self,
        prompts: &Prompts,
        filters: &FilterRules,
        presenter: &mut P,
        renderer: &R,
        cancel: &CancellationToken,
    ) -> Result<RunStats, GenerateError>
    where
        P: Presenter + ?Sized,
        R: Renderer + ?Sized,
    {
        prompt::ask(prompts, &mut self.metadata, presenter, cancel).await?;
        tracing::debug!(keys = self.metadata.len(), "prompts answered");

        let filtered = filter::filter(&mut self.files, filters, &self.metadata, cancel).await?;
        let rendered = render::render(&mut self.files, &self.metadata, renderer, cancel).await?;

        tracing::info!(
            files = self.files.len(),
            filtered,
            rendered,
            "generation pipeline finished"
        );

        Ok(RunStats { filtered, rendered })
    }
}

#[cfg(test)]
mod tests {
    use super::prompt::tests::ScriptedPresenter;
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_pipeline_ask_filter_render() {
        let prompts: Prompts = serde_json::from_str(
            r#"{
                "name": { "default": "demo" },
                "useTests": { "type": "confirm" },
                "testFramework": { "type": "list", "when": "useTests", "choices": ["jest", "mocha"] }
            }"#,
        )
        .unwrap();
        let filters: FilterRules = serde_json::from_str(r#"{ "test/**": "useTests" }"#).unwrap();

        let files: FileCollection = [
            ("README.md", "# {{name}}"),
            ("test/unit.spec", "uses {{testFramework}}"),
            ("LICENSE", "MIT"),
        ]
        .into_iter()
        .collect();

        let mut generator = Generator::new(Metadata::new(), files);
        let mut presenter =
            ScriptedPresenter::new([Answer::Text("my \"app\"".into()), Answer::Boolean(false)]);

        let stats = generator
            .run(
                &prompts,
                &filters,
                &mut presenter,
                &HandlebarsRenderer::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stats, RunStats { filtered: 1, rendered: 1 });
        assert_eq!(presenter.asked, vec!["name", "useTests"]);

        let (metadata, files) = generator.into_parts();
        assert_eq!(
            Value::Object(metadata),
            json!({ "name": "my \\\"app\\\"", "useTests": false })
        );
        assert_eq!(files.get("README.md"), Some(&b"# my \\\"app\\\""[..]));
        assert!(!files.contains("test/unit.spec"));
        assert_eq!(files.get("LICENSE"), Some(&b"MIT"[..]));
    }

    #[tokio::test]
    async fn test_pipeline_cancelled() {
        let prompts: Prompts = serde_json::from_str(r#"{ "name": {} }"#).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut generator = Generator::default();
        let err = generator
            .run(
                &prompts,
                &FilterRules::default(),
                &mut ScriptedPresenter::default(),
                &HandlebarsRenderer::new(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Cancelled));
    }
}
