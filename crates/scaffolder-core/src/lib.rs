//! Scaffolder Core - Shared library for generating projects from templates
//!
//! A template is a directory holding an options file (`meta.json` or
//! `meta.yaml`) and a `template/` folder with the files to generate. Generation
//! runs a three-stage pipeline over one metadata object:
//!
//! 1. **ask** - walk the declared prompts in order, skipping those whose `when`
//!    condition is false, and record normalized answers in metadata
//! 2. **filter** - drop template files matched by a filter rule whose condition
//!    is false
//! 3. **render** - substitute metadata into every file containing `{{ }}`
//!
//! # Architecture
//!
//! - **Layer 1: Pipeline** - the stages, the condition grammar and the
//!   sequencing/fan-out combinators (`pipeline`)
//! - **Layer 2: Orchestration** - options loading, file I/O and version checks
//!   (`templates`), configured through the `ProductConfig` trait
//! - **Layer 3: Interface** - optional cliclack presenter and `init` flow
//!   (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based presenter and `run`
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use scaffolder_core::{templates, CancellationToken, DefaultsPresenter, HandlebarsRenderer};
//!
//! let request = templates::GenerateRequest { /* ... */ };
//! let generated = templates::generate(
//!     &request,
//!     &mut DefaultsPresenter,
//!     &HandlebarsRenderer::new(),
//!     &CancellationToken::new(),
//! )
//! .await?;
//! ```

pub mod error;
pub mod logger;
pub mod metadata;
pub mod pipeline;
pub mod product;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use error::{ConditionError, GenerateError, PresentationError, RenderError, SchemaError};
pub use metadata::{FileCollection, Metadata};
pub use pipeline::{
    Answer, Condition, DefaultsPresenter, FilterRules, Generator, HandlebarsRenderer, Presenter,
    PromptKind, PromptSpec, Prompts, Question, Renderer, RunStats,
};
pub use product::ProductConfig;
pub use templates::{generate, GenerateRequest, Generated, TemplateOptions};
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "tui")]
pub use tui::{run, CliclackPresenter, InitArgs};
