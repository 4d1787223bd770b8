//! Template substitution and the render stage

use super::sequence::{fan_out, FanOutError};
use crate::error::{GenerateError, RenderError};
use crate::metadata::{FileCollection, Metadata};
use async_trait::async_trait;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, Renderable,
};
use regex::Regex;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

/// Substitutes metadata into template text
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, template: &str, metadata: &Metadata) -> Result<String, RenderError>;
}

/// Handlebars renderer configured for raw output
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("if_eq", Box::new(EqBlock { negate: false }));
        registry.register_helper("unless_eq", Box::new(EqBlock { negate: true }));
        Self { registry }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for HandlebarsRenderer {
    async fn render(&self, template: &str, metadata: &Metadata) -> Result<String, RenderError> {
        self.registry
            .render_template(template, metadata)
            .map_err(|e| RenderError::new(e.to_string()))
    }
}

/// `{{#if_eq a b}}...{{else}}...{{/if_eq}}` and its `unless_eq` inverse
struct EqBlock {
    negate: bool,
}

impl HelperDef for EqBlock {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let lhs = h.param(0).map(|p| p.value());
        let rhs = h.param(1).map(|p| p.value());
        let equal = lhs.is_some() && lhs == rhs;

        let block = if equal != self.negate {
            h.template()
        } else {
            h.inverse()
        };

        match block {
            Some(template) => template.render(r, ctx, rc, out),
            None => Ok(()),
        }
    }
}

fn marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("marker pattern is valid"))
}

/// Whether the text contains at least one `{{ ... }}` substitution point
pub fn has_marker(text: &str) -> bool {
    marker().is_match(text)
}

/// Render every file that contains a template marker.
///
/// Files that are not UTF-8 or contain no marker are never touched. Renders
/// are buffered and committed only when every file succeeded, so a failure
/// leaves the collection unchanged. Returns the number of files rendered.
pub async fn render<R>(
    files: &mut FileCollection,
    metadata: &Metadata,
    renderer: &R,
    cancel: &CancellationToken,
) -> Result<usize, GenerateError>
where
    R: Renderer + ?Sized,
{
    let rendered: Vec<(String, String)> = {
        let templated: Vec<(&str, &str)> = files
            .iter()
            .filter_map(|(path, bytes)| {
                let text = std::str::from_utf8(bytes).ok()?;
                has_marker(text).then_some((path, text))
            })
            .collect();

        fan_out(templated.iter().copied(), cancel, |(path, text)| async move {
            renderer
                .render(text, metadata)
                .await
                .map(|output| (path.to_string(), output))
        })
        .await
        .map_err(|err| {
            let names = |indices: Vec<usize>| -> Vec<String> {
                indices
                    .into_iter()
                    .map(|i| templated[i].0.to_string())
                    .collect()
            };
            match err {
                FanOutError::Failed {
                    index,
                    error,
                    completed,
                } => GenerateError::Render {
                    path: templated[index].0.to_string(),
                    rendered: names(completed),
                    source: error,
                },
                FanOutError::Cancelled { .. } => GenerateError::Cancelled,
            }
        })?
    };

    let count = rendered.len();
    for (path, output) in rendered {
        files.replace(&path, output.into_bytes());
    }
    tracing::debug!(count, "rendered template files");

    Ok(count)
}
