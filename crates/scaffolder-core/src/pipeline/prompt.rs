//! Prompt schema and the ask stage
//!
//! Prompts are asked one at a time in declaration order, since a later
//! prompt's `when` may depend on an earlier answer. Answers are normalized
//! before they are written into metadata.

use super::condition::Condition;
use super::sequence::{sequence, SequenceError};
use crate::error::{GenerateError, PresentationError, SchemaError};
use crate::metadata::Metadata;
use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Number, Value};
use tokio_util::sync::CancellationToken;

/// Named prompt specifications, in declaration order
pub type Prompts = IndexMap<String, PromptSpec>;

/// Kind of question to present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    /// Free text
    #[default]
    #[serde(alias = "string")]
    Input,
    /// Free text with hidden input
    Password,
    /// Numeric input
    Number,
    /// Yes/no
    Confirm,
    /// Single choice
    #[serde(alias = "list", alias = "rawlist")]
    Select,
    /// Multiple choice
    #[serde(rename = "checkbox", alias = "multiselect")]
    MultiSelect,
}

/// One entry of a choice list, written either as a bare string or as
/// `{ "name": ..., "value": ..., "checked": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ChoiceDef")]
pub struct Choice {
    /// Label shown to the user
    pub name: String,
    /// Value recorded when selected; any JSON value, the label when omitted
    pub value: Value,
    /// Pre-selected in a multi-select
    pub checked: bool,
}

/// Schema form of a choice
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ChoiceDef {
    Plain(String),
    Detailed {
        name: String,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        checked: bool,
    },
}

impl From<ChoiceDef> for Choice {
    fn from(def: ChoiceDef) -> Self {
        match def {
            ChoiceDef::Plain(name) => Choice {
                value: Value::String(name.clone()),
                name,
                checked: false,
            },
            ChoiceDef::Detailed {
                name,
                value,
                checked,
            } => Choice {
                value: value.unwrap_or_else(|| Value::String(name.clone())),
                name,
                checked,
            },
        }
    }
}

/// Declarative answer validation
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ValidationDef")]
pub struct Validation {
    required: bool,
    pattern: Option<Regex>,
    message: Option<String>,
}

/// Schema form of a validation: `{ "required": true, "pattern": "^[a-z-]+$", "message": "..." }`
#[derive(Deserialize)]
pub struct ValidationDef {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TryFrom<ValidationDef> for Validation {
    type Error = SchemaError;

    fn try_from(def: ValidationDef) -> Result<Self, Self::Error> {
        let pattern = def
            .pattern
            .map(|p| Regex::new(&p).map_err(|source| SchemaError::Pattern { pattern: p, source }))
            .transpose()?;
        Ok(Self {
            required: def.required,
            pattern,
            message: def.message,
        })
    }
}

impl Validation {
    /// Accept the answer or return the reason it was rejected
    pub fn check(&self, answer: &Answer) -> Result<(), String> {
        let rejected = |fallback: String| Err(self.message.clone().unwrap_or(fallback));

        match answer {
            Answer::Text(text) => {
                if self.required && text.trim().is_empty() {
                    return rejected("A value is required".to_string());
                }
                if let Some(pattern) = &self.pattern {
                    if !pattern.is_match(text) {
                        return rejected(format!("Value must match {}", pattern.as_str()));
                    }
                }
                Ok(())
            }
            Answer::Choice(choice) if self.required && is_blank(choice) => {
                rejected("A choice is required".to_string())
            }
            Answer::MultiChoice(choices) if self.required && choices.is_empty() => {
                rejected("Select at least one option".to_string())
            }
            _ => Ok(()),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Schema entry describing one question
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptSpec {
    #[serde(rename = "type", default)]
    pub kind: PromptKind,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default)]
    pub validate: Option<Validation>,

    /// Only ask when this evaluates true on the metadata at that point
    #[serde(default)]
    pub when: Option<Condition>,
}

impl PromptSpec {
    /// A free-text prompt with a default value
    pub fn text(default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::default()
        }
    }
}

/// A question handed to the [`Presenter`]
#[derive(Debug, Clone, Copy)]
pub struct Question<'a> {
    pub key: &'a str,
    pub kind: PromptKind,
    pub message: &'a str,
    pub default: Option<&'a Value>,
    pub choices: &'a [Choice],
}

impl Question<'_> {
    /// Default rendered as text, for input-style prompts
    pub fn default_text(&self) -> Option<String> {
        match self.default? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Default for a confirmation (`true` when unspecified)
    pub fn default_confirm(&self) -> bool {
        self.default.and_then(Value::as_bool).unwrap_or(true)
    }

    /// Default for a numeric prompt, from a number or a numeric string
    pub fn default_number(&self) -> Option<Number> {
        match self.default? {
            Value::Number(n) => Some(n.clone()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Index of the default choice for a single select. The default names a
    /// choice by value or label; a number that is not a choice value is an
    /// index.
    pub fn default_choice(&self) -> Option<usize> {
        let default = self.default?;
        self.position(default).or_else(|| {
            default
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .filter(|&i| i < self.choices.len())
        })
    }

    /// Indices of the pre-selected choices for a multi-select
    pub fn default_choices(&self) -> Vec<usize> {
        match self.default {
            Some(Value::Array(items)) => items.iter().filter_map(|v| self.position(v)).collect(),
            _ => self
                .choices
                .iter()
                .enumerate()
                .filter(|(_, c)| c.checked)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    fn position(&self, wanted: &Value) -> Option<usize> {
        self.choices
            .iter()
            .position(|c| &c.value == wanted || wanted.as_str() == Some(c.name.as_str()))
    }

    /// Value of the choice at `index`
    pub fn choice_value(&self, index: usize) -> Option<Value> {
        self.choices.get(index).map(|c| c.value.clone())
    }
}

/// Raw answer from the presenter, one variant per prompt kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Number(Number),
    Boolean(bool),
    Choice(Value),
    MultiChoice(Vec<Value>),
}

impl Answer {
    /// Shape the answer for storage in metadata
    pub fn into_value(self) -> Value {
        match self {
            Answer::Text(text) => Value::String(text.replace('"', "\\\"")),
            Answer::Number(n) => Value::Number(n),
            Answer::Boolean(b) => Value::Bool(b),
            Answer::Choice(choice) => choice,
            Answer::MultiChoice(selected) => Value::Object(
                selected
                    .into_iter()
                    .map(|value| (key_of(value), Value::Bool(true)))
                    .collect(),
            ),
        }
    }
}

/// Mapping key for a selected value: strings as-is, anything else in its
/// JSON form (`false`, `3`)
fn key_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Asks the user questions
#[async_trait]
pub trait Presenter: Send {
    /// Present one question and wait for the answer
    async fn ask(&mut self, question: &Question<'_>) -> Result<Answer, PresentationError>;

    /// The last answer was rejected by validation; the question is asked again
    /// after this returns.
    async fn rejected(&mut self, reason: &str) -> Result<(), PresentationError>;
}

/// Non-interactive presenter that takes every default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsPresenter;

#[async_trait]
impl Presenter for DefaultsPresenter {
    async fn ask(&mut self, question: &Question<'_>) -> Result<Answer, PresentationError> {
        let answer = match question.kind {
            PromptKind::Input | PromptKind::Password => {
                Answer::Text(question.default_text().unwrap_or_default())
            }
            PromptKind::Number => Answer::Number(
                question
                    .default_number()
                    .ok_or_else(|| PresentationError::NoDefault(question.key.to_string()))?,
            ),
            PromptKind::Confirm => Answer::Boolean(question.default_confirm()),
            PromptKind::Select => {
                let value = question
                    .choice_value(question.default_choice().unwrap_or(0))
                    .ok_or_else(|| PresentationError::NoChoices(question.key.to_string()))?;
                Answer::Choice(value)
            }
            PromptKind::MultiSelect => Answer::MultiChoice(
                question
                    .default_choices()
                    .into_iter()
                    .filter_map(|i| question.choice_value(i))
                    .collect(),
            ),
        };
        Ok(answer)
    }

    async fn rejected(&mut self, reason: &str) -> Result<(), PresentationError> {
        Err(PresentationError::Rejected(reason.to_string()))
    }
}

struct AskState<'a, P: ?Sized> {
    metadata: &'a mut Metadata,
    presenter: &'a mut P,
}

/// Ask every prompt in order, writing normalized answers into `metadata`
pub async fn ask<P>(
    prompts: &Prompts,
    metadata: &mut Metadata,
    presenter: &mut P,
    cancel: &CancellationToken,
) -> Result<(), GenerateError>
where
    P: Presenter + ?Sized,
{
    let state = AskState {
        metadata,
        presenter,
    };

    sequence(prompts, state, cancel, |state, (key, spec)| {
        prompt(state, key, spec)
    })
    .await
    .map(|_| ())
    .map_err(|err| match err {
        SequenceError::Step { error, .. } => error,
        SequenceError::Cancelled { .. } => GenerateError::Cancelled,
    })
}

async fn prompt<'a, P>(
    mut state: AskState<'a, P>,
    key: &str,
    spec: &PromptSpec,
) -> Result<AskState<'a, P>, GenerateError>
where
    P: Presenter + ?Sized,
{
    if let Some(when) = &spec.when {
        if !when.evaluate(state.metadata) {
            tracing::debug!(key, condition = %when, "skipping prompt");
            return Ok(state);
        }
    }

    let question = Question {
        key,
        kind: spec.kind,
        message: spec.message.as_deref().unwrap_or(key),
        default: spec.default.as_ref(),
        choices: &spec.choices,
    };
    let presentation = |source| GenerateError::Presentation {
        key: key.to_string(),
        source,
    };

    let answer = loop {
        let answer = state.presenter.ask(&question).await.map_err(presentation)?;
        match spec.validate.as_ref().map(|v| v.check(&answer)) {
            Some(Err(reason)) => {
                tracing::debug!(key, %reason, "answer rejected");
                state.presenter.rejected(&reason).await.map_err(presentation)?;
            }
            _ => break answer,
        }
    };

    state.metadata.insert(key.to_string(), answer.into_value());
    Ok(state)
}
