//! Charm-style question presenter using cliclack

use crate::error::PresentationError;
use crate::pipeline::{Answer, Presenter, PromptKind, Question};
use async_trait::async_trait;

/// Presents each question inline in the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct CliclackPresenter;

#[async_trait]
impl Presenter for CliclackPresenter {
    async fn ask(&mut self, question: &Question<'_>) -> Result<Answer, PresentationError> {
        let answer = match question.kind {
            PromptKind::Input => {
                let mut input = cliclack::input(question.message).required(false);
                if let Some(default) = question.default_text() {
                    input = input.placeholder(&default).default_input(&default);
                }
                Answer::Text(input.interact()?)
            }
            PromptKind::Password => {
                let password: String = cliclack::password(question.message)
                    .mask('▪')
                    .interact()?;
                Answer::Text(password)
            }
            PromptKind::Number => {
                let mut input = cliclack::input(question.message);
                if let Some(default) = question.default_number() {
                    let default = default.to_string();
                    input = input.placeholder(&default).default_input(&default);
                }
                Answer::Number(input.interact()?)
            }
            PromptKind::Confirm => {
                let confirmed: bool = cliclack::confirm(question.message)
                    .initial_value(question.default_confirm())
                    .interact()?;
                Answer::Boolean(confirmed)
            }
            PromptKind::Select => {
                if question.choices.is_empty() {
                    return Err(PresentationError::NoChoices(question.key.to_string()));
                }

                // Items are keyed by index since choice values need not be strings
                let mut select = cliclack::select(question.message);
                for (index, choice) in question.choices.iter().enumerate() {
                    select = select.item(index, &choice.name, "");
                }
                if let Some(initial) = question.default_choice() {
                    select = select.initial_value(initial);
                }

                let selected: usize = select.interact()?;
                let value = question
                    .choice_value(selected)
                    .ok_or_else(|| PresentationError::NoChoices(question.key.to_string()))?;
                Answer::Choice(value)
            }
            PromptKind::MultiSelect => {
                if question.choices.is_empty() {
                    return Err(PresentationError::NoChoices(question.key.to_string()));
                }

                let mut multi = cliclack::multiselect(question.message);
                for (index, choice) in question.choices.iter().enumerate() {
                    multi = multi.item(index, &choice.name, "");
                }

                let selected: Vec<usize> = multi
                    .initial_values(question.default_choices())
                    .required(false)
                    .interact()?;
                Answer::MultiChoice(
                    selected
                        .into_iter()
                        .filter_map(|i| question.choice_value(i))
                        .collect(),
                )
            }
        };

        Ok(answer)
    }

    async fn rejected(&mut self, reason: &str) -> Result<(), PresentationError> {
        cliclack::log::error(reason)?;
        Ok(())
    }
}
