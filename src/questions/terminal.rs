//! Interactive terminal prompts for questions, built on dialoguer.

use anyhow::Result;
use async_trait::async_trait;
use dialoguer::{Input, MultiSelect, Select, theme::ColorfulTheme};

use super::{AnswerValue, Answers, Question, QuestionAsker, QuestionKind};
use crate::errors::QuestionError;

const OTHER_LABEL: &str = "Other (type your own)";
const DEFER_LABEL: &str = "Use your judgement";

/// What a choice index maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Choice {
    Option(String),
    Other,
    Deferred,
}

fn single_items(options: &[String], allow_other: bool) -> Vec<String> {
    let mut items = options.to_vec();
    if allow_other {
        items.push(OTHER_LABEL.to_string());
    }
    items.push(DEFER_LABEL.to_string());
    items
}

fn interpret(options: &[String], allow_other: bool, index: usize) -> Choice {
    if let Some(option) = options.get(index) {
        return Choice::Option(option.clone());
    }
    if allow_other && index == options.len() {
        Choice::Other
    } else {
        Choice::Deferred
    }
}

/// Asks on stdin/stdout. Blocking prompts run on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalAsker;

impl TerminalAsker {
    fn ask_blocking(questions: &[Question]) -> Result<Answers> {
        let theme = ColorfulTheme::default();
        let mut answers = Answers::new();

        for q in questions {
            let answer = match &q.kind {
                QuestionKind::Single { options } => {
                    let index = Select::with_theme(&theme)
                        .with_prompt(&q.prompt)
                        .items(&single_items(options, q.allow_other))
                        .default(0)
                        .interact()?;
                    match interpret(options, q.allow_other, index) {
                        Choice::Option(value) => Some(AnswerValue::One(value)),
                        Choice::Other => Self::free_text(&theme, "Your answer")?,
                        Choice::Deferred => None,
                    }
                }
                QuestionKind::Multi { options } => {
                    let mut items = options.clone();
                    if q.allow_other {
                        items.push(OTHER_LABEL.to_string());
                    }
                    let picked = MultiSelect::with_theme(&theme)
                        .with_prompt(format!("{} (space to select, enter to confirm)", q.prompt))
                        .items(&items)
                        .interact()?;

                    let mut values = Vec::new();
                    for index in picked {
                        match interpret(options, q.allow_other, index) {
                            Choice::Option(value) => values.push(value),
                            Choice::Other => {
                                if let Some(AnswerValue::One(text)) =
                                    Self::free_text(&theme, "Other")?
                                {
                                    values.push(text);
                                }
                            }
                            Choice::Deferred => {}
                        }
                    }
                    // Nothing picked means "use your judgement".
                    (!values.is_empty()).then_some(AnswerValue::Many(values))
                }
                QuestionKind::Text => Self::free_text(
                    &theme,
                    &format!("{} (leave empty to let the agent decide)", q.prompt),
                )?,
            };
            answers.insert(q.id.clone(), answer);
        }

        Ok(answers)
    }

    fn free_text(theme: &ColorfulTheme, prompt: &str) -> Result<Option<AnswerValue>> {
        let text: String = Input::with_theme(theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        let text = text.trim().to_string();
        Ok((!text.is_empty()).then_some(AnswerValue::One(text)))
    }
}

#[async_trait]
impl QuestionAsker for TerminalAsker {
    async fn ask(&self, questions: &[Question]) -> Result<Answers, QuestionError> {
        let questions = questions.to_vec();
        tokio::task::spawn_blocking(move || Self::ask_blocking(&questions))
            .await
            .map_err(|e| QuestionError::Prompt(e.into()))?
            .map_err(QuestionError::Prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Vec<String> {
        vec!["red".to_string(), "blue".to_string()]
    }

    #[test]
    fn test_single_items_with_other() {
        assert_eq!(
            single_items(&opts(), true),
            vec!["red", "blue", OTHER_LABEL, DEFER_LABEL]
        );
    }

    #[test]
    fn test_single_items_without_other() {
        assert_eq!(single_items(&opts(), false), vec!["red", "blue", DEFER_LABEL]);
    }

    #[test]
    fn test_interpret_indices() {
        assert_eq!(interpret(&opts(), true, 1), Choice::Option("blue".to_string()));
        assert_eq!(interpret(&opts(), true, 2), Choice::Other);
        assert_eq!(interpret(&opts(), true, 3), Choice::Deferred);
        assert_eq!(interpret(&opts(), false, 2), Choice::Deferred);
    }
}
