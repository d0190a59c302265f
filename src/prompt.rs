//! The interactive boundary.
//!
//! Workflow code never talks to the terminal directly. It asks a [`Prompter`]
//! for text or a yes/no answer and hands over a validator; the prompter keeps
//! asking until the validator accepts. Two implementations exist:
//!
//! - [`TerminalPrompter`]: `dialoguer` prompts on stderr, `$EDITOR` for long text.
//! - [`ScriptedPrompter`]: a queue of canned answers, for tests and dry runs.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Editor, Input};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("terminal error: {0}")]
    Terminal(#[from] dialoguer::Error),
    #[error("script error: {0}")]
    Script(String),
}

/// Validator handed to [`Prompter::text`]. `Err` carries the message shown
/// to the operator before asking again.
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

pub trait Prompter {
    /// Ask for one line of text. Empty answers reach the validator.
    fn text(&mut self, prompt: &str, validate: Validator<'_>) -> Result<String, PromptError>;

    /// Ask for multi-line free text. An abandoned edit yields `""`.
    fn long_text(&mut self, prompt: &str) -> Result<String, PromptError>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError>;
}

/// Accept anything.
pub fn any(_: &str) -> Result<(), String> {
    Ok(())
}

// ============================================================================
// Terminal
// ============================================================================

pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn text(&mut self, prompt: &str, validate: Validator<'_>) -> Result<String, PromptError> {
        let answer = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|s: &String| validate(s))
            .interact_text()?;
        Ok(answer)
    }

    fn long_text(&mut self, prompt: &str) -> Result<String, PromptError> {
        eprintln!("{prompt}");
        let edited = Editor::new().extension(".md").edit("")?;
        Ok(edited.map(|s| s.trim_end().to_string()).unwrap_or_default())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(answer)
    }
}

// ============================================================================
// Scripted
// ============================================================================

/// One canned answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Confirm(bool),
    /// Take the prompt's default (confirm prompts only).
    Default,
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Answer::Text(s.to_string())
    }
}

impl From<bool> for Answer {
    fn from(b: bool) -> Self {
        Answer::Confirm(b)
    }
}

/// Replays answers in order and records every prompt it was asked.
///
/// A text answer rejected by the validator is recorded in
/// [`rejections`](Self::rejections) and the next answer is tried, mirroring
/// an operator re-typing after an error message.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub asked: Vec<String>,
    pub rejections: Vec<(String, String)>,
}

impl ScriptedPrompter {
    pub fn new<I, A>(answers: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Answer>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str) -> Result<Answer, PromptError> {
        self.answers
            .pop_front()
            .ok_or_else(|| PromptError::Script(format!("no answer left for '{prompt}'")))
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, prompt: &str, validate: Validator<'_>) -> Result<String, PromptError> {
        self.asked.push(prompt.to_string());
        loop {
            match self.next(prompt)? {
                Answer::Text(value) => match validate(&value) {
                    Ok(()) => return Ok(value),
                    Err(msg) => self.rejections.push((value, msg)),
                },
                other => {
                    return Err(PromptError::Script(format!(
                        "expected text for '{prompt}', got {other:?}"
                    )));
                }
            }
        }
    }

    fn long_text(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.text(prompt, &any)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        self.asked.push(prompt.to_string());
        match self.next(prompt)? {
            Answer::Confirm(value) => Ok(value),
            Answer::Default => Ok(default),
            other => Err(PromptError::Script(format!(
                "expected yes/no for '{prompt}', got {other:?}"
            ))),
        }
    }
}
