//! Operator confirmation seam
//!
//! Every destructive or overwriting step asks through `OperatorPrompt`.
//! The CLI wires a terminal implementation; `-y` swaps in `AssumeYes`.

use crate::errors::{ExError, ExErrorKind, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Ask the operator before acting
#[allow(clippy::result_large_err)]
pub trait OperatorPrompt {
    /// Yes/no question. `Ok(false)` means the operator declined.
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Io` if the answer cannot be read.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Pick one of `options` by index. `Ok(None)` means the operator backed out.
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Io` if the answer cannot be read, or
    /// `ExErrorKind::Validation` if a choice cannot be made without a terminal.
    fn choose(&self, prompt: &str, options: &[String]) -> Result<Option<usize>>;
}

/// Confirms everything. Used when the operator passed `-y`.
///
/// Cannot pick among options on the operator's behalf.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl OperatorPrompt for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }

    fn choose(&self, prompt: &str, _options: &[String]) -> Result<Option<usize>> {
        Err(ExError::new(ExErrorKind::Validation)
            .with_op("choose")
            .with_message(format!(
                "Interactive selection required ({}); name the archive explicitly",
                prompt
            )))
    }
}

/// Declines everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl OperatorPrompt for AssumeNo {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }

    fn choose(&self, _prompt: &str, _options: &[String]) -> Result<Option<usize>> {
        Ok(None)
    }
}

/// Answer sequence for tests and scripted runs
///
/// Answers are consumed in order; running out declines. Every prompt text is
/// recorded.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    asked: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    Confirm(bool),
    Choose(Option<usize>),
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn next(&self, prompt: &str) -> Option<ScriptedAnswer> {
        self.asked
            .lock()
            .map(|mut a| a.push(prompt.to_string()))
            .ok();
        self.answers.lock().ok().and_then(|mut a| a.pop_front())
    }
}

impl OperatorPrompt for ScriptedPrompt {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(matches!(self.next(prompt), Some(ScriptedAnswer::Confirm(true))))
    }

    fn choose(&self, prompt: &str, options: &[String]) -> Result<Option<usize>> {
        match self.next(prompt) {
            Some(ScriptedAnswer::Choose(Some(i))) if i < options.len() => Ok(Some(i)),
            _ => Ok(None),
        }
    }
}
