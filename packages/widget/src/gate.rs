//! Confirmation and prompt dialogs.
//!
//! The controller asks the user before anything destructive and collects the
//! history message for a committed save. Both questions are synchronous from the
//! controller's point of view: the transition that asks waits for the answer,
//! then proceeds or aborts. [`ConfirmationGate`] abstracts the modal so the state
//! machine runs without a real UI; [`ScriptedGate`] is the in-memory stand-in.

use std::collections::VecDeque;

pub const CANCEL_MESSAGE: &str = "There are unsaved changes.\n\nAre you sure you want to cancel?";
pub const REVERT_MESSAGE: &str =
    "There are unsaved changes.\n\nAre you sure you want to revert changes?";
pub const SWITCH_VERSION_MESSAGE: &str =
    "There are unsaved changes.\n\nAre you sure you want to load another version?";
pub const DELETE_MESSAGE: &str = "Are you sure you want to delete this?\n\nIt cannot be recovered.";
pub const COMMIT_PROMPT: &str = "Describe this change for the version history:";
pub const TRANSPORT_ALERT: &str = "There was an error while contacting the server.";

/// Process-wide modal dialogs. Only one question is ever on screen.
pub trait ConfirmationGate {
    /// Yes/no question. `true` means go ahead.
    fn confirm_discard(&mut self, message: &str) -> bool;

    /// Free-text question. `None` means the user declined.
    fn prompt_text(&mut self, message: &str) -> Option<String>;
}

/// A question the gate was asked, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Asked {
    Confirm(String),
    Prompt(String),
}

/// Replays queued answers and records every question.
///
/// When a queue runs dry confirmations answer `false` and prompts answer `None`,
/// so an unexpected question aborts rather than destroys.
#[derive(Clone, Debug, Default)]
pub struct ScriptedGate {
    confirms: VecDeque<bool>,
    prompts: VecDeque<Option<String>>,
    asked: Vec<Asked>,
}

impl ScriptedGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }

    pub fn answering(mut self, answer: Option<&str>) -> Self {
        self.prompts.push_back(answer.map(str::to_string));
        self
    }

    pub fn asked(&self) -> &[Asked] {
        &self.asked
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm_discard(&mut self, message: &str) -> bool {
        self.asked.push(Asked::Confirm(message.to_string()));
        self.confirms.pop_front().unwrap_or(false)
    }

    fn prompt_text(&mut self, message: &str) -> Option<String> {
        self.asked.push(Asked::Prompt(message.to_string()));
        self.prompts.pop_front().flatten()
    }
}
