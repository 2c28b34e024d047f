//! Prompt rendering for a batch

use std::fmt::Write;

use crate::core::types::{Batch, ChatMessage};

/// Default system instruction describing the expected output
pub const SYSTEM_INSTRUCTION: &str = r#"You are a helpful assistant that classifies and reviews items.

Each item has:
- "item_id": unique id for each item
- "description": the item's description

Return a JSON object with a "reviews" array containing exactly one object per item, with the following keys:
- "item_id": same as item_id from input
- "classification": classification of the item category
- "review": small review, 1-2 phrases max
"#;

/// Two-message prompt: system instruction followed by the item listing
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    messages: [ChatMessage; 2],
}

impl Prompt {
    pub fn new(system: ChatMessage, user: ChatMessage) -> Self {
        Self {
            messages: [system, user],
        }
    }

    pub fn system(&self) -> &ChatMessage {
        &self.messages[0]
    }

    pub fn user(&self) -> &ChatMessage {
        &self.messages[1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages.into()
    }
}

/// Renders batches into prompts
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_instruction: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Replace the system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Build the prompt for one batch
    pub fn build(&self, batch: &Batch) -> Prompt {
        let user = format!(
            "The following {} items need to be classified and reviewed:\n\n{}",
            batch.len(),
            render_items(batch)
        );

        Prompt::new(
            ChatMessage::system(self.system_instruction.clone()),
            ChatMessage::user(user),
        )
    }
}

fn render_items(batch: &Batch) -> String {
    let mut text = String::new();
    for item in batch.items() {
        // Writing into a String cannot fail
        let _ = write!(
            text,
            "Item ID: {}\nDescription: {}\n\n",
            item.item_id,
            single_line(&item.description)
        );
    }
    text
}

/// Collapse line breaks so a description cannot start a forged `Item ID:` line
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
