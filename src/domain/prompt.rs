//! Outgoing prompt value object.
//!
//! A prompt is the text shown to the homeowner plus optional quick-reply buttons.
//! Model output may carry either a bare string or the `{text, quick_replies}` object,
//! so deserialization accepts both shapes.

use serde::{Deserialize, Serialize};

/// One quick-reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub title: String,
    pub payload: String,
}

impl QuickReply {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Text plus optional quick replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PromptRepr")]
pub struct Prompt {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
}

impl Prompt {
    /// Creates a text-only prompt.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    /// Attaches quick replies.
    pub fn with_quick_replies(mut self, replies: Vec<QuickReply>) -> Self {
        self.quick_replies = replies;
        self
    }

    /// Prepends a lead-in sentence, keeping quick replies.
    pub fn prefixed(mut self, lead: &str) -> Self {
        self.text = format!("{} {}", lead, self.text);
        self
    }

    /// True when there is nothing to show.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)?;
        if !self.quick_replies.is_empty() {
            let titles: Vec<&str> = self.quick_replies.iter().map(|r| r.title.as_str()).collect();
            write!(f, " [{}]", titles.join(" | "))?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PromptRepr {
    Plain(String),
    Rich {
        text: String,
        #[serde(default)]
        quick_replies: Vec<QuickReply>,
    },
}

impl From<PromptRepr> for Prompt {
    fn from(repr: PromptRepr) -> Self {
        match repr {
            PromptRepr::Plain(text) => Prompt::text(text),
            PromptRepr::Rich {
                text,
                quick_replies,
            } => Prompt {
                text,
                quick_replies,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_plain_string() {
        let prompt: Prompt = serde_json::from_str("\"What is the zip code?\"").unwrap();
        assert_eq!(prompt, Prompt::text("What is the zip code?"));
    }

    #[test]
    fn deserializes_from_rich_object() {
        let prompt: Prompt = serde_json::from_str(
            r#"{"text": "Open to group bidding?", "quick_replies": [{"title": "Yes", "payload": "confirm_yes"}]}"#,
        )
        .unwrap();

        assert_eq!(prompt.text, "Open to group bidding?");
        assert_eq!(prompt.quick_replies.len(), 1);
        assert_eq!(prompt.quick_replies[0].payload, "confirm_yes");
    }

    #[test]
    fn display_lists_quick_reply_titles() {
        let prompt = Prompt::text("Pick one").with_quick_replies(vec![
            QuickReply::new("Yes", "yes"),
            QuickReply::new("No", "no"),
        ]);
        assert_eq!(prompt.to_string(), "Pick one [Yes | No]");
    }

    #[test]
    fn prefixed_keeps_quick_replies() {
        let prompt = Prompt::text("What's the zip?")
            .with_quick_replies(vec![QuickReply::new("Skip", "skip")])
            .prefixed("Thanks.");
        assert_eq!(prompt.text, "Thanks. What's the zip?");
        assert_eq!(prompt.quick_replies.len(), 1);
    }
}
