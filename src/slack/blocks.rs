//! Block Kit message structure.
//!
//! Published messages are layered: header with the title, divider, body
//! section and a context footer with the generation time.

use serde::Serialize;

/// A text object inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    /// Unformatted text.
    PlainText {
        /// Content.
        text: String,
        /// Render `:emoji:` shortcodes.
        emoji: bool,
    },
    /// Slack mrkdwn.
    Mrkdwn {
        /// Content.
        text: String,
    },
}

impl TextObject {
    /// Plain text with emoji rendering enabled.
    pub fn plain(text: impl Into<String>) -> Self {
        TextObject::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    /// Mrkdwn text.
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }

    /// The raw text.
    pub fn text(&self) -> &str {
        match self {
            TextObject::PlainText { text, .. } | TextObject::Mrkdwn { text } => text,
        }
    }
}

/// A layout block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Large title line.
    Header {
        /// Title.
        text: TextObject,
    },
    /// Horizontal rule.
    Divider,
    /// Body text.
    Section {
        /// Body.
        text: TextObject,
    },
    /// Small print.
    Context {
        /// Elements shown side by side.
        elements: Vec<TextObject>,
    },
}

/// A message ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Header title; also the notification fallback text.
    pub title: String,
    /// Body in mrkdwn.
    pub body: String,
    /// Footer line.
    pub footer: String,
}

impl OutgoingMessage {
    /// Build the block layout.
    pub fn blocks(&self) -> Vec<Block> {
        vec![
            Block::Header {
                text: TextObject::plain(&self.title),
            },
            Block::Divider,
            Block::Section {
                text: TextObject::mrkdwn(&self.body),
            },
            Block::Context {
                elements: vec![TextObject::mrkdwn(&self.footer)],
            },
        ]
    }

    /// Sections joined by blank lines, for plain-text output.
    pub fn plain_text(&self) -> String {
        format!("{}\n\n{}\n\n{}", self.title, self.body, self.footer)
    }
}
