//! The answer value handed to the delivery layer.

/// How the delivery layer should render the answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAs {
    PlainText,
    Markdown,
}

/// What the answer is: a regular message or a sticker reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Message,
    Sticker,
}

/// Post-processing steps the dispatcher applies before the answer leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Cipher,
}

/// An answer produced by a provider.
///
/// Providers must not produce an `Answer` with empty `content`; "nothing to
/// say" is `None`, never an empty answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub content: String,
    pub render_as: RenderAs,
    pub kind: AnswerKind,
    pub transforms: Vec<Transform>,
}

impl Answer {
    /// A plain-text message answer with no transforms.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            render_as: RenderAs::PlainText,
            kind: AnswerKind::Message,
            transforms: Vec::new(),
        }
    }

    /// A markdown-rendered message answer with no transforms.
    pub fn markdown(content: impl Into<String>) -> Self {
        Self {
            render_as: RenderAs::Markdown,
            ..Self::plain(content)
        }
    }

    /// A sticker answer; `content` is the sticker reference.
    pub fn sticker(content: impl Into<String>) -> Self {
        Self {
            kind: AnswerKind::Sticker,
            ..Self::plain(content)
        }
    }

    /// Request the cipher transform on this answer.
    pub fn with_cipher(mut self) -> Self {
        if !self.transforms.contains(&Transform::Cipher) {
            self.transforms.push(Transform::Cipher);
        }
        self
    }

    pub fn wants_cipher(&self) -> bool {
        self.transforms.contains(&Transform::Cipher)
    }
}
