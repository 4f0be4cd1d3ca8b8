//! Conversation state types: messages, reply variants, session access.

use ccommon::MessageId;
use cwire::WidgetUpdate;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Model,
}

/// One complete candidate reply for a model turn. Regeneration appends
/// further variants; existing entries are never rewritten.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variant {
    pub content: String,
    pub images: Vec<String>,
    pub sources: Vec<Value>,
    pub thinking_time: Option<f64>,
}

/// Attachment metadata carried on a user message. Binary content never
/// lives in the history; the backend is handed paths and names only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub url_path: Option<String>,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub variants: Vec<Variant>,
    pub current_variant: usize,
    pub images: Vec<String>,
    pub files: Vec<FileRef>,
    pub widgets: Vec<WidgetUpdate>,
    pub is_loading: bool,
    pub is_error: bool,
    pub is_generating_image: bool,
    pub image_prompt: Option<String>,
    pub timestamp: f64,
}

impl ChatMessage {
    pub fn user(id: MessageId, content: impl Into<String>, timestamp: f64) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            variants: Vec::new(),
            current_variant: 0,
            images: Vec::new(),
            files: Vec::new(),
            widgets: Vec::new(),
            is_loading: false,
            is_error: false,
            is_generating_image: false,
            image_prompt: None,
            timestamp,
        }
    }

    /// Empty model message awaiting its generation attempt.
    pub fn placeholder(id: MessageId, timestamp: f64) -> Self {
        Self {
            id,
            role: MessageRole::Model,
            content: String::new(),
            variants: Vec::new(),
            current_variant: 0,
            images: Vec::new(),
            files: Vec::new(),
            widgets: Vec::new(),
            is_loading: true,
            is_error: false,
            is_generating_image: false,
            image_prompt: None,
            timestamp,
        }
    }

    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.current_variant = variants.len().saturating_sub(1);
        self.variants = variants;
        self
    }

    /// The currently selected reply variant, if any exist yet.
    pub fn selected_variant(&self) -> Option<&Variant> {
        self.variants.get(self.current_variant)
    }

    /// Variant content when present, raw content otherwise. While loading,
    /// `content` is the live delta mirror and always wins; legacy messages
    /// with no variants also fall back to it.
    pub fn display_content(&self) -> &str {
        if self.is_loading {
            return &self.content;
        }

        self.selected_variant()
            .map(|variant| variant.content.as_str())
            .unwrap_or(&self.content)
    }

    pub fn display_images(&self) -> &[String] {
        if self.is_loading {
            return &self.images;
        }

        self.selected_variant()
            .map(|variant| variant.images.as_slice())
            .unwrap_or(&self.images)
    }
}

/// Who may do what with the loaded session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionAccess {
    pub is_public: bool,
    pub is_owner: bool,
    pub public_id: Option<String>,
    pub share_url: Option<String>,
    pub read_only: bool,
}

/// What started the current generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Send,
    Regenerate,
    Edit,
}

/// Lifecycle of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Settled,
    Aborted,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantDirection {
    Previous,
    Next,
}

impl VariantDirection {
    pub(crate) fn offset(self) -> isize {
        match self {
            Self::Previous => -1,
            Self::Next => 1,
        }
    }
}

/// One file the user attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl OutgoingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_content_prefers_the_selected_variant() {
        let mut message = ChatMessage::placeholder(MessageId::from("m1"), 0.0);
        message.is_loading = false;
        message.content = "raw".to_string();
        assert_eq!(message.display_content(), "raw");

        message.variants = vec![
            Variant {
                content: "first".to_string(),
                ..Variant::default()
            },
            Variant {
                content: "second".to_string(),
                ..Variant::default()
            },
        ];
        message.current_variant = 1;
        assert_eq!(message.display_content(), "second");
    }

    #[test]
    fn with_variants_selects_the_latest() {
        let mut message = ChatMessage::placeholder(MessageId::from("m1"), 0.0).with_variants(vec![
            Variant::default(),
            Variant {
                content: "latest".to_string(),
                ..Variant::default()
            },
        ]);
        message.is_loading = false;

        assert_eq!(message.current_variant, 1);
        assert_eq!(message.display_content(), "latest");
    }
}
