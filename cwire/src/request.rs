//! Generation request and conversation-context serde models.
//!
//! ```rust
//! use cwire::{ApiPart, ApiRole, ApiTurn};
//!
//! let turn = ApiTurn {
//!     role: ApiRole::User,
//!     parts: vec![ApiPart::text("hello")],
//! };
//!
//! let json = serde_json::to_string(&turn).expect("turn should serialize");
//! assert_eq!(json, r#"{"role":"user","parts":[{"text":"hello"}]}"#);
//! ```

use ccommon::{SendOptions, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRole {
    User,
    Model,
}

/// One backend part: exactly one of text, file, or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiPart {
    Text { text: String },
    File { file: FilePart },
    Image { image: ImagePart },
}

impl ApiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url_path: impl Into<String>) -> Self {
        Self::Image {
            image: ImagePart {
                url_path: url_path.into(),
            },
        }
    }

    pub fn file(
        url_path: impl Into<String>,
        mime_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self::File {
            file: FilePart {
                url_path: url_path.into(),
                mime_type: Some(mime_type.into()),
                original_name: Some(original_name.into()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePart {
    pub url_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    pub url_path: String,
}

/// One conversation turn as the backend expects its context history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTurn {
    pub role: ApiRole,
    pub parts: Vec<ApiPart>,
}

/// Raw bytes of one attachment uploaded alongside the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Everything needed for one generation attempt against the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub message: String,
    pub model: String,
    pub session_id: SessionId,
    pub history: Vec<ApiTurn>,
    pub attachments: Vec<AttachmentUpload>,
    pub options: SendOptions,
    pub guest_token: Option<String>,
}

impl GenerateRequest {
    pub fn new(
        message: impl Into<String>,
        model: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            session_id,
            history: Vec::new(),
            attachments: Vec::new(),
            options: SendOptions::default(),
            guest_token: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ApiTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentUpload) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_options(mut self, options: SendOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_guest_token(mut self, token: impl Into<String>) -> Self {
        self.guest_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_serialize_to_single_key_objects() {
        let parts = vec![
            ApiPart::text("look at this"),
            ApiPart::file("/files/a.pdf", "application/pdf", "a.pdf"),
            ApiPart::image("/images/b.png"),
        ];

        let json = serde_json::to_string(&parts).expect("parts should serialize");
        assert_eq!(
            json,
            concat!(
                "[{\"text\":\"look at this\"},",
                "{\"file\":{\"url_path\":\"/files/a.pdf\",",
                "\"mime_type\":\"application/pdf\",\"original_name\":\"a.pdf\"}},",
                "{\"image\":{\"url_path\":\"/images/b.png\"}}]"
            )
        );
    }

    #[test]
    fn parts_round_trip_through_untagged_deserialize() {
        let json = r#"[{"text":"hi"},{"image":{"url_path":"/i.png"}}]"#;
        let parts: Vec<ApiPart> = serde_json::from_str(json).expect("parts should parse");

        assert_eq!(
            parts,
            vec![ApiPart::text("hi"), ApiPart::image("/i.png")]
        );
    }

    #[test]
    fn request_builder_helpers_compose() {
        let request = GenerateRequest::new("hello", "gemini", SessionId::from("s1"))
            .with_history(vec![ApiTurn {
                role: ApiRole::User,
                parts: vec![ApiPart::text("earlier")],
            }])
            .with_attachment(AttachmentUpload::new("a.txt", "text/plain", b"abc".to_vec()))
            .with_guest_token("tok");

        assert_eq!(request.history.len(), 1);
        assert_eq!(request.attachments.len(), 1);
        assert_eq!(request.guest_token.as_deref(), Some("tok"));
    }
}
