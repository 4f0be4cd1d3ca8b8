//! Normalization of stored backend history into conversation state.
//!
//! Stored sessions accumulate legacy debris: attachment metadata that was
//! inlined into text parts, extracted file bodies, and binary placeholders.
//! Everything is scrubbed here so the rest of the engine only ever sees
//! clean `ChatMessage` values.

use ccommon::MessageId;
use cwire::RawTurn;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::types::{ChatMessage, FileRef, MessageRole, Variant};

static FILE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)---\s*File:\s*[^-\n]+---.*?---\s*End\s*File\s*---")
        .expect("file block pattern")
});

static BINARY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[Binary\s+file:[^\]]+\]").expect("binary marker pattern"));

pub(crate) fn normalize_history(turns: &[RawTurn]) -> Vec<ChatMessage> {
    turns.iter().map(normalize_turn).collect()
}

fn normalize_turn(turn: &RawTurn) -> ChatMessage {
    let role = if turn.role == "user" {
        MessageRole::User
    } else {
        MessageRole::Model
    };

    let mut text = turn
        .parts
        .iter()
        .find_map(|part| part.text.clone())
        .unwrap_or_default();

    if is_inlined_attachment_metadata(&text) {
        text.clear();
    }

    let binding = FILE_BLOCK.replace_all(&text, "");
    let text = BINARY_MARKER.replace_all(&binding, "");
    let content = text.trim().to_string();

    let images: Vec<String> = turn
        .parts
        .iter()
        .filter_map(|part| part.image.as_ref())
        .map(|image| image.url_path().to_string())
        .collect();

    let files: Vec<FileRef> = turn
        .parts
        .iter()
        .filter_map(|part| part.file.as_ref())
        .map(|file| FileRef {
            url_path: file.url_path().map(str::to_string),
            original_name: file.original_name().unwrap_or("file").to_string(),
            mime_type: file
                .mime_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            size: file.size(),
        })
        .collect();

    let id = turn
        .id
        .clone()
        .map(MessageId::from)
        .unwrap_or_else(|| MessageId::new(format!("msg-{}", Uuid::new_v4())));

    let timestamp = turn.timestamp.unwrap_or(0.0);

    match role {
        MessageRole::User => ChatMessage::user(id, content, timestamp)
            .with_files(files)
            .with_images(images),
        MessageRole::Model => {
            let variant = Variant {
                content: content.clone(),
                images: images.clone(),
                sources: Vec::new(),
                thinking_time: None,
            };

            let mut message = ChatMessage::placeholder(id, timestamp)
                .with_images(images)
                .with_variants(vec![variant]);
            message.is_loading = false;
            message.content = content;
            message
        }
    }
}

/// Old sessions stored the attachment descriptor JSON directly in the text
/// part; it is metadata, not conversation content.
fn is_inlined_attachment_metadata(text: &str) -> bool {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return false;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return false;
    };

    let Some(object) = value.as_object() else {
        return false;
    };

    ["url_path", "original_name", "mime_type"]
        .iter()
        .any(|key| object.contains_key(*key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, json_parts: &str) -> RawTurn {
        serde_json::from_str(&format!(
            r#"{{"role": "{role}", "parts": {json_parts}}}"#
        ))
        .expect("turn should parse")
    }

    #[test]
    fn user_turns_collect_text_files_and_images() {
        let raw = turn(
            "user",
            r#"[
                {"text": "look at these"},
                {"file": {"url_path": "/files/a.pdf", "original_name": "a.pdf", "mime_type": "application/pdf", "size": 9}},
                {"image": "/images/b.png"}
            ]"#,
        );

        let message = normalize_turn(&raw);
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.content, "look at these");
        assert_eq!(message.files.len(), 1);
        assert_eq!(message.files[0].original_name, "a.pdf");
        assert_eq!(message.images, vec!["/images/b.png".to_string()]);
        assert!(message.variants.is_empty());
    }

    #[test]
    fn model_turns_gain_a_settled_variant() {
        let raw = turn("model", r#"[{"text": "an answer"}]"#);
        let message = normalize_turn(&raw);

        assert_eq!(message.role, MessageRole::Model);
        assert!(!message.is_loading);
        assert_eq!(message.variants.len(), 1);
        assert_eq!(message.display_content(), "an answer");
    }

    #[test]
    fn inlined_attachment_metadata_is_dropped_from_text() {
        let raw = turn(
            "user",
            r#"[{"text": "{\"url_path\": \"/files/a.pdf\", \"mime_type\": \"application/pdf\"}"}]"#,
        );

        assert_eq!(normalize_turn(&raw).content, "");
    }

    #[test]
    fn ordinary_json_looking_text_is_preserved() {
        let raw = turn("user", r#"[{"text": "{\"answer\": 42}"}]"#);
        assert_eq!(normalize_turn(&raw).content, "{\"answer\": 42}");
    }

    #[test]
    fn extracted_file_bodies_and_binary_markers_are_scrubbed() {
        let raw = turn(
            "user",
            r#"[{"text": "summarize this --- File: notes.txt ---\nsecret body\n--- End File --- please [Binary file: blob.bin]"}]"#,
        );

        assert_eq!(normalize_turn(&raw).content, "summarize this  please");
    }

    #[test]
    fn missing_ids_are_generated() {
        let raw = turn("user", r#"[{"text": "hi"}]"#);
        let message = normalize_turn(&raw);
        assert!(message.id.as_str().starts_with("msg-"));
    }
}
