//! Projection of in-memory history into backend conversation context.

use cwire::{ApiPart, ApiRole, ApiTurn, FilePart};

use crate::types::{ChatMessage, MessageRole};

/// Serialize every settled message strictly before `upto` into the
/// role/parts shape the backend consumes.
///
/// Messages still loading are skipped, model turns resolve through their
/// selected variant, and turns that produce no parts are omitted entirely:
/// the backend must never see a turn with an empty part list.
pub fn history_for_backend(messages: &[ChatMessage], upto: usize) -> Vec<ApiTurn> {
    let mut turns = Vec::new();

    for message in messages.iter().take(upto) {
        if message.is_loading {
            continue;
        }

        let (role, parts) = match message.role {
            MessageRole::User => (ApiRole::User, user_parts(message)),
            MessageRole::Model => (ApiRole::Model, model_parts(message)),
        };

        if parts.is_empty() {
            continue;
        }

        turns.push(ApiTurn { role, parts });
    }

    turns
}

fn user_parts(message: &ChatMessage) -> Vec<ApiPart> {
    let mut parts = Vec::new();

    if !message.content.trim().is_empty() {
        parts.push(ApiPart::text(message.content.clone()));
    }

    for file in &message.files {
        parts.push(ApiPart::File {
            file: FilePart {
                url_path: file.url_path.clone().unwrap_or_default(),
                mime_type: Some(file.mime_type.clone()),
                original_name: Some(file.original_name.clone()),
            },
        });
    }

    for image in &message.images {
        parts.push(ApiPart::image(image.clone()));
    }

    parts
}

fn model_parts(message: &ChatMessage) -> Vec<ApiPart> {
    let mut parts = Vec::new();

    let content = message.display_content();
    if !content.trim().is_empty() {
        parts.push(ApiPart::text(content));
    }

    for image in message.display_images() {
        parts.push(ApiPart::image(image.clone()));
    }

    parts
}

#[cfg(test)]
mod tests {
    use ccommon::MessageId;

    use super::*;
    use crate::types::{FileRef, Variant};

    fn user(id: &str, content: &str) -> ChatMessage {
        ChatMessage::user(MessageId::from(id), content, 0.0)
    }

    fn model(id: &str, content: &str) -> ChatMessage {
        let mut message = ChatMessage::placeholder(MessageId::from(id), 0.0);
        message.is_loading = false;
        message.content = content.to_string();
        message
    }

    #[test]
    fn serializes_settled_turns_before_the_pivot() {
        let messages = vec![
            user("u1", "first question"),
            model("m1", "first answer"),
            user("u2", "second question"),
        ];

        let turns = history_for_backend(&messages, 2);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ApiRole::User);
        assert_eq!(turns[0].parts, vec![ApiPart::text("first question")]);
        assert_eq!(turns[1].role, ApiRole::Model);
        assert_eq!(turns[1].parts, vec![ApiPart::text("first answer")]);
    }

    #[test]
    fn loading_messages_are_skipped() {
        let messages = vec![
            user("u1", "question"),
            ChatMessage::placeholder(MessageId::from("m1"), 0.0),
        ];

        let turns = history_for_backend(&messages, messages.len());
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn empty_turns_are_omitted_entirely() {
        let mut failed = model("m1", "");
        failed.is_error = true;

        let messages = vec![user("u1", "question"), failed, user("u2", "retry")];
        let turns = history_for_backend(&messages, messages.len());

        assert_eq!(turns.len(), 2);
        assert!(turns.iter().all(|turn| !turn.parts.is_empty()));
    }

    #[test]
    fn user_attachments_follow_the_text_part() {
        let mut message = user("u1", "see attached");
        message.files = vec![FileRef {
            url_path: Some("/files/report.pdf".to_string()),
            original_name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
        }];
        message.images = vec!["/images/chart.png".to_string()];

        let turns = history_for_backend(&[message], 1);
        assert_eq!(turns[0].parts.len(), 3);
        assert_eq!(turns[0].parts[0], ApiPart::text("see attached"));
        assert_eq!(
            turns[0].parts[1],
            ApiPart::file("/files/report.pdf", "application/pdf", "report.pdf")
        );
        assert_eq!(turns[0].parts[2], ApiPart::image("/images/chart.png"));
    }

    #[test]
    fn model_turns_resolve_through_the_selected_variant() {
        let mut message = model("m1", "stale mirror");
        message.variants = vec![
            Variant {
                content: "first take".to_string(),
                ..Variant::default()
            },
            Variant {
                content: "second take".to_string(),
                images: vec!["/images/v2.png".to_string()],
                ..Variant::default()
            },
        ];
        message.current_variant = 1;

        let turns = history_for_backend(&[message], 1);
        assert_eq!(
            turns[0].parts,
            vec![
                ApiPart::text("second take"),
                ApiPart::image("/images/v2.png"),
            ]
        );
    }

    #[test]
    fn legacy_model_turns_fall_back_to_raw_fields() {
        let mut message = model("m1", "stored answer");
        message.images = vec!["/images/stored.png".to_string()];

        let turns = history_for_backend(&[message], 1);
        assert_eq!(
            turns[0].parts,
            vec![
                ApiPart::text("stored answer"),
                ApiPart::image("/images/stored.png"),
            ]
        );
    }
}
