//! The chat session engine: conversation state, command surface, and the
//! single-flight generation attempt machine.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use ccommon::{MessageId, SendOptions, SessionId};
use cwire::{
    AttachmentUpload, CancelToken, Completion, GenerateRequest, GenerationTransport, SessionApi,
    SessionSummary, ShareState, StreamEvent, WidgetUpdate, WireError, list_all_sessions,
};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::error::EngineError;
use crate::history::history_for_backend;
use crate::hooks::{EngineHooks, NoopEngineHooks};
use crate::normalize::normalize_history;
use crate::resolver::SessionDirectory;
use crate::store::{InMemoryKeyValueStore, KeyValueStore};
use crate::types::{
    AttemptKind, AttemptPhase, ChatMessage, FileRef, MessageRole, OutgoingFile, SessionAccess,
    Variant, VariantDirection,
};

/// Localizable markers and persistence behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct EnginePolicy {
    /// Mirror guest session ids and tokens into the key/value store.
    pub allow_guest_persistence: bool,
    /// Appended to the partial text when an attempt is stopped.
    pub stopped_marker: String,
    /// Label used in the inline note appended on a failed attempt.
    pub error_label: String,
    /// Page size for session listing.
    pub page_size: u32,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            allow_guest_persistence: true,
            stopped_marker: "_[Generation stopped]_".to_string(),
            error_label: "Error".to_string(),
            page_size: 50,
        }
    }
}

#[derive(Debug)]
struct ActiveAttempt {
    generation: u64,
    kind: AttemptKind,
    target: MessageId,
    cancel: CancelToken,
}

#[derive(Debug, Default)]
struct EngineState {
    messages: Vec<ChatMessage>,
    session_id: Option<SessionId>,
    session_slug: Option<String>,
    access: SessionAccess,
    phase: AttemptPhase,
    active: Option<ActiveAttempt>,
    next_generation: u64,
}

struct PreparedAttempt {
    generation: u64,
    kind: AttemptKind,
    target: MessageId,
    session_id: SessionId,
    request: GenerateRequest,
    cancel: CancelToken,
    interrupted: Option<AttemptKind>,
}

/// Owns one conversation: the message list, session identity and access,
/// and at most one in-flight generation attempt.
///
/// Commands are safe to issue from multiple tasks; starting a new attempt
/// cancels the previous one and settles its target message before the new
/// placeholder appears, so at most one message is ever loading.
pub struct ChatEngine {
    transport: Arc<dyn GenerationTransport>,
    sessions: Arc<dyn SessionApi>,
    directory: SessionDirectory,
    policy: EnginePolicy,
    hooks: Arc<dyn EngineHooks>,
    state: Mutex<EngineState>,
}

#[derive(Default)]
pub struct ChatEngineBuilder {
    transport: Option<Arc<dyn GenerationTransport>>,
    sessions: Option<Arc<dyn SessionApi>>,
    store: Option<Arc<dyn KeyValueStore>>,
    policy: EnginePolicy,
    hooks: Option<Arc<dyn EngineHooks>>,
}

impl ChatEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(mut self, transport: Arc<dyn GenerationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn session_api(mut self, sessions: Arc<dyn SessionApi>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn policy(mut self, policy: EnginePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn EngineHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn build(self) -> Result<ChatEngine, EngineError> {
        let transport = self
            .transport
            .ok_or_else(|| EngineError::invalid_command("a generation transport is required"))?;
        let sessions = self
            .sessions
            .ok_or_else(|| EngineError::invalid_command("a session api is required"))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryKeyValueStore::new()));

        Ok(ChatEngine {
            transport,
            sessions,
            directory: SessionDirectory::new(store),
            policy: self.policy,
            hooks: self.hooks.unwrap_or_else(|| Arc::new(NoopEngineHooks)),
            state: Mutex::new(EngineState::default()),
        })
    }
}

impl ChatEngine {
    pub fn builder() -> ChatEngineBuilder {
        ChatEngineBuilder::new()
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot of the current message list.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state().session_id.clone()
    }

    pub fn session_slug(&self) -> Option<String> {
        self.state().session_slug.clone()
    }

    pub fn access(&self) -> SessionAccess {
        self.state().access.clone()
    }

    pub fn phase(&self) -> AttemptPhase {
        self.state().phase
    }

    pub fn is_generating(&self) -> bool {
        self.state().active.is_some()
    }

    /// Append the user's message and run one generation attempt.
    ///
    /// A no-op when there is nothing to send or the session is read-only.
    /// Assigns a fresh session identity when the conversation has none yet.
    pub async fn send(
        &self,
        text: &str,
        files: Vec<OutgoingFile>,
        model: &str,
        options: SendOptions,
    ) {
        if text.trim().is_empty() && files.is_empty() {
            return;
        }

        let prepared = {
            let mut state = self.state();
            if state.access.read_only {
                return;
            }

            let session_id = self.ensure_identity(&mut state);

            // Context is everything already settled; the interrupted
            // placeholder (if any) is still loading here and gets skipped.
            let context = history_for_backend(&state.messages, state.messages.len());
            let interrupted = self.settle_interrupted(&mut state);

            let now = unix_timestamp();
            let user_id = MessageId::new(format!("user-{}", Uuid::new_v4()));
            let target = MessageId::new(format!("model-{}", Uuid::new_v4()));

            let file_refs: Vec<FileRef> = files
                .iter()
                .map(|file| FileRef {
                    url_path: None,
                    original_name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                    size: file.bytes.len() as u64,
                })
                .collect();

            state
                .messages
                .push(ChatMessage::user(user_id, text, now).with_files(file_refs));
            state.messages.push(ChatMessage::placeholder(target.clone(), now));

            let attachments: Vec<AttachmentUpload> = files
                .into_iter()
                .map(|file| AttachmentUpload::new(file.name, file.mime_type, file.bytes))
                .collect();

            let mut request = GenerateRequest::new(text, model, session_id.clone())
                .with_history(context)
                .with_options(options);
            request.attachments = attachments;
            if let Some(token) = self.directory.guest_token(&session_id) {
                request = request.with_guest_token(token);
            }

            self.begin_attempt(&mut state, AttemptKind::Send, target, session_id, request, interrupted)
        };

        self.run_attempt(prepared).await;
    }

    /// Cancel the in-flight attempt, if any. The attempt settles its target
    /// message as aborted; partial text is preserved.
    pub fn stop(&self) {
        let state = self.state();
        if let Some(attempt) = &state.active {
            attempt.cancel.cancel();
        }
    }

    /// Re-run the generation behind `message_id`, appending the result as a
    /// new variant. Messages after the target are discarded first.
    pub async fn regenerate(&self, message_id: &MessageId, model: &str) {
        let prepared = {
            let mut state = self.state();
            if state.access.read_only {
                return;
            }

            let Some(target_index) = find_message(&state.messages, message_id) else {
                return;
            };
            if state.messages[target_index].role != MessageRole::Model || target_index == 0 {
                return;
            }

            let user_index = target_index - 1;
            if state.messages[user_index].role != MessageRole::User {
                return;
            }

            let session_id = self.ensure_identity(&mut state);
            let user_content = state.messages[user_index].content.clone();
            let context = history_for_backend(&state.messages, user_index);
            let interrupted = self.settle_interrupted(&mut state);

            state.messages.truncate(target_index + 1);

            let mut target = state.messages[target_index].clone();
            target.content = String::new();
            target.is_loading = true;
            target.is_error = false;
            target.is_generating_image = false;
            target.image_prompt = None;
            state.messages[target_index] = target;

            let mut request = GenerateRequest::new(user_content, model, session_id.clone())
                .with_history(context);
            if let Some(token) = self.directory.guest_token(&session_id) {
                request = request.with_guest_token(token);
            }

            self.begin_attempt(
                &mut state,
                AttemptKind::Regenerate,
                message_id.clone(),
                session_id,
                request,
                interrupted,
            )
        };

        self.run_attempt(prepared).await;
    }

    /// Rewrite a user message, discard everything after it, and run a fresh
    /// attempt. This is a single-variant reset, not a branch.
    pub async fn edit_message(&self, message_id: &MessageId, new_text: &str, model: &str) {
        if new_text.trim().is_empty() {
            return;
        }

        let prepared = {
            let mut state = self.state();
            if state.access.read_only {
                return;
            }

            let Some(user_index) = find_message(&state.messages, message_id) else {
                return;
            };
            if state.messages[user_index].role != MessageRole::User {
                return;
            }

            let session_id = self.ensure_identity(&mut state);
            let interrupted = self.settle_interrupted(&mut state);

            let mut edited = state.messages[user_index].clone();
            edited.content = new_text.to_string();
            state.messages[user_index] = edited;
            state.messages.truncate(user_index + 1);

            let context = history_for_backend(&state.messages, user_index);

            let target = MessageId::new(format!("model-{}", Uuid::new_v4()));
            state
                .messages
                .push(ChatMessage::placeholder(target.clone(), unix_timestamp()));

            let mut request = GenerateRequest::new(new_text, model, session_id.clone())
                .with_history(context);
            if let Some(token) = self.directory.guest_token(&session_id) {
                request = request.with_guest_token(token);
            }

            self.begin_attempt(&mut state, AttemptKind::Edit, target, session_id, request, interrupted)
        };

        self.run_attempt(prepared).await;
    }

    /// Move the selected variant pointer by one, clamped to bounds. Purely
    /// local; later messages answered a different variant and are dropped.
    pub fn switch_variant(&self, message_id: &MessageId, direction: VariantDirection) {
        let mut state = self.state();
        if state.access.read_only {
            return;
        }

        let Some(index) = find_message(&state.messages, message_id) else {
            return;
        };

        let message = &state.messages[index];
        if message.is_loading || message.variants.len() <= 1 {
            return;
        }

        let selected = message.current_variant as isize + direction.offset();
        if selected < 0 || selected as usize >= message.variants.len() {
            return;
        }

        let selected = selected as usize;
        let mut updated = message.clone();
        let variant = updated.variants[selected].clone();
        updated.current_variant = selected;
        updated.content = variant.content;
        updated.images = variant.images;
        state.messages[index] = updated;

        state.messages.truncate(index + 1);
    }

    /// Resolve identity, fetch the stored history, and replace the
    /// conversation wholesale.
    pub async fn load_session(&self, slug_or_id: &str) -> Result<(), EngineError> {
        let session_id = self.directory.resolve(slug_or_id);
        let guest_token = self.directory.guest_token(&session_id);

        let data = match self
            .sessions
            .fetch_history(&session_id, guest_token.as_deref())
            .await
        {
            Ok(data) => data,
            Err(error) => {
                let mut state = self.state();
                self.settle_interrupted(&mut state);
                state.messages.clear();
                state.access = SessionAccess::default();
                state.phase = AttemptPhase::Idle;
                return Err(error.into());
            }
        };

        let resolved = data
            .session_id
            .clone()
            .map(SessionId::from)
            .unwrap_or(session_id);

        let access = SessionAccess {
            is_public: data.is_public,
            is_owner: data.is_owner,
            public_id: data.public_id.clone(),
            share_url: data.share_url.clone(),
            read_only: data.read_only || (data.is_public && !data.is_owner),
        };

        let slug = data
            .public_id
            .clone()
            .unwrap_or_else(|| self.directory.slug_for(&resolved));
        self.directory.register(&resolved, &slug);
        if self.policy.allow_guest_persistence {
            self.directory.remember_current(&resolved, Some(&slug));
            self.directory.remember_guest_session(&resolved);
        }

        let messages = normalize_history(&data.history);

        let mut state = self.state();
        self.settle_interrupted(&mut state);
        state.messages = messages;
        state.session_id = Some(resolved);
        state.session_slug = Some(slug);
        state.access = access;
        state.phase = AttemptPhase::Idle;
        Ok(())
    }

    /// Reset to an empty, identity-less conversation. Guests get a fresh
    /// session id pre-allocated for the next conversation.
    pub fn clear_chat(&self) {
        {
            let mut state = self.state();
            self.settle_interrupted(&mut state);
            state.messages.clear();
            state.session_id = None;
            state.session_slug = None;
            state.access = SessionAccess::default();
            state.phase = AttemptPhase::Idle;
        }

        if self.policy.allow_guest_persistence {
            let next = SessionId::new(Uuid::new_v4().to_string());
            self.directory.remember_current(&next, None);
            self.directory.remember_guest_session(&next);
        }
    }

    pub async fn enable_sharing(&self) -> Result<Option<ShareState>, EngineError> {
        let Some(session_id) = self.session_id() else {
            return Ok(None);
        };

        let data = self.sessions.set_shared(&session_id, true).await?;

        let mut state = self.state();
        state.access = SessionAccess {
            is_public: data.is_public,
            is_owner: true,
            public_id: data.public_id.clone(),
            share_url: data.share_url.clone(),
            read_only: false,
        };

        if let Some(public_id) = &data.public_id {
            self.directory.register(&session_id, public_id);
            state.session_slug = Some(public_id.clone());
        }

        Ok(Some(data))
    }

    /// Turn sharing off. This never flips the current viewer to read-only;
    /// only a load can change that.
    pub async fn disable_sharing(&self) -> Result<Option<ShareState>, EngineError> {
        let Some(session_id) = self.session_id() else {
            return Ok(None);
        };

        let data = self.sessions.set_shared(&session_id, false).await?;

        let mut state = self.state();
        state.access = SessionAccess {
            is_public: false,
            is_owner: true,
            public_id: data.public_id.clone(),
            share_url: None,
            read_only: state.access.read_only,
        };

        Ok(Some(data))
    }

    /// All sessions visible to this client, merged across pages.
    ///
    /// Authenticated users list their account's sessions; guests list only
    /// the ids remembered locally, authenticated by their stored tokens.
    pub async fn list_sessions(
        &self,
        authenticated: bool,
    ) -> Result<Vec<SessionSummary>, EngineError> {
        let tokens = self.directory.guest_tokens();

        let ids = if authenticated {
            Vec::new()
        } else {
            if !self.policy.allow_guest_persistence {
                return Ok(Vec::new());
            }

            let ids = self.directory.guest_session_ids();
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            ids
        };

        list_all_sessions(self.sessions.as_ref(), ids, self.policy.page_size, tokens)
            .await
            .map_err(Into::into)
    }

    pub async fn rename_session(
        &self,
        session_id: &SessionId,
        title: &str,
    ) -> Result<(), EngineError> {
        self.sessions
            .rename_session(session_id, title)
            .await
            .map_err(Into::into)
    }

    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), EngineError> {
        let token = self.directory.guest_token(session_id);
        self.sessions
            .delete_session(session_id, token.as_deref())
            .await
            .map_err(Into::into)
    }

    fn ensure_identity(&self, state: &mut EngineState) -> SessionId {
        if let Some(id) = &state.session_id {
            return id.clone();
        }

        let id = SessionId::new(Uuid::new_v4().to_string());
        let slug = self.directory.slug_for(&id);
        self.directory.register(&id, &slug);
        if self.policy.allow_guest_persistence {
            self.directory.remember_current(&id, Some(&slug));
            self.directory.remember_guest_session(&id);
        }

        state.session_id = Some(id.clone());
        state.session_slug = Some(slug);
        id
    }

    /// Cancel the active attempt and settle its target as aborted so the
    /// new attempt starts with no loading message in the history.
    fn settle_interrupted(&self, state: &mut EngineState) -> Option<AttemptKind> {
        let attempt = state.active.take()?;
        attempt.cancel.cancel();

        if let Some(index) = find_message(&state.messages, &attempt.target) {
            let mut message = state.messages[index].clone();
            if message.is_loading {
                finalize(
                    &mut message,
                    attempt.kind,
                    Completion::aborted(),
                    &self.policy.stopped_marker,
                );
                state.messages[index] = message;
            }
        }

        state.phase = AttemptPhase::Aborted;
        Some(attempt.kind)
    }

    fn begin_attempt(
        &self,
        state: &mut EngineState,
        kind: AttemptKind,
        target: MessageId,
        session_id: SessionId,
        request: GenerateRequest,
        interrupted: Option<AttemptKind>,
    ) -> PreparedAttempt {
        state.next_generation += 1;
        let generation = state.next_generation;
        let cancel = CancelToken::new();

        state.active = Some(ActiveAttempt {
            generation,
            kind,
            target: target.clone(),
            cancel: cancel.clone(),
        });
        state.phase = AttemptPhase::Sending;

        PreparedAttempt {
            generation,
            kind,
            target,
            session_id,
            request,
            cancel,
            interrupted,
        }
    }

    async fn run_attempt(&self, prepared: PreparedAttempt) {
        let PreparedAttempt {
            generation,
            kind,
            target,
            session_id,
            request,
            cancel,
            interrupted,
        } = prepared;

        if let Some(previous) = interrupted {
            self.hooks
                .on_attempt_phase(&session_id, previous, AttemptPhase::Aborted);
        }

        self.hooks
            .on_attempt_phase(&session_id, kind, AttemptPhase::Sending);
        let started = Instant::now();

        let stream = match self.transport.generate(request, cancel).await {
            Ok(stream) => stream,
            Err(error) => {
                self.apply_error(generation, kind, &target, &session_id, error);
                return;
            }
        };

        self.mark_streaming(generation, kind, &session_id);

        let mut stream = stream;
        let mut accumulated = String::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamEvent::Completion(completion)) => {
                    self.apply_completion(generation, kind, &target, &session_id, completion, started);
                    return;
                }
                Ok(event) => {
                    self.apply_event(generation, &target, event, &mut accumulated);
                }
                Err(error) => {
                    self.apply_error(generation, kind, &target, &session_id, error);
                    return;
                }
            }
        }

        // The stream dried up without a terminal event; settle as aborted so
        // the placeholder cannot stay loading forever.
        self.apply_completion(
            generation,
            kind,
            &target,
            &session_id,
            Completion::aborted(),
            started,
        );
    }

    fn mark_streaming(&self, generation: u64, kind: AttemptKind, session_id: &SessionId) {
        {
            let mut state = self.state();
            if !is_current(&state, generation) {
                return;
            }
            state.phase = AttemptPhase::Streaming;
        }

        self.hooks
            .on_attempt_phase(session_id, kind, AttemptPhase::Streaming);
    }

    fn apply_event(
        &self,
        generation: u64,
        target: &MessageId,
        event: StreamEvent,
        accumulated: &mut String,
    ) {
        match event {
            StreamEvent::TextDelta(delta) => {
                accumulated.push_str(&delta);
                let mirror = accumulated.clone();
                self.update_message(generation, target, move |message| {
                    message.content = mirror;
                    message.is_generating_image = false;
                    message.image_prompt = None;
                });
            }
            StreamEvent::WidgetUpdate(update) => {
                self.update_message(generation, target, move |message| {
                    upsert_widget(&mut message.widgets, update);
                });
            }
            StreamEvent::ImageGenerating { prompt } => {
                self.update_message(generation, target, move |message| {
                    message.is_generating_image = true;
                    message.image_prompt = prompt;
                });
            }
            StreamEvent::SessionRenamed { session_id, slug } => {
                self.adopt_identity(generation, &session_id, slug.as_deref());
            }
            // Terminal events are handled by the attempt loop.
            StreamEvent::Completion(_) => {}
        }
    }

    fn apply_completion(
        &self,
        generation: u64,
        kind: AttemptKind,
        target: &MessageId,
        session_id: &SessionId,
        completion: Completion,
        started: Instant,
    ) {
        let aborted = completion.aborted;

        {
            let mut state = self.state();
            if !is_current(&state, generation) {
                return;
            }

            if self.policy.allow_guest_persistence
                && let Some(token) = &completion.session_token
                && let Some(current) = state.session_id.clone()
            {
                self.directory.store_guest_token(&current, token);
            }

            if let Some(index) = find_message(&state.messages, target) {
                let mut message = state.messages[index].clone();
                finalize(&mut message, kind, completion, &self.policy.stopped_marker);
                state.messages[index] = message;
            }

            state.active = None;
            state.phase = if aborted {
                AttemptPhase::Aborted
            } else {
                AttemptPhase::Settled
            };
        }

        let phase = if aborted {
            AttemptPhase::Aborted
        } else {
            AttemptPhase::Settled
        };
        self.hooks.on_attempt_phase(session_id, kind, phase);
        self.hooks
            .on_generation_finished(session_id, kind, started.elapsed());
    }

    fn apply_error(
        &self,
        generation: u64,
        kind: AttemptKind,
        target: &MessageId,
        session_id: &SessionId,
        error: WireError,
    ) {
        {
            let mut state = self.state();
            if !is_current(&state, generation) {
                return;
            }

            if let Some(index) = find_message(&state.messages, target) {
                let mut message = state.messages[index].clone();
                append_note(
                    &mut message.content,
                    &format!("[{}: {}]", self.policy.error_label, error.message),
                );
                message.is_loading = false;
                message.is_error = true;
                message.is_generating_image = false;
                message.image_prompt = None;
                state.messages[index] = message;
            }

            state.active = None;
            state.phase = AttemptPhase::Errored;
        }

        self.hooks
            .on_attempt_phase(session_id, kind, AttemptPhase::Errored);
    }

    fn update_message(
        &self,
        generation: u64,
        target: &MessageId,
        mutate: impl FnOnce(&mut ChatMessage),
    ) {
        let mut state = self.state();
        if !is_current(&state, generation) {
            return;
        }

        if let Some(index) = find_message(&state.messages, target) {
            let mut message = state.messages[index].clone();
            mutate(&mut message);
            state.messages[index] = message;
        }
    }

    /// Session identity is write-once: it can be learned when absent and its
    /// slug corrected, but an established id never changes.
    fn adopt_identity(&self, generation: u64, new_id: &str, slug: Option<&str>) {
        let mut state = self.state();
        if !is_current(&state, generation) {
            return;
        }

        match state.session_id.clone() {
            None => {
                let id = SessionId::from(new_id);
                let slug = slug
                    .map(str::to_string)
                    .unwrap_or_else(|| self.directory.slug_for(&id));
                self.directory.register(&id, &slug);
                if self.policy.allow_guest_persistence {
                    self.directory.remember_current(&id, Some(&slug));
                    self.directory.remember_guest_session(&id);
                }

                state.session_id = Some(id);
                state.session_slug = Some(slug);
            }
            Some(current) if current.as_str() == new_id => {
                if let Some(slug) = slug {
                    self.directory.register(&current, slug);
                    if self.policy.allow_guest_persistence {
                        self.directory.remember_current(&current, Some(slug));
                    }
                    state.session_slug = Some(slug.to_string());
                }
            }
            Some(_) => {}
        }
    }
}

fn is_current(state: &EngineState, generation: u64) -> bool {
    state
        .active
        .as_ref()
        .is_some_and(|attempt| attempt.generation == generation)
}

fn find_message(messages: &[ChatMessage], id: &MessageId) -> Option<usize> {
    messages.iter().position(|message| &message.id == id)
}

fn append_note(content: &mut String, note: &str) {
    if !content.is_empty() {
        content.push_str("\n\n");
    }

    content.push_str(note);
}

/// Settle a message with its attempt's terminal payload.
///
/// `reply`, when present, overrides the delta accumulation mirrored in
/// `content`. Regeneration appends a variant; send and edit reset to a
/// single one.
fn finalize(message: &mut ChatMessage, kind: AttemptKind, completion: Completion, stopped_marker: &str) {
    let mut accumulated = message.content.clone();
    if completion.aborted {
        append_note(&mut accumulated, stopped_marker);
    }

    let content = completion.reply.unwrap_or(accumulated);
    let variant = Variant {
        content: content.clone(),
        images: completion.images.clone(),
        sources: completion.sources,
        thinking_time: completion.thinking_time,
    };

    match kind {
        AttemptKind::Regenerate => {
            message.variants.push(variant);
            message.current_variant = message.variants.len() - 1;
        }
        AttemptKind::Send | AttemptKind::Edit => {
            message.variants = vec![variant];
            message.current_variant = 0;
        }
    }

    message.content = content;
    message.images = completion.images;
    message.is_loading = false;
    message.is_generating_image = false;
    message.image_prompt = None;
}

fn upsert_widget(widgets: &mut Vec<WidgetUpdate>, update: WidgetUpdate) {
    if let Some(existing) = widgets
        .iter_mut()
        .rev()
        .find(|widget| widget.tag == update.tag)
    {
        *existing = update;
    } else {
        widgets.push(update);
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
