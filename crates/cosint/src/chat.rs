use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::client::{ApiClient, ChatRequest};
use crate::errors::{ApiError, ChatError};
use crate::events::{Event, EventBus};
use crate::models::intel::ActionTrigger;
use crate::models::message::ChatMessage;
use crate::sink::{NavigationSink, NoteSink};
use crate::stream::{clean_display, ParseUpdate, StreamParser, Utf8ChunkDecoder};

const STREAM_ERROR_PREFIX: &str = "Sorry, I encountered an error";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyStatus {
    Completed,
    Cancelled,
    /// The transport failed; the transcript carries a synthetic assistant message
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyOutcome {
    pub status: ReplyStatus,
    pub conversation_id: Option<String>,
    /// Content of the last assistant message when the reply ended
    pub display: String,
}

/// Extra request fields for member briefings
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub bioguide_id: Option<String>,
    pub initial_context: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<ChatMessage>,
    conversation_id: Option<String>,
    pending_action: Option<ActionTrigger>,
    /// Latest trigger of the reply being streamed, proposed once it ends
    reply_trigger: Option<ActionTrigger>,
}

/// Clears the in-flight flag when the request ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One chat transcript and the single reply that may be streaming into it.
///
/// Intel packets go to the note sink as soon as they close. The navigation
/// sink hears about the reply's final trigger once the reply ends, however it
/// ends. By default both sinks are the session's [`EventBus`].
pub struct ChatSession {
    client: Arc<ApiClient>,
    events: EventBus,
    notes: Arc<dyn NoteSink>,
    navigation: Arc<dyn NavigationSink>,
    context: ChatContext,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl ChatSession {
    pub fn new(client: Arc<ApiClient>, events: EventBus) -> Self {
        let sink = Arc::new(events.clone());
        Self {
            client,
            notes: sink.clone(),
            navigation: sink,
            events,
            context: ChatContext::default(),
            state: Mutex::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Open (or create) the briefing conversation for a member and load its history
    pub async fn for_member(
        client: Arc<ApiClient>,
        events: EventBus,
        bioguide_id: &str,
        name: Option<&str>,
        initial_context: Option<String>,
    ) -> Result<Self, ChatError> {
        let conversation_id = client.open_member_conversation(bioguide_id, name).await?;
        let session = Self::new(client, events).with_context(ChatContext {
            bioguide_id: Some(bioguide_id.to_string()),
            initial_context,
        });
        session.load(&conversation_id).await?;
        Ok(session)
    }

    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_note_sink(mut self, sink: Arc<dyn NoteSink>) -> Self {
        self.notes = sink;
        self
    }

    pub fn with_navigation_sink(mut self, sink: Arc<dyn NavigationSink>) -> Self {
        self.navigation = sink;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state().conversation_id.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn pending_action(&self) -> Option<ActionTrigger> {
        self.state().pending_action.clone()
    }

    /// Take the pending trigger so the caller can navigate to it
    pub fn accept_action(&self) -> Option<ActionTrigger> {
        self.state().pending_action.take()
    }

    pub fn dismiss_action(&self) {
        if let Some(trigger) = self.state().pending_action.take() {
            debug!(id = trigger.id(), "action dismissed");
        }
    }

    /// Start over with an empty transcript; the next reply creates a new conversation
    pub fn reset(&self) -> Result<(), ChatError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(ChatError::RequestInFlight)?;
        *self.state() = SessionState::default();
        Ok(())
    }

    /// Replace the transcript with the stored history of a conversation
    pub async fn load(&self, conversation_id: &str) -> Result<(), ChatError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(ChatError::RequestInFlight)?;

        let messages: Vec<ChatMessage> = self
            .client
            .conversation_messages(conversation_id)
            .await?
            .into_iter()
            .map(|mut message| {
                if message.is_assistant() {
                    message.content = clean_display(&message.content);
                }
                message
            })
            .collect();
        debug!(conversation_id, count = messages.len(), "history loaded");

        let mut state = self.state();
        state.messages = messages;
        state.conversation_id = Some(conversation_id.to_string());
        state.pending_action = None;
        Ok(())
    }

    /// Send a message and stream the reply into the transcript.
    ///
    /// Only one reply streams at a time; a second call while one is running
    /// fails with [`ChatError::RequestInFlight`]. When `cancel` resolves the
    /// stream is dropped and whatever was already displayed stays.
    pub async fn submit<F>(&self, text: &str, cancel: F) -> Result<ReplyOutcome, ChatError>
    where
        F: Future<Output = ()>,
    {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(ChatError::RequestInFlight)?;

        let request = {
            let mut state = self.state();
            state.messages.push(ChatMessage::human(text));
            state.messages.push(ChatMessage::assistant(""));
            state.reply_trigger = None;
            ChatRequest {
                message: text.to_string(),
                conversation_id: state.conversation_id.clone(),
                initial_context: self.context.initial_context.clone(),
                bioguide_id: self.context.bioguide_id.clone(),
            }
        };

        tokio::pin!(cancel);
        let status = tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!("reply cancelled");
                ReplyStatus::Cancelled
            }
            result = self.stream_reply(&request) => match result {
                Ok(()) => ReplyStatus::Completed,
                Err(e) => {
                    warn!("Reply stream failed: {}", e);
                    self.surface_error(&e);
                    ReplyStatus::Failed(e.to_string())
                }
            }
        };

        // Only the final trigger of the reply reaches the navigation sink
        let trigger = self.state().reply_trigger.take();
        if let Some(trigger) = trigger {
            self.navigation.propose(trigger);
        }

        let state = self.state();
        Ok(ReplyOutcome {
            status,
            conversation_id: state.conversation_id.clone(),
            display: state
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        })
    }

    async fn stream_reply(&self, request: &ChatRequest) -> Result<(), ApiError> {
        let mut stream = self.client.chat_stream(request).await?;
        if let Some(id) = stream.conversation_id.take() {
            self.adopt_conversation(id);
        }

        let mut decoder = Utf8ChunkDecoder::new();
        let mut parser = StreamParser::new();
        while let Some(chunk) = stream.next_chunk().await {
            let text = decoder.decode(&chunk?);
            if !text.is_empty() {
                self.apply(parser.push(&text));
            }
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            self.apply(parser.push(&rest));
        }
        debug!(chars = parser.buffer().len(), "reply complete");
        Ok(())
    }

    fn apply(&self, update: ParseUpdate) {
        {
            let mut state = self.state();
            if let Some(last) = state.messages.last_mut() {
                last.content = update.display;
            }
            if let Some(trigger) = update.action {
                state.pending_action = Some(trigger.clone());
                state.reply_trigger = Some(trigger);
            }
        }

        for packet in update.packets {
            debug!(title = %packet.title, "intel packet captured");
            self.notes.capture(packet);
        }
        for directive in update.tracked_bills {
            self.events.publish(Event::TrackedBillsChanged {
                directive: Some(directive),
            });
        }
    }

    fn adopt_conversation(&self, id: String) {
        let mut state = self.state();
        if state.conversation_id.as_deref() == Some(id.as_str()) {
            return;
        }
        state.conversation_id = Some(id.clone());
        drop(state);

        debug!(conversation_id = %id, "conversation created");
        self.events.publish(Event::ConversationCreated { id });
    }

    /// Put one synthetic assistant message in the transcript. The empty reply
    /// placeholder is reused; otherwise the partial reply is kept and the
    /// error follows it.
    fn surface_error(&self, error: &ApiError) {
        let content = format!(
            "{}: {}. Please check if the backend is running.",
            STREAM_ERROR_PREFIX, error
        );
        let mut state = self.state();
        match state.messages.last_mut() {
            Some(last) if last.is_assistant() && last.content.is_empty() => last.content = content,
            _ => state.messages.push(ChatMessage::assistant(content)),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
