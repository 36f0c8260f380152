//! Typed publish/subscribe for cross-view refreshes.
//!
//! Views that show conversations, notes or tracked bills subscribe here and
//! reload when something they display changes, instead of polling.
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::intel::{ActionTrigger, IntelPacket, TrackedBillDirective};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A packet was extracted from an assistant reply
    IntelCaptured(IntelPacket),
    /// The assistant proposed opening a member or bill page
    ActionProposed(ActionTrigger),
    /// The backend assigned an id to a new conversation
    ConversationCreated { id: String },
    /// A conversation was created, renamed, deleted or reordered
    ConversationsChanged,
    /// Notes of one member changed; `None` when the member is not known
    NotesChanged { bioguide_id: Option<String> },
    /// The tracked list changed. `directive` is set when a reply asked the
    /// backend to track a bill, `None` for direct edits.
    TrackedBillsChanged { directive: Option<TrackedBillDirective> },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Nobody listening is fine.
    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            debug!("event published with no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
