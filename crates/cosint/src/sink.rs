use std::sync::Mutex;

use crate::events::{Event, EventBus};
use crate::models::intel::{ActionTrigger, IntelPacket};

/// Receives intel packets as soon as they are complete in the stream
pub trait NoteSink: Send + Sync {
    fn capture(&self, packet: IntelPacket);
}

/// Receives proposed navigation actions; the caller accepts or dismisses them later
pub trait NavigationSink: Send + Sync {
    fn propose(&self, trigger: ActionTrigger);
}

impl NoteSink for EventBus {
    fn capture(&self, packet: IntelPacket) {
        self.publish(Event::IntelCaptured(packet));
    }
}

impl NavigationSink for EventBus {
    fn propose(&self, trigger: ActionTrigger) {
        self.publish(Event::ActionProposed(trigger));
    }
}

/// Keeps everything it is given, mostly useful in tests and batch tools
#[derive(Debug, Default)]
pub struct CollectingSink {
    packets: Mutex<Vec<IntelPacket>>,
    triggers: Mutex<Vec<ActionTrigger>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> Vec<IntelPacket> {
        self.packets
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn triggers(&self) -> Vec<ActionTrigger> {
        self.triggers
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

impl NoteSink for CollectingSink {
    fn capture(&self, packet: IntelPacket) {
        if let Ok(mut packets) = self.packets.lock() {
            packets.push(packet);
        }
    }
}

impl NavigationSink for CollectingSink {
    fn propose(&self, trigger: ActionTrigger) {
        if let Ok(mut triggers) = self.triggers.lock() {
            triggers.push(trigger);
        }
    }
}
