use std::future::{pending, Future};
use std::io;
use std::sync::Arc;

use anyhow::Result;
use cosint::chat::{ChatSession, ReplyStatus};
use cosint::client::ApiClient;
use cosint::events::Event;
use cosint::models::intel::IntelPacket;
use cosint::models::records::NoteDraft;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tracing::warn;

use crate::commands::dashboard;
use crate::prompt::{InputType, Prompt};

pub struct Session<'a> {
    chat: ChatSession,
    client: Arc<ApiClient>,
    events: Receiver<Event>,
    prompt: Box<dyn Prompt + 'a>,
}

impl<'a> Session<'a> {
    pub fn new(chat: ChatSession, client: Arc<ApiClient>, prompt: Box<impl Prompt + 'a>) -> Self {
        let events = chat.events().subscribe();
        Session {
            chat,
            client,
            events,
            prompt,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.setup_session();

        for message in self.chat.messages() {
            self.prompt.render(&message);
        }

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = input.content {
                        self.reply(&content).await?;
                    }
                }
                InputType::NewChat => {
                    self.chat.reset()?;
                    self.prompt.notice("Started a new conversation.");
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }
        }

        self.close_session();
        Ok(())
    }

    /// Send one message and render the reply, then deal with anything it asked for
    pub async fn headless_start(&mut self, message: &str) -> Result<()> {
        self.reply(message).await
    }

    async fn reply(&mut self, content: &str) -> Result<()> {
        self.prompt.show_busy();
        let outcome = self
            .chat
            .submit(content, interrupted(tokio::signal::ctrl_c()))
            .await;
        self.prompt.hide_busy();

        let outcome = outcome?;
        if let Some(message) = self.chat.messages().last() {
            self.prompt.render(message);
        }
        if outcome.status == ReplyStatus::Cancelled {
            self.prompt.notice("Interrupt: reply stopped.");
        }

        self.handle_events().await?;
        self.handle_action().await
    }

    async fn handle_events(&mut self) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(Event::IntelCaptured(packet)) => self.offer_note(packet).await?,
                Ok(Event::ConversationCreated { id }) => {
                    self.prompt.notice(&format!("Conversation {}", id));
                }
                Ok(Event::TrackedBillsChanged {
                    directive: Some(directive),
                }) => {
                    self.prompt.notice(&format!(
                        "Now tracking {} ({})",
                        directive.bill_id(),
                        directive.title
                    ));
                }
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Missed {} session events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(()),
            }
        }
    }

    async fn offer_note(&mut self, packet: IntelPacket) -> Result<()> {
        self.prompt.render_packet(&packet);

        let Some(bioguide_id) = self.chat.context().bioguide_id.clone() else {
            return Ok(());
        };
        if !self
            .prompt
            .confirm(&format!("Save \"{}\" to the notebook?", packet.title))?
        {
            return Ok(());
        }

        let draft = NoteDraft {
            title: packet.title,
            content: packet.content,
        };
        match self.client.create_member_note(&bioguide_id, &draft).await {
            Ok(note) => self.prompt.notice(&format!("Saved note {}", note.id)),
            Err(e) => self.prompt.notice(&format!("Could not save note: {}", e)),
        }
        Ok(())
    }

    async fn handle_action(&mut self) -> Result<()> {
        let Some(trigger) = self.chat.pending_action() else {
            return Ok(());
        };
        if !self
            .prompt
            .confirm(&format!("Open the dashboard for {}?", trigger.name()))?
        {
            self.chat.dismiss_action();
            return Ok(());
        }

        if let Some(trigger) = self.chat.accept_action() {
            match dashboard::render_trigger(&self.client, &trigger).await {
                Ok(markdown) => self.prompt.render_markdown(&markdown),
                Err(e) => self
                    .prompt
                    .notice(&format!("Could not load {}: {}", trigger.dashboard_path(), e)),
            }
        }
        Ok(())
    }

    fn setup_session(&mut self) {
        let banner = match (&self.chat.context().bioguide_id, self.chat.conversation_id()) {
            (Some(id), _) => format!("Briefing on member {}", id),
            (None, Some(id)) => format!("Resuming conversation {}", id),
            (None, None) => "Starting a new conversation".to_string(),
        };
        self.prompt.notice(&banner);
    }

    fn close_session(&mut self) {
        if let Some(id) = self.chat.conversation_id() {
            self.prompt
                .notice(&format!("Closing session. Resume with `cosint chat -c {}`", id));
        }
        self.prompt.close();
    }
}

/// Resolves on ctrl-c. If the handler cannot be installed it never resolves,
/// so a reply is not cancelled the moment it starts.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Could not listen for ctrl-c: {}", e);
        pending::<()>().await;
    }
}
