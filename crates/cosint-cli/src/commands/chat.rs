use std::sync::Arc;

use anyhow::Result;
use cosint::chat::{ChatContext, ChatSession};
use cosint::client::ApiClient;
use cosint::events::EventBus;

use crate::prompt::cliclack::CliclackPrompt;
use crate::session::Session;

pub struct ChatOptions {
    pub conversation: Option<String>,
    pub member: Option<String>,
    pub name: Option<String>,
    pub context: Option<String>,
    pub message: Option<String>,
}

pub async fn handle_chat(
    client: Arc<ApiClient>,
    events: EventBus,
    options: ChatOptions,
) -> Result<()> {
    if !client.has_session().await? {
        println!("No session found. Run `cosint auth login` first.");
        return Ok(());
    }

    let chat = match &options.member {
        Some(bioguide_id) => {
            ChatSession::for_member(
                client.clone(),
                events,
                bioguide_id,
                options.name.as_deref(),
                options.context.clone(),
            )
            .await?
        }
        None => {
            let chat = ChatSession::new(client.clone(), events).with_context(ChatContext {
                bioguide_id: None,
                initial_context: options.context.clone(),
            });
            if let Some(conversation_id) = &options.conversation {
                chat.load(conversation_id).await?;
            }
            chat
        }
    };

    let mut session = Session::new(chat, client, Box::new(CliclackPrompt::new()));
    match options.message {
        Some(message) => session.headless_start(&message).await,
        None => session.start().await,
    }
}
