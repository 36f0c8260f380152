use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::CredentialProvider;
use crate::config::ApiSettings;
use crate::errors::{ApiError, ApiResult};
use crate::events::{Event, EventBus};
use crate::models::intel::normalize_bill_type;
use crate::models::message::ChatMessage;
use crate::models::records::{
    BillDashboard, Conversation, ConversationRef, MemberDashboard, NoteDraft, RecordUpdate,
    RegistryOrderItem, ResearchNote, TrackedBill,
};

/// Set by the chat endpoint when it created a conversation for this request
pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bioguide_id: Option<String>,
}

impl ChatRequest {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// An open chat response: the conversation id the server reported, if any,
/// and the raw body as it arrives
pub struct ChatStream {
    pub conversation_id: Option<String>,
    body: BoxStream<'static, ApiResult<Vec<u8>>>,
}

impl ChatStream {
    pub async fn next_chunk(&mut self) -> Option<ApiResult<Vec<u8>>> {
        self.body.next().await
    }
}

/// HTTP client for the COSINT backend.
///
/// With an [`EventBus`] attached, successful mutations announce what they
/// changed so other views can reload.
pub struct ApiClient {
    client: Client,
    host: String,
    credentials: Arc<dyn CredentialProvider>,
    events: Option<EventBus>,
}

impl ApiClient {
    pub fn new(
        settings: &ApiSettings,
        credentials: Arc<dyn CredentialProvider>,
    ) -> ApiResult<Self> {
        let client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(Self {
            client,
            host: settings.host.trim_end_matches('/').to_string(),
            credentials,
            events: None,
        })
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the credential provider currently has a token
    pub async fn has_session(&self) -> ApiResult<bool> {
        Ok(self.credentials.access_token().await?.is_some())
    }

    async fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = format!("{}{}", self.host, path);
        let builder = self.client.request(method, url);

        Ok(match self.credentials.access_token().await? {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(ApiError::Unauthorized { status })
            }
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::NotFound(error_detail(&body)))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status,
                    body: error_detail(&body),
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let builder = self.request(Method::GET, path).await?;
        Ok(self.send(builder).await?.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let builder = self.request(method, path).await?.json(body);
        Ok(self.send(builder).await?.json().await?)
    }

    fn notify(&self, event: Event) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, path).await?;
        self.send(builder).await?;
        Ok(())
    }

    /// Post a chat message and return the streamed reply body
    pub async fn chat_stream(&self, request: &ChatRequest) -> ApiResult<ChatStream> {
        let builder = self.request(Method::POST, "/chat/stream").await?.json(request);
        let response = self.send(builder).await?;

        let conversation_id = response
            .headers()
            .get(CONVERSATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(?conversation_id, "chat stream opened");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from))
            .boxed();

        Ok(ChatStream {
            conversation_id,
            body,
        })
    }

    // Conversations

    pub async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> ApiResult<Vec<ChatMessage>> {
        self.get_json(&format!("/conversations/{}/messages", segment(conversation_id)))
            .await
    }

    pub async fn create_conversation(&self) -> ApiResult<Conversation> {
        let builder = self.request(Method::POST, "/conversations").await?;
        let conversation = self.send(builder).await?.json().await?;
        self.notify(Event::ConversationsChanged);
        Ok(conversation)
    }

    pub async fn list_conversations(&self) -> ApiResult<Vec<Conversation>> {
        self.get_json("/conversations").await
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> ApiResult<Conversation> {
        let conversation = self
            .send_json(
                Method::PATCH,
                &format!("/conversations/{}", segment(conversation_id)),
                &json!({ "title": title }),
            )
            .await?;
        self.notify(Event::ConversationsChanged);
        Ok(conversation)
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.delete(&format!("/conversations/{}", segment(conversation_id)))
            .await?;
        self.notify(Event::ConversationsChanged);
        Ok(())
    }

    /// The briefing conversation for a member, if one was opened before
    pub async fn member_conversation(&self, bioguide_id: &str) -> ApiResult<Option<String>> {
        let found: ConversationRef = self
            .get_json(&format!("/conversations/member/{}", segment(bioguide_id)))
            .await?;
        Ok(found.id)
    }

    /// Find or create the briefing conversation for a member
    pub async fn open_member_conversation(
        &self,
        bioguide_id: &str,
        name: Option<&str>,
    ) -> ApiResult<String> {
        let mut builder = self
            .request(
                Method::POST,
                &format!("/conversations/member/{}", segment(bioguide_id)),
            )
            .await?;
        if let Some(name) = name {
            builder = builder.query(&[("name", name)]);
        }

        let opened: ConversationRef = self.send(builder).await?.json().await?;
        let id = opened.id.ok_or_else(|| {
            ApiError::InvalidRequest(format!("no conversation returned for {}", bioguide_id))
        })?;
        // The backend may have just created it
        self.notify(Event::ConversationsChanged);
        Ok(id)
    }

    // Tracked bills

    pub async fn list_tracked_bills(&self) -> ApiResult<Vec<TrackedBill>> {
        self.get_json("/tracked-bills").await
    }

    pub async fn track_bill(&self, bill: &TrackedBill) -> ApiResult<TrackedBill> {
        let tracked = self.send_json(Method::POST, "/tracked-bills", bill).await?;
        self.notify(Event::TrackedBillsChanged { directive: None });
        Ok(tracked)
    }

    pub async fn rename_tracked_bill(&self, bill_id: &str, title: &str) -> ApiResult<TrackedBill> {
        let update = RecordUpdate {
            title: Some(title.to_string()),
            content: None,
        };
        let renamed = self
            .send_json(
                Method::PATCH,
                &format!("/tracked-bills/{}", segment(bill_id)),
                &update,
            )
            .await?;
        self.notify(Event::TrackedBillsChanged { directive: None });
        Ok(renamed)
    }

    pub async fn untrack_bill(&self, bill_id: &str) -> ApiResult<()> {
        self.delete(&format!("/tracked-bills/{}", segment(bill_id)))
            .await?;
        self.notify(Event::TrackedBillsChanged { directive: None });
        Ok(())
    }

    /// Persist the sidebar ordering of conversations and tracked bills
    pub async fn update_order(&self, items: &[RegistryOrderItem]) -> ApiResult<()> {
        let _: Value = self
            .send_json(Method::PUT, "/order", &json!({ "items": items }))
            .await?;
        self.notify(Event::ConversationsChanged);
        self.notify(Event::TrackedBillsChanged { directive: None });
        Ok(())
    }

    // Research notes

    pub async fn list_member_notes(&self, bioguide_id: &str) -> ApiResult<Vec<ResearchNote>> {
        self.get_json(&format!("/member/{}/notes", segment(bioguide_id)))
            .await
    }

    pub async fn create_member_note(
        &self,
        bioguide_id: &str,
        note: &NoteDraft,
    ) -> ApiResult<ResearchNote> {
        let created = self
            .send_json(
                Method::POST,
                &format!("/member/{}/notes", segment(bioguide_id)),
                note,
            )
            .await?;
        self.notify(Event::NotesChanged {
            bioguide_id: Some(bioguide_id.to_string()),
        });
        Ok(created)
    }

    pub async fn update_note(
        &self,
        note_id: &str,
        update: &RecordUpdate,
    ) -> ApiResult<ResearchNote> {
        if update.title.is_none() && update.content.is_none() {
            return Err(ApiError::InvalidRequest(
                "nothing to update: give a title or content".to_string(),
            ));
        }
        let note: ResearchNote = self
            .send_json(Method::PATCH, &format!("/notes/{}", segment(note_id)), update)
            .await?;
        self.notify(Event::NotesChanged {
            bioguide_id: note.bioguide_id.clone(),
        });
        Ok(note)
    }

    /// The owning member is unknown here, so listeners reload every notebook
    pub async fn delete_note(&self, note_id: &str) -> ApiResult<()> {
        self.delete(&format!("/notes/{}", segment(note_id))).await?;
        self.notify(Event::NotesChanged { bioguide_id: None });
        Ok(())
    }

    // Dashboards

    pub async fn member_dashboard(&self, bioguide_id: &str) -> ApiResult<MemberDashboard> {
        self.get_json(&format!("/member/{}", segment(bioguide_id)))
            .await
    }

    pub async fn bill_dashboard(
        &self,
        congress: u32,
        bill_type: &str,
        bill_number: &str,
    ) -> ApiResult<BillDashboard> {
        self.get_json(&format!(
            "/bill/{}/{}/{}",
            congress,
            segment(&normalize_bill_type(bill_type)),
            segment(bill_number.trim())
        ))
        .await
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// FastAPI errors look like `{"detail": "..."}`; fall back to the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
