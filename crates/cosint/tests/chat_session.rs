use std::future::{pending, ready};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cosint::auth::StaticCredentials;
use cosint::chat::{ChatSession, ReplyStatus};
use cosint::client::ApiClient;
use cosint::config::ApiSettings;
use cosint::errors::ChatError;
use cosint::events::{Event, EventBus};
use cosint::models::intel::{ActionTrigger, IntelPacket};
use cosint::models::message::Role;
use cosint::sink::CollectingSink;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::Receiver;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPLY: &str = "Senator Brown voted yea on H.R. 815.\n\n\
*Accessing information from Congress.gov...*\n\n\
Want the full bill? [RESEARCH_BILL: 118 | HR | 815]\n\n\
[TRACK_BILL: 118 | HR | 815 | National Security Act, 2024]\n\n\
[INTEL_PACKET: Brown on HR 815 | Voted yea on final passage, April 2024. |END_PACKET]";

struct Harness {
    server: MockServer,
    client: Arc<ApiClient>,
    events: EventBus,
}

impl Harness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let settings = ApiSettings {
            host: server.uri(),
            timeout_secs: 10,
        };
        let client =
            Arc::new(ApiClient::new(&settings, Arc::new(StaticCredentials::new("token"))).unwrap());
        Self {
            server,
            client,
            events: EventBus::new(),
        }
    }

    fn session(&self) -> ChatSession {
        ChatSession::new(self.client.clone(), self.events.clone())
    }

    async fn reply_with(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat/stream"))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}

/// Serve one chat request with a chunked body, one write per chunk. With
/// `stall` set the body is never finished and the connection stays open.
async fn chunked_backend(chunks: Vec<&'static str>, stall: bool) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = vec![0u8; 16 * 1024];
        let _ = socket.read(&mut request).await;

        let head = "HTTP/1.1 200 OK\r\n\
                    content-type: text/plain; charset=utf-8\r\n\
                    transfer-encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for chunk in chunks {
            let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        if stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        } else {
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.flush().await;
        }
    });
    Ok(format!("http://{}", addr))
}

fn session_for(host: String, sink: Arc<CollectingSink>) -> Result<ChatSession> {
    let settings = ApiSettings {
        host,
        timeout_secs: 10,
    };
    let client = ApiClient::new(&settings, Arc::new(StaticCredentials::new("token")))?;
    Ok(ChatSession::new(Arc::new(client), EventBus::new())
        .with_note_sink(sink.clone())
        .with_navigation_sink(sink))
}

fn drain(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_reply_is_parsed_into_transcript_and_sinks() -> Result<()> {
    let harness = Harness::new().await;
    harness
        .reply_with(
            ResponseTemplate::new(200)
                .insert_header("X-Conversation-Id", "c-42")
                .set_body_string(REPLY),
        )
        .await;

    let sink = Arc::new(CollectingSink::new());
    let session = harness
        .session()
        .with_note_sink(sink.clone())
        .with_navigation_sink(sink.clone());
    let mut rx = harness.events.subscribe();

    let outcome = session
        .submit("How did Sherrod Brown vote on HR 815?", pending())
        .await?;

    assert_eq!(outcome.status, ReplyStatus::Completed);
    assert_eq!(outcome.conversation_id.as_deref(), Some("c-42"));
    assert_eq!(
        outcome.display,
        "Senator Brown voted yea on H.R. 815.\n\n\
         *Accessing information from Congress.gov...*\n\n\
         Want the full bill?"
    );

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::Human);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, outcome.display);

    assert_eq!(
        sink.packets(),
        vec![IntelPacket::new(
            "Brown on HR 815",
            "Voted yea on final passage, April 2024."
        )]
    );
    assert_eq!(sink.triggers(), vec![ActionTrigger::bill("118", "HR", "815")]);

    let events = drain(&mut rx);
    assert!(events.contains(&Event::ConversationCreated {
        id: "c-42".to_string()
    }));
    let tracked: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TrackedBillsChanged {
                directive: Some(directive),
            } => Some(directive.bill_id()),
            _ => None,
        })
        .collect();
    assert_eq!(tracked, vec!["118-hr-815".to_string()]);

    assert_eq!(
        session.pending_action(),
        Some(ActionTrigger::bill("118", "HR", "815"))
    );
    assert!(session.accept_action().is_some());
    assert_eq!(session.pending_action(), None);
    Ok(())
}

#[tokio::test]
async fn test_default_sinks_publish_on_event_bus() -> Result<()> {
    let harness = Harness::new().await;
    harness
        .reply_with(ResponseTemplate::new(200).set_body_string(
            "Opening a page. [CREATE_PAGE_ACTION: Sherrod Brown | B000944] \
             [INTEL_PACKET: T | C |END_PACKET]",
        ))
        .await;

    let session = harness.session();
    let mut rx = harness.events.subscribe();
    session.submit("Tell me about Senator Brown", pending()).await?;

    let events = drain(&mut rx);
    assert!(events.contains(&Event::IntelCaptured(IntelPacket::new("T", "C"))));
    assert!(events.contains(&Event::ActionProposed(ActionTrigger::member(
        "Sherrod Brown",
        "B000944"
    ))));
    assert_eq!(session.messages()[1].content, "Opening a page.");

    session.dismiss_action();
    assert_eq!(session.pending_action(), None);
    Ok(())
}

#[tokio::test]
async fn test_follow_up_reuses_conversation_id() -> Result<()> {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_json(json!({"message": "first"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Conversation-Id", "c-9")
                .set_body_string("one"),
        )
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_json(json!({"message": "second", "conversation_id": "c-9"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("two"))
        .expect(1)
        .mount(&harness.server)
        .await;

    let session = harness.session();
    session.submit("first", pending()).await?;
    let outcome = session.submit("second", pending()).await?;

    assert_eq!(outcome.display, "two");
    assert_eq!(session.conversation_id().as_deref(), Some("c-9"));
    assert_eq!(session.messages().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_surfaces_one_message() -> Result<()> {
    let harness = Harness::new().await;
    harness
        .reply_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "agent crashed"})))
        .await;

    let session = harness.session();
    let outcome = session.submit("Hello?", pending()).await?;

    assert!(matches!(outcome.status, ReplyStatus::Failed(_)));
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert!(messages[1].content.starts_with("Sorry, I encountered an error"));
    assert!(!session.is_busy());
    Ok(())
}

#[tokio::test]
async fn test_second_submission_rejected_while_streaming() -> Result<()> {
    let harness = Harness::new().await;
    harness
        .reply_with(
            ResponseTemplate::new(200)
                .set_body_string("done")
                .set_delay(Duration::from_millis(300)),
        )
        .await;

    let session = harness.session();
    let (first, second) = tokio::join!(session.submit("first", pending()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.submit("second", ready(())).await
    });

    assert_eq!(first?.status, ReplyStatus::Completed);
    assert!(matches!(second, Err(ChatError::RequestInFlight)));
    assert_eq!(session.messages().len(), 2);
    assert!(!session.is_busy());
    Ok(())
}

#[tokio::test]
async fn test_cancel_stops_reply() -> Result<()> {
    let harness = Harness::new().await;
    harness
        .reply_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(2)),
        )
        .await;

    let session = harness.session();
    let outcome = session
        .submit("Hello?", tokio::time::sleep(Duration::from_millis(50)))
        .await?;

    assert_eq!(outcome.status, ReplyStatus::Cancelled);
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "");
    assert!(!session.is_busy());
    Ok(())
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let harness = Harness::new().await;
    let session = harness.session();
    assert!(matches!(
        session.submit("   ", pending()).await,
        Err(ChatError::EmptyMessage)
    ));
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn test_member_session_loads_clean_history() -> Result<()> {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/conversations/member/B000944"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c-5"})))
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations/c-5/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"role": "human", "content": "Committee assignments?"},
            {"role": "assistant", "content": "Finance and Banking.\n\n[INTEL_PACKET: Committees | Finance, Banking |END_PACKET]"}
        ])))
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_json(json!({
            "message": "And votes?",
            "conversation_id": "c-5",
            "initial_context": "Member dashboard",
            "bioguide_id": "B000944"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("Mostly yea."))
        .expect(1)
        .mount(&harness.server)
        .await;

    let session = ChatSession::for_member(
        harness.client.clone(),
        harness.events.clone(),
        "B000944",
        Some("Sherrod Brown"),
        Some("Member dashboard".to_string()),
    )
    .await?;

    let messages = session.messages();
    assert_eq!(session.conversation_id().as_deref(), Some("c-5"));
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Finance and Banking.");

    session.submit("And votes?", pending()).await?;
    assert_eq!(session.messages().len(), 4);

    session.reset()?;
    assert!(session.messages().is_empty());
    assert_eq!(session.conversation_id(), None);
    Ok(())
}

#[tokio::test]
async fn test_navigation_independent_of_chunking() -> Result<()> {
    let whole_sink = Arc::new(CollectingSink::new());
    let whole = session_for(
        chunked_backend(
            vec!["Open? [CREATE_PAGE_ACTION: Sherrod Brown | B000944] or [RESEARCH_BILL: 118 | HR | 815]"],
            false,
        )
        .await?,
        whole_sink.clone(),
    )?;
    whole.submit("Who sponsored it?", pending()).await?;

    let split_sink = Arc::new(CollectingSink::new());
    let split = session_for(
        chunked_backend(
            vec![
                "Open? [CREATE_PAGE_ACTION: Sherrod Brown | B000944]",
                " or [RESEARCH_BILL: 118 | HR | 815]",
            ],
            false,
        )
        .await?,
        split_sink.clone(),
    )?;
    split.submit("Who sponsored it?", pending()).await?;

    let expected = vec![ActionTrigger::bill("118", "HR", "815")];
    assert_eq!(whole_sink.triggers(), expected);
    assert_eq!(split_sink.triggers(), expected);
    assert_eq!(split.pending_action(), whole.pending_action());
    assert_eq!(split.messages()[1].content, whole.messages()[1].content);
    Ok(())
}

#[tokio::test]
async fn test_cancel_keeps_text_already_shown() -> Result<()> {
    let sink = Arc::new(CollectingSink::new());
    let host = chunked_backend(
        vec![
            "Partial answer [INTEL_PACKET: T | C |END_PACKET]",
            " and the rest [RESEARCH_BILL: 118 | HR | 815]",
        ],
        true,
    )
    .await?;
    let session = session_for(host, sink.clone())?;

    let first_chunk_applied = async {
        while sink.packets().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    let outcome = session.submit("Summarise it", first_chunk_applied).await?;

    assert_eq!(outcome.status, ReplyStatus::Cancelled);
    assert_eq!(outcome.display, "Partial answer");
    assert_eq!(session.messages()[1].content, "Partial answer");
    assert_eq!(sink.packets(), vec![IntelPacket::new("T", "C")]);
    assert!(sink.triggers().is_empty());
    assert!(!session.is_busy());
    Ok(())
}
