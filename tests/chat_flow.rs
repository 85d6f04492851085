//! Drives the app through whole exchanges the way the event loop does.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::json;
use ticket_chat::api::ApiClient;
use ticket_chat::app::App;
use ticket_chat::config::Config;
use ticket_chat::handler::handle_event;
use ticket_chat::status::Status;
use ticket_chat::tickets::TicketPanel;
use ticket_chat::transcript::Sender;
use ticket_chat::tui::AppEvent;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn type_and_send(app: &mut App, text: &str) {
    for c in text.chars() {
        handle_event(app, key(KeyCode::Char(c)));
    }
    handle_event(app, key(KeyCode::Enter));
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> AppEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event within timeout")
        .expect("channel open")
}

fn app_for(server: &MockServer) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = App::with_client(ApiClient::new(&server.uri()), &Config::new(), tx);
    (app, rx)
}

#[tokio::test]
async fn test_ticket_creation_flow() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "**Got it**",
            "ticket_id": "T-1",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tickets": [{
                "id": "T-1",
                "summary": "need help",
                "created_at": "2024-05-01T09:30:00"
            }],
            "total": 1
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (mut app, mut rx) = app_for(&mock_server);
    app.tickets = TicketPanel::Empty;

    type_and_send(&mut app, "need help");

    // The user's line is shown before any reply arrives
    assert_eq!(app.transcript.len(), 1);
    assert_eq!(app.status, Status::Processing);
    assert!(!app.input_enabled);

    let event = next_event(&mut rx).await;
    assert!(matches!(event, AppEvent::ChatFinished(Ok(_))));
    handle_event(&mut app, event);
    let replied_at = Instant::now();

    let entries: Vec<(Sender, String)> = app
        .transcript
        .messages()
        .iter()
        .map(|m| (m.sender, m.markup().to_html()))
        .collect();
    assert_eq!(
        entries,
        vec![
            (Sender::User, "need help".to_string()),
            (Sender::Bot, "<strong>Got it</strong>".to_string()),
        ]
    );
    assert_eq!(app.status, Status::Ready);
    assert!(app.input_enabled);

    let event = next_event(&mut rx).await;
    assert!(matches!(event, AppEvent::RefreshTickets));
    assert!(replied_at.elapsed() >= Duration::from_millis(450));
    handle_event(&mut app, event);
    assert_eq!(app.tickets, TicketPanel::Loading);

    let event = next_event(&mut rx).await;
    handle_event(&mut app, event);
    match &app.tickets {
        TicketPanel::Loaded { tickets, total } => {
            assert_eq!(*total, 1);
            assert_eq!(tickets[0].id, "T-1");
        }
        other => panic!("expected loaded tickets, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_exchange_reports_and_recovers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "LLM timeout"})))
        .mount(&mock_server)
        .await;

    let (mut app, mut rx) = app_for(&mock_server);
    type_and_send(&mut app, "hello");

    let event = next_event(&mut rx).await;
    handle_event(&mut app, event);

    assert_eq!(app.status, Status::Error);
    assert!(app.input_enabled);
    let last = app.transcript.last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    assert_eq!(last.content, "Sorry, there was an error: LLM timeout");

    // No refresh follows a failure
    let pending = tokio::time::timeout(Duration::from_millis(700), rx.recv()).await;
    assert!(pending.is_err());

    // And the next message goes out normally
    type_and_send(&mut app, "again");
    assert_eq!(app.transcript.len(), 3);
    assert_eq!(app.status, Status::Processing);
}

#[tokio::test]
async fn test_whitespace_input_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "x"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (mut app, mut rx) = app_for(&mock_server);
    type_and_send(&mut app, "    ");

    assert!(app.transcript.is_empty());
    assert_eq!(app.status, Status::Ready);
    let pending = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(pending.is_err());
}

#[tokio::test]
async fn test_empty_ticket_list_is_empty_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tickets": [], "total": 0})))
        .mount(&mock_server)
        .await;

    let (mut app, mut rx) = app_for(&mock_server);
    app.load_tickets();
    assert_eq!(app.tickets, TicketPanel::Loading);

    let event = next_event(&mut rx).await;
    handle_event(&mut app, event);
    assert_eq!(app.tickets, TicketPanel::Empty);
}

#[tokio::test]
async fn test_refresh_key_reloads_tickets() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db locked"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (mut app, mut rx) = app_for(&mock_server);
    handle_event(
        &mut app,
        AppEvent::Key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL)),
    );
    assert_eq!(app.tickets, TicketPanel::Loading);

    let event = next_event(&mut rx).await;
    handle_event(&mut app, event);
    assert_eq!(app.tickets, TicketPanel::Failed("db locked".to_string()));
}
