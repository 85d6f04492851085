use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ChatReply, ChatRequest, TicketList};
use crate::config::Config;
use crate::status::Status;
use crate::tickets::TicketPanel;
use crate::transcript::{ChatMessage, Transcript};
use crate::tui::AppEvent;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// The whole widget: transcript, input line, status and ticket pane.
///
/// Owned by the event loop. Network work runs in spawned tasks that report
/// back as [`AppEvent`]s, so every state change happens here on one task.
pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input line
    pub input: String,
    pub input_cursor: usize, // cursor position in chars
    pub input_enabled: bool,

    // Chat
    pub transcript: Transcript,
    pub status: Status,
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the transcript pane
    pub chat_width: u16,  // Inner width, for wrapping

    // Tickets
    pub tickets: TicketPanel,
    pub ticket_scroll: u16,
    pub ticket_height: u16,
    pub ticket_width: u16,

    // Animation state
    pub animation_frame: u8,

    api: ApiClient,
    user_id: String,
    org: String,
    refresh_delay: Duration,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: UnboundedSender<AppEvent>) -> Result<Self, ApiError> {
        let api = ApiClient::from_config(config)?;
        info!(base_url = %api.base_url(), user_id = %config.user_id(), org = %config.org(), "chat client ready");
        Ok(Self::with_client(api, config, events))
    }

    pub fn with_client(api: ApiClient, config: &Config, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            input_cursor: 0,
            input_enabled: true,

            transcript: Transcript::new(),
            status: Status::Ready,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            tickets: TicketPanel::Loading,
            ticket_scroll: 0,
            ticket_height: 0,
            ticket_width: 0,

            animation_frame: 0,

            api,
            user_id: config.user_id().to_string(),
            org: config.org().to_string(),
            refresh_delay: config.refresh_delay(),
            events,
        }
    }

    pub fn is_sending(&self) -> bool {
        !self.input_enabled
    }

    /// Local half of a send: validate, lock the input, echo the user's text.
    ///
    /// Returns the request to issue, or `None` when there is nothing to send.
    pub fn begin_send(&mut self) -> Option<ChatRequest> {
        if !self.input_enabled {
            return None;
        }

        let message = self.input.trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.input_enabled = false;
        self.status = Status::Processing;
        self.push_message(ChatMessage::user(message.clone()));
        self.input.clear();
        self.input_cursor = 0;

        Some(ChatRequest {
            message,
            user_id: self.user_id.clone(),
            org: self.org.clone(),
        })
    }

    /// Send the current input, if any. The reply arrives as
    /// [`AppEvent::ChatFinished`].
    pub fn send_message(&mut self) {
        let Some(request) = self.begin_send() else {
            return;
        };

        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = api.chat(&request).await;
            let _ = events.send(AppEvent::ChatFinished(outcome));
        });
    }

    /// Apply the result of a chat request. Both outcomes unlock the input and
    /// give it focus again.
    ///
    /// Returns true when a ticket refresh should follow.
    pub fn finish_send(&mut self, outcome: Result<ChatReply, ApiError>) -> bool {
        let refresh = match outcome {
            Ok(reply) => {
                debug!(intent = ?reply.intent, "assistant replied");
                let created = reply.ticket_id.is_some();
                if let Some(ticket_id) = &reply.ticket_id {
                    info!(ticket_id = %ticket_id, "ticket created");
                }
                self.push_message(ChatMessage::bot(reply.response));
                self.status = Status::Ready;
                created
            }
            Err(err) => {
                warn!(error = %err, status = ?err.status(), "chat request failed");
                self.push_message(ChatMessage::bot(format!("Sorry, there was an error: {}", err)));
                self.status = Status::Error;
                false
            }
        };

        self.input_enabled = true;
        self.input_mode = InputMode::Editing;
        // The typing indicator is gone now
        self.scroll_chat_to_bottom();
        refresh
    }

    /// Ask for a ticket reload after the configured delay, giving the backend
    /// time to persist what it just created.
    pub fn schedule_ticket_refresh(&self) {
        let delay = self.refresh_delay;
        let events = self.events.clone();
        debug!(delay_ms = delay.as_millis() as u64, "ticket refresh scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::RefreshTickets);
        });
    }

    /// Show the loading placeholder and fetch the list. The result arrives as
    /// [`AppEvent::TicketsLoaded`]; the latest arrival wins.
    pub fn load_tickets(&mut self) {
        self.tickets = TicketPanel::Loading;
        self.ticket_scroll = 0;

        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.list_tickets().await;
            let _ = events.send(AppEvent::TicketsLoaded(result));
        });
    }

    pub fn finish_ticket_load(&mut self, result: Result<TicketList, ApiError>) {
        if let Err(err) = &result {
            warn!(error = %err, "loading tickets failed");
        }
        self.tickets = TicketPanel::from_result(result);
    }

    fn push_message(&mut self, message: ChatMessage) {
        self.transcript.push(message);
        self.scroll_chat_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Rows the transcript takes once wrapped to the pane width.
    pub fn transcript_height(&self) -> u16 {
        let width = if self.chat_width > 0 { self.chat_width } else { 50 };
        ui::wrapped_height(ui::transcript_text(self), width)
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_height().saturating_sub(visible_height)
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    /// Rows the ticket pane content takes once wrapped.
    pub fn ticket_content_height(&self) -> u16 {
        let width = if self.ticket_width > 0 { self.ticket_width } else { 30 };
        ui::wrapped_height(ui::ticket_text(&self.tickets), width)
    }

    fn max_ticket_scroll(&self) -> u16 {
        let visible_height = if self.ticket_height > 0 {
            self.ticket_height
        } else {
            20
        };
        self.ticket_content_height().saturating_sub(visible_height)
    }

    /// Pull the ticket scroll back inside the content after a resize.
    pub fn clamp_ticket_scroll(&mut self) {
        self.ticket_scroll = self.ticket_scroll.min(self.max_ticket_scroll());
    }

    pub fn scroll_tickets_up(&mut self) {
        self.ticket_scroll = self.ticket_scroll.saturating_sub(1);
    }

    pub fn scroll_tickets_down(&mut self) {
        self.ticket_scroll = self.ticket_scroll.saturating_add(1).min(self.max_ticket_scroll());
    }
}
