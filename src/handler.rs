use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::ChatFinished(outcome) => {
            if app.finish_send(outcome) {
                app.schedule_ticket_refresh();
            }
        }
        AppEvent::RefreshTickets => app.load_tickets(),
        AppEvent::TicketsLoaded(result) => app.finish_ticket_load(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('r') if ctrl => {
            app.load_tickets();
            return;
        }
        KeyCode::F(5) => {
            app.load_tickets();
            return;
        }
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Tab | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('r') => app.load_tickets(),

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1)),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,

        // Ticket pane scrolling
        KeyCode::Char('J') => app.scroll_tickets_down(),
        KeyCode::Char('K') => app.scroll_tickets_up(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }

    // Input is locked while a request is in flight
    if !app.input_enabled {
        return;
    }

    match key.code {
        KeyCode::Enter => app.send_message(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        // Unbound Ctrl/Alt chords are not text
        KeyCode::Char(_) if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {}
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiError, ChatReply};
    use crate::config::Config;
    use crate::status::Status;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::with_client(ApiClient::new("http://127.0.0.1:9"), &Config::new(), tx);
        (app, rx)
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_keys() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "helo");
        handle_event(&mut app, key(KeyCode::Left));
        type_text(&mut app, "l");
        assert_eq!(app.input, "hello");

        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        assert_eq!(app.input, "ello");

        handle_event(&mut app, key(KeyCode::End));
        handle_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "ell");
    }

    #[test]
    fn test_modified_chars_are_not_typed() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "ab");
        handle_event(&mut app, AppEvent::Key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)));
        handle_event(&mut app, AppEvent::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT)));
        handle_event(&mut app, AppEvent::Key(KeyEvent::new(KeyCode::Char('C'), KeyModifiers::SHIFT)));
        assert_eq!(app.input, "abC");
        assert_eq!(app.input_cursor, 3);
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.transcript.is_empty());
        assert!(app.input_enabled);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typing_is_ignored_while_sending() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "question");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.transcript.len(), 1);
        assert!(!app.input_enabled);

        type_text(&mut app, "more");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.input.is_empty());
        assert_eq!(app.transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_finished_with_ticket_schedules_refresh() {
        let (mut app, mut rx) = test_app();
        app.input = "need help".to_string();
        app.begin_send();

        handle_event(
            &mut app,
            AppEvent::ChatFinished(Ok(ChatReply {
                response: "**Got it**".to_string(),
                ticket_id: Some("T-1".to_string()),
                intent: Some("ticket_create".to_string()),
            })),
        );
        assert_eq!(app.status, Status::Ready);
        assert!(app.input_enabled);

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        assert!(matches!(rx.try_recv(), Ok(AppEvent::RefreshTickets)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_failure_schedules_nothing() {
        let (mut app, mut rx) = test_app();
        app.input = "hi".to_string();
        app.begin_send();

        handle_event(
            &mut app,
            AppEvent::ChatFinished(Err(ApiError::Application {
                status: 500,
                detail: "nope".to_string(),
            })),
        );
        assert_eq!(app.status, Status::Error);

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.should_quit, "q is text while editing");

        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
