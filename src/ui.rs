use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::markup::{Markup, Run};
use crate::status::Status;
use crate::tickets::{self, Ticket, TicketPanel};
use crate::transcript::{ChatMessage, Sender};
use unicode_width::UnicodeWidthChar;

fn run_style(run: &Run) -> Style {
    let mut style = Style::default();
    if run.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if run.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    style
}

/// Turn parsed markup into styled lines. Text is emitted literally, so
/// nothing in a message can inject terminal styling.
pub fn markup_lines(markup: &Markup) -> Vec<Line<'static>> {
    markup
        .lines()
        .iter()
        .map(|runs| {
            Line::from(
                runs.iter()
                    .map(|run| Span::styled(run.text.clone(), run_style(run)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

/// A transcript entry: sender label on the first line, then the body.
pub fn message_lines(message: &ChatMessage) -> Vec<Line<'static>> {
    let label_style = match message.sender {
        Sender::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Sender::Bot => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    };

    let mut lines = markup_lines(&message.markup());
    let label = Span::styled(format!("{}: ", message.sender.label()), label_style);
    match lines.first_mut() {
        Some(first) => first.spans.insert(0, label),
        None => lines.push(Line::from(label)),
    }
    lines
}

/// Rows `text` takes once word-wrapped to `width`, the way the panes draw it.
pub fn wrapped_height(text: Text<'_>, width: u16) -> u16 {
    let rows = Paragraph::new(text).wrap(Wrap { trim: false }).line_count(width);
    rows.min(u16::MAX as usize) as u16
}

/// Everything the chat pane shows: messages, separators, typing indicator.
pub fn transcript_text(app: &App) -> Text<'static> {
    if app.transcript.is_empty() && !app.is_sending() {
        return Text::from(Span::styled(
            "Ask a question or describe a problem to open a ticket...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in app.transcript.messages() {
        lines.extend(message_lines(msg));
        lines.push(Line::default());
    }

    if app.is_sending() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Assistant is typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [chat_area, tickets_area] = Layout::horizontal([
        Constraint::Percentage(60),
        Constraint::Percentage(40),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_tickets(app, frame, tickets_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status_style = match app.status {
        Status::Ready => Style::default().fg(Color::Green),
        Status::Processing => Style::default().fg(Color::Yellow),
        Status::Error => Style::default().fg(Color::Red).bold(),
    };

    let title = Line::from(vec![
        Span::styled(" Ticket Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(app.status.as_str(), status_style),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Black).bg(Color::Gray);
    let label_style = Style::default().fg(Color::Gray);

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().fg(Color::Black).bg(Color::Blue)),
        InputMode::Editing => (" INSERT ", Style::default().fg(Color::Black).bg(Color::Yellow)),
    };

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Ctrl+R ", key_style),
            Span::styled(" refresh tickets ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" J/K ", key_style),
            Span::styled(" tickets ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" refresh ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    let resized = app.chat_height != transcript_area.height.saturating_sub(2)
        || app.chat_width != transcript_area.width.saturating_sub(2);
    app.chat_height = transcript_area.height.saturating_sub(2);
    app.chat_width = transcript_area.width.saturating_sub(2);
    if resized {
        app.scroll_chat_to_bottom();
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Chat ");

    let chat = Paragraph::new(transcript_text(app))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, transcript_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if !app.input_enabled {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let title = if app.input_enabled {
        " Message (Enter to send) "
    } else {
        " Waiting for reply... "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (scroll_offset, cursor_col) = input_window(&app.input, app.input_cursor, inner_width);
    let visible: String = app.input.chars().skip(scroll_offset).collect();

    let input_style = if app.input_enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(visible).style(input_style).block(input_block);
    frame.render_widget(input, area);

    if editing && app.input_enabled {
        let x = area.x + 1 + cursor_col as u16;
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

/// First visible char of the input line and the cursor's column in cells.
///
/// Scrolls just far enough that the cursor keeps a free cell at the right
/// edge. Columns are display widths, so wide characters take two.
pub fn input_window(input: &str, cursor: usize, width: usize) -> (usize, usize) {
    let widths: Vec<usize> = input
        .chars()
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .collect();
    let mut start = cursor.min(widths.len());
    let mut col = 0;
    while start > 0 && col + widths[start - 1] < width {
        col += widths[start - 1];
        start -= 1;
    }
    (start, col)
}

/// The card for one ticket: id and priority, summary, then labelled fields.
pub fn ticket_lines(ticket: &Ticket) -> Vec<Line<'static>> {
    let priority_color = match ticket.priority {
        tickets::Priority::P0 => Color::Red,
        tickets::Priority::P1 => Color::LightRed,
        tickets::Priority::P2 => Color::Yellow,
        tickets::Priority::P3 => Color::Green,
        tickets::Priority::Unknown => Color::Gray,
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(ticket.id.clone(), Style::default().fg(Color::Cyan).bold()),
            Span::raw(" "),
            Span::styled(
                format!("[{}]", ticket.priority),
                Style::default().fg(priority_color).bold(),
            ),
        ]),
        Line::from(ticket.summary.clone()),
    ];
    for field in tickets::card_fields(ticket) {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}: ", field.label), Style::default().fg(Color::DarkGray)),
            Span::raw(field.value),
        ]));
    }
    lines
}

/// Ticket pane contents for each panel state.
pub fn ticket_text(panel: &TicketPanel) -> Text<'static> {
    match panel {
        TicketPanel::Loading => Text::from(Span::styled(
            tickets::LOADING_MESSAGE,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        TicketPanel::Empty => Text::from(Span::styled(
            tickets::EMPTY_MESSAGE,
            Style::default().fg(Color::DarkGray),
        )),
        TicketPanel::Failed(detail) => Text::from(Span::styled(
            format!("Error loading tickets: {}", detail),
            Style::default().fg(Color::Red),
        )),
        TicketPanel::Loaded { tickets, .. } => {
            let mut lines: Vec<Line<'static>> = Vec::new();
            for ticket in tickets {
                lines.extend(ticket_lines(ticket));
                lines.push(Line::default());
            }
            Text::from(lines)
        }
    }
}

fn render_tickets(app: &mut App, frame: &mut Frame, area: Rect) {
    app.ticket_height = area.height.saturating_sub(2);
    app.ticket_width = area.width.saturating_sub(2);
    app.clamp_ticket_scroll();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(app.tickets.title());

    let panel = Paragraph::new(ticket_text(&app.tickets))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.ticket_scroll, 0));
    frame.render_widget(panel, area);
}
