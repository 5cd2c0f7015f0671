use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        block::Title, Block, Borders, List, ListItem, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
};
use virtual_hub_core::{ConversationStore, Message, Role, KNOWLEDGE_BASE, SUGGESTED_QUESTIONS};
use crate::app::{App, FocusPane, InputMode};

const INPUT_PLACEHOLDER: &str =
    "Ask a question about OPT, international student resources, or CBS programs...";
const SOURCE_LABEL_CHARS: usize = 40;
const SIDEBAR_WIDTH: u16 = 42;
const MAX_INPUT_LINES: u16 = 5;

/// Short tag for a citation: first ".pdf" dropped, cut to 40 chars, "..." appended
pub fn source_label(source: &str) -> String {
    let name = source.replacen(".pdf", "", 1);
    let mut label: String = name.chars().take(SOURCE_LABEL_CHARS).collect();
    label.push_str("...");
    label
}

const SOURCES_PREFIX: &str = "📄 Sources: ";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        let bold = &after_open[..close];
        if bold.is_empty() {
            // "****" is literal
            spans.push(Span::raw(rest[..open + 4].to_string()));
            rest = &after_open[close + 2..];
            continue;
        }

        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        spans.push(Span::styled(
            bold.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: banner, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, chat_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_sidebar(app, frame, sidebar_area);
    render_chat(app, frame, chat_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" 🎓 CMC FELLOWS VIRTUAL HUB ", Style::default().fg(Color::White).bold()),
        Span::styled(" 2025 - 2026 AI Assistant ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!(" {} ", app.endpoint),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Blue));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let kb_height = KNOWLEDGE_BASE.len() as u16 + 2;
    let [list_area, kb_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(kb_height),
    ])
    .areas(area);

    let focused = app.focus == FocusPane::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let mut items = vec![ListItem::new(Line::from(Span::styled(
        " + New Chat",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )))];
    items.extend(
        SUGGESTED_QUESTIONS
            .iter()
            .map(|q| ListItem::new(format!(" {}", q))),
    );

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Suggested Questions "),
        )
        .highlight_style(if focused {
            Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        })
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.sidebar_state);

    let kb_lines: Vec<Line> = KNOWLEDGE_BASE
        .iter()
        .map(|doc| {
            Line::from(vec![
                Span::styled(" 📄 ", Style::default().fg(Color::DarkGray)),
                Span::raw(*doc),
            ])
        })
        .collect();

    let kb = Paragraph::new(kb_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Knowledge Base "),
    );
    frame.render_widget(kb, kb_area);
}

fn message_lines(msg: &Message, lines: &mut Vec<Line<'static>>) {
    match msg.role {
        Role::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in msg.text.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Role::Bot => {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            for line in msg.text.lines() {
                lines.push(parse_markdown_line(line));
            }
        }
    }

    if !msg.sources.is_empty() {
        let mut spans = vec![Span::styled(
            SOURCES_PREFIX,
            Style::default().fg(Color::DarkGray),
        )];
        for (i, source) in msg.sources.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(
                format!("[{}]", source_label(source)),
                Style::default().fg(Color::Magenta),
            ));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
}

/// Everything the chat pane shows: messages plus the typing indicator
fn transcript_text(conversation: &ConversationStore, animation_frame: u8) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in conversation.messages() {
        message_lines(msg, &mut lines);
    }

    if conversation.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

/// Rows the transcript takes once wrapped at `width` columns, using the same
/// word wrapping and glyph widths as the rendered pane
pub fn transcript_line_count(
    conversation: &ConversationStore,
    animation_frame: u8,
    width: u16,
) -> usize {
    Paragraph::new(transcript_text(conversation, animation_frame))
        .wrap(Wrap { trim: false })
        .line_count(width)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_lines = (app.conversation.pending_input().split('\n').count() as u16)
        .max(1)
        .min(MAX_INPUT_LINES);
    let [history_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_lines + 2),
    ])
    .areas(area);

    app.chat_area = Some(history_area);

    // Store chat dimensions for scroll calculations (inner size minus borders)
    app.chat_height = history_area.height.saturating_sub(2);
    app.chat_width = history_area.width.saturating_sub(2);
    app.follow_transcript();

    let chat_focused = app.focus == FocusPane::Chat;
    let border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" AI Assistant ")
        .title(
            Title::from(Span::styled(" ● Online ", Style::default().fg(Color::Green)))
                .alignment(Alignment::Right),
        );

    let total_lines = app.chat_line_count();
    let chat = Paragraph::new(transcript_text(&app.conversation, app.animation_frame))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, history_area);

    if total_lines > app.chat_height {
        let mut scrollbar_state = ScrollbarState::new(
            total_lines.saturating_sub(app.chat_height) as usize,
        )
        .position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            history_area,
            &mut scrollbar_state,
        );
    }

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Input {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = if app.conversation.is_loading() {
        " Ask (waiting for answer...) "
    } else {
        " Ask "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let pending = app.conversation.pending_input();
    if pending.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
        .block(input_block);
        frame.render_widget(placeholder, area);
    } else {
        // Scroll so the cursor stays visible in both directions
        let (row, col) = cursor_row_col(pending, app.input_cursor);
        let inner_width = area.width.saturating_sub(2) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;
        let col_offset = if inner_width > 0 && col >= inner_width {
            col - inner_width + 1
        } else {
            0
        };
        let row_offset = if inner_height > 0 && row >= inner_height {
            row - inner_height + 1
        } else {
            0
        };

        // Cyan matches the "You:" style - visible in both light and dark terminals
        let input = Paragraph::new(pending.to_string())
            .style(Style::default().fg(Color::Cyan))
            .block(input_block)
            .scroll((row_offset as u16, col_offset as u16));
        frame.render_widget(input, area);
    }

    if editing {
        let (row, col) = cursor_row_col(pending, app.input_cursor);
        let inner_width = area.width.saturating_sub(2) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;
        let x = if inner_width > 0 { col.min(inner_width - 1) } else { 0 };
        let y = if inner_height > 0 { row.min(inner_height - 1) } else { 0 };
        frame.set_cursor_position((area.x + 1 + x as u16, area.y + 1 + y as u16));
    }
}

/// Line and column (in chars) of the cursor within multi-line input
fn cursor_row_col(text: &str, cursor: usize) -> (usize, usize) {
    let before: String = text.chars().take(cursor).collect();
    let row = before.matches('\n').count();
    let col = before
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0);
    (row, col)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let mut hints = vec![Span::styled(mode_text, mode_style)];
    match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => {
            let send_style = if app.conversation.can_send() {
                label_style
            } else {
                disabled_style
            };
            hints.extend(vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", send_style),
                Span::styled(" Shift+Enter ", key_style),
                Span::styled(" new line ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" normal ", label_style),
            ]);
        }
        (InputMode::Normal, FocusPane::Sidebar) => {
            hints.extend(vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" select ", label_style),
            ]);
        }
        (InputMode::Normal, FocusPane::Chat) => {
            hints.extend(vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" g/G ", key_style),
                Span::styled(" top/bottom ", label_style),
            ]);
        }
        (InputMode::Normal, FocusPane::Input) => {
            hints.extend(vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
            ]);
        }
    }

    // Common hints
    hints.extend(vec![
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
        Span::styled(" Ctrl+N ", key_style),
        Span::styled(" new chat ", label_style),
    ]);
    if app.input_mode == InputMode::Normal {
        hints.extend(vec![
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]);
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
