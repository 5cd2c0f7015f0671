use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => {
            if app.input_mode == InputMode::Editing {
                app.insert_str(&text);
            }
        }
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            // Also catches tasks that died before they could send AnswerReady
            app.poll_answer().await;
        }
        AppEvent::AnswerReady => app.poll_answer().await,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('n') => {
                app.new_chat();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.focus = app.focus.next(),

        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('n') => app.new_chat(),

        _ => match app.focus {
            FocusPane::Sidebar => handle_sidebar_key(app, key),
            FocusPane::Chat => handle_chat_key(app, key),
            FocusPane::Input => {
                if key.code == KeyCode::Enter {
                    app.input_mode = InputMode::Editing;
                }
            }
        },
    }
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_nav_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.activate_sidebar_selection(),
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = app.half_page();
            app.scroll_chat_down(half);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = app.half_page();
            app.scroll_chat_up(half);
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::PageDown => {
            let half = app.half_page();
            app.scroll_chat_down(half * 2);
        }
        KeyCode::PageUp => {
            let half = app.half_page();
            app.scroll_chat_up(half * 2);
        }
        KeyCode::Char('g') => app.scroll_chat_to_top(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = app.focus.next();
        }
        // Shift+Enter only arrives on terminals with enhanced key reporting; Alt+Enter works everywhere
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.insert_char('\n');
        }
        KeyCode::Enter => app.send_message(),
        KeyCode::Backspace => app.delete_back(),
        KeyCode::Delete => app.delete_forward(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Position-based scrolling: the wheel acts on whatever is under the pointer
    let in_sidebar = app.sidebar_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(WHEEL_LINES);
            } else if in_sidebar {
                app.sidebar_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(WHEEL_LINES);
            } else if in_sidebar {
                app.sidebar_nav_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::sync::Arc;
    use virtual_hub_core::{Answer, AnswerSource, NetworkError, SUGGESTED_QUESTIONS};

    struct EchoSource;

    #[async_trait]
    impl AnswerSource for EchoSource {
        async fn ask(&self, question: &str) -> Result<Answer, NetworkError> {
            Ok(Answer {
                answer: format!("echo: {}", question),
                sources: vec!["echo.pdf".to_string()],
            })
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        key_with(code, KeyModifiers::NONE)
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    fn new_app() -> App {
        App::new(Arc::new(EchoSource), "http://localhost")
    }

    #[tokio::test]
    async fn test_enter_sends_and_tick_settles() {
        let mut app = new_app();
        type_text(&mut app, "hi").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.conversation.is_loading());

        for _ in 0..100 {
            handle_event(&mut app, AppEvent::Tick).await.unwrap();
            if !app.conversation.is_loading() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let last = app.conversation.messages().last().unwrap();
        assert_eq!(last.text, "echo: hi");
        assert_eq!(last.sources, vec!["echo.pdf"]);
    }

    #[tokio::test]
    async fn test_alt_enter_inserts_newline() {
        let mut app = new_app();
        type_text(&mut app, "a").await;
        handle_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::ALT)).await.unwrap();
        type_text(&mut app, "b").await;
        assert_eq!(app.conversation.pending_input(), "a\nb");
        assert!(!app.conversation.is_loading());
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_editing() {
        let mut app = new_app();
        handle_event(&mut app, key_with(KeyCode::Char('c'), KeyModifiers::CONTROL)).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_q_types_while_editing_and_quits_in_normal() {
        let mut app = new_app();
        type_text(&mut app, "q").await;
        assert!(!app.should_quit);
        assert_eq!(app.conversation.pending_input(), "q");

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_sidebar_suggestion_fills_input() {
        let mut app = new_app();
        // Input -> Chat -> Sidebar
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Sidebar);

        handle_event(&mut app, key(KeyCode::Char('j'))).await.unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.conversation.pending_input(), SUGGESTED_QUESTIONS[0]);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(!app.conversation.is_loading());
    }

    #[tokio::test]
    async fn test_ctrl_n_starts_new_chat() {
        let mut app = new_app();
        type_text(&mut app, "draft").await;
        handle_event(&mut app, key_with(KeyCode::Char('n'), KeyModifiers::CONTROL)).await.unwrap();
        assert_eq!(app.conversation.pending_input(), "");
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_paste_ignored_outside_editing() {
        let mut app = new_app();
        app.input_mode = InputMode::Normal;
        handle_event(&mut app, AppEvent::Paste("text".to_string())).await.unwrap();
        assert_eq!(app.conversation.pending_input(), "");

        app.input_mode = InputMode::Editing;
        handle_event(&mut app, AppEvent::Paste("text".to_string())).await.unwrap();
        assert_eq!(app.conversation.pending_input(), "text");
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 3, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(4, 4, rect));
        assert!(!point_in_rect(5, 4, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
