use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use virtual_hub_core::{
    Answer, AnswerSource, ConversationStore, NetworkError, SUGGESTED_QUESTIONS,
};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Chat,
    Input,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Input => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Sidebar,
            FocusPane::Sidebar => FocusPane::Input,
        }
    }
}

/// Rows of the sidebar list: "New Chat" followed by the suggested questions
pub const SIDEBAR_ITEMS: usize = SUGGESTED_QUESTIONS.len() + 1;

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation
    pub conversation: ConversationStore,
    pub input_cursor: usize, // char index into the pending input
    pub query_task: Option<JoinHandle<Result<Answer, NetworkError>>>,
    source: Arc<dyn AnswerSource>,
    notifier: Option<UnboundedSender<AppEvent>>,
    pub endpoint: String,

    // Chat pane
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    seen_revision: u64,

    // Sidebar
    pub sidebar_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing indicator

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(source: Arc<dyn AnswerSource>, endpoint: impl Into<String>) -> Self {
        let mut sidebar_state = ListState::default();
        sidebar_state.select(Some(0));

        let conversation = ConversationStore::new();
        let seen_revision = conversation.revision();

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            conversation,
            input_cursor: 0,
            query_task: None,
            source,
            notifier: None,
            endpoint: endpoint.into(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            seen_revision,
            sidebar_state,
            animation_frame: 0,
            sidebar_area: None,
            chat_area: None,
        }
    }

    /// Wake the event loop through `tx` as soon as an answer arrives
    pub fn with_notifier(mut self, tx: UnboundedSender<AppEvent>) -> Self {
        self.notifier = Some(tx);
        self
    }

    // Input editing. The text itself lives in the conversation store.

    fn edit_input(&mut self, edit: impl FnOnce(&mut String, &mut usize)) {
        let mut text = self.conversation.pending_input().to_string();
        edit(&mut text, &mut self.input_cursor);
        self.conversation.set_pending_input(text);
    }

    pub fn insert_char(&mut self, c: char) {
        self.edit_input(|text, cursor| {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        });
    }

    pub fn insert_str(&mut self, s: &str) {
        // Terminals send CRLF on paste
        let s = s.replace("\r\n", "\n").replace('\r', "\n");
        self.edit_input(|text, cursor| {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert_str(byte_pos, &s);
            *cursor += s.chars().count();
        });
    }

    pub fn delete_back(&mut self) {
        self.edit_input(|text, cursor| {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        });
    }

    pub fn delete_forward(&mut self) {
        self.edit_input(|text, cursor| {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        });
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.conversation.pending_input().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.conversation.pending_input().chars().count();
    }

    // Conversation actions

    /// Send the pending input, if the store accepts it
    pub fn send_message(&mut self) {
        let Some(question) = self.conversation.submit_pending() else {
            return;
        };
        self.input_cursor = 0;

        debug!(chars = question.chars().count(), "dispatching question");
        let source = Arc::clone(&self.source);
        let notifier = self.notifier.clone();
        self.query_task = Some(tokio::spawn(async move {
            let result = source.ask(&question).await;
            if let Some(tx) = notifier {
                let _ = tx.send(AppEvent::AnswerReady);
            }
            result
        }));
    }

    /// Settle the background request once it has finished
    pub async fn poll_answer(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!("answer task failed: {}", e);
                    Err(NetworkError::Interrupted(e.to_string()))
                }
            };
            self.conversation.on_fetch_result(result);
        }
    }

    pub fn new_chat(&mut self) {
        self.conversation.reset();
        self.input_cursor = 0;
        self.chat_scroll = 0;
    }

    /// Pre-fill the input with a suggested question (does not send)
    pub fn apply_suggestion(&mut self, idx: usize) {
        if let Some(question) = SUGGESTED_QUESTIONS.get(idx) {
            self.conversation.set_pending_input(*question);
            self.cursor_end();
            self.focus = FocusPane::Input;
            self.input_mode = InputMode::Editing;
        }
    }

    /// Run whatever the selected sidebar row stands for
    pub fn activate_sidebar_selection(&mut self) {
        match self.sidebar_state.selected() {
            Some(0) => self.new_chat(),
            Some(i) => self.apply_suggestion(i - 1),
            None => {}
        }
    }

    // Sidebar navigation
    pub fn sidebar_nav_down(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0);
        self.sidebar_state.select(Some((i + 1).min(SIDEBAR_ITEMS - 1)));
    }

    pub fn sidebar_nav_up(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0);
        self.sidebar_state.select(Some(i.saturating_sub(1)));
    }

    // Chat scrolling

    fn max_chat_scroll(&self) -> u16 {
        self.chat_line_count().saturating_sub(self.visible_chat_height())
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_chat_height() / 2).max(1)
    }

    /// Jump to the newest message whenever the transcript changed since the
    /// last frame. Called from render once the chat size is known.
    pub fn follow_transcript(&mut self) {
        let revision = self.conversation.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.scroll_chat_to_bottom();
        }
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Height of the transcript once wrapped into the chat pane, measured
    /// on the same text `ui` draws. Saturates at `u16::MAX`.
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let lines = crate::ui::transcript_line_count(
            &self.conversation,
            self.animation_frame,
            wrap_width,
        );
        u16::try_from(lines).unwrap_or(u16::MAX)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use virtual_hub_core::{Message, Phase};

    struct FixedSource(Option<Answer>);

    #[async_trait]
    impl AnswerSource for FixedSource {
        async fn ask(&self, _question: &str) -> Result<Answer, NetworkError> {
            self.0
                .clone()
                .ok_or_else(|| NetworkError::Interrupted("offline".to_string()))
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl AnswerSource for PanickingSource {
        async fn ask(&self, _question: &str) -> Result<Answer, NetworkError> {
            panic!("source blew up");
        }
    }

    fn app_with(source: impl AnswerSource + 'static) -> App {
        App::new(Arc::new(source), "http://localhost")
    }

    async fn settle(app: &mut App) {
        for _ in 0..100 {
            app.poll_answer().await;
            if app.query_task.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("answer task never finished");
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_keeps_cursor_in_sync() {
        let mut app = app_with(FixedSource(None));
        type_text(&mut app, "hllo");
        app.cursor_home();
        app.cursor_right();
        app.insert_char('e');
        assert_eq!(app.conversation.pending_input(), "hello");
        assert_eq!(app.input_cursor, 2);

        app.cursor_end();
        app.delete_back();
        assert_eq!(app.conversation.pending_input(), "hell");

        app.cursor_home();
        app.delete_forward();
        assert_eq!(app.conversation.pending_input(), "ell");
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn test_paste_normalizes_line_endings() {
        let mut app = app_with(FixedSource(None));
        app.insert_str("one\r\ntwo");
        assert_eq!(app.conversation.pending_input(), "one\ntwo");
        assert_eq!(app.input_cursor, 7);
    }

    #[tokio::test]
    async fn test_send_and_receive_answer() {
        let mut app = app_with(FixedSource(Some(Answer {
            answer: "OPT is...".to_string(),
            sources: vec!["opt.pdf".to_string(), "faq.pdf".to_string()],
        })));
        type_text(&mut app, "What is OPT?");
        app.send_message();

        assert_eq!(app.conversation.phase(), Phase::AwaitingResponse);
        assert_eq!(app.input_cursor, 0);
        assert!(app.query_task.is_some());

        settle(&mut app).await;
        let msgs = app.conversation.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[2].sources.len(), 2);
        assert_eq!(app.conversation.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_blank_input_does_not_spawn() {
        let mut app = app_with(FixedSource(None));
        type_text(&mut app, "   ");
        app.send_message();
        assert!(app.query_task.is_none());
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_second_send_while_loading_is_ignored() {
        let mut app = app_with(FixedSource(Some(Answer::default())));
        type_text(&mut app, "one");
        app.send_message();
        type_text(&mut app, "two");
        app.send_message();

        assert_eq!(app.conversation.messages().len(), 2);
        assert_eq!(app.conversation.pending_input(), "two");

        settle(&mut app).await;
        assert_eq!(app.conversation.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_request_shows_fallback() {
        let mut app = app_with(FixedSource(None));
        type_text(&mut app, "hi");
        app.send_message();
        settle(&mut app).await;
        assert_eq!(app.conversation.messages().last(), Some(&Message::fallback()));
    }

    #[tokio::test]
    async fn test_panicking_task_still_settles() {
        let mut app = app_with(PanickingSource);
        type_text(&mut app, "hi");
        app.send_message();
        settle(&mut app).await;
        assert_eq!(app.conversation.messages().last(), Some(&Message::fallback()));
        assert!(!app.conversation.is_loading());
    }

    #[tokio::test]
    async fn test_answer_ready_notification() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = app_with(FixedSource(Some(Answer::default()))).with_notifier(tx);
        type_text(&mut app, "hi");
        app.send_message();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(matches!(event, Some(AppEvent::AnswerReady)));
    }

    #[test]
    fn test_suggestion_prefills_without_sending() {
        let mut app = app_with(FixedSource(None));
        app.focus = FocusPane::Sidebar;
        app.input_mode = InputMode::Normal;
        app.sidebar_state.select(Some(2));
        app.activate_sidebar_selection();

        assert_eq!(app.conversation.pending_input(), SUGGESTED_QUESTIONS[1]);
        assert_eq!(app.input_cursor, SUGGESTED_QUESTIONS[1].chars().count());
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[test]
    fn test_new_chat_row_resets() {
        let mut app = app_with(FixedSource(None));
        type_text(&mut app, "draft");
        app.sidebar_state.select(Some(0));
        app.activate_sidebar_selection();
        assert_eq!(app.conversation.pending_input(), "");
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn test_sidebar_nav_is_clamped() {
        let mut app = app_with(FixedSource(None));
        app.sidebar_nav_up();
        assert_eq!(app.sidebar_state.selected(), Some(0));
        for _ in 0..10 {
            app.sidebar_nav_down();
        }
        assert_eq!(app.sidebar_state.selected(), Some(SIDEBAR_ITEMS - 1));
    }

    #[test]
    fn test_follow_transcript_scrolls_on_change() {
        let mut app = app_with(FixedSource(None));
        app.chat_width = 20;
        app.chat_height = 3;
        app.follow_transcript();
        assert_eq!(app.chat_scroll, 0);

        app.conversation.submit("a question that is long enough to wrap");
        app.follow_transcript();
        assert_eq!(app.chat_scroll, app.chat_line_count() - 3);

        app.scroll_chat_up(2);
        let scrolled = app.chat_scroll;
        app.follow_transcript();
        assert_eq!(app.chat_scroll, scrolled);
    }

    #[test]
    fn test_chat_line_count_saturates_on_huge_transcript() {
        let mut app = app_with(FixedSource(None));
        app.chat_width = 40;
        app.conversation.submit("dump");
        app.conversation.on_fetch_result(Ok(Answer {
            answer: "x\n".repeat(70_000),
            sources: Vec::new(),
        }));

        assert_eq!(app.chat_line_count(), u16::MAX);
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }
}
