use crate::ai::{idea_context, is_fallback, Assistant};
use crate::calendar::{self, DaySummary, GridCell, MonthGrid, WEEKDAY_LABELS};
use crate::commands::Session;
use crate::config::Config;
use crate::editor::ThreadEditor;
use crate::model::{day_key, PostStatus, ThreadPost, THREAD_CHAR_LIMIT};
use crate::planner::{Action, Planner};
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn run(session: Session) -> Result<()> {
    tracing::info!(store = %session.planner.location(), "starting tui");
    let mut terminal = setup_terminal()?;
    let mut app = App::new(session);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    planner: Planner,
    config: Config,
    assistant: Arc<Assistant>,
    month: NaiveDate,
    cursor: NaiveDate,
    today: NaiveDate,
    focus: Focus,
    post_idx: usize,
    mode: Mode,
    ideas: IdeasPanel,
    status: String,
    last_save: Instant,
    next_ticket: u64,
    replies_tx: Sender<AiReply>,
    replies_rx: Receiver<AiReply>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    Calendar,
    Day,
}

enum Mode {
    Normal,
    Theme {
        target: ThemeTarget,
        field: FieldValue,
    },
    Ideas,
    Editing(Box<EditorState>),
    ConfirmDelete {
        date: NaiveDate,
        post_id: String,
        label: String,
    },
}

#[derive(Copy, Clone)]
enum ThemeTarget {
    Month(NaiveDate),
    Week(NaiveDate),
    Day(NaiveDate),
}

struct IdeasPanel {
    topic: FieldValue,
    ideas: Vec<String>,
    selected: usize,
    pending: Option<u64>,
}

/// Form state around a [`ThreadEditor`]. Text inputs mirror the working
/// copy and are written back on every keystroke.
struct EditorState {
    editor: ThreadEditor,
    field: EditorField,
    title: FieldValue,
    time: FieldValue,
    segments: Vec<FieldValue>,
    splitter: Option<FieldValue>,
    confirm_delete: bool,
    pending: Option<u64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EditorField {
    Title,
    Time,
    Status,
    Segment(usize),
}

enum AiReply {
    Ideas {
        ticket: u64,
        ideas: Vec<String>,
    },
    Split {
        ticket: u64,
        parts: Vec<String>,
    },
    Polish {
        ticket: u64,
        segment_id: String,
        text: String,
    },
}

enum EditorOutcome {
    Stay,
    Close,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    /// Returns false when already on the first line.
    fn move_up(&mut self) -> bool {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return false;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
        true
    }

    /// Returns false when already on the last line.
    fn move_down(&mut self) -> bool {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return false;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
        true
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Applies a plain editing key. Returns true when the key was consumed.
    fn edit(&mut self, key: &KeyEvent, multiline: bool) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Enter if multiline => self.insert_char('\n'),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl ThemeTarget {
    fn label(&self) -> String {
        match self {
            ThemeTarget::Month(d) => format!("Theme for {}", d.format("%B %Y")),
            ThemeTarget::Week(d) => format!("Theme for week {}", calendar::week_number(*d)),
            ThemeTarget::Day(d) => format!("Theme for {}", day_key(*d)),
        }
    }

    fn action(self, theme: String) -> Action {
        match self {
            ThemeTarget::Month(month) => Action::SetMonthTheme { month, theme },
            ThemeTarget::Week(date) => Action::SetWeeklyTheme { date, theme },
            ThemeTarget::Day(date) => Action::SetDailyTheme { date, theme },
        }
    }
}

impl IdeasPanel {
    fn new() -> Self {
        IdeasPanel {
            topic: FieldValue::new(""),
            ideas: Vec::new(),
            selected: 0,
            pending: None,
        }
    }
}

impl EditorState {
    fn new(editor: ThreadEditor) -> Self {
        let post = editor.post();
        let title = FieldValue::new(&post.title);
        let time = FieldValue::new(&post.time);
        let segments = post
            .segments
            .iter()
            .map(|s| FieldValue::new(&s.content))
            .collect();
        EditorState {
            editor,
            field: EditorField::Title,
            title,
            time,
            segments,
            splitter: None,
            confirm_delete: false,
            pending: None,
        }
    }

    fn sync_segments(&mut self) {
        self.segments = self
            .editor
            .segments()
            .iter()
            .map(|s| FieldValue::new(&s.content))
            .collect();
        if let EditorField::Segment(idx) = self.field {
            let last = self.segments.len().saturating_sub(1);
            self.field = EditorField::Segment(idx.min(last));
        }
    }

    fn fields(&self) -> Vec<EditorField> {
        let mut fields = vec![EditorField::Title, EditorField::Time, EditorField::Status];
        fields.extend((0..self.segments.len()).map(EditorField::Segment));
        fields
    }

    fn step_field(&mut self, forward: bool) -> Result<(), String> {
        self.commit_time()?;
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.field = fields[next];
        Ok(())
    }

    fn commit_time(&mut self) -> Result<(), String> {
        if let Err(err) = self.editor.set_time(&self.time.value) {
            return Err(err.to_string());
        }
        self.time = FieldValue::new(&self.editor.post().time);
        Ok(())
    }

    fn active_input(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            EditorField::Title => Some(&mut self.title),
            EditorField::Time => Some(&mut self.time),
            EditorField::Status => None,
            EditorField::Segment(idx) => self.segments.get_mut(idx),
        }
    }

    /// Pushes the active text input into the working copy.
    fn commit_active(&mut self) {
        match self.field {
            EditorField::Title => self.editor.set_title(self.title.value.clone()),
            EditorField::Segment(idx) => {
                let id = self.editor.segments().get(idx).map(|s| s.id.clone());
                if let (Some(id), Some(input)) = (id, self.segments.get(idx)) {
                    self.editor.update_segment(&id, input.value.clone());
                }
            }
            EditorField::Time | EditorField::Status => {}
        }
    }

    fn current_segment(&self) -> Option<(String, String)> {
        match self.field {
            EditorField::Segment(idx) => self
                .editor
                .segments()
                .get(idx)
                .map(|s| (s.id.clone(), s.content.clone())),
            _ => None,
        }
    }
}

impl App {
    fn new(session: Session) -> Self {
        let Session {
            config,
            planner,
            assistant,
        } = session;
        let today = Local::now().date_naive();
        let (replies_tx, replies_rx) = mpsc::channel();
        let status = format!("Loaded planner from {}", planner.location());
        App {
            planner,
            config,
            assistant: Arc::new(assistant),
            month: calendar::first_of_month(today),
            cursor: today,
            today,
            focus: Focus::Calendar,
            post_idx: 0,
            mode: Mode::Normal,
            ideas: IdeasPanel::new(),
            status,
            last_save: Instant::now(),
            next_ticket: 0,
            replies_tx,
            replies_rx,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.drain_replies();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Theme { target, mut field } => {
                if !self.handle_theme_key(target, &mut field, key) {
                    self.mode = Mode::Theme { target, field };
                }
            }
            Mode::Ideas => self.mode = self.handle_ideas_key(key),
            Mode::Editing(mut state) => {
                if let EditorOutcome::Stay = self.handle_editor_key(&mut state, key) {
                    self.mode = Mode::Editing(state);
                }
            }
            Mode::ConfirmDelete {
                date,
                post_id,
                label,
            } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.dispatch(Action::DeletePost { date, post_id });
                    self.clamp_post_idx();
                }
                KeyCode::Char('n') | KeyCode::Esc => self.status = "Delete canceled".into(),
                _ => {
                    self.mode = Mode::ConfirmDelete {
                        date,
                        post_id,
                        label,
                    }
                }
            },
        }
        Ok(false)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Calendar => Focus::Day,
                    Focus::Day => Focus::Calendar,
                };
                self.clamp_post_idx();
            }
            KeyCode::Char('[') | KeyCode::PageUp => self.shift_month(-1),
            KeyCode::Char(']') | KeyCode::PageDown => self.shift_month(1),
            KeyCode::Char('g') => self.jump_to(self.today),
            KeyCode::Char('m') => self.open_theme(ThemeTarget::Month(self.month)),
            KeyCode::Char('w') => self.open_theme(ThemeTarget::Week(self.cursor)),
            KeyCode::Char('t') => self.open_theme(ThemeTarget::Day(self.cursor)),
            KeyCode::Char('n') => self.create_post(ThreadPost::draft(&self.config.default_post_time)),
            KeyCode::Char('i') => {
                self.mode = Mode::Ideas;
                self.status = "Ideas: type a topic, Enter to generate, Ctrl+A to use, Esc to close"
                    .into();
            }
            _ => match self.focus {
                Focus::Calendar => self.handle_calendar_key(key),
                Focus::Day => self.handle_day_key(key),
            },
        }
        Ok(false)
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-7),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(7),
            KeyCode::Enter => {
                self.focus = Focus::Day;
                self.clamp_post_idx();
            }
            _ => {}
        }
    }

    fn handle_day_key(&mut self, key: KeyEvent) {
        let count = self.planner.day(self.cursor).posts.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.post_idx = self.post_idx.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.post_idx + 1 < count {
                    self.post_idx += 1;
                }
            }
            KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => self.focus = Focus::Calendar,
            KeyCode::Enter | KeyCode::Char('e') => match self.selected_post() {
                Some(post) => self.open_editor(post),
                None => self.status = "No post selected to edit".into(),
            },
            KeyCode::Char('d') => match self.selected_post() {
                Some(post) => {
                    let label = post.display_title("Untitled Post");
                    self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", post.id);
                    self.mode = Mode::ConfirmDelete {
                        date: self.cursor,
                        post_id: post.id,
                        label,
                    };
                }
                None => self.status = "No post selected to delete".into(),
            },
            _ => {}
        }
    }

    /// Returns true once the dialog is finished.
    fn handle_theme_key(&mut self, target: ThemeTarget, field: &mut FieldValue, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => self.status = "Canceled".into(),
            KeyCode::Enter => self.dispatch(target.action(field.value.clone())),
            _ => {
                field.edit(&key, false);
                return false;
            }
        }
        true
    }

    fn handle_ideas_key(&mut self, key: KeyEvent) -> Mode {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.ideas.pending = None;
                self.status = "Ideas closed".into();
                return Mode::Normal;
            }
            KeyCode::Up => self.ideas.selected = self.ideas.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.ideas.selected + 1 < self.ideas.ideas.len() {
                    self.ideas.selected += 1;
                }
            }
            KeyCode::Enter => self.request_ideas(),
            KeyCode::Char('a') if control => {
                if is_fallback(&self.ideas.ideas) {
                    self.status = "No ideas to use; generate again".into();
                    return Mode::Ideas;
                }
                if let Some(idea) = self.ideas.ideas.get(self.ideas.selected).cloned() {
                    self.ideas.pending = None;
                    self.create_post(ThreadPost::from_idea(&idea, &self.config.idea_post_time));
                    return std::mem::replace(&mut self.mode, Mode::Normal);
                }
                self.status = "No idea selected".into();
            }
            _ => {
                self.ideas.topic.edit(&key, false);
            }
        }
        Mode::Ideas
    }

    fn handle_editor_key(&mut self, state: &mut EditorState, key: KeyEvent) -> EditorOutcome {
        if state.confirm_delete {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.dispatch(state.editor.clone().delete());
                    self.clamp_post_idx();
                    return EditorOutcome::Close;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    state.confirm_delete = false;
                    self.status = "Delete canceled".into();
                }
                _ => {}
            }
            return EditorOutcome::Stay;
        }

        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        if state.splitter.is_some() {
            match key.code {
                KeyCode::Esc => state.splitter = None,
                KeyCode::Char('g') if control => self.request_split(state),
                _ => {
                    if let Some(input) = state.splitter.as_mut() {
                        input.edit(&key, true);
                    }
                }
            }
            return EditorOutcome::Stay;
        }

        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return EditorOutcome::Close;
            }
            KeyCode::Char('s') if control => return self.save_editor(state),
            KeyCode::Enter if control => return self.save_editor(state),
            KeyCode::Char('n') if control => {
                state.editor.add_segment();
                state.sync_segments();
                state.field = EditorField::Segment(state.segments.len() - 1);
            }
            KeyCode::Char('d') if control => {
                if let Some((id, _)) = state.current_segment() {
                    if state.editor.remove_segment(&id) {
                        state.sync_segments();
                    } else {
                        self.status = "A thread needs at least one segment".into();
                    }
                }
            }
            KeyCode::Char('p') if control => self.request_polish(state),
            KeyCode::Char('k') if control => {
                state.splitter = Some(FieldValue::new(""));
            }
            KeyCode::Char('x') if control => {
                state.confirm_delete = true;
                self.status = "Delete this post? (y to confirm, n/Esc to cancel)".into();
            }
            KeyCode::Tab | KeyCode::BackTab => {
                if let Err(err) = state.step_field(key.code == KeyCode::Tab) {
                    self.status = err;
                }
            }
            KeyCode::Up => {
                let moved = state.active_input().map(|f| f.move_up()).unwrap_or(false);
                if !moved {
                    if let Err(err) = state.step_field(false) {
                        self.status = err;
                    }
                }
            }
            KeyCode::Down => {
                let moved = state.active_input().map(|f| f.move_down()).unwrap_or(false);
                if !moved {
                    if let Err(err) = state.step_field(true) {
                        self.status = err;
                    }
                }
            }
            _ if state.field == EditorField::Status => match key.code {
                KeyCode::Left => {
                    state.editor.cycle_status();
                    state.editor.cycle_status();
                }
                KeyCode::Right | KeyCode::Char(' ') => state.editor.cycle_status(),
                KeyCode::Enter => return self.save_editor(state),
                _ => {}
            },
            KeyCode::Enter if !matches!(state.field, EditorField::Segment(_)) => {
                return self.save_editor(state);
            }
            _ => {
                let multiline = matches!(state.field, EditorField::Segment(_));
                if let Some(input) = state.active_input() {
                    if input.edit(&key, multiline) {
                        state.commit_active();
                    }
                }
            }
        }
        EditorOutcome::Stay
    }

    fn save_editor(&mut self, state: &mut EditorState) -> EditorOutcome {
        state.commit_active();
        if let Err(err) = state.commit_time() {
            self.status = format!("Could not save: {}", err);
            return EditorOutcome::Stay;
        }
        let over = state.editor.over_limit_count();
        self.dispatch(state.editor.clone().save());
        if over > 0 {
            self.status = format!(
                "Saved; {} segment(s) over {} characters",
                over, THREAD_CHAR_LIMIT
            );
        }
        EditorOutcome::Close
    }

    fn request_ideas(&mut self) {
        if self.ideas.pending.is_some() {
            self.status = "Still generating ideas...".into();
            return;
        }
        let topic = self.ideas.topic.value.trim().to_string();
        if topic.is_empty() {
            return;
        }
        let context = idea_context(
            &self.planner.month(self.month).monthly_theme,
            &self.planner.day(self.cursor).daily_theme,
        );
        let ticket = self.spawn_ai(move |assistant, ticket| AiReply::Ideas {
            ticket,
            ideas: assistant.generate_ideas(&topic, &context),
        });
        self.ideas.pending = Some(ticket);
        self.status = "Generating ideas...".into();
    }

    fn request_split(&mut self, state: &mut EditorState) {
        if state.pending.is_some() {
            self.status = "Assistant is still working".into();
            return;
        }
        let text = match &state.splitter {
            Some(input) if !input.value.trim().is_empty() => input.value.clone(),
            _ => return,
        };
        let ticket = self.spawn_ai(move |assistant, ticket| AiReply::Split {
            ticket,
            parts: assistant.split_into_chain(&text),
        });
        state.pending = Some(ticket);
        self.status = "Splitting into a chain...".into();
    }

    fn request_polish(&mut self, state: &mut EditorState) {
        if state.pending.is_some() {
            self.status = "Assistant is still working".into();
            return;
        }
        let Some((segment_id, content)) = state.current_segment() else {
            self.status = "Move to a segment to polish it".into();
            return;
        };
        if content.is_empty() {
            return;
        }
        let ticket = self.spawn_ai(move |assistant, ticket| AiReply::Polish {
            ticket,
            text: assistant.polish(&content),
            segment_id,
        });
        state.pending = Some(ticket);
        self.status = "Polishing...".into();
    }

    fn spawn_ai<F>(&mut self, job: F) -> u64
    where
        F: FnOnce(&Assistant, u64) -> AiReply + Send + 'static,
    {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let assistant = Arc::clone(&self.assistant);
        let tx = self.replies_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job(&*assistant, ticket));
        });
        ticket
    }

    /// Applies finished AI work. Replies whose panel or editor has since
    /// closed no longer match a pending ticket and are dropped.
    fn drain_replies(&mut self) {
        while let Ok(reply) = self.replies_rx.try_recv() {
            match reply {
                AiReply::Ideas { ticket, ideas } => {
                    if self.ideas.pending != Some(ticket) {
                        tracing::debug!(ticket, "discarding stale ideas");
                        continue;
                    }
                    self.ideas.pending = None;
                    self.status = format!("{} idea(s)", ideas.len());
                    self.ideas.ideas = ideas;
                    self.ideas.selected = 0;
                }
                AiReply::Split { ticket, parts } => {
                    let Some(state) = self.editor_for(ticket) else {
                        continue;
                    };
                    state.pending = None;
                    let count = parts.len();
                    state.editor.apply_split(parts);
                    state.sync_segments();
                    state.splitter = None;
                    state.field = EditorField::Segment(0);
                    self.status = format!("Chain of {} segment(s)", count);
                }
                AiReply::Polish {
                    ticket,
                    segment_id,
                    text,
                } => {
                    let Some(state) = self.editor_for(ticket) else {
                        continue;
                    };
                    state.pending = None;
                    state.editor.apply_polish(&segment_id, text);
                    state.sync_segments();
                    self.status = "Polished".into();
                }
            }
        }
    }

    fn editor_for(&mut self, ticket: u64) -> Option<&mut EditorState> {
        match &mut self.mode {
            Mode::Editing(state) if state.pending == Some(ticket) => Some(state.as_mut()),
            _ => {
                tracing::debug!(ticket, "discarding reply for closed editor");
                None
            }
        }
    }

    fn create_post(&mut self, post: ThreadPost) {
        let opened = post.clone();
        self.dispatch(Action::CreatePost {
            date: self.cursor,
            post,
        });
        self.focus = Focus::Day;
        self.post_idx = self.planner.day(self.cursor).posts.len().saturating_sub(1);
        self.open_editor(opened);
    }

    fn open_editor(&mut self, post: ThreadPost) {
        self.status = format!(
            "Editing {} (Tab fields, Ctrl+S save, Ctrl+N/Ctrl+D segment, Ctrl+P polish, Ctrl+K split, Ctrl+X delete, Esc cancel)",
            post.id
        );
        let editor = ThreadEditor::new(self.cursor, post);
        self.mode = Mode::Editing(Box::new(EditorState::new(editor)));
    }

    fn open_theme(&mut self, target: ThemeTarget) {
        let current = match target {
            ThemeTarget::Month(d) => self.planner.month(d).monthly_theme,
            ThemeTarget::Week(d) => calendar::weekly_theme_for(self.planner.state(), d),
            ThemeTarget::Day(d) => self.planner.day(d).daily_theme,
        };
        self.status = format!("{} (Enter save, Esc cancel)", target.label());
        self.mode = Mode::Theme {
            target,
            field: FieldValue::new(&current),
        };
    }

    fn dispatch(&mut self, action: Action) {
        let message = action.describe();
        match self.planner.dispatch(action) {
            Ok(()) => {
                self.last_save = Instant::now();
                self.status = message;
            }
            Err(err) => {
                tracing::error!("save failed: {:#}", err);
                self.status = format!("Save failed: {}", err);
            }
        }
    }

    fn selected_post(&self) -> Option<ThreadPost> {
        self.planner
            .day(self.cursor)
            .posts
            .get(self.post_idx)
            .cloned()
    }

    fn clamp_post_idx(&mut self) {
        let count = self.planner.day(self.cursor).posts.len();
        self.post_idx = self.post_idx.min(count.saturating_sub(1));
    }

    fn move_cursor(&mut self, days: i64) {
        if let Some(date) = self
            .cursor
            .checked_add_signed(ChronoDuration::days(days))
        {
            self.jump_to(date);
        }
    }

    fn jump_to(&mut self, date: NaiveDate) {
        self.cursor = date;
        self.month = calendar::first_of_month(date);
        self.post_idx = 0;
    }

    fn shift_month(&mut self, delta: i32) {
        let month = calendar::shift_month(self.month, delta);
        let day = self.cursor.day().min(calendar::days_in_month(month));
        self.month = month;
        self.cursor = month.with_day(day).unwrap_or(month);
        self.post_idx = 0;
    }

    fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(12),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
            .split(layout[1]);
        self.draw_month(f, body[0]);
        self.draw_sidebar(f, body[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Theme { target, field } => self.draw_theme_dialog(f, target, field),
            Mode::Editing(state) => {
                self.draw_editor(f, state);
                if state.confirm_delete {
                    self.draw_confirm(f, &state.editor.post().display_title("Untitled Post"));
                }
            }
            Mode::ConfirmDelete { label, .. } => self.draw_confirm(f, label),
            Mode::Normal | Mode::Ideas => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "threadplan ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.month.format("%B %Y").to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.planner.location(), Style::default().fg(Color::DarkGray)),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            if self.assistant.is_enabled() {
                Span::styled("AI on", Style::default().fg(Color::Green))
            } else {
                Span::styled("AI off (no key)", Style::default().fg(Color::DarkGray))
            },
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_month(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(8)])
            .split(area);

        let state = self.planner.state();
        let plan = self.planner.month(self.month);
        let stats = calendar::month_stats(state, self.month);
        let theme = if plan.monthly_theme.is_empty() {
            Span::styled("(press m to set)", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(plan.monthly_theme.clone(), Style::default().fg(Color::Yellow))
        };
        let lines = vec![
            Line::from(vec![
                Span::styled("Monthly theme: ", Style::default().fg(Color::Gray)),
                theme,
            ]),
            Line::from(vec![
                Span::styled(format!("{} posts", stats.total), Style::default().fg(Color::White)),
                Span::raw("   "),
                Span::styled(format!("{} drafts", stats.drafts), status_style(PostStatus::Draft)),
                Span::raw("   "),
                Span::styled(
                    format!("{} scheduled", stats.scheduled),
                    status_style(PostStatus::Scheduled),
                ),
                Span::raw("   "),
                Span::styled(
                    format!("{} published", stats.published),
                    status_style(PostStatus::Published),
                ),
            ]),
        ];
        let summary = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    self.month.format("%B %Y").to_string(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )),
        );
        f.render_widget(summary, sections[0]);
        self.draw_grid(f, sections[1]);
    }

    fn draw_grid(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let grid = MonthGrid::new(self.month);
        let mut row_constraints = vec![Constraint::Length(1)];
        row_constraints.extend(std::iter::repeat(Constraint::Ratio(1, 6)).take(6));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(row_constraints)
            .split(area);
        let columns = || {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(std::iter::repeat(Constraint::Ratio(1, 7)).take(7).collect::<Vec<_>>())
        };

        let heading_cells = columns().split(rows[0]);
        for (idx, label) in WEEKDAY_LABELS.iter().enumerate() {
            let heading = Paragraph::new(*label)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
            f.render_widget(heading, heading_cells[idx]);
        }

        let state = self.planner.state();
        for (row_idx, week) in grid.rows().enumerate() {
            let cells = columns().split(rows[row_idx + 1]);
            for (col_idx, cell) in week.iter().enumerate() {
                let summary = calendar::day_summary(state, cell.date);
                let week_theme = if cell.is_week_start && cell.in_month {
                    Some(calendar::weekly_theme_for(state, cell.date))
                } else {
                    None
                };
                self.draw_cell(f, cells[col_idx], cell, &summary, week_theme);
            }
        }
    }

    fn draw_cell(
        &self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        cell: &GridCell,
        summary: &DaySummary,
        week_theme: Option<String>,
    ) {
        let is_cursor = cell.date == self.cursor;
        let width = area.width.saturating_sub(2) as usize;
        let mut number_style = Style::default().fg(if cell.in_month {
            Color::White
        } else {
            Color::DarkGray
        });
        if cell.date == self.today {
            number_style = number_style
                .bg(Color::Yellow)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD);
        }
        let mut title = vec![Span::styled(format!("{:>2}", summary.date.day()), number_style)];
        if summary.post_count > 0 {
            title.push(Span::styled(
                format!(" ({})", summary.post_count),
                Style::default().fg(Color::LightYellow),
            ));
        }

        let mut lines = Vec::new();
        if let Some(theme) = week_theme {
            let week = calendar::week_number(cell.date);
            let text = if theme.is_empty() {
                format!("W{}", week)
            } else {
                format!("W{} {}", week, theme)
            };
            lines.push(Line::from(Span::styled(
                truncate_text(&text, width),
                Style::default().fg(Color::LightMagenta),
            )));
        }
        for preview in &summary.previews {
            let marker = if preview.chain { "≡ " } else { "• " };
            lines.push(Line::from(Span::styled(
                truncate_text(&format!("{}{}", marker, preview.label), width),
                status_style(preview.status),
            )));
        }
        if summary.more > 0 {
            lines.push(Line::from(Span::styled(
                format!("+ {} more", summary.more),
                Style::default().fg(Color::Gray),
            )));
        }

        let border = if is_cursor {
            Style::default()
                .fg(if self.focus == Focus::Calendar {
                    Color::Cyan
                } else {
                    Color::Blue
                })
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Line::from(title));
        if !cell.in_month {
            block = block.style(Style::default().bg(Color::Rgb(16, 18, 24)));
        }
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_sidebar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let ideas_open = matches!(self.mode, Mode::Ideas);
        let mut constraints = vec![Constraint::Length(6), Constraint::Min(6)];
        if ideas_open {
            constraints.push(Constraint::Percentage(45));
        }
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let plan = self.planner.day(self.cursor);
        let week_theme = calendar::weekly_theme_for(self.planner.state(), self.cursor);
        let muted = Style::default().fg(Color::DarkGray);
        let info = vec![
            Line::from(Span::styled(
                self.cursor.format("%A, %B %-d %Y").to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(
                    format!("Week {}: ", calendar::week_number(self.cursor)),
                    Style::default().fg(Color::Gray),
                ),
                if week_theme.is_empty() {
                    Span::styled("(w to set)", muted)
                } else {
                    Span::styled(week_theme, Style::default().fg(Color::LightMagenta))
                },
            ]),
            Line::from(vec![
                Span::styled("Day theme: ", Style::default().fg(Color::Gray)),
                if plan.daily_theme.is_empty() {
                    Span::styled("(t to set)", muted)
                } else {
                    Span::styled(plan.daily_theme.clone(), Style::default().fg(Color::Cyan))
                },
            ]),
        ];
        let info_block = Paragraph::new(info).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Day"),
        );
        f.render_widget(info_block, sections[0]);

        let focused = self.focus == Focus::Day;
        let width = sections[1].width.saturating_sub(4) as usize;
        let items = if plan.posts.is_empty() {
            vec![ListItem::new("No posts planned. Press n to add one.")]
        } else {
            plan.posts.iter().map(|p| post_item(p, width)).collect()
        };
        let mut list_state = ListState::default();
        if focused && !plan.posts.is_empty() {
            list_state.select(Some(self.post_idx.min(plan.posts.len() - 1)));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(if focused {
                        Color::Cyan
                    } else {
                        Color::DarkGray
                    }))
                    .title(Span::styled(
                        format!("Posts ({})", plan.posts.len()),
                        Style::default()
                            .fg(if focused { Color::Cyan } else { Color::Gray })
                            .add_modifier(Modifier::BOLD),
                    )),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(list, sections[1], &mut list_state);

        if ideas_open {
            self.draw_ideas(f, sections[2]);
        }
    }

    fn draw_ideas(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines = field_lines("Topic", &self.ideas.topic, true);
        if self.ideas.pending.is_some() {
            lines.push(Line::from(Span::styled(
                "Generating...",
                Style::default().fg(Color::Yellow),
            )));
        }
        lines.push(Line::from(""));
        for (idx, idea) in self.ideas.ideas.iter().enumerate() {
            let style = if idx == self.ideas.selected {
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(format!("{}. {}", idx + 1, idea), style)));
        }
        let panel = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightMagenta))
                .title(Span::styled(
                    "Idea generator",
                    Style::default()
                        .fg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD),
                )),
        );
        f.render_widget(Clear, area);
        f.render_widget(panel, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let mut spans = Vec::new();
        match (&self.mode, self.focus) {
            (Mode::Editing(_), _) => spans.extend([
                key("Tab", Color::LightCyan),
                Span::raw(" field  "),
                key("Ctrl+S", Color::LightGreen),
                Span::raw(" save  "),
                key("Ctrl+N/D", Color::LightYellow),
                Span::raw(" add/remove segment  "),
                key("Ctrl+P", Color::LightMagenta),
                Span::raw(" polish  "),
                key("Ctrl+K", Color::LightMagenta),
                Span::raw(" split  "),
                key("Ctrl+X", Color::LightRed),
                Span::raw(" delete  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ]),
            (Mode::Ideas, _) => spans.extend([
                key("Enter", Color::LightGreen),
                Span::raw(" generate  "),
                key("↑↓", Color::LightCyan),
                Span::raw(" choose  "),
                key("Ctrl+A", Color::LightMagenta),
                Span::raw(" use idea  "),
                key("Esc", Color::LightRed),
                Span::raw(" close"),
            ]),
            (Mode::Theme { .. }, _) | (Mode::ConfirmDelete { .. }, _) => spans.extend([
                key("Enter", Color::LightGreen),
                Span::raw(" confirm  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ]),
            (Mode::Normal, Focus::Calendar) => spans.extend([
                key("←↑↓→ / h j k l", Color::LightCyan),
                Span::raw(" day  "),
                key("[ ]", Color::LightCyan),
                Span::raw(" month  "),
                key("g", Color::LightCyan),
                Span::raw(" today  "),
                key("Enter/Tab", Color::LightYellow),
                Span::raw(" posts  "),
                key("n", Color::LightMagenta),
                Span::raw(" new  "),
                key("m w t", Color::LightGreen),
                Span::raw(" month/week/day theme  "),
                key("i", Color::LightMagenta),
                Span::raw(" ideas  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ]),
            (Mode::Normal, Focus::Day) => spans.extend([
                key("↑↓", Color::LightCyan),
                Span::raw(" browse  "),
                key("Enter/e", Color::LightYellow),
                Span::raw(" edit  "),
                key("n", Color::LightMagenta),
                Span::raw(" new  "),
                key("d", Color::LightRed),
                Span::raw(" delete  "),
                key("Esc/Tab", Color::LightCyan),
                Span::raw(" calendar  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ]),
        }
        Line::from(spans)
    }

    fn draw_theme_dialog(&self, f: &mut ratatui::Frame<'_>, target: &ThemeTarget, field: &FieldValue) {
        let area = centered_rect(60, 20, f.size());
        let dialog = Paragraph::new(field_lines("Theme", field, true))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(Span::styled(
                        target.label(),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_editor(&self, f: &mut ratatui::Frame<'_>, state: &EditorState) {
        let area = centered_rect(80, 85, f.size());
        let post = state.editor.post();
        let in_form = state.splitter.is_none();
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut active_line = 0;

        if state.pending.is_some() {
            lines.push(Line::from(Span::styled(
                "Assistant is working...",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        if let Some(input) = &state.splitter {
            lines.push(Line::from(Span::styled(
                "Magic split: paste long text, Ctrl+G to generate the chain, Esc to close",
                Style::default().fg(Color::LightMagenta),
            )));
            active_line = lines.len();
            lines.extend(field_lines("Text", input, true));
            lines.push(Line::from(""));
        }

        let title_active = in_form && state.field == EditorField::Title;
        if title_active {
            active_line = lines.len();
        }
        lines.extend(field_lines("Title", &state.title, title_active));
        let time_active = in_form && state.field == EditorField::Time;
        if time_active {
            active_line = lines.len();
        }
        lines.extend(field_lines("Time (HH:MM)", &state.time, time_active));

        let status_active = in_form && state.field == EditorField::Status;
        if status_active {
            active_line = lines.len();
        }
        let mut status_spans = vec![Span::styled(
            "Status: ",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD | Modifier::DIM),
        )];
        for status in PostStatus::ALL {
            let mut style = status_style(status);
            if status == post.status {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            status_spans.push(Span::styled(format!(" {} ", status), style));
            status_spans.push(Span::raw(" "));
        }
        if status_active {
            status_spans.push(Span::styled("← →", Style::default().fg(Color::Cyan)));
        }
        lines.push(Line::from(status_spans));
        lines.push(Line::from(""));

        let total = state.segments.len();
        for (idx, input) in state.segments.iter().enumerate() {
            let count = input.value.chars().count();
            let over = count > THREAD_CHAR_LIMIT;
            let active = in_form && state.field == EditorField::Segment(idx);
            if active {
                active_line = lines.len();
            }
            lines.push(Line::from(vec![
                Span::styled(
                    format!("── {}/{} ", idx + 1, total),
                    Style::default().fg(if active { Color::Cyan } else { Color::Gray }),
                ),
                Span::styled(
                    format!("{}/{}", count, THREAD_CHAR_LIMIT),
                    Style::default().fg(if over { Color::LightRed } else { Color::DarkGray }),
                ),
            ]));
            lines.extend(field_lines("Text", input, active));
        }

        let inner_height = area.height.saturating_sub(2);
        let scroll = (active_line as u16).saturating_sub(inner_height / 2);
        let title = if post.is_chain() {
            format!("Edit thread chain ({} posts)", post.segments.len())
        } else {
            "Edit post".to_string()
        };
        let dialog = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, label: &str) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", label),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn status_style(status: PostStatus) -> Style {
    Style::default().fg(match status {
        PostStatus::Draft => Color::Gray,
        PostStatus::Scheduled => Color::LightBlue,
        PostStatus::Published => Color::LightGreen,
    })
}

fn post_item(post: &ThreadPost, width: usize) -> ListItem<'static> {
    let mut head = vec![
        Span::styled(post.time.clone(), Style::default().fg(Color::LightYellow)),
        Span::raw(" "),
        Span::styled(format!("[{}]", post.status), status_style(post.status)),
        Span::raw(" "),
    ];
    if post.is_chain() {
        head.push(Span::styled(
            format!("CHAIN ({}) ", post.segments.len()),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    head.push(Span::styled(
        truncate_text(&post.display_title("Untitled Post"), width.saturating_sub(20)),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ));
    let preview = post
        .segments
        .first()
        .map(|s| s.content.replace('\n', " "))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "No content yet...".to_string());
    ListItem::new(vec![
        Line::from(head),
        Line::from(Span::styled(
            format!("  {}", truncate_text(&preview, width.saturating_sub(2))),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        )),
    ])
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&"...".chars().take(max - keep).collect::<String>());
    out
}

fn prev_char(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}
