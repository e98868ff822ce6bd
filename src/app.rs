use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ratatui::layout::{Position, Rect};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::blocklist::{BlockEntry, BlockList};
use crate::filter::{self, CompiledRules, Verdict};
use crate::prefs::{Preferences, ThresholdField};
use crate::scheduler::{Phase, SchedulerView, DEFAULT_INTERVAL};
use crate::types::{AppEvent, DetailKey, FeedItem, RefreshCommand, SnapshotMeta};

/// Terminal lines per feed row (author line + content line).
pub const FEED_ROW_HEIGHT: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditThreshold(ThresholdField),
    BlockList,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetailStatus {
    Loading,
    Ready(Value),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetailState {
    pub key: DetailKey,
    pub status: DetailStatus,
}

pub struct App {
    quit: bool,
    fps: u32,

    items: Vec<FeedItem>,
    verdicts: Vec<Verdict>,
    rules: CompiledRules,
    meta: SnapshotMeta,
    loaded: bool,
    last_error: Option<String>,
    last_updated: Option<DateTime<Utc>>,

    prefs: Preferences,
    blocklist: BlockList,

    schedule: SchedulerView,
    auto_update: bool,

    // Index into the visible rows, not into `items`.
    sel: usize,
    details: Option<DetailState>,
    details_scroll: u16,

    input_mode: InputMode,
    edit_buffer: String,
    blocklist_sel: usize,

    // Last rendered feed list area, for mouse hover.
    feed_area: Rect,
    hovering: bool,
    holding: bool,
    interacting_sent: bool,

    toast_message: Option<(String, Instant)>,

    refresh_tx: Option<UnboundedSender<RefreshCommand>>,
    detail_tx: Option<UnboundedSender<DetailKey>>,
}

impl App {
    pub fn new(
        prefs: Preferences,
        blocklist: BlockList,
        fps: u32,
        auto_update: bool,
        refresh_tx: Option<UnboundedSender<RefreshCommand>>,
        detail_tx: Option<UnboundedSender<DetailKey>>,
    ) -> Self {
        let rules = prefs.rules().compile();
        let interval_seconds = DEFAULT_INTERVAL.as_secs();
        Self {
            quit: false,
            fps,
            items: Vec::new(),
            verdicts: Vec::new(),
            rules,
            meta: SnapshotMeta::default(),
            loaded: false,
            last_error: None,
            last_updated: None,
            prefs,
            blocklist,
            schedule: SchedulerView {
                phase: Phase::Idle,
                remaining_seconds: interval_seconds,
                interval_seconds,
            },
            auto_update,
            sel: 0,
            details: None,
            details_scroll: 0,
            input_mode: InputMode::Normal,
            edit_buffer: String::new(),
            blocklist_sel: 0,
            feed_area: Rect::default(),
            hovering: false,
            holding: false,
            interacting_sent: false,
            toast_message: None,
            refresh_tx,
            detail_tx,
        }
    }

    /// Seed the header countdown with the configured interval until the
    /// refresh task reports its first view.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        let secs = interval.as_secs();
        self.schedule.interval_seconds = secs;
        self.schedule.remaining_seconds = secs;
        self
    }

    // ----- getters -----
    pub fn fps(&self) -> u32 { self.fps }
    pub fn quit_flag(&self) -> bool { self.quit }
    pub fn items(&self) -> &[FeedItem] { &self.items }
    pub fn verdicts(&self) -> &[Verdict] { &self.verdicts }
    pub fn rules(&self) -> &CompiledRules { &self.rules }
    pub fn prefs(&self) -> &Preferences { &self.prefs }
    pub fn blocklist(&self) -> &BlockList { &self.blocklist }
    pub fn meta(&self) -> &SnapshotMeta { &self.meta }
    pub fn is_loaded(&self) -> bool { self.loaded }
    pub fn last_error(&self) -> Option<&str> { self.last_error.as_deref() }
    pub fn last_updated(&self) -> Option<DateTime<Utc>> { self.last_updated }
    pub fn schedule(&self) -> SchedulerView { self.schedule }
    pub fn auto_update(&self) -> bool { self.auto_update }
    pub fn input_mode(&self) -> InputMode { self.input_mode }
    pub fn edit_buffer(&self) -> &str { &self.edit_buffer }
    pub fn blocklist_selection(&self) -> usize { self.blocklist_sel }
    pub fn details(&self) -> Option<&DetailState> { self.details.as_ref() }
    pub fn details_scroll(&self) -> u16 { self.details_scroll }
    pub fn is_interacting(&self) -> bool { self.hovering || self.holding }
    pub fn is_holding(&self) -> bool { self.holding }

    /// Indices into `items()` of the rows that pass the block-list and the
    /// show-only-matching switch, in feed order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.verdicts
            .iter()
            .enumerate()
            .filter(|(_, v)| v.visible)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn highlighted_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.visible && v.highlighted).count()
    }

    /// Position of the selection within `visible_indices()`.
    pub fn selected_row(&self) -> usize { self.sel }

    pub fn selected_item(&self) -> Option<&FeedItem> {
        self.visible_indices().get(self.sel).map(|&i| &self.items[i])
    }

    pub fn selected_verdict(&self) -> Option<Verdict> {
        self.visible_indices().get(self.sel).map(|&i| self.verdicts[i])
    }

    /// Header status for the refresh countdown.
    pub fn status_text(&self) -> String {
        match self.schedule.phase {
            Phase::Fetching => "refreshing…".to_string(),
            Phase::Counting => format!("{}s until refresh", self.schedule.remaining_seconds),
            Phase::Paused => "paused".to_string(),
            Phase::Idle if !self.auto_update => "auto-refresh off".to_string(),
            Phase::Idle => "waiting".to_string(),
        }
    }

    /// Show a toast notification for 2 seconds
    pub fn show_toast(&mut self, msg: String) {
        self.toast_message = Some((msg, Instant::now()));
    }

    /// Get current toast message if still active (visible for 2 seconds)
    pub fn toast_message(&self) -> Option<&str> {
        const TOAST_DURATION: Duration = Duration::from_secs(2);
        self.toast_message.as_ref().and_then(|(msg, time)| {
            if time.elapsed() < TOAST_DURATION {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    // ----- events -----
    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Quit => self.quit = true,
            AppEvent::Snapshot(snapshot) => {
                let keep = self.selected_item().map(|it| it.tweet_id.clone());
                self.items = snapshot.items;
                self.meta = snapshot.meta;
                self.loaded = true;
                self.last_error = None;
                self.last_updated = Some(Utc::now());
                self.reevaluate();
                if let Some(id) = keep {
                    self.select_tweet(&id);
                }
            }
            AppEvent::FetchFailed(msg) => {
                // Keep showing the previous snapshot.
                self.last_error = Some(msg);
            }
            AppEvent::Schedule(view) => self.schedule = view,
            AppEvent::Detail { key, result } => {
                // Late answers for a key no longer shown are dropped.
                if self.details.as_ref().map(|d| &d.key) == Some(&key) {
                    let status = match result {
                        Ok(v) => DetailStatus::Ready(v),
                        Err(e) => DetailStatus::Failed(e),
                    };
                    self.details = Some(DetailState { key, status });
                }
            }
        }
    }

    fn reevaluate(&mut self) {
        self.rules = self.prefs.rules().compile();
        self.verdicts = filter::evaluate_all(&self.items, &self.rules, &self.blocklist);
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let n = self.visible_indices().len();
        if n == 0 {
            self.sel = 0;
        } else if self.sel >= n {
            self.sel = n - 1;
        }
    }

    fn select_tweet(&mut self, tweet_id: &str) {
        if let Some(pos) = self
            .visible_indices()
            .iter()
            .position(|&i| self.items[i].tweet_id == tweet_id)
        {
            self.sel = pos;
        }
    }

    fn send_refresh(&self, cmd: RefreshCommand) {
        if let Some(tx) = &self.refresh_tx {
            let _ = tx.send(cmd);
        }
    }

    // ----- navigation -----
    pub fn up(&mut self) {
        if self.input_mode == InputMode::BlockList {
            self.blocklist_sel = self.blocklist_sel.saturating_sub(1);
            return;
        }
        if self.sel > 0 {
            self.sel -= 1;
            self.on_selection_changed();
        }
    }

    pub fn down(&mut self) {
        if self.input_mode == InputMode::BlockList {
            if self.blocklist_sel + 1 < self.blocklist.len() {
                self.blocklist_sel += 1;
            }
            return;
        }
        if self.sel + 1 < self.visible_indices().len() {
            self.sel += 1;
            self.on_selection_changed();
        }
    }

    pub fn home(&mut self) {
        self.sel = 0;
        self.on_selection_changed();
    }

    pub fn end(&mut self) {
        self.sel = self.visible_indices().len().saturating_sub(1);
        self.on_selection_changed();
    }

    /// Select a visible row directly (mouse click).
    pub fn select_row(&mut self, row: usize) {
        if row < self.visible_indices().len() && row != self.sel {
            self.sel = row;
            self.on_selection_changed();
        }
    }

    pub fn scroll_details(&mut self, delta: i32) {
        let next = (self.details_scroll as i32 + delta).max(0);
        self.details_scroll = next.min(u16::MAX as i32) as u16;
    }

    fn on_selection_changed(&mut self) {
        self.details = None;
        self.details_scroll = 0;
    }

    // ----- refresh -----
    pub fn toggle_auto_update(&mut self) {
        self.auto_update = !self.auto_update;
        self.send_refresh(RefreshCommand::SetAutoUpdate(self.auto_update));
        self.show_toast(format!("Auto-refresh {}", if self.auto_update { "on" } else { "off" }));
    }

    pub fn refresh_now(&mut self) {
        self.send_refresh(RefreshCommand::RefreshNow);
    }

    pub fn set_feed_area(&mut self, area: Rect) {
        self.feed_area = area;
    }

    /// Mouse moved to (column, row).
    pub fn on_mouse_move(&mut self, column: u16, row: u16) {
        self.set_hover(self.feed_area.contains(Position::new(column, row)));
    }

    /// Mouse clicked at (column, row); selects the feed row under it.
    pub fn on_mouse_click(&mut self, column: u16, row: u16) {
        let area = self.feed_area;
        if !area.contains(Position::new(column, row)) || row <= area.y {
            return;
        }
        let row_in_list = (row - area.y - 1) as usize / FEED_ROW_HEIGHT;
        self.select_row(self.feed_offset() + row_in_list);
    }

    /// First visible feed row. The list is re-laid out from the top every
    /// frame, so the offset is just enough to keep the selection on screen.
    pub fn feed_offset(&self) -> usize {
        let capacity = (self.feed_area.height.saturating_sub(2) as usize / FEED_ROW_HEIGHT).max(1);
        (self.sel + 1).saturating_sub(capacity)
    }

    pub fn set_hover(&mut self, hovering: bool) {
        self.hovering = hovering;
        self.sync_interacting();
    }

    pub fn toggle_hold(&mut self) {
        self.holding = !self.holding;
        self.sync_interacting();
    }

    fn sync_interacting(&mut self) {
        let now = self.is_interacting();
        if now != self.interacting_sent {
            self.interacting_sent = now;
            self.send_refresh(RefreshCommand::SetInteracting(now));
        }
    }

    pub fn quit(&mut self) {
        self.quit = true;
        self.send_refresh(RefreshCommand::Shutdown);
    }

    // ----- rules -----
    pub fn toggle_combinator(&mut self) {
        let next = self.prefs.rules().combinator.toggled();
        self.prefs.set_combinator(next);
        self.reevaluate();
        self.show_toast(format!("Follower logic: {next}"));
    }

    pub fn toggle_show_only_matching(&mut self) {
        let next = !self.prefs.rules().show_only_matching;
        self.prefs.set_show_only_matching(next);
        self.reevaluate();
        self.show_toast(if next { "Showing matching only".into() } else { "Showing all posts".into() });
    }

    pub fn reset_rules(&mut self) {
        self.prefs.reset();
        self.reevaluate();
        self.show_toast("Rules reset to defaults".into());
    }

    pub fn start_edit(&mut self, field: ThresholdField) {
        self.edit_buffer = self.prefs.threshold(field).to_string();
        self.input_mode = InputMode::EditThreshold(field);
    }

    pub fn edit_add_char(&mut self, ch: char) {
        if ch.is_ascii_digit() || ch == '.' || ch == '-' {
            self.edit_buffer.push(ch);
        }
    }

    pub fn edit_backspace(&mut self) {
        self.edit_buffer.pop();
    }

    /// Commit the current buffer and move on to the next threshold.
    pub fn edit_next_field(&mut self) {
        if let InputMode::EditThreshold(field) = self.input_mode {
            self.commit_value(field);
            self.start_edit(field.next());
        }
    }

    pub fn commit_edit(&mut self) {
        if let InputMode::EditThreshold(field) = self.input_mode {
            self.commit_value(field);
            self.input_mode = InputMode::Normal;
            self.edit_buffer.clear();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.edit_buffer.clear();
    }

    fn commit_value(&mut self, field: ThresholdField) {
        let value = filter::parse_threshold(&self.edit_buffer);
        if value != self.prefs.threshold(field) {
            self.prefs.set_threshold(field, value);
            self.reevaluate();
            log::info!("[app] {} = {value}", field.label());
        }
    }

    // ----- block-list -----
    pub fn block_selected(&mut self) {
        let Some(item) = self.selected_item() else { return };
        let entry = BlockEntry::from_item(item);
        let label = format!("@{}", entry.screen_name);
        if self.blocklist.block(entry) {
            self.reevaluate();
            self.details = None;
            self.show_toast(format!("Blocked {label}"));
        }
    }

    pub fn open_blocklist(&mut self) {
        self.blocklist_sel = 0;
        self.input_mode = InputMode::BlockList;
    }

    pub fn close_blocklist(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn unblock_selected(&mut self) {
        let Some(id) = self
            .blocklist
            .entries()
            .get(self.blocklist_sel)
            .map(|e| e.user_id.clone())
        else {
            return;
        };
        if self.blocklist.unblock(&id) {
            self.reevaluate();
            if self.blocklist_sel >= self.blocklist.len() {
                self.blocklist_sel = self.blocklist.len().saturating_sub(1);
            }
            self.show_toast("Unblocked".into());
        }
    }

    pub fn clear_blocklist(&mut self) {
        self.blocklist.clear();
        self.blocklist_sel = 0;
        self.reevaluate();
        self.show_toast("Block-list cleared".into());
    }

    // ----- details -----
    fn request_details(&mut self, key: DetailKey) {
        let Some(tx) = &self.detail_tx else {
            self.show_toast("Details unavailable".into());
            return;
        };
        if tx.send(key.clone()).is_err() {
            self.show_toast("Details unavailable".into());
            return;
        }
        self.details = Some(DetailState { key, status: DetailStatus::Loading });
        self.details_scroll = 0;
    }

    pub fn request_user_details(&mut self) {
        if let Some(name) = self.selected_item().map(|it| it.screen_name.clone()) {
            if !name.is_empty() {
                self.request_details(DetailKey::User(name));
            }
        }
    }

    pub fn request_token_details(&mut self) {
        match self.selected_item().and_then(|it| it.contract_address.clone()) {
            Some(ca) if !ca.is_empty() => self.request_details(DetailKey::Token(ca)),
            _ => self.show_toast("No contract address on this post".into()),
        }
    }

    /// Contract address of the selected post, for the clipboard.
    pub fn copy_content(&self) -> Option<String> {
        self.selected_item()
            .and_then(|it| it.contract_address.clone())
            .filter(|ca| !ca.is_empty())
    }
}
