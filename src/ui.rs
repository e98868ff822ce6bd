use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, DetailStatus, InputMode};
use crate::filter;
use crate::prefs::ThresholdField;
use crate::scheduler::Phase;
use crate::types::FeedItem;
use crate::util_text::{format_count, format_count_compact, relative_time, single_line, truncate_chars};

const FOCUS: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const HIGHLIGHT: Color = Color::Yellow;
const OK: Color = Color::Green;
const BAD: Color = Color::Red;

/// Notable followers listed in the details pane.
const TOP_NOTABLE: usize = 30;

// ===============================
// Top-level draw
// ===============================
pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(1), // rule bar
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    header(f, chunks[0], app);
    rule_bar(f, chunks[1], app);
    body(f, chunks[2], app);
    footer(f, chunks[3], app);

    // Overlays render last
    if app.input_mode() == InputMode::BlockList {
        draw_blocklist_overlay(f, app);
    }
    if app.toast_message().is_some() {
        draw_toast_modal(f, app);
    }
}

// ===============================
// Header / rule bar
// ===============================
fn header(f: &mut Frame, area: Rect, app: &App) {
    let status_color = match app.schedule().phase {
        Phase::Fetching => HIGHLIGHT,
        Phase::Counting => OK,
        Phase::Paused => FOCUS,
        Phase::Idle => DIM,
    };

    let mut spans = vec![
        Span::styled(" feedx ", Style::default().fg(FOCUS).add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
    ];
    if let Some(viewers) = app.meta().active_viewers {
        spans.push(Span::raw(format!("{} online │ ", format_count(viewers))));
    }
    spans.push(Span::styled(app.status_text(), Style::default().fg(status_color)));
    if app.is_holding() {
        spans.push(Span::styled(" (held)", Style::default().fg(FOCUS)));
    }
    if let Some(t) = app.last_updated() {
        spans.push(Span::styled(
            format!(" │ updated {}", relative_time(&t.to_rfc3339(), Utc::now())),
            Style::default().fg(DIM),
        ));
    }
    if let Some(err) = app.last_error() {
        spans.push(Span::styled(
            format!(" │ ⚠ {}", truncate_chars(err, 60)),
            Style::default().fg(BAD),
        ));
    }
    if app.prefs().is_volatile() || app.blocklist().is_volatile() {
        spans.push(Span::styled(" │ prefs not saved", Style::default().fg(BAD)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn rule_bar(f: &mut Frame, area: Rect, app: &App) {
    let rules = app.prefs().rules();
    let editing = match app.input_mode() {
        InputMode::EditThreshold(field) => Some(field),
        _ => None,
    };

    let value = |field: ThresholdField| -> Span<'static> {
        if editing == Some(field) {
            Span::styled(
                format!("[{}▏]", app.edit_buffer()),
                Style::default().fg(FOCUS).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw(format_count(app.prefs().threshold(field)))
        }
    };

    let spans = vec![
        Span::raw(" followers ≥ "),
        value(ThresholdField::Followers),
        Span::styled(format!(" {} ", rules.combinator), Style::default().fg(HIGHLIGHT)),
        Span::raw("notable ≥ "),
        value(ThresholdField::NotableFollowers),
        Span::styled(" AND ", Style::default().fg(DIM)),
        Span::raw("renames ≤ "),
        value(ThresholdField::Renames),
        Span::styled(" AND ", Style::default().fg(DIM)),
        Span::raw("contracts ≤ "),
        value(ThresholdField::Contracts),
        Span::styled(
            format!(
                "  │ {} │ {} blocked",
                if rules.show_only_matching { "matching only" } else { "all posts" },
                app.blocklist().len()
            ),
            Style::default().fg(DIM),
        ),
    ];
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ===============================
// Body
// ===============================
fn body(f: &mut Frame, area: Rect, app: &mut App) {
    const NARROW_THRESHOLD: u16 = 100;

    let direction = if area.width < NARROW_THRESHOLD {
        Direction::Vertical
    } else {
        Direction::Horizontal
    };
    let panes = Layout::default()
        .direction(direction)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    app.set_feed_area(panes[0]);
    render_feed_pane(f, panes[0], app);
    render_details_pane(f, panes[1], app);
}

fn render_feed_pane(f: &mut Frame, area: Rect, app: &App) {
    let visible = app.visible_indices();
    let items = app.items();
    let verdicts = app.verdicts();
    let now = Utc::now();
    let width = area.width.saturating_sub(4) as usize;

    let rows: Vec<ListItem> = visible
        .iter()
        .map(|&i| {
            let item = &items[i];
            let hit = verdicts[i].highlighted;
            let marker = if hit { "★ " } else { "  " };
            let when = item
                .created_at
                .as_deref()
                .map(|t| relative_time(t, now))
                .unwrap_or_default();
            let author = Line::from(vec![
                Span::styled(marker, Style::default().fg(HIGHLIGHT)),
                Span::styled(
                    format!("@{}", item.screen_name),
                    if hit {
                        Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    },
                ),
                Span::styled(
                    format!(
                        "  {} fol · {} kol · {} ren  {}",
                        format_count_compact(item.followers_count),
                        item.notable_follower_count(),
                        item.rename_count(),
                        when
                    ),
                    Style::default().fg(DIM),
                ),
            ]);
            let content = Line::from(Span::raw(format!(
                "  {}",
                truncate_chars(&single_line(&item.content), width.saturating_sub(2))
            )));
            ListItem::new(vec![author, content])
        })
        .collect();

    let title = if !app.is_loaded() {
        " Feed (loading…) ".to_string()
    } else {
        format!(
            " Feed ({} shown / {} · {} highlighted) ",
            visible.len(),
            items.len(),
            app.highlighted_count()
        )
    };

    let border = if app.is_interacting() { FOCUS } else { DIM };
    let list = List::new(rows)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default()
        .with_offset(app.feed_offset())
        .with_selected((!visible.is_empty()).then_some(app.selected_row()));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_details_pane(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_item() {
        Some(item) => details_lines(item, app),
        None => vec![Line::from(Span::styled(
            if app.is_loaded() { "(No posts to show)" } else { "(Waiting for the first snapshot)" },
            Style::default().fg(DIM),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.details_scroll(), 0))
        .block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(DIM)),
        );
    f.render_widget(paragraph, area);
}

fn details_lines(item: &FeedItem, app: &App) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(DIM);
    let mut lines = Vec::new();

    let highlighted = app.selected_verdict().map(|v| v.highlighted).unwrap_or(false);
    lines.push(Line::from(vec![
        Span::styled(format!("{} ", item.name), bold),
        Span::raw(format!("@{}", item.screen_name)),
        if highlighted {
            Span::styled("  ★ highlighted", Style::default().fg(HIGHLIGHT))
        } else {
            Span::raw("")
        },
    ]));
    lines.push(Line::from(format!(
        "{} followers · {} following · {} notable followers",
        format_count(item.followers_count),
        format_count(item.following_count),
        item.notable_follower_count()
    )));
    if let Some(t) = item.created_at.as_deref() {
        lines.push(Line::from(Span::styled(
            format!("posted {}", relative_time(t, Utc::now())),
            dim,
        )));
    }
    lines.push(Line::from(""));
    for l in item.content.lines() {
        lines.push(Line::from(l.to_string()));
    }
    lines.push(Line::from(""));

    if let Some(ca) = item.contract_address.as_deref().filter(|ca| !ca.is_empty()) {
        lines.push(Line::from(vec![Span::styled("CA ", dim), Span::raw(ca.to_string())]));
    }
    lines.push(Line::from(format!(
        "{} unique contracts promoted · {} renames",
        item.unique_contract_count,
        item.rename_count()
    )));
    let previous = item.previous_names();
    if !previous.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("previously ", dim),
            Span::raw(previous.iter().map(|n| format!("@{n}")).collect::<Vec<_>>().join(", ")),
        ]));
    }

    lines.push(Line::from(""));
    let mut checks = vec![Span::styled("rules ", dim)];
    for (name, pass) in filter::explain(item, app.rules()) {
        checks.push(Span::styled(
            format!("{} {name}  ", if pass { "✓" } else { "✗" }),
            Style::default().fg(if pass { OK } else { BAD }),
        ));
    }
    lines.push(Line::from(checks));

    let top = item.top_notable_followers(TOP_NOTABLE);
    if !top.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Notable followers ({})", item.notable_follower_count()),
            bold,
        )));
        for nf in top {
            let info = &nf.user_info;
            let mut row = vec![
                Span::raw(format!("  @{:<20}", info.screen_name)),
                Span::styled(format!("{:>7}", format_count_compact(info.followers_count)), dim),
            ];
            if let Some(note) = info.note.as_deref().filter(|n| !n.is_empty()) {
                row.push(Span::styled(format!("  {note}"), Style::default().fg(FOCUS)));
            }
            lines.push(Line::from(row));
        }
    }

    if let Some(detail) = app.details() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("Lookup {}", detail.key), bold)));
        match &detail.status {
            DetailStatus::Loading => lines.push(Line::from(Span::styled("loading…", dim))),
            DetailStatus::Failed(e) => {
                lines.push(Line::from(Span::styled(e.clone(), Style::default().fg(BAD))))
            }
            DetailStatus::Ready(v) => {
                let pretty = serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());
                lines.extend(pretty.lines().map(|l| Line::from(l.to_string())));
            }
        }
    }

    lines
}

// ===============================
// Footer
// ===============================
fn footer(f: &mut Frame, area: Rect, app: &App) {
    let hint = match app.input_mode() {
        InputMode::EditThreshold(field) => {
            format!(" editing {} · Enter save · Tab next · Esc cancel", field.label())
        }
        InputMode::BlockList => " ↑↓ select · u unblock · C clear all · Esc close".to_string(),
        InputMode::Normal => " q quit · ↑↓ move · a auto-refresh · r refresh · space hold · t thresholds · o AND/OR · m matching only · b block · B block-list · i user · d token · c copy CA · R reset".to_string(),
    };
    f.render_widget(Paragraph::new(hint).style(Style::default().fg(DIM)), area);
}

// ===============================
// Overlays
// ===============================
fn draw_blocklist_overlay(f: &mut Frame, app: &App) {
    // Centered overlay (70% width, 60% height)
    let area = f.area();
    let width = (area.width * 7) / 10;
    let height = (area.height * 6) / 10;
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let overlay = Rect { x, y, width, height };

    f.render_widget(Clear, overlay);

    let entries = app.blocklist().entries();
    let rows: Vec<ListItem> = if entries.is_empty() {
        vec![ListItem::new(Span::styled("  nobody blocked", Style::default().fg(DIM)))]
    } else {
        entries
            .iter()
            .map(|e| {
                ListItem::new(format!(
                    "@{:<20} {:<24} {}",
                    e.screen_name,
                    truncate_chars(&e.name, 24),
                    e.blocked_at.format("%Y-%m-%d %H:%M")
                ))
            })
            .collect()
    };

    let list = List::new(rows)
        .block(
            Block::default()
                .title(format!(" Block-list ({}) ", entries.len()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(FOCUS)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !entries.is_empty() {
        state.select(Some(app.blocklist_selection()));
    }
    f.render_stateful_widget(list, overlay, &mut state);
}

fn draw_toast_modal(f: &mut Frame, app: &App) {
    let message = app.toast_message().unwrap_or("");

    // Small centered box (40% width, 3 lines height)
    let area = f.area();
    let width = (area.width * 4) / 10;
    let height = 3;
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let overlay = Rect { x, y, width, height };

    f.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(OK));

    let text = Paragraph::new(format!("✓ {message}"))
        .style(Style::default().fg(OK).add_modifier(Modifier::BOLD))
        .block(block);

    f.render_widget(text, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::BlockList;
    use crate::prefs::Preferences;
    use crate::store::MemoryStore;
    use crate::types::{AppEvent, FeedSnapshot};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_renders_feed_and_rules() {
        let store = MemoryStore::new();
        let mut app = App::new(
            Preferences::load(Box::new(store.clone())),
            BlockList::load(Box::new(store)),
            30,
            false,
            None,
            None,
        );
        app.on_event(AppEvent::Snapshot(FeedSnapshot {
            items: vec![FeedItem {
                tweet_id: "1".into(),
                user_id: "1".into(),
                screen_name: "whale".into(),
                followers_count: 25_000,
                content: "gm".into(),
                ..Default::default()
            }],
            ..Default::default()
        }));
        let screen = render(&mut app);
        assert!(screen.contains("@whale"));
        assert!(screen.contains("followers ≥ 1,000"));
        assert!(screen.contains("auto-refresh off"));
        assert!(app.feed_offset() == 0);
    }
}
