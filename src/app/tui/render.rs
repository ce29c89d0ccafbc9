use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState, Wrap,
};

use crate::api::{MovieDetailResponse, build_image_url};
use crate::format::{format_timestamp_millis, strip_html, truncate, truncate_text};
use crate::history::WatchHistoryEntry;

use super::DetailState;

const DETAIL_SYNOPSIS_CHARS: usize = 220;

pub(super) fn draw_tui(
    frame: &mut Frame,
    items: &[WatchHistoryEntry],
    table_state: &mut TableState,
    status: &str,
    pending_clear: bool,
    details_by_slug: &HashMap<String, DetailState>,
    loading: bool,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected_text = table_state
        .selected()
        .map(|idx| (idx + 1).to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut header_spans = vec![
        Span::styled(
            "MOONPLAY",
            Style::default()
                .fg(Color::Rgb(190, 140, 255))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} watched", items.len()),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("selected {selected_text}"),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
    ];
    if loading {
        header_spans.push(Span::styled("   ", Style::default()));
        header_spans.push(Span::styled(
            "loading...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let header = Paragraph::new(Line::from(header_spans))
        .alignment(Alignment::Center)
        .block(panel_block("Dashboard"));
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            Row::new(vec![
                Cell::from(item.name.clone()),
                Cell::from(item.episode_name.clone()),
                Cell::from(format_timestamp_millis(item.timestamp)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(55),
            Constraint::Length(12),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(vec!["Title", "Episode", "Watched"]).style(
            Style::default()
                .fg(Color::Rgb(190, 140, 255))
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block("Continue Watching"))
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(190, 140, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, body_chunks[0], table_state);

    let selection_text = match table_state.selected().and_then(|idx| items.get(idx)) {
        Some(item) => selection_details(item, details_by_slug.get(&item.slug)),
        None => "Nothing watched yet.\n\nRun `moonplay play <slug>` to start an episode.".to_string(),
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .wrap(Wrap { trim: true })
        .block(panel_block("Selected"))
        .alignment(Alignment::Left);
    frame.render_widget(selection, body_chunks[1]);

    let controls = Paragraph::new(Line::from(Span::styled(
        "↑/↓ move  Enter play  r refresh  c clear history  q quit",
        Style::default().fg(Color::Rgb(185, 195, 210)),
    )))
    .alignment(Alignment::Center)
    .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);

    if pending_clear {
        let popup_text = format!(
            "Clear the whole watch history?\n\n{} entries will be removed.\n\n[y / Enter] Clear   [n / Esc] Cancel",
            items.len()
        );
        let popup_area = popup_rect_for_text(frame.area(), &popup_text);
        render_popup_shadow(frame, popup_area);
        frame.render_widget(Clear, popup_area);
        let popup = Paragraph::new(popup_text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(modal_block("Confirm Clear"));
        frame.render_widget(popup, popup_area);
    }
}

pub(super) fn selection_details(item: &WatchHistoryEntry, detail: Option<&DetailState>) -> String {
    let mut text = format!(
        "Title\n{}\n\nOriginal\n{}\n\nEpisode\n{}\n\nWatched\n{}\n\nThumb\n{}",
        truncate(&item.name, 40),
        truncate(non_empty_or_dash(&item.origin_name), 40),
        non_empty_or_dash(&item.episode_name),
        format_timestamp_millis(item.timestamp),
        build_image_url(&item.thumb_url),
    );
    match detail {
        Some(DetailState::Ready(detail)) => text.push_str(&detail_summary(detail)),
        Some(DetailState::Failed(err)) => {
            text.push_str(&format!("\n\nDetails\nunavailable: {}", truncate(err, 60)));
        }
        None => text.push_str("\n\nDetails\nLoading..."),
    }
    text
}

fn detail_summary(detail: &MovieDetailResponse) -> String {
    let movie = &detail.movie;
    let facts: Vec<String> = [
        movie.year.map(|year| year.to_string()),
        Some(movie.quality.clone()),
        Some(movie.lang.clone()),
        Some(movie.episode_current.clone()),
    ]
    .into_iter()
    .flatten()
    .filter(|fact| !fact.trim().is_empty())
    .collect();
    let mut out = String::new();
    if !facts.is_empty() {
        out.push_str(&format!("\n\nInfo\n{}", facts.join(" | ")));
    }
    let synopsis = strip_html(&movie.content);
    if !synopsis.is_empty() {
        out.push_str(&format!(
            "\n\nSynopsis\n{}",
            truncate_text(&synopsis, DETAIL_SYNOPSIS_CHARS)
        ));
    }
    let servers = detail
        .episodes
        .iter()
        .map(|server| format!("{} ({})", server.server_name, server.server_data.len()))
        .collect::<Vec<_>>();
    if !servers.is_empty() {
        out.push_str(&format!("\n\nServers\n{}", servers.join(", ")));
    }
    out
}

fn non_empty_or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(200, 170, 240))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let max_line_width = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let width = max_line_width
        .saturating_add(12)
        .clamp(44.min(available_width), 72.min(available_width));

    let available_height = area.height.saturating_sub(2).max(1);
    let height = line_count
        .saturating_add(6)
        .clamp(9.min(available_height), 16.min(available_height));

    centered_fixed_rect(width, height, area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EpisodeServer;

    fn entry() -> WatchHistoryEntry {
        WatchHistoryEntry {
            slug: "naruto".to_string(),
            name: "Naruto".to_string(),
            origin_name: String::new(),
            thumb_url: "naruto-thumb.jpg".to_string(),
            episode_slug: "tap-01".to_string(),
            episode_name: "1".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn selection_without_details_shows_loading() {
        let text = selection_details(&entry(), None);
        assert!(text.contains("Original\n-"));
        assert!(text.contains("https://img.ophim.live/uploads/movies/naruto-thumb.jpg"));
        assert!(text.ends_with("Details\nLoading..."));
    }

    #[test]
    fn selection_with_details_lists_facts_and_servers() {
        let mut detail = MovieDetailResponse::default();
        detail.movie.year = Some(2002);
        detail.movie.quality = "HD".to_string();
        detail.movie.content = "<p>Ninja &amp; friends</p>".to_string();
        detail.episodes.push(EpisodeServer {
            server_name: "Vietsub #1".to_string(),
            server_data: Vec::new(),
        });

        let text = selection_details(&entry(), Some(&DetailState::Ready(Box::new(detail))));

        assert!(text.contains("Info\n2002 | HD"));
        assert!(text.contains("Synopsis\nNinja & friends"));
        assert!(text.contains("Servers\nVietsub #1 (0)"));
    }

    #[test]
    fn failed_details_are_reported() {
        let text = selection_details(
            &entry(),
            Some(&DetailState::Failed("HTTP status 404".to_string())),
        );
        assert!(text.contains("unavailable: HTTP status 404"));
    }

    #[test]
    fn popup_stays_inside_small_terminals() {
        let area = Rect::new(0, 0, 30, 8);
        let popup = popup_rect_for_text(area, "a fairly long line of confirmation text");
        assert!(popup.width <= area.width);
        assert!(popup.height <= area.height);
    }
}
