mod actions;
mod render;
mod session;

use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::api::MovieDetailResponse;
use crate::loader::PageLoader;

use super::AppContext;
use super::watch::{PlayRequest, run_play};

use self::actions::{fetch_detail, missing_detail_slug, refresh_items, status_error, status_info};
use self::render::draw_tui;
use self::session::TuiSession;

#[derive(Debug, Clone)]
pub(super) enum DetailState {
    Ready(Box<MovieDetailResponse>),
    Failed(String),
}

pub(crate) fn run_tui(ctx: &mut AppContext) -> Result<()> {
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut loader = PageLoader::new();
    let busy = Rc::new(Cell::new(false));
    let indicator = Rc::clone(&busy);
    let subscription = loader.subscribe(move |loading| indicator.set(loading));

    let mut items = ctx.history.list();
    let mut table_state = TableState::default();
    table_state.select((!items.is_empty()).then_some(0));
    let mut details_by_slug: HashMap<String, DetailState> = HashMap::new();
    let mut pending_clear = false;
    let mut status = if items.is_empty() {
        status_info("Nothing watched yet. Run `moonplay play <slug>` to start.")
    } else {
        status_info("Ready.")
    };

    loop {
        if loader.is_loading() {
            loader.tick(Instant::now());
        }
        terminal.draw(|frame| {
            draw_tui(
                frame,
                &items,
                &mut table_state,
                &status,
                pending_clear,
                &details_by_slug,
                busy.get(),
            )
        })?;

        if let Some(slug) = missing_detail_slug(&items, &table_state, &details_by_slug) {
            loader.start(Instant::now());
            terminal.draw(|frame| {
                draw_tui(
                    frame,
                    &items,
                    &mut table_state,
                    &status,
                    pending_clear,
                    &details_by_slug,
                    busy.get(),
                )
            })?;
            let detail = fetch_detail(&mut ctx.api, &slug);
            details_by_slug.insert(slug, detail);
            loader.stop();
            continue;
        }

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if pending_clear {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    pending_clear = false;
                    ctx.history.clear();
                    refresh_items(&ctx.history, &mut items, &mut table_state, None);
                    status = if items.is_empty() {
                        status_info("Watch history cleared.")
                    } else {
                        status_error("Clear failed: history could not be removed.")
                    };
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    pending_clear = false;
                    status = status_info("Clear canceled.");
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = table_state.selected()
                    && !items.is_empty()
                {
                    let next = (selected + 1).min(items.len().saturating_sub(1));
                    table_state.select(Some(next));
                }
            }
            KeyCode::Char('r') => {
                loader.start(Instant::now());
                ctx.api.invalidate();
                details_by_slug.clear();
                refresh_items(&ctx.history, &mut items, &mut table_state, None);
                loader.stop();
                status = status_info(&format!("Refreshed: {} entries.", items.len()));
            }
            KeyCode::Char('c') => {
                if items.is_empty() {
                    status = status_error("Clear failed: history is already empty.");
                    continue;
                }
                pending_clear = true;
                status = status_info("Confirm clear: y/Enter to clear, n/Esc to cancel.");
            }
            KeyCode::Enter => {
                let Some(selected) = table_state.selected() else {
                    continue;
                };
                let Some(item) = items.get(selected) else {
                    continue;
                };
                let request = PlayRequest {
                    slug: item.slug.clone(),
                    episode: Some(item.episode_slug.clone()),
                    server: 0,
                    auto_next: false,
                };
                let title = item.name.clone();

                session.suspend()?;
                let result = run_play(ctx, &request);
                session.resume()?;
                terminal.clear()?;

                match result {
                    Ok(msg) => status = status_info(&msg),
                    Err(err) => {
                        status = status_error(&format!("Playback failed for {title}: {err:#}"));
                    }
                }

                let episode = request.episode.as_deref().unwrap_or_default();
                refresh_items(
                    &ctx.history,
                    &mut items,
                    &mut table_state,
                    Some((&request.slug, episode)),
                );
            }
            _ => {}
        }
    }

    loader.unsubscribe(subscription);
    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}
