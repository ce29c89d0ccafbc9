use std::io::{self, BufRead, Write};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::api::{EpisodeData, EpisodeServer, MovieDetailResponse, build_image_url};
use crate::history::{WatchHistoryEntry, now_millis};
use crate::playback::{
    Handled, HostCapabilities, PlaybackEngine, PlaybackSource, PlaybackState, PlaybackStatus,
    PlayerStrategyFactory, Strategy,
};

use super::AppContext;

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayRequest {
    pub(crate) slug: String,
    pub(crate) episode: Option<String>,
    pub(crate) server: usize,
    pub(crate) auto_next: bool,
}

pub(super) fn resolve_episode<'a>(
    detail: &'a MovieDetailResponse,
    server: usize,
    episode: Option<&str>,
) -> Result<(&'a EpisodeServer, &'a EpisodeData)> {
    if detail.episodes.is_empty() {
        bail!("no episodes available for {}", detail.movie.name);
    }
    let Some(episodes) = detail.episodes.get(server) else {
        bail!(
            "server {server} not found ({} available)",
            detail.episodes.len()
        );
    };
    let Some(chosen) = episodes.episode_or_first(episode) else {
        bail!("server {} lists no episodes", episodes.server_name);
    };
    if let Some(wanted) = episode
        && wanted != chosen.slug
    {
        warn!(wanted, fallback = %chosen.slug, "episode not found; using first episode");
    }
    Ok((episodes, chosen))
}

pub(super) fn history_entry(
    detail: &MovieDetailResponse,
    fallback_slug: &str,
    episode: &EpisodeData,
) -> WatchHistoryEntry {
    let movie = &detail.movie;
    let slug = if movie.slug.trim().is_empty() {
        fallback_slug
    } else {
        movie.slug.as_str()
    };
    WatchHistoryEntry {
        slug: slug.to_string(),
        name: movie.name.clone(),
        origin_name: movie.origin_name.clone(),
        thumb_url: movie.thumb_url.clone(),
        episode_slug: episode.slug.clone(),
        episode_name: episode.name.clone(),
        timestamp: now_millis(),
    }
}

pub(super) fn playback_source(detail: &MovieDetailResponse, episode: &EpisodeData) -> PlaybackSource {
    let movie = &detail.movie;
    let poster = if movie.poster_url.trim().is_empty() {
        &movie.thumb_url
    } else {
        &movie.poster_url
    };
    PlaybackSource::new(episode.stream_url(), Some(build_image_url(poster)))
}

pub(super) fn status_line(status: &PlaybackStatus) -> String {
    match status.state {
        PlaybackState::Idle => "Idle: no stream to play.".to_string(),
        PlaybackState::Loading => "Loading stream...".to_string(),
        PlaybackState::Ready => "Playing.".to_string(),
        PlaybackState::Error => format!(
            "Error: {}",
            status.error_message.as_deref().unwrap_or("playback failed")
        ),
    }
}

pub(super) fn episode_label(detail: &MovieDetailResponse, episode: &EpisodeData) -> String {
    let name = episode.name.trim();
    if name.is_empty() {
        detail.movie.name.clone()
    } else {
        format!("{} - Ep {name}", detail.movie.name)
    }
}

pub(super) fn ask_yes_no<R: BufRead>(prompt: &str, input: &mut R) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("failed to flush prompt")?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Plays the requested episode until the player exits or the viewer gives
/// up, recording each episode that starts. Returns a summary line.
pub(crate) fn run_play(ctx: &mut AppContext, request: &PlayRequest) -> Result<String> {
    let detail = ctx
        .api
        .detail(&request.slug)
        .with_context(|| format!("failed to load movie {}", request.slug))?;
    let (server, first) = resolve_episode(&detail, request.server, request.episode.as_deref())?;
    if first.stream_url().is_empty() {
        return Ok("No stream link found for this episode.".to_string());
    }

    let mut current = first.clone();
    ctx.history
        .record(history_entry(&detail, &request.slug, &current));
    println!("Now playing: {}", episode_label(&detail, &current));

    let factory = PlayerStrategyFactory::new(ctx.config.player.clone(), ctx.config.http.clone());
    let capabilities = HostCapabilities {
        native_manifest: ctx.config.player.native_hls,
    };
    let (mut engine, events) = PlaybackEngine::new(
        playback_source(&detail, &current),
        capabilities,
        ctx.config.recovery,
        factory,
    );
    debug!(
        strategy = engine.strategy().map(Strategy::label),
        poster = engine.source().poster_url.as_deref(),
        "playback engine created"
    );
    engine.set_listener(|status: &PlaybackStatus| println!("{}", status_line(status)));

    let stdin = io::stdin();
    loop {
        match engine.status().state {
            PlaybackState::Idle => {
                return Ok("No stream link found for this episode.".to_string());
            }
            PlaybackState::Error => {
                if ask_yes_no("Retry playback?", &mut stdin.lock())? {
                    engine.retry();
                    continue;
                }
                let message = engine
                    .status()
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "playback failed".to_string());
                return Ok(format!(
                    "Stopped {}: {message}",
                    episode_label(&detail, &current)
                ));
            }
            PlaybackState::Loading | PlaybackState::Ready => {}
        }

        let event = match events.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => bail!("playback event channel closed"),
        };
        if engine.handle(event) != Handled::Ended {
            continue;
        }

        let finished = episode_label(&detail, &current);
        if !request.auto_next {
            return Ok(format!("Finished {finished}."));
        }
        let Some(next) = server.next_after(&current.slug) else {
            return Ok(format!("Finished {finished}. No more episodes."));
        };
        if next.stream_url().is_empty() {
            return Ok(format!(
                "Finished {finished}. Next episode has no stream link."
            ));
        }

        current = next.clone();
        info!(episode = %current.slug, "advancing to next episode");
        ctx.history
            .record(history_entry(&detail, &request.slug, &current));
        println!("Up next: {}", episode_label(&detail, &current));
        engine.set_source(playback_source(&detail, &current));
    }
}
