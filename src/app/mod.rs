mod tui;
mod watch;


use anyhow::Result;
use tracing::debug;

use crate::api::{
    ApiError, CategoryItem, CategoryRef, MovieDetailResponse, MovieItem, MoviePage, OphimClient,
};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::db::Database;
use crate::format::{format_timestamp_millis, strip_html, truncate, truncate_text};
use crate::history::WatchHistoryStore;
use crate::pagination::render_page_line;
use crate::paths::database_file_path;

use self::watch::{PlayRequest, run_play};

const SYNOPSIS_CHARS: usize = 400;

pub(crate) struct AppContext {
    pub(crate) config: Config,
    pub(crate) api: OphimClient,
    pub(crate) history: WatchHistoryStore<Database>,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();
    debug!(?config, "configuration resolved");
    let db = open_db()?;
    let mut ctx = AppContext {
        api: OphimClient::new(config.api_base.clone(), config.http.clone()),
        history: WatchHistoryStore::new(db),
        config,
    };

    match cli.command {
        Some(Command::Latest { page }) => print_movie_page(&ctx.api.latest(page)?),
        Some(Command::Search { keyword, page }) => match ctx.api.search(&keyword, page) {
            Ok(results) => print_movie_page(&results),
            Err(err @ ApiError::KeywordTooShort) => println!("{err}."),
            Err(err) => return Err(err.into()),
        },
        Some(Command::Category { slug, page }) => print_movie_page(&ctx.api.category(&slug, page)?),
        Some(Command::Genres) => print_categories(&ctx.api.genres()?),
        Some(Command::Countries) => print_categories(&ctx.api.countries()?),
        Some(Command::Show { slug }) => print_detail(&ctx.api.detail(&slug)?),
        Some(Command::Play {
            slug,
            episode,
            server,
            auto_next,
        }) => {
            let request = PlayRequest {
                slug,
                episode,
                server,
                auto_next,
            };
            let message = run_play(&mut ctx, &request)?;
            println!("\n{message}");
        }
        Some(Command::History { clear }) => run_history(&ctx, clear),
        Some(Command::Tui) | None => tui::run_tui(&mut ctx)?,
    }

    Ok(())
}

fn run_history(ctx: &AppContext, clear: bool) {
    if clear {
        ctx.history.clear();
        println!("Watch history cleared.");
        return;
    }

    let entries = ctx.history.list();
    if entries.is_empty() {
        println!("No watch history yet. Run `moonplay play <slug>` first.");
        return;
    }

    println!(
        "{:<36} {:<12} {:<18} {:<30}",
        "TITLE", "EPISODE", "WATCHED", "SLUG"
    );
    for entry in entries {
        println!(
            "{:<36} {:<12} {:<18} {:<30}",
            truncate(&entry.name, 36),
            truncate(&entry.episode_name, 12),
            format_timestamp_millis(entry.timestamp),
            truncate(&entry.slug, 30)
        );
    }
}

fn movie_row(item: &MovieItem) -> String {
    let year = item
        .year
        .map(|year| year.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<32} {:<36} {:<6} {:<16}",
        truncate(&item.slug, 32),
        truncate(&item.name, 36),
        year,
        truncate(&item.episode_current, 16)
    )
}

fn print_movie_page(page: &MoviePage) {
    if let Some(title) = &page.title {
        println!("{title}\n");
    }
    if page.items.is_empty() {
        println!("No movies found.");
        return;
    }

    println!(
        "{:<32} {:<36} {:<6} {:<16}",
        "SLUG", "TITLE", "YEAR", "EPISODE"
    );
    for item in &page.items {
        println!("{}", movie_row(item));
    }

    let total = page.pagination.page_count();
    if let Some(pager) = render_page_line(page.pagination.current_page, total) {
        println!("\nPage {pager}");
    }
}

fn print_categories(items: &[CategoryItem]) {
    if items.is_empty() {
        println!("Nothing listed.");
        return;
    }
    println!("{:<28} {:<28}", "SLUG", "NAME");
    for item in items {
        println!("{:<28} {:<28}", truncate(&item.slug, 28), truncate(&item.name, 28));
    }
}

fn print_detail(detail: &MovieDetailResponse) {
    let movie = &detail.movie;
    println!("{}", movie.name);
    if !movie.origin_name.is_empty() {
        println!("  Original: {}", movie.origin_name);
    }
    let facts: Vec<String> = [
        movie.year.map(|year| year.to_string()),
        Some(movie.quality.clone()),
        Some(movie.lang.clone()),
        Some(movie.time.clone()),
        Some(movie.episode_current.clone()),
    ]
    .into_iter()
    .flatten()
    .filter(|fact| !fact.trim().is_empty())
    .collect();
    if !facts.is_empty() {
        println!("  {}", facts.join(" | "));
    }
    if !movie.category.is_empty() {
        println!("  Genres: {}", join_names(&movie.category));
    }
    if !movie.country.is_empty() {
        println!("  Country: {}", join_names(&movie.country));
    }
    if !movie.director.is_empty() {
        println!("  Director: {}", movie.director.join(", "));
    }
    if !movie.actor.is_empty() {
        println!("  Cast: {}", truncate_text(&movie.actor.join(", "), 120));
    }

    let synopsis = strip_html(&movie.content);
    if !synopsis.is_empty() {
        println!("\n{}", truncate_text(&synopsis, SYNOPSIS_CHARS));
    }

    if detail.episodes.is_empty() {
        println!("\nNo episodes available yet.");
        return;
    }
    for (index, server) in detail.episodes.iter().enumerate() {
        let episodes: Vec<&str> = server
            .server_data
            .iter()
            .map(|episode| episode.slug.as_str())
            .collect();
        println!(
            "\n[{index}] {} ({} episode(s))\n  {}",
            server.server_name,
            episodes.len(),
            episodes.join(" ")
        );
    }
}

fn join_names(refs: &[CategoryRef]) -> String {
    refs.iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}
