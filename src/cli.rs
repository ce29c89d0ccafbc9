use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "moonplay",
    version,
    about = "Browse OPhim movies, stream episodes and keep a watch history"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the continue-watching dashboard
    Tui,
    /// List recently updated movies
    Latest {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search movies by keyword
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List movies of a genre, country or list slug
    Category {
        slug: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List available genres
    Genres,
    /// List available countries
    Countries,
    /// Show movie details and episodes
    Show { slug: String },
    /// Play an episode and record it in the watch history
    Play {
        slug: String,
        /// Episode slug; defaults to the first episode of the server
        #[arg(long)]
        episode: Option<String>,
        /// Zero-based server index
        #[arg(long, default_value_t = 0)]
        server: usize,
        /// Continue with the next episode when the player exits cleanly
        #[arg(long)]
        auto_next: bool,
    },
    /// Print the watch history
    History {
        /// Remove every history entry
        #[arg(long)]
        clear: bool,
    },
}
