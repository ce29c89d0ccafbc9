use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const DEFAULT_API_BASE: &str = "https://ophim1.com";
const DEFAULT_PLAYER: &str = "mpv";
const DEFAULT_NETWORK_RECOVERIES: u32 = 3;
const DEFAULT_MEDIA_RECOVERIES: u32 = 2;

#[derive(Debug, Clone)]
pub(crate) struct HttpSettings {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(15),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PlayerConfig {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
    /// Host player handles HLS manifests itself.
    pub(crate) native_hls: bool,
    /// Upper bound on the variant height picked from a master playlist.
    pub(crate) max_height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecoveryLimits {
    pub(crate) network: u32,
    pub(crate) media: u32,
}

impl Default for RecoveryLimits {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK_RECOVERIES,
            media: DEFAULT_MEDIA_RECOVERIES,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) api_base: String,
    pub(crate) http: HttpSettings,
    pub(crate) player: PlayerConfig,
    pub(crate) recovery: RecoveryLimits,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        Self {
            api_base: resolve_api_base(env::var_os("MOONPLAY_API_BASE")),
            http: HttpSettings::default(),
            player: PlayerConfig {
                program: resolve_player_bin(env::var_os("MOONPLAY_PLAYER")),
                args: parse_player_args(env::var("MOONPLAY_PLAYER_ARGS").ok().as_deref()),
                native_hls: parse_flag(env::var("MOONPLAY_NATIVE_HLS").ok().as_deref()),
                max_height: env::var("MOONPLAY_MAX_HEIGHT")
                    .ok()
                    .and_then(|raw| raw.trim().parse::<u32>().ok())
                    .filter(|height| *height > 0),
            },
            recovery: RecoveryLimits {
                network: parse_limit(
                    env::var("MOONPLAY_NETWORK_RECOVERIES").ok().as_deref(),
                    DEFAULT_NETWORK_RECOVERIES,
                ),
                media: parse_limit(
                    env::var("MOONPLAY_MEDIA_RECOVERIES").ok().as_deref(),
                    DEFAULT_MEDIA_RECOVERIES,
                ),
            },
        }
    }
}

pub(crate) fn resolve_player_bin(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_PLAYER),
    }
}

pub(crate) fn resolve_api_base(env_value: Option<OsString>) -> String {
    let raw = env_value
        .and_then(|value| value.into_string().ok())
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .unwrap_or_default();
    if raw.is_empty() {
        DEFAULT_API_BASE.to_string()
    } else {
        raw
    }
}

pub(crate) fn parse_player_args(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub(crate) fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn parse_limit(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}
