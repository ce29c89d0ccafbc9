mod client;
mod models;

use thiserror::Error;

use crate::http::HttpError;

pub(crate) use client::OphimClient;
pub(crate) use models::{
    CategoryItem, CategoryRef, EpisodeData, EpisodeServer, MovieDetailResponse, MovieItem, MoviePage,
};

pub(crate) const IMAGE_CDN: &str = "https://img.ophim.live/uploads/movies";
pub(crate) const PLACEHOLDER_IMAGE: &str = "/placeholder-movie.svg";
pub(crate) const MIN_KEYWORD_CHARS: usize = 2;

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("search keyword must be at least {MIN_KEYWORD_CHARS} characters")]
    KeywordTooShort,
    #[error("movie slug is empty")]
    EmptySlug,
}

/// Absolute image URL for a thumb/poster path from the API.
pub(crate) fn build_image_url(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    if path.starts_with("http") {
        return path.to_string();
    }
    format!("{IMAGE_CDN}/{}", path.trim_start_matches('/'))
}
