//! OPhim response payloads.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct CategoryRef {
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    #[allow(dead_code)]
    pub(crate) slug: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Modified {
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MovieItem {
    #[allow(dead_code)] // Part of the API response schema
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) slug: String,
    #[allow(dead_code)]
    pub(crate) origin_name: String,
    #[allow(dead_code)]
    pub(crate) thumb_url: String,
    #[allow(dead_code)]
    pub(crate) poster_url: String,
    pub(crate) year: Option<i32>,
    #[allow(dead_code)]
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[allow(dead_code)]
    pub(crate) quality: String,
    #[allow(dead_code)]
    pub(crate) lang: String,
    pub(crate) episode_current: String,
    #[allow(dead_code)]
    pub(crate) category: Vec<CategoryRef>,
    #[allow(dead_code)]
    pub(crate) country: Vec<CategoryRef>,
    #[allow(dead_code)]
    pub(crate) modified: Option<Modified>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Pagination {
    pub(crate) total_items: u64,
    pub(crate) total_items_per_page: u64,
    pub(crate) current_page: u32,
    pub(crate) total_pages: Option<u32>,
}

impl Pagination {
    /// Page count as reported, or derived from the item totals.
    pub(crate) fn page_count(&self) -> u32 {
        if let Some(total) = self.total_pages {
            return total;
        }
        if self.total_items_per_page == 0 {
            return 0;
        }
        let pages = self.total_items.div_ceil(self.total_items_per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MovieListResponse {
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) status: bool,
    pub(crate) items: Vec<MovieItem>,
    pub(crate) pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct V1Params {
    pub(crate) pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct V1Data {
    pub(crate) items: Vec<MovieItem>,
    pub(crate) params: V1Params,
    #[serde(rename = "titlePage")]
    pub(crate) title_page: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct V1ApiResponse {
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) status: String,
    pub(crate) data: V1Data,
}

/// Listing shape shared by the root and `/v1/api` endpoints.
#[derive(Debug, Clone, Default)]
pub(crate) struct MoviePage {
    pub(crate) title: Option<String>,
    pub(crate) items: Vec<MovieItem>,
    pub(crate) pagination: Pagination,
}

impl From<MovieListResponse> for MoviePage {
    fn from(response: MovieListResponse) -> Self {
        Self {
            title: None,
            items: response.items,
            pagination: response.pagination,
        }
    }
}

impl From<V1ApiResponse> for MoviePage {
    fn from(response: V1ApiResponse) -> Self {
        let title = Some(response.data.title_page).filter(|title| !title.trim().is_empty());
        Self {
            title,
            items: response.data.items,
            pagination: response.data.params.pagination,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MovieDetail {
    pub(crate) name: String,
    pub(crate) slug: String,
    pub(crate) origin_name: String,
    pub(crate) content: String,
    pub(crate) thumb_url: String,
    pub(crate) poster_url: String,
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) trailer_url: String,
    pub(crate) episode_current: String,
    #[allow(dead_code)]
    pub(crate) episode_total: String,
    pub(crate) quality: String,
    pub(crate) lang: String,
    pub(crate) year: Option<i32>,
    #[allow(dead_code)]
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) time: String,
    pub(crate) actor: Vec<String>,
    pub(crate) director: Vec<String>,
    pub(crate) category: Vec<CategoryRef>,
    pub(crate) country: Vec<CategoryRef>,
    #[allow(dead_code)]
    pub(crate) status: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct EpisodeData {
    pub(crate) name: String,
    pub(crate) slug: String,
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) filename: String,
    pub(crate) link_embed: String,
    pub(crate) link_m3u8: String,
}

impl EpisodeData {
    /// Manifest link when present, else the embed link; empty when neither.
    pub(crate) fn stream_url(&self) -> &str {
        let m3u8 = self.link_m3u8.trim();
        if m3u8.is_empty() {
            self.link_embed.trim()
        } else {
            m3u8
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EpisodeServer {
    pub(crate) server_name: String,
    pub(crate) server_data: Vec<EpisodeData>,
}

impl EpisodeServer {
    /// The episode with `slug`, falling back to the first one.
    pub(crate) fn episode_or_first(&self, slug: Option<&str>) -> Option<&EpisodeData> {
        slug.and_then(|slug| self.server_data.iter().find(|ep| ep.slug == slug))
            .or_else(|| self.server_data.first())
    }

    pub(crate) fn next_after(&self, slug: &str) -> Option<&EpisodeData> {
        let idx = self.server_data.iter().position(|ep| ep.slug == slug)?;
        self.server_data.get(idx + 1)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MovieDetailResponse {
    #[allow(dead_code)] // Part of the API response schema
    pub(crate) status: bool,
    pub(crate) movie: MovieDetail,
    pub(crate) episodes: Vec<EpisodeServer>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct CategoryItem {
    #[allow(dead_code)] // Part of the API response schema
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) slug: String,
}
