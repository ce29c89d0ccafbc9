use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::models::{MovieListResponse, V1ApiResponse};
use super::{ApiError, CategoryItem, MIN_KEYWORD_CHARS, MovieDetailResponse, MoviePage};
use crate::config::HttpSettings;
use crate::http::get_text_with_retries;
use crate::query_cache::{QueryCache, QueryKey};

/// Read-only OPhim client with a per-query response cache.
#[derive(Debug)]
pub(crate) struct OphimClient {
    base: String,
    http: HttpSettings,
    cache: QueryCache,
}

impl OphimClient {
    pub(crate) fn new(base: impl Into<String>, http: HttpSettings) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            http,
            cache: QueryCache::new(),
        }
    }

    pub(crate) fn latest(&mut self, page: u32) -> Result<MoviePage, ApiError> {
        let page = page.max(1);
        let response: MovieListResponse = self.fetch(
            QueryKey::Latest { page },
            "/danh-sach/phim-moi-cap-nhat",
            vec![page_param(page)],
        )?;
        Ok(response.into())
    }

    pub(crate) fn detail(&mut self, slug: &str) -> Result<MovieDetailResponse, ApiError> {
        let slug = non_empty_slug(slug)?;
        self.fetch(
            QueryKey::Detail {
                slug: slug.to_string(),
            },
            &format!("/phim/{slug}"),
            Vec::new(),
        )
    }

    pub(crate) fn search(&mut self, keyword: &str, page: u32) -> Result<MoviePage, ApiError> {
        let keyword = keyword.trim();
        if keyword.chars().count() < MIN_KEYWORD_CHARS {
            return Err(ApiError::KeywordTooShort);
        }
        let page = page.max(1);
        let response: V1ApiResponse = self.fetch(
            QueryKey::Search {
                keyword: keyword.to_string(),
                page,
            },
            "/v1/api/tim-kiem",
            vec![("keyword".to_string(), keyword.to_string()), page_param(page)],
        )?;
        Ok(response.into())
    }

    pub(crate) fn genres(&mut self) -> Result<Vec<CategoryItem>, ApiError> {
        self.fetch_with(QueryKey::Genres, "/the-loai", Vec::new(), |body| {
            decode_category_list(body, "/the-loai")
        })
    }

    pub(crate) fn countries(&mut self) -> Result<Vec<CategoryItem>, ApiError> {
        self.fetch_with(QueryKey::Countries, "/quoc-gia", Vec::new(), |body| {
            decode_category_list(body, "/quoc-gia")
        })
    }

    pub(crate) fn category(&mut self, slug: &str, page: u32) -> Result<MoviePage, ApiError> {
        let slug = non_empty_slug(slug)?;
        let page = page.max(1);
        let response: V1ApiResponse = self.fetch(
            QueryKey::Category {
                slug: slug.to_string(),
                page,
            },
            &format!("/v1/api/danh-sach/{slug}"),
            vec![page_param(page)],
        )?;
        Ok(response.into())
    }

    /// Drops every cached response so the next call hits the network.
    pub(crate) fn invalidate(&mut self) {
        debug!("query cache invalidated");
        self.cache.invalidate_all();
    }

    fn fetch<T: DeserializeOwned>(
        &mut self,
        key: QueryKey,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        self.fetch_with(key, path, query, |body| {
            serde_json::from_str(body).map_err(|source| ApiError::Decode {
                endpoint: path.to_string(),
                source,
            })
        })
    }

    fn fetch_with<T>(
        &mut self,
        key: QueryKey,
        path: &str,
        query: Vec<(String, String)>,
        decode: impl Fn(&str) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base);
        let http = &self.http;
        self.cache.get_or_fetch(
            key,
            Instant::now(),
            || get_text_with_retries(&url, &query, http).map_err(ApiError::from),
            decode,
        )
    }
}

fn page_param(page: u32) -> (String, String) {
    ("page".to_string(), page.to_string())
}

fn non_empty_slug(slug: &str) -> Result<&str, ApiError> {
    let slug = slug.trim().trim_matches('/');
    if slug.is_empty() {
        Err(ApiError::EmptySlug)
    } else {
        Ok(slug)
    }
}

/// Accepts a bare array or a `{ data: { items: [...] } }` envelope.
fn decode_category_list(body: &str, endpoint: &str) -> Result<Vec<CategoryItem>, ApiError> {
    let decode_error = |source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    };
    let value: Value = serde_json::from_str(body).map_err(decode_error)?;
    let list = if value.is_array() {
        value
    } else {
        value.pointer("/data/items").cloned().unwrap_or(value)
    };
    serde_json::from_value(list).map_err(decode_error)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{Behavior, TestServer};

    const LATEST: &str = r#"{
        "status": true,
        "items": [
            {
                "_id": "a1",
                "name": "Trò Chơi Con Mực",
                "slug": "tro-choi-con-muc",
                "origin_name": "Squid Game",
                "thumb_url": "tro-choi-con-muc-thumb.jpg",
                "poster_url": "tro-choi-con-muc-poster.jpg",
                "year": 2021,
                "modified": { "time": "2024-01-01T00:00:00.000Z" }
            },
            { "_id": "a2", "name": "Bare", "slug": "bare" }
        ],
        "pagination": { "totalItems": 240, "totalItemsPerPage": 24, "currentPage": 2 }
    }"#;

    const SEARCH: &str = r#"{
        "status": "success",
        "data": {
            "items": [{ "_id": "n1", "name": "Naruto", "slug": "naruto", "episode_current": "Tập 220" }],
            "params": { "pagination": { "totalItems": 1, "totalItemsPerPage": 24, "currentPage": 1, "totalPages": 1 } },
            "titlePage": "naruto"
        }
    }"#;

    const DETAIL: &str = r#"{
        "status": true,
        "movie": {
            "name": "Naruto",
            "slug": "naruto",
            "content": "<p>Ninja &amp; friends</p>",
            "thumb_url": "naruto-thumb.jpg",
            "category": [{ "id": "c1", "name": "Hoạt Hình", "slug": "hoat-hinh" }]
        },
        "episodes": [
            {
                "server_name": "Vietsub #1",
                "server_data": [
                    { "name": "1", "slug": "tap-01", "link_m3u8": "https://cdn.example/1/index.m3u8", "link_embed": "https://embed.example/1" },
                    { "name": "2", "slug": "tap-02", "link_m3u8": "", "link_embed": "https://embed.example/2" }
                ]
            }
        ]
    }"#;

    fn client(server: &TestServer) -> OphimClient {
        OphimClient::new(
            format!("{}/", server.base_url),
            HttpSettings {
                connect_timeout: Duration::from_millis(200),
                read_timeout: Duration::from_millis(500),
                attempts: 1,
                retry_delay: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn latest_decodes_items_and_derives_page_count() {
        let server = TestServer::spawn(vec![Behavior::Respond(200, LATEST.to_string())]);
        let mut api = client(&server);

        let page = api.latest(2).expect("latest page");

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].origin_name, "Squid Game");
        assert_eq!(page.items[0].year, Some(2021));
        assert_eq!(page.items[1].thumb_url, "");
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.page_count(), 10);
        assert_eq!(
            server.request_targets(),
            vec!["/danh-sach/phim-moi-cap-nhat?page=2".to_string()]
        );
    }

    #[test]
    fn repeated_query_is_served_from_cache_until_invalidated() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(200, LATEST.to_string()),
            Behavior::Respond(200, LATEST.to_string()),
        ]);
        let mut api = client(&server);

        api.latest(1).expect("first");
        api.latest(1).expect("cached");
        assert_eq!(server.request_count(), 1);

        api.invalidate();
        api.latest(1).expect("refetched");
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn search_uses_v1_endpoint_and_title() {
        let server = TestServer::spawn(vec![Behavior::Respond(200, SEARCH.to_string())]);
        let mut api = client(&server);

        let page = api.search("  naruto ", 1).expect("search");

        assert_eq!(page.title.as_deref(), Some("naruto"));
        assert_eq!(page.items[0].episode_current, "Tập 220");
        assert_eq!(page.pagination.page_count(), 1);
        assert_eq!(
            server.request_targets(),
            vec!["/v1/api/tim-kiem?keyword=naruto&page=1".to_string()]
        );
    }

    #[test]
    fn short_keyword_is_rejected_without_request() {
        let server = TestServer::spawn(Vec::new());
        let mut api = client(&server);

        assert!(matches!(api.search("a", 1), Err(ApiError::KeywordTooShort)));
        assert!(matches!(api.search("  ", 1), Err(ApiError::KeywordTooShort)));
        assert_eq!(server.request_count(), 0);
    }

    #[test]
    fn detail_exposes_servers_and_stream_links() {
        let server = TestServer::spawn(vec![Behavior::Respond(200, DETAIL.to_string())]);
        let mut api = client(&server);

        let detail = api.detail("naruto").expect("detail");

        assert_eq!(detail.movie.category[0].slug, "hoat-hinh");
        let episodes = &detail.episodes[0];
        assert_eq!(episodes.server_name, "Vietsub #1");
        let first = episodes.episode_or_first(None).expect("first episode");
        assert_eq!(first.stream_url(), "https://cdn.example/1/index.m3u8");
        let second = episodes.episode_or_first(Some("tap-02")).expect("second");
        assert_eq!(second.stream_url(), "https://embed.example/2");
        assert_eq!(
            episodes.episode_or_first(Some("missing")).map(|ep| ep.slug.as_str()),
            Some("tap-01")
        );
        assert_eq!(
            episodes.next_after("tap-01").map(|ep| ep.slug.as_str()),
            Some("tap-02")
        );
        assert!(episodes.next_after("tap-02").is_none());
        assert_eq!(server.request_targets(), vec!["/phim/naruto".to_string()]);
    }

    #[test]
    fn category_lists_accept_bare_and_wrapped_shapes() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(
                200,
                r#"[{"_id":"g1","name":"Hành Động","slug":"hanh-dong"}]"#.to_string(),
            ),
            Behavior::Respond(
                200,
                r#"{"status":"success","data":{"items":[{"_id":"q1","name":"Hàn Quốc","slug":"han-quoc"}]}}"#
                    .to_string(),
            ),
        ]);
        let mut api = client(&server);

        let genres = api.genres().expect("genres");
        let countries = api.countries().expect("countries");

        assert_eq!(genres[0].slug, "hanh-dong");
        assert_eq!(countries[0].name, "Hàn Quốc");
    }

    #[test]
    fn category_page_hits_v1_listing() {
        let server = TestServer::spawn(vec![Behavior::Respond(200, SEARCH.to_string())]);
        let mut api = client(&server);

        let page = api.category("hoat-hinh", 3).expect("category");

        assert_eq!(page.items.len(), 1);
        assert_eq!(
            server.request_targets(),
            vec!["/v1/api/danh-sach/hoat-hinh?page=3".to_string()]
        );
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let server = TestServer::spawn(vec![Behavior::Respond(200, "not json".to_string())]);
        let mut api = client(&server);

        let err = api.latest(1).expect_err("decode should fail");
        assert!(matches!(err, ApiError::Decode { .. }));
        assert!(err.to_string().contains("/danh-sach/phim-moi-cap-nhat"));
    }

    #[test]
    fn error_page_is_not_cached() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(200, "<html>maintenance</html>".to_string()),
            Behavior::Respond(200, LATEST.to_string()),
        ]);
        let mut api = client(&server);

        assert!(matches!(api.latest(1), Err(ApiError::Decode { .. })));
        let page = api.latest(1).expect("second fetch decodes");

        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn empty_slug_is_rejected() {
        let server = TestServer::spawn(Vec::new());
        let mut api = client(&server);
        assert!(matches!(api.detail(" / "), Err(ApiError::EmptySlug)));
    }
}
