//! HTTP metadata fetcher on `reqwest` + `scraper`.

use super::{FetchError, MetadataFetcher, PageMetadata};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const MAX_REDIRECTS: usize = 5;
/// Metadata lives in `<head>`; anything past this many bytes is not read.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

static TITLE_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    selectors(&[
        ("meta[property='og:title']", "content"),
        ("meta[name='twitter:title']", "content"),
    ])
});
static DESCRIPTION_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    selectors(&[
        ("meta[property='og:description']", "content"),
        ("meta[name='description']", "content"),
        ("meta[name='twitter:description']", "content"),
    ])
});
static IMAGE_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    selectors(&[
        ("meta[property='og:image']", "content"),
        ("meta[name='twitter:image']", "content"),
        ("link[rel='image_src']", "href"),
    ])
});
static TITLE_ELEMENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid title selector"));

fn selectors(specs: &[(&str, &'static str)]) -> Vec<(Selector, &'static str)> {
    specs
        .iter()
        .map(|(css, attr)| (Selector::parse(css).expect("valid metadata selector"), *attr))
        .collect()
}

/// Fetches a page over HTTP and reads Open Graph / HTML metadata from it.
#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
}

impl HttpMetadataFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT_HTML),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let capacity = response
            .content_length()
            .map_or(0, |len| usize::try_from(len).unwrap_or(MAX_BODY_BYTES))
            .min(MAX_BODY_BYTES);
        let mut body = Vec::with_capacity(capacity);
        while let Some(chunk) = response.chunk().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })? {
            if append_capped(&mut body, &chunk, MAX_BODY_BYTES) {
                debug!("event=metadata_fetch module=metadata status=truncated max_bytes={MAX_BODY_BYTES}");
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Appends `chunk` without letting `body` grow past `cap`.
///
/// Returns `true` once the cap is reached.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() >= cap
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<PageMetadata, FetchError> {
        let started_at = Instant::now();
        match self.fetch_html(url).await {
            Ok(html) => {
                let metadata = parse_metadata(&html);
                debug!(
                    "event=metadata_fetch module=metadata status=ok duration_ms={} body_bytes={} has_image={}",
                    started_at.elapsed().as_millis(),
                    html.len(),
                    !metadata.image.is_empty()
                );
                Ok(metadata)
            }
            Err(err) => {
                warn!(
                    "event=metadata_fetch module=metadata status=error duration_ms={} error_code={}",
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                Err(err)
            }
        }
    }
}

/// Extracts metadata from an HTML document.
///
/// Open Graph tags win over Twitter cards, which win over plain HTML. The
/// `<title>` element is the last title fallback.
pub fn parse_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = first_attr(&document, &TITLE_SELECTORS)
        .or_else(|| {
            document
                .select(&TITLE_ELEMENT)
                .next()
                .map(|element| collapse_whitespace(&element.text().collect::<String>()))
                .filter(|title| !title.is_empty())
        })
        .unwrap_or_default();

    PageMetadata {
        title,
        description: first_attr(&document, &DESCRIPTION_SELECTORS).unwrap_or_default(),
        image: first_attr(&document, &IMAGE_SELECTORS).unwrap_or_default(),
    }
}

fn first_attr(document: &Html, candidates: &[(Selector, &'static str)]) -> Option<String> {
    candidates.iter().find_map(|(selector, attr)| {
        document
            .select(selector)
            .filter_map(|element| element.value().attr(attr))
            .map(collapse_whitespace)
            .find(|value| !value.is_empty())
    })
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{append_capped, parse_metadata};

    #[test]
    fn body_reader_stops_at_cap() {
        let mut body = Vec::new();
        assert!(!append_capped(&mut body, b"<head>", 10));
        assert!(append_capped(&mut body, b"<title>x</title>", 10));
        assert_eq!(body, b"<head><tit");

        assert!(append_capped(&mut body, b"more", 10));
        assert_eq!(body.len(), 10);
    }

    #[test]
    fn truncated_document_still_yields_head_metadata() {
        let mut body = Vec::new();
        let page = format!(
            r#"<html><head><meta property="og:title" content="Big page"></head><body>{}</body></html>"#,
            "x".repeat(4096)
        );
        append_capped(&mut body, page.as_bytes(), 128);
        let metadata = parse_metadata(&String::from_utf8_lossy(&body));
        assert_eq!(metadata.title, "Big page");
    }

    #[test]
    fn prefers_open_graph_tags() {
        let html = r#"<html><head>
            <title>Fallback title</title>
            <meta property="og:title" content="OG title">
            <meta name="description" content="plain description">
            <meta property="og:description" content="OG description">
            <meta property="og:image" content="/img.png">
        </head><body></body></html>"#;

        let metadata = parse_metadata(html);
        assert_eq!(metadata.title, "OG title");
        assert_eq!(metadata.description, "OG description");
        assert_eq!(metadata.image, "/img.png");
    }

    #[test]
    fn falls_back_to_plain_html() {
        let html = r#"<html><head>
            <title>
                Plain   title
            </title>
            <meta name="description" content="A page">
            <link rel="image_src" href="https://cdn.example.net/i.jpg">
        </head></html>"#;

        let metadata = parse_metadata(html);
        assert_eq!(metadata.title, "Plain title");
        assert_eq!(metadata.description, "A page");
        assert_eq!(metadata.image, "https://cdn.example.net/i.jpg");
    }

    #[test]
    fn missing_tags_yield_empty_fields() {
        let metadata = parse_metadata("<html><body><p>nothing here</p></body></html>");
        assert!(metadata.title.is_empty());
        assert!(metadata.description.is_empty());
        assert!(metadata.image.is_empty());
    }

    #[test]
    fn blank_og_value_falls_through_to_next_candidate() {
        let html = r#"<head>
            <meta property="og:image" content="  ">
            <meta name="twitter:image" content="/card.png">
        </head>"#;
        assert_eq!(parse_metadata(html).image, "/card.png");
    }
}
