//! HTML content analysis
//!
//! This module turns a fetched body into an [`ExportRecord`] and detects its
//! language. The coordinator only depends on the [`ContentAnalyzer`] trait;
//! [`HtmlAnalyzer`] is the default implementation.

use crate::output::ExportRecord;
use scraper::{Html, Selector};
use url::Url;

/// Language reported when none can be detected
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Title used for pages without a non-empty `<title>`
pub const UNTITLED: &str = "Untitled";

/// Shortest visible text worth running statistical detection on
const MIN_DETECTION_CHARS: usize = 20;

/// Extracts records and languages from fetched bodies
pub trait ContentAnalyzer: Send + Sync {
    /// Builds the export record for `body` fetched from `address`
    ///
    /// A record with a `links` array of hrefs lets the coordinator follow
    /// links from the page.
    fn analyze(&self, body: &str, address: &str) -> ExportRecord;

    /// Language code of `body`, or [`UNKNOWN_LANGUAGE`]
    fn detect_language(&self, body: &str) -> String;
}

/// Default scraper-based analyzer
///
/// # Record Fields
///
/// | Key | Value |
/// |-----|-------|
/// | `url` | The fetched address |
/// | `title` | Trimmed `<title>`, or `"Untitled"` |
/// | `links` | `href` of every `<a>`, as written |
/// | `images` | `src` of every `<img>`, as written |
/// | `link_count` | Number of links |
/// | `image_count` | Number of images |
#[derive(Debug, Clone, Default)]
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl ContentAnalyzer for HtmlAnalyzer {
    fn analyze(&self, body: &str, address: &str) -> ExportRecord {
        let document = Html::parse_document(body);

        let title = extract_title(&document).unwrap_or_else(|| UNTITLED.to_string());
        let links = select_attr(&document, "a[href]", "href");
        let images = select_attr(&document, "img[src]", "src");

        let mut record = ExportRecord::new();
        record.insert("url", address);
        record.insert("title", title);
        record.insert("link_count", links.len());
        record.insert("image_count", images.len());
        record.insert("links", links);
        record.insert("images", images);

        tracing::debug!("Analyzed {}", address);
        record
    }

    fn detect_language(&self, body: &str) -> String {
        let document = Html::parse_document(body);

        let declared = Selector::parse("html[lang]")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .and_then(|element| element.value().attr("lang"))
                    .and_then(primary_subtag)
            });

        declared
            .or_else(|| meta_language(&document))
            .or_else(|| detect_text_language(&document_text(&document)))
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

/// Language from `<meta http-equiv="content-language">`
fn meta_language(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[http-equiv][content]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("http-equiv")
                .map(|v| v.eq_ignore_ascii_case("content-language"))
                .unwrap_or(false)
        })
        .and_then(|element| element.value().attr("content"))
        .and_then(primary_subtag)
}

/// Statistical guess from visible text, as an ISO 639-1 code where one exists
fn detect_text_language(text: &str) -> Option<String> {
    if text.chars().count() < MIN_DETECTION_CHARS {
        return None;
    }

    let info = whatlang::detect(text)?;
    let code = info.lang().code();
    tracing::trace!(
        "Detected {} from text (confidence {:.2})",
        code,
        info.confidence()
    );

    Some(iso_639_1(code).unwrap_or(code).to_string())
}

/// Two-letter code for a three-letter one reported by the detector
fn iso_639_1(code: &str) -> Option<&'static str> {
    let short = match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        _ => return None,
    };
    Some(short)
}

/// Primary subtag of a language tag, lowercased (`en-US` -> `en`)
fn primary_subtag(tag: &str) -> Option<String> {
    let primary = tag
        .split(|c: char| c == '-' || c == '_' || c == ',')
        .next()?
        .trim()
        .to_lowercase();

    if primary.is_empty() {
        None
    } else {
        Some(primary)
    }
}

/// Visible text of the document body, whitespace-joined
pub fn extract_text(body: &str) -> String {
    document_text(&Html::parse_document(body))
}

fn document_text(document: &Html) -> String {
    let text: Vec<&str> = match Selector::parse("body") {
        Ok(selector) => match document.select(&selector).next() {
            Some(element) => element.text().collect(),
            None => document.root_element().text().collect(),
        },
        Err(_) => document.root_element().text().collect(),
    };

    text.iter()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => match absolute_url.scheme() {
            "http" | "https" => Some(absolute_url.to_string()),
            _ => None,
        },
        Err(_) => None,
    }
}
