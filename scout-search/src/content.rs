//! HTML content extraction: strips boilerplate and returns structured page content.
//!
//! Parses raw HTML once, reads title/description/author/date/language
//! from meta tags, finds the main content region and collects its text
//! while skipping boilerplate elements and ad containers.

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{ContentError, ContentErrorReason};
use crate::types::{domain_of, ContentType, FetchedContent};

/// Elements whose subtree never contributes text.
const BOILERPLATE: &str =
    "script, style, noscript, nav, footer, header, aside, svg, iframe, form, template";

/// Ad and sponsor containers skipped during text collection.
const AD_CONTAINERS: &str = ".ad, .ads, .advert, .advertisement, .ad-container, .ad-banner, \
     .sponsored, [id^=\"ad-\"], [id^=\"ads-\"], [class*=\"sponsor\"], [class*=\"advert\"], \
     [aria-label=\"advertisement\"]";

/// Main content candidates in priority order.
const MAIN_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-body",
];

/// Where a metadata value is read from.
enum Source {
    Attr(&'static str),
    Text,
}

const TITLE_SOURCES: &[(&str, Source)] = &[
    ("meta[property=\"og:title\"]", Source::Attr("content")),
    ("meta[name=\"twitter:title\"]", Source::Attr("content")),
    ("title", Source::Text),
    ("h1", Source::Text),
];

const DESCRIPTION_SOURCES: &[(&str, Source)] = &[
    ("meta[name=\"description\"]", Source::Attr("content")),
    ("meta[property=\"og:description\"]", Source::Attr("content")),
    ("meta[name=\"twitter:description\"]", Source::Attr("content")),
];

const AUTHOR_SOURCES: &[(&str, Source)] = &[
    ("meta[name=\"author\"]", Source::Attr("content")),
    ("meta[property=\"article:author\"]", Source::Attr("content")),
    ("[rel=\"author\"]", Source::Text),
    (".author", Source::Text),
];

const DATE_SOURCES: &[(&str, Source)] = &[
    ("meta[property=\"article:published_time\"]", Source::Attr("content")),
    ("meta[name=\"date\"]", Source::Attr("content")),
    ("meta[name=\"pubdate\"]", Source::Attr("content")),
    ("time[datetime]", Source::Attr("datetime")),
];

const LANGUAGE_SOURCES: &[(&str, Source)] = &[
    ("html[lang]", Source::Attr("lang")),
    ("meta[http-equiv=\"content-language\" i]", Source::Attr("content")),
    ("meta[property=\"og:locale\"]", Source::Attr("content")),
];

/// Extract structured content from raw HTML fetched from `url`.
///
/// Body text is whitespace-collapsed and truncated to `max_chars`
/// characters with a trailing `"..."`.
///
/// # Errors
///
/// Returns a [`ContentError`] with reason [`ContentErrorReason::Invalid`]
/// if the page has no extractable text.
pub fn extract(html: &str, url: &str, max_chars: usize) -> Result<FetchedContent, ContentError> {
    let document = Html::parse_document(html);

    let skip = Selector::parse(&format!("{BOILERPLATE}, {AD_CONTAINERS}")).ok();
    let Some((main, text)) = main_region(&document, skip.as_ref()) else {
        return Err(ContentError::new(
            url,
            ContentErrorReason::Invalid,
            "no extractable content found",
        ));
    };
    let body_text = truncate_chars(&text, max_chars);
    let word_count = body_text.split_whitespace().count();

    let has_images = contains(main, "img");
    let has_videos = contains_in_document(
        &document,
        "video, iframe[src*=\"youtube.com\"], iframe[src*=\"vimeo.com\"], meta[property=\"og:video\"]",
    );

    let og_type = first_value(&document, &[("meta[property=\"og:type\"]", Source::Attr("content"))]);
    let content_type = classify_content_type(url, og_type.as_deref(), has_videos);

    Ok(FetchedContent {
        url: url.to_owned(),
        title: first_value(&document, TITLE_SOURCES).unwrap_or_default(),
        description: first_value(&document, DESCRIPTION_SOURCES).unwrap_or_default(),
        body_text,
        domain: domain_of(url),
        content_type,
        word_count,
        has_images,
        has_videos,
        author: first_value(&document, AUTHOR_SOURCES),
        publish_date: first_value(&document, DATE_SOURCES),
        language: first_value(&document, LANGUAGE_SOURCES),
    })
}

/// Classify a page from its `og:type`, URL and embedded media.
pub fn classify_content_type(url: &str, og_type: Option<&str>, has_videos: bool) -> ContentType {
    let og = og_type.unwrap_or_default().to_lowercase();
    if og.starts_with("video") {
        return ContentType::Video;
    }
    if og == "article" {
        return ContentType::Article;
    }

    let lower = url.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if [".pdf", ".doc", ".docx", ".ppt", ".pptx"]
        .iter()
        .any(|ext| path.ends_with(ext))
    {
        return ContentType::Document;
    }
    if ["youtube.com/watch", "youtu.be/", "vimeo.com/", "/video/", "/videos/"]
        .iter()
        .any(|p| lower.contains(p))
    {
        return ContentType::Video;
    }
    if ["/blog/", "/news/", "/article", "/posts/", "/post/"]
        .iter()
        .any(|p| path.contains(p))
    {
        return ContentType::Article;
    }
    if has_videos {
        ContentType::Video
    } else {
        ContentType::Webpage
    }
}

/// First content region whose readable text (boilerplate and ads removed)
/// is non-empty, with that text. `body` is the last resort.
fn main_region<'a>(document: &'a Html, skip: Option<&Selector>) -> Option<(ElementRef<'a>, String)> {
    MAIN_SELECTORS
        .iter()
        .chain(std::iter::once(&"body"))
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| {
            document.select(&sel).find_map(|el| {
                let mut raw = String::new();
                collect_text(el, skip, &mut raw);
                let text = normalise_whitespace(&raw);
                (!text.is_empty()).then_some((el, text))
            })
        })
}

/// Append the text of `element`, skipping subtrees that match `skip`.
fn collect_text(element: ElementRef<'_>, skip: Option<&Selector>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if skip.is_some_and(|s| s.matches(&child_el)) {
                        continue;
                    }
                    collect_text(child_el, skip, out);
                }
            }
            _ => {}
        }
    }
}

fn first_value(document: &Html, sources: &[(&str, Source)]) -> Option<String> {
    sources.iter().find_map(|(css, from)| {
        let sel = Selector::parse(css).ok()?;
        document.select(&sel).find_map(|el| {
            let value = match from {
                Source::Attr(name) => el.value().attr(name).map(str::to_owned)?,
                Source::Text => el.text().collect::<String>(),
            };
            let value = normalise_whitespace(&value);
            (!value.is_empty()).then_some(value)
        })
    })
}

fn contains(element: ElementRef<'_>, css: &str) -> bool {
    Selector::parse(css).is_ok_and(|sel| element.select(&sel).next().is_some())
}

fn contains_in_document(document: &Html, css: &str) -> bool {
    Selector::parse(css).is_ok_and(|sel| document.select(&sel).next().is_some())
}

/// Collapse every whitespace run into a single space.
fn normalise_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars` characters, appending `"..."` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_owned(),
        Some((end, _)) => {
            let mut truncated = text[..end].trim_end().to_owned();
            truncated.push_str("...");
            truncated
        }
    }
}
