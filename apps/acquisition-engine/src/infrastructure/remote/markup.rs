//! Minimal markup scraping: hidden inputs and visible text.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

#[allow(clippy::expect_used)] // Patterns are compile-time constants
fn input_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("input regex is valid"))
}

#[allow(clippy::expect_used)]
fn attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.\[\]]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("attribute regex is valid")
    })
}

#[allow(clippy::expect_used)]
fn hidden_blocks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)>")
            .expect("block regex is valid")
    })
}

#[allow(clippy::expect_used)]
fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"))
}

#[allow(clippy::expect_used)]
fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

/// Name/value pairs of every `<input type="hidden">` in the markup.
#[must_use]
pub fn hidden_fields(markup: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    for tag in input_tag().find_iter(markup) {
        let mut attrs: HashMap<String, String> = HashMap::new();
        for caps in attribute().captures_iter(tag.as_str()) {
            let Some(name) = caps.get(1) else {
                continue;
            };
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            attrs.insert(name.as_str().to_lowercase(), decode_entities(value));
        }

        let is_hidden = attrs
            .get("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
        if !is_hidden {
            continue;
        }
        if let Some(name) = attrs.remove("name") {
            let value = attrs.remove("value").unwrap_or_default();
            fields.entry(name).or_insert(value);
        }
    }

    fields
}

/// Human-visible text with tags, scripts and styles removed.
#[must_use]
pub fn visible_text(markup: &str) -> String {
    let without_blocks = hidden_blocks().replace_all(markup, " ");
    let without_tags = any_tag().replace_all(&without_blocks, " ");
    let decoded = decode_entities(&without_tags);
    whitespace().replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
