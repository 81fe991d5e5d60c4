//! Text helpers for turning feed markup into notification text

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Default display length for notification bodies
pub const DEFAULT_SUMMARY_CHARS: usize = 180;

/// Marker appended to text that was cut
pub const TRUNCATION_MARKER: char = '…';

// Patterns are literals; compilation cannot fail at runtime.
#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

#[allow(clippy::expect_used)]
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("entity pattern is valid")
});

/// Replace every markup tag with a space and collapse runs of whitespace
///
/// # Examples
///
/// ```
/// use feed_push::utils::strip_html;
///
/// assert_eq!(strip_html("<p>Hello <b>world</b></p>\n"), "Hello world");
/// ```
pub fn strip_html(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode numeric character references and the common named HTML entities
///
/// Unknown named entities are left as they are.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            decode_entity(entity).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "hellip" => "…",
        "ndash" => "–",
        "mdash" => "—",
        "lsquo" => "‘",
        "rsquo" => "’",
        "ldquo" => "“",
        "rdquo" => "”",
        "laquo" => "«",
        "raquo" => "»",
        "iexcl" => "¡",
        "iquest" => "¿",
        "euro" => "€",
        "copy" => "©",
        "reg" => "®",
        "middot" => "·",
        "aacute" => "á",
        "eacute" => "é",
        "iacute" => "í",
        "oacute" => "ó",
        "uacute" => "ú",
        "Aacute" => "Á",
        "Eacute" => "É",
        "Iacute" => "Í",
        "Oacute" => "Ó",
        "Uacute" => "Ú",
        "ntilde" => "ñ",
        "Ntilde" => "Ñ",
        "uuml" => "ü",
        "Uuml" => "Ü",
        "ccedil" => "ç",
        "Ccedil" => "Ç",
        _ => return None,
    };
    Some(decoded.to_string())
}

/// Cut `text` to at most `max_chars` characters, appending `…` when cut
///
/// Counts Unicode scalar values, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut cut = text[..byte_idx].to_string();
            cut.push(TRUNCATION_MARKER);
            cut
        }
        None => text.to_string(),
    }
}

/// Markup-free, entity-decoded text suitable for display
///
/// Entities are decoded after tags are removed so that escaped angle brackets
/// in the source survive as literal text.
pub fn display_text(html: &str) -> String {
    let stripped = strip_html(html);
    let decoded = decode_entities(&stripped);
    // nbsp decodes to a space; collapse again
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`display_text`] cut to `max_chars`
pub fn summarize(html: &str, max_chars: usize) -> String {
    truncate_chars(&display_text(html), max_chars)
}
