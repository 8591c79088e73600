//! Display title resolution.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::format::SourceFormat;

/// Title used when a document has no heading to take one from.
pub const UNTITLED: &str = "Untitled";

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1(?:\s[^>]*)?>(.*?)</h1\s*>").expect("valid h1 pattern"));

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").expect("valid title pattern")
});

static NUMERIC_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid entity pattern")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));

/// Resolve the display title of a document.
///
/// Markdown takes the first level-1 heading line; HTML takes the first
/// `<h1>`, then `<title>`. Falls back to [`UNTITLED`].
pub fn resolve_title(content: &str, format: SourceFormat) -> String {
    let found = match format {
        SourceFormat::Markdown => markdown_title(content),
        SourceFormat::HtmlFragment | SourceFormat::HtmlDocument => html_title(content),
    };

    found.unwrap_or_else(|| UNTITLED.to_string())
}

/// Find the first `# Heading` line.
fn markdown_title(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix('#')?;
        // `##` is a level-2 heading, `#foo` is not a heading at all
        if !rest.starts_with([' ', '\t']) {
            return None;
        }
        let text = rest.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

/// Text of the first `<h1>`, else the first `<title>`.
fn html_title(content: &str) -> Option<String> {
    first_element_text(&H1_RE, content).or_else(|| first_element_text(&TITLE_RE, content))
}

fn first_element_text(re: &Regex, content: &str) -> Option<String> {
    let inner = re.captures(content)?.get(1)?.as_str();
    let text = TAG_RE.replace_all(inner, "");
    let text = decode_entities(&text.split_whitespace().collect::<Vec<_>>().join(" "));
    (!text.is_empty()).then_some(text)
}

/// Decode the entities an escaped title can contain.
///
/// Numeric references are decoded first and `&amp;` last, so `&amp;lt;`
/// stays the literal text `&lt;`.
fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });

    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn markdown_uses_first_level_one_heading() {
        let md = "intro text\n## Not this\n#   Binary Search  \n# Second\n";
        assert_eq!(resolve_title(md, SourceFormat::Markdown), "Binary Search");
    }

    #[test]
    fn markdown_without_heading_is_untitled() {
        assert_eq!(resolve_title("just text", SourceFormat::Markdown), UNTITLED);
        assert_eq!(resolve_title("#hashtag\n", SourceFormat::Markdown), UNTITLED);
        assert_eq!(resolve_title("", SourceFormat::Markdown), UNTITLED);
    }

    #[test]
    fn markdown_handles_crlf_and_tabs() {
        let md = "#\tTabbed Title\r\n\r\nbody";
        assert_eq!(resolve_title(md, SourceFormat::Markdown), "Tabbed Title");
    }

    #[test]
    fn markdown_keeps_non_ascii() {
        let md = "# 이진 탐색\n";
        assert_eq!(resolve_title(md, SourceFormat::Markdown), "이진 탐색");
    }

    #[test]
    fn html_prefers_h1_and_strips_nested_tags() {
        let html = r#"<html><head><title>Tab Title</title></head>
<body><h1 class="hero">Fast <em>Fourier</em>
  Transform</h1></body></html>"#;
        assert_eq!(
            resolve_title(html, SourceFormat::HtmlDocument),
            "Fast Fourier Transform"
        );
    }

    #[test]
    fn html_falls_back_to_title_element() {
        let html = "<head><title>Only &amp; Title</title></head><p>body</p>";
        assert_eq!(resolve_title(html, SourceFormat::HtmlFragment), "Only & Title");
    }

    #[test]
    fn html_without_headings_is_untitled() {
        assert_eq!(
            resolve_title("<p>no heading</p><h2>sub</h2>", SourceFormat::HtmlFragment),
            UNTITLED
        );
    }

    #[test]
    fn html_decodes_numeric_entities_once() {
        let html = "<h1>Euler&#8217;s &#x3C0; &#39;Identity&#x27; &amp;#39;</h1>";
        assert_eq!(
            resolve_title(html, SourceFormat::HtmlFragment),
            "Euler\u{2019}s \u{3c0} 'Identity' &#39;"
        );
    }

    #[test]
    fn invalid_numeric_entities_are_kept() {
        let html = "<h1>bad &#xD800; ref</h1>";
        assert_eq!(
            resolve_title(html, SourceFormat::HtmlFragment),
            "bad &#xD800; ref"
        );
    }
}
