use std::fmt::{Display, Formatter};

use scraper::{Html, Node};
use serde::{Deserialize, Serialize};

const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Ordered, whitespace-trimmed, non-empty lines of a page's visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalText {
    lines: Vec<String>,
}

impl CanonicalText {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .flat_map(|piece| {
                piece
                    .as_ref()
                    .lines()
                    .map(|line| line.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|line| !line.is_empty())
            .collect();
        Self { lines }
    }

    /// Parses raw markup and extracts the visible text, one line per text
    /// fragment. The parser recovers from malformed markup, so extraction is
    /// best-effort rather than fallible.
    pub fn from_html(raw: &str) -> Self {
        let document = Html::parse_document(raw);
        let mut fragments = Vec::new();
        for node in document.tree.root().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => INVISIBLE_TAGS.contains(&element.name()),
                _ => false,
            });
            if !hidden {
                fragments.push(text.to_string());
            }
        }
        Self::from_lines(fragments)
    }

    /// Rebuilds canonical text from its stored newline-joined form.
    pub fn from_stored(raw: &str) -> Self {
        Self::from_lines(raw.lines())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Display for CanonicalText {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::CanonicalText;

    #[test]
    fn strips_script_and_style_content() {
        let html = r#"
            <html><head>
            <style>body { color: red; }</style>
            <script>var tracked = true;</script>
            </head><body>
            <h1>Openings</h1>
            <p>Software Engineer</p>
            </body></html>
        "#;
        let text = CanonicalText::from_html(html);
        assert_eq!(text.lines(), ["Openings", "Software Engineer"]);
    }

    #[test]
    fn separates_sibling_blocks() {
        let html = "<div>First</div><div>Second</div>";
        let text = CanonicalText::from_html(html);
        assert_eq!(text.lines(), ["First", "Second"]);
    }

    #[test]
    fn trims_and_drops_blank_lines_preserving_order() {
        let html = "<p>  alpha  </p><p>   </p><p>beta</p><p>\n\n</p><p>gamma</p>";
        let text = CanonicalText::from_html(html);
        assert_eq!(text.lines(), ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn tolerates_malformed_markup() {
        let html = "<div><p>unclosed<b>bold<div>later</p>";
        let text = CanonicalText::from_html(html);
        assert!(text.lines().contains(&"unclosed".to_string()));
        assert!(text.lines().contains(&"later".to_string()));
    }

    #[test]
    fn stored_roundtrip_matches() {
        let text = CanonicalText::from_lines(["one", "two", "three"]);
        let restored = CanonicalText::from_stored(&text.to_string());
        assert_eq!(text, restored);
    }

    #[test]
    fn multiline_fragment_splits_into_lines() {
        let text = CanonicalText::from_lines(["a\n  b  \n\nc"]);
        assert_eq!(text.lines(), ["a", "b", "c"]);
    }
}
