//! Inline `**bold**` parsing for partially revealed text.

/// A run of text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Visible text, markers removed.
    pub text: &'a str,
    /// Whether the run is bold.
    pub bold: bool,
}

const MARKER: &str = "**";

/// Split `text` into plain and bold segments.
///
/// Only closed `**…**` pairs become bold. An opening marker whose partner has
/// not been revealed yet stays literal, so a streaming bold phrase shows its
/// asterisks until the closing pair arrives.
#[must_use]
pub fn parse_inline(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(MARKER) {
        let after_open = &rest[open.saturating_add(MARKER.len())..];
        let Some(close) = after_open.find(MARKER) else {
            break;
        };
        push(&mut segments, &rest[..open], false);
        push(&mut segments, &after_open[..close], true);
        rest = &after_open[close.saturating_add(MARKER.len())..];
    }
    push(&mut segments, rest, false);
    segments
}

fn push<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str, bold: bool) {
    if !text.is_empty() {
        segments.push(Segment { text, bold });
    }
}

/// `text` with every closed marker pair removed.
#[must_use]
pub fn plain_text(text: &str) -> String {
    parse_inline(text).into_iter().map(|s| s.text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, bold: bool) -> Segment<'_> {
        Segment { text, bold }
    }

    #[test]
    fn test_plain_text_is_one_segment() {
        assert_eq!(parse_inline("revenue up"), vec![seg("revenue up", false)]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_closed_pairs_become_bold() {
        assert_eq!(
            parse_inline("East is **+18%** vs **plan**."),
            vec![
                seg("East is ", false),
                seg("+18%", true),
                seg(" vs ", false),
                seg("plan", true),
                seg(".", false),
            ]
        );
    }

    #[test]
    fn test_unclosed_marker_stays_literal() {
        assert_eq!(
            parse_inline("Growth **strong"),
            vec![seg("Growth **strong", false)]
        );
        assert_eq!(parse_inline("a *"), vec![seg("a *", false)]);
    }

    #[test]
    fn test_every_prefix_parses() {
        let full = "**Q3** closed at **¥4.2M**";
        let mut end: usize = 0;
        for c in full.chars() {
            end = end.saturating_add(c.len_utf8());
            let _ = parse_inline(&full[..end]);
        }
        assert_eq!(plain_text(full), "Q3 closed at ¥4.2M");
    }
}
