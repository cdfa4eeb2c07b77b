//! The parser's universal output shape.

use serde::{Deserialize, Serialize};

use super::attachment::Attachment;

/// Separator inserted between sibling text parts when merging.
pub const TEXT_SEPARATOR: &str = "\n---\n";
/// Separator inserted between sibling HTML parts when merging.
pub const HTML_SEPARATOR: &str = "<hr>";

/// Decoded content of a message (or of one subtree of its MIME structure).
///
/// Every recursion level of the parser produces one of these as an immutable
/// value and merges it upward, rather than mutating a shared accumulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailContent {
    /// Joined `text/plain` parts.
    pub text: String,

    /// Joined `text/html` parts.
    pub html: String,

    /// Attachments collected across the whole subtree.
    pub attachments: Vec<Attachment>,
}

impl MailContent {
    /// `true` when nothing at all was extracted. Gates the fallback parser.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.html.is_empty() && self.attachments.is_empty()
    }

    /// Merge a child result into this one: text joined with `"\n---\n"`,
    /// HTML with `"<hr>"`, attachments appended.
    pub fn merge(&mut self, child: MailContent) {
        self.push_text(&child.text);
        self.push_html(&child.html);
        self.attachments.extend(child.attachments);
    }

    /// Append a text fragment, inserting the separator when both sides are
    /// non-empty.
    pub fn push_text(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push_str(TEXT_SEPARATOR);
        }
        self.text.push_str(fragment);
    }

    /// Append an HTML fragment, inserting the separator when both sides are
    /// non-empty.
    pub fn push_html(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.html.is_empty() {
            self.html.push_str(HTML_SEPARATOR);
        }
        self.html.push_str(fragment);
    }

    /// Post-process both bodies: normalize `\r\n` and bare `\r` to `\n`,
    /// collapse runs of 3+ newlines down to 2, and trim.
    pub fn normalize(&mut self) {
        self.text = normalize_body(&self.text);
        self.html = normalize_body(&self.html);
    }
}

fn normalize_body(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");

    let mut collapsed = String::with_capacity(unified.len());
    let mut newline_run = 0usize;
    for ch in unified.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                collapsed.push(ch);
            }
        } else {
            newline_run = 0;
            collapsed.push(ch);
        }
    }

    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_joins_with_separators() {
        let mut parent = MailContent {
            text: "first".to_string(),
            html: "<p>one</p>".to_string(),
            ..Default::default()
        };
        parent.merge(MailContent {
            text: "second".to_string(),
            html: "<p>two</p>".to_string(),
            ..Default::default()
        });
        assert_eq!(parent.text, "first\n---\nsecond");
        assert_eq!(parent.html, "<p>one</p><hr><p>two</p>");
    }

    #[test]
    fn test_merge_empty_child_adds_no_separator() {
        let mut parent = MailContent {
            text: "only".to_string(),
            ..Default::default()
        };
        parent.merge(MailContent::default());
        assert_eq!(parent.text, "only");
        assert_eq!(parent.html, "");
    }

    #[test]
    fn test_merge_into_empty_parent_adds_no_separator() {
        let mut parent = MailContent::default();
        parent.merge(MailContent {
            text: "child".to_string(),
            ..Default::default()
        });
        assert_eq!(parent.text, "child");
    }

    #[test]
    fn test_is_empty() {
        assert!(MailContent::default().is_empty());
        let with_text = MailContent {
            text: "x".to_string(),
            ..Default::default()
        };
        assert!(!with_text.is_empty());
    }

    #[test]
    fn test_normalize_line_endings_and_runs() {
        let mut content = MailContent {
            text: "a\r\nb\r\r\n\n\n\nc\n".to_string(),
            ..Default::default()
        };
        content.normalize();
        assert_eq!(content.text, "a\nb\n\nc");
    }
}
