// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lightweight markup conversion for the Telegram Bot API.
//!
//! Replies are written with `*bold*` and `_italic_` markers. Telegram's
//! HTML parse mode is far less fragile than MarkdownV2 (only `<`, `>` and
//! `&` need escaping), so markers are rewritten into `<b>`/`<i>` tags and
//! everything else is HTML-escaped.

/// Escapes the three characters Telegram HTML treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Converts `*bold*` and `_italic_` markers into Telegram HTML.
///
/// A marker only opens at a word boundary and only when a matching closer
/// exists later on the same line, so identifiers like `add_expense` and
/// stray asterisks pass through untouched.
pub fn to_html(text: &str) -> String {
    let styled = |tag: &str, inner: &str, out: &mut String| {
        out.push_str(&format!("<{tag}>{}</{tag}>", escape_html(inner)));
    };
    render(text, styled, escape_html)
}

/// Drops the markers, leaving the plain text. Used when HTML is rejected.
pub fn to_plain(text: &str) -> String {
    render(text, |_, inner, out| out.push_str(inner), str::to_string)
}

fn render(
    text: &str,
    mut styled: impl FnMut(&str, &str, &mut String),
    plain: impl Fn(&str) -> String,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let tag = match ch {
            '*' => Some("b"),
            '_' => Some("i"),
            _ => None,
        };
        let opens = tag.is_some() && (i == 0 || !chars[i - 1].is_alphanumeric());
        if let (Some(tag), true) = (tag, opens)
            && let Some(close) = find_closer(&chars, i + 1, ch)
        {
            out.push_str(&plain(&literal));
            literal.clear();
            let inner: String = chars[i + 1..close].iter().collect();
            styled(tag, &inner, &mut out);
            i = close + 1;
            continue;
        }
        literal.push(ch);
        i += 1;
    }

    out.push_str(&plain(&literal));
    out
}

fn find_closer(chars: &[char], start: usize, marker: char) -> Option<usize> {
    let mut j = start;
    while j < chars.len() && chars[j] != '\n' {
        if chars[j] == marker {
            let boundary = chars.get(j + 1).is_none_or(|c| !c.is_alphanumeric());
            if j > start && boundary && !chars[j - 1].is_whitespace() {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

/// Splits text into chunks no longer than `max_chars`, preferring line breaks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            // Single oversized line: hard-split on char boundaries.
            let mut piece = String::new();
            for ch in line.chars() {
                if piece.chars().count() == max_chars {
                    chunks.push(std::mem::take(&mut piece));
                }
                piece.push(ch);
            }
            current_len = piece.chars().count();
            current = piece;
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic_become_tags() {
        assert_eq!(
            to_html("Spent *$45.00* on _lunch_"),
            "Spent <b>$45.00</b> on <i>lunch</i>"
        );
    }

    #[test]
    fn html_characters_are_escaped() {
        assert_eq!(to_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(to_html("*<Food>*"), "<b>&lt;Food&gt;</b>");
    }

    #[test]
    fn snake_case_identifiers_are_left_alone() {
        assert_eq!(to_html("add_expense_amount"), "add_expense_amount");
        assert_eq!(to_html("use add_expense or _this_"), "use add_expense or <i>this</i>");
    }

    #[test]
    fn unmatched_markers_stay_literal() {
        assert_eq!(to_html("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(to_html("*open\nclose*"), "*open\nclose*");
    }

    #[test]
    fn markers_do_not_span_lines() {
        assert_eq!(
            to_html("*Food*: $10\n*Rent*: $900"),
            "<b>Food</b>: $10\n<b>Rent</b>: $900"
        );
    }

    #[test]
    fn plain_strips_markers_without_escaping() {
        assert_eq!(to_plain("*Total*: _a & b_"), "Total: a & b");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_message("hello", 4096), vec!["hello"]);
    }

    #[test]
    fn long_text_splits_on_lines() {
        let text = "aaaa\nbbbb\ncccc\n";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cccc\n"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn oversized_line_is_hard_split() {
        let chunks = split_message(&"x".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), "x".repeat(25));
    }
}
