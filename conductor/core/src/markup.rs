//! Inline Markup Lexer
//!
//! Turns message text into typed render segments. The lexer is a pure
//! function: it keeps no state between calls and any surface can render the
//! output however it likes.
//!
//! # Syntax
//!
//! Tried against the unconsumed prefix of each line, first match wins:
//!
//! | Order | Markup                | Segment                    |
//! |-------|-----------------------|----------------------------|
//! | 1     | `[youtube:ID]`        | [`Segment::EmbedDirective`] |
//! | 2     | `![alt](url)`         | [`Segment::Image`]         |
//! | 3     | `**[label](url)**`    | [`Segment::BoldLink`]      |
//! | 4     | `[label](url)`        | [`Segment::Link`]          |
//! | 5     | `**text**`            | [`Segment::Bold`]          |
//! | 6     | `*text*` or `_text_`  | [`Segment::Italic`]        |
//! | 7     | `` `code` ``          | [`Segment::Code`]          |
//!
//! Text up to the next special character becomes a [`Segment::PlainRun`].
//! A special character that starts no pattern is emitted on its own as a
//! one-character run, so every step consumes at least one character.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Characters that can introduce a pattern
const SPECIAL: [char; 5] = ['[', '!', '*', '_', '`'];

/// One render instruction
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Inline video player
    EmbedDirective {
        /// YouTube video ID
        video_id: String,
    },
    /// Inline image
    Image {
        /// Alt text
        alt: String,
        /// Image URL
        url: String,
    },
    /// Emphasized link
    BoldLink {
        /// Link text
        label: String,
        /// Target URL
        url: String,
    },
    /// Link
    Link {
        /// Link text
        label: String,
        /// Target URL
        url: String,
    },
    /// Bold text
    Bold(String),
    /// Italic text
    Italic(String),
    /// Inline code
    Code(String),
    /// Text with no markup
    PlainRun(String),
    /// End of a source line
    LineBreak,
}

type Build = fn(&Captures<'_>) -> Segment;

fn group(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index).map_or_else(String::new, |m| m.as_str().to_string())
}

/// Patterns in precedence order
static PATTERNS: Lazy<Vec<(Regex, Build)>> = Lazy::new(|| {
    let table: [(&str, Build); 8] = [
        (r"^\[youtube:([A-Za-z0-9_-]+)\]", |c| Segment::EmbedDirective {
            video_id: group(c, 1),
        }),
        (r"^!\[([^\]]*)\]\(([^)\s]+)\)", |c| Segment::Image {
            alt: group(c, 1),
            url: group(c, 2),
        }),
        (r"^\*\*\[([^\]]+)\]\(([^)\s]+)\)\*\*", |c| Segment::BoldLink {
            label: group(c, 1),
            url: group(c, 2),
        }),
        (r"^\[([^\]]+)\]\(([^)\s]+)\)", |c| Segment::Link {
            label: group(c, 1),
            url: group(c, 2),
        }),
        (r"^\*\*([^*]+)\*\*", |c| Segment::Bold(group(c, 1))),
        (r"^\*([^*]+)\*", |c| Segment::Italic(group(c, 1))),
        (r"^_([^_]+)_", |c| Segment::Italic(group(c, 1))),
        (r"^`([^`]+)`", |c| Segment::Code(group(c, 1))),
    ];
    // A pattern that fails to compile is left out; its markup renders as plain text
    table
        .into_iter()
        .filter_map(|(pattern, build)| match Regex::new(pattern) {
            Ok(regex) => Some((regex, build)),
            Err(e) => {
                tracing::error!(%pattern, error = %e, "Markup pattern failed to compile");
                None
            }
        })
        .collect()
});

/// Lex `text` into segments
///
/// Lines are separated by [`Segment::LineBreak`]; a trailing newline yields a
/// trailing break.
#[must_use]
pub fn lex(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            segments.push(Segment::LineBreak);
        }
        lex_line(line.strip_suffix('\r').unwrap_or(line), &mut segments);
    }
    segments
}

fn lex_line(line: &str, out: &mut Vec<Segment>) {
    let mut rest = line;
    while !rest.is_empty() {
        if let Some((segment, len)) = match_pattern(rest) {
            out.push(segment);
            rest = &rest[len..];
            continue;
        }

        let len = match rest.find(SPECIAL) {
            Some(0) => rest.chars().next().map_or(1, char::len_utf8),
            Some(next) => next,
            None => rest.len(),
        };
        out.push(Segment::PlainRun(rest[..len].to_string()));
        rest = &rest[len..];
    }
}

fn match_pattern(rest: &str) -> Option<(Segment, usize)> {
    if !rest.starts_with(SPECIAL) {
        return None;
    }
    PATTERNS.iter().find_map(|(regex, build)| {
        let caps = regex.captures(rest)?;
        let len = caps.get(0)?.end();
        Some((build(&caps), len))
    })
}

/// Flatten segments for surfaces without rich text
///
/// Links render as `label (url)`, images as `[image: alt]`, embeds as
/// `[video: id]`.
#[must_use]
pub fn to_plain_text(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::EmbedDirective { video_id } => {
                out.push_str("[video: ");
                out.push_str(video_id);
                out.push(']');
            }
            Segment::Image { alt, .. } => {
                out.push_str("[image: ");
                out.push_str(alt);
                out.push(']');
            }
            Segment::BoldLink { label, url } | Segment::Link { label, url } => {
                out.push_str(label);
                out.push_str(" (");
                out.push_str(url);
                out.push(')');
            }
            Segment::Bold(text)
            | Segment::Italic(text)
            | Segment::Code(text)
            | Segment::PlainRun(text) => out.push_str(text),
            Segment::LineBreak => out.push('\n'),
        }
    }
    out
}
