//! Styled text fragments used by report paragraphs.
//!
//! Narrative text returned by the language model frequently carries markdown emphasis.  The
//! [`parse_markup`] function turns `**bold**` and `*italic*` markers into [`Span`] values so the
//! document renderers can emit styled runs instead of literal asterisks.  Other markdown is left
//! as plain text.

use std::fmt;

use genpdf::style::{Style, StyledString};

/// A slice of text together with inline style attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    italic: bool,
}

impl Span {
    /// Creates a new span with the provided text and no styles applied.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the raw text contained in this span.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Marks the span as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Marks the span as italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Returns a copy of the span carrying `text` instead of its own text.
    pub(crate) fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: self.bold,
            italic: self.italic,
        }
    }

    fn to_style(&self) -> Style {
        let mut style = Style::new();
        if self.bold {
            style.set_bold();
        }
        if self.italic {
            style.set_italic();
        }
        style
    }

    /// Converts the span into a [`StyledString`] for the PDF renderer.
    pub fn to_styled_string(&self) -> StyledString {
        StyledString::new(self.text.clone(), self.to_style())
    }
}

/// Error produced when emphasis markers are unbalanced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    index: usize,
    message: String,
}

impl ParseError {
    fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }

    /// Byte offset at which parsing failed.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.index)
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy, Debug, Default)]
struct StyleState {
    bold: bool,
    italic: bool,
}

impl StyleState {
    fn to_span(self, text: impl Into<String>) -> Span {
        Span {
            text: text.into(),
            bold: self.bold,
            italic: self.italic,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Marker {
    Bold,
    Italic,
}

impl Marker {
    fn token(self) -> &'static str {
        match self {
            Marker::Bold => "**",
            Marker::Italic => "*",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Marker::Bold => "bold span",
            Marker::Italic => "italic span",
        }
    }
}

/// Parses `**bold**` and `*italic*` emphasis into spans.
///
/// Markers nest (`**bold *both***`).  An unterminated marker is an error.
pub fn parse_markup(input: &str) -> Result<Vec<Span>, ParseError> {
    let (spans, _) = parse_inner(input, 0, StyleState::default(), None)?;
    Ok(spans)
}

/// Like [`parse_markup`], but returns the input as a single plain span when it does not parse.
pub fn parse_markup_lossy(input: &str) -> Vec<Span> {
    parse_markup(input).unwrap_or_else(|_| vec![Span::new(input)])
}

fn parse_inner(
    input: &str,
    mut index: usize,
    state: StyleState,
    closing: Option<Marker>,
) -> Result<(Vec<Span>, usize), ParseError> {
    let mut spans = Vec::new();
    let mut buffer = String::new();

    while index < input.len() {
        let rest = &input[index..];

        if let Some(marker) = closing {
            // Inside italic, `**` opens bold unless bold is already active (`***` closes both).
            let closes = match marker {
                Marker::Bold => rest.starts_with("**"),
                Marker::Italic => {
                    rest.starts_with('*') && (!rest.starts_with("**") || state.bold)
                }
            };
            if closes {
                flush_buffer(&mut buffer, &mut spans, state);
                return Ok((spans, index + marker.token().len()));
            }
        }

        let opened = if opens(rest, Marker::Bold) && !state.bold {
            Some(Marker::Bold)
        } else if opens(rest, Marker::Italic) && !state.italic {
            Some(Marker::Italic)
        } else {
            None
        };

        if let Some(marker) = opened {
            flush_buffer(&mut buffer, &mut spans, state);
            let mut nested = state;
            match marker {
                Marker::Bold => nested.bold = true,
                Marker::Italic => nested.italic = true,
            }
            let (inner, next) =
                parse_inner(input, index + marker.token().len(), nested, Some(marker))?;
            spans.extend(inner);
            index = next;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        buffer.push(ch);
        index += ch.len_utf8();
    }

    if let Some(marker) = closing {
        Err(ParseError::new(
            index,
            format!("unterminated {}", marker.description()),
        ))
    } else {
        flush_buffer(&mut buffer, &mut spans, state);
        Ok((spans, index))
    }
}

/// A marker only opens when text follows it directly, so `* item` stays a list bullet.
fn opens(rest: &str, marker: Marker) -> bool {
    rest.strip_prefix(marker.token())
        .and_then(|after| after.chars().next())
        .is_some_and(|next| !next.is_whitespace() && (marker == Marker::Bold || next != '*'))
}

fn flush_buffer(buffer: &mut String, spans: &mut Vec<Span>, state: StyleState) {
    if buffer.is_empty() {
        return;
    }
    spans.push(state.to_span(std::mem::take(buffer)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_single_span() {
        let text = "Scope covers cradle to grave.";
        assert_eq!(parse_markup(text).unwrap(), vec![Span::new(text)]);
    }

    #[test]
    fn parses_bold_and_italic() {
        let spans = parse_markup("The **functional unit** is *one brush*.").unwrap();
        assert_eq!(
            spans,
            vec![
                Span::new("The "),
                Span::new("functional unit").bold(),
                Span::new(" is "),
                Span::new("one brush").italic(),
                Span::new("."),
            ]
        );
    }

    #[test]
    fn nested_markers_combine_styles() {
        let spans = parse_markup("**bold *both***").unwrap();
        assert_eq!(
            spans,
            vec![Span::new("bold ").bold(), Span::new("both").bold().italic()]
        );
    }

    #[test]
    fn unterminated_marker_is_an_error() {
        let err = parse_markup("*emphasis without end").unwrap_err();
        assert_eq!(err.message(), "unterminated italic span");
        assert_eq!(err.index(), "*emphasis without end".len());
    }

    #[test]
    fn list_bullets_stay_literal() {
        let text = "* Reduce plastic\n* Recycle bristles";
        assert_eq!(parse_markup(text).unwrap(), vec![Span::new(text)]);

        let spans = parse_markup("* Use *recycled* nylon").unwrap();
        assert_eq!(
            spans,
            vec![
                Span::new("* Use "),
                Span::new("recycled").italic(),
                Span::new(" nylon"),
            ]
        );
    }

    #[test]
    fn spaced_asterisks_are_plain_text() {
        let text = "2 * 3 = 6 and ** not bold";
        assert_eq!(parse_markup(text).unwrap(), vec![Span::new(text)]);
    }

    #[test]
    fn lossy_parse_keeps_raw_text() {
        assert_eq!(parse_markup_lossy("**open"), vec![Span::new("**open")]);
    }

    #[test]
    fn styled_string_carries_emphasis() {
        let styled = Span::new("x").bold().to_styled_string();
        assert!(styled.style.is_bold());
        assert!(!styled.style.is_italic());
    }
}
