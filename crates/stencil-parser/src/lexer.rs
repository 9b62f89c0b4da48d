//! Splits a template source into text runs and markers.
//!
//! Three marker families are recognized: `{{ … }}` interpolations,
//! `{% … %}` statements and `{# … #}` comments. Anything else, including a
//! lone `{` or `}`, is literal text. `{% raw %}` blocks are resolved here so
//! their content never reaches the statement parser.

use crate::ast::Span;
use crate::error::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Text,
    Expression,
    Statement,
    /// Comments and `raw`/`endraw` markers: they produce no node but still
    /// carry whitespace-control flags.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    /// Text content, or the marker body without delimiters and `-` flags.
    pub body: &'a str,
    /// Byte offset of `body` in the source.
    pub body_offset: usize,
    /// The whole text run or marker, delimiters included.
    pub span: Span,
    /// `{{-`: strip whitespace at the end of the preceding text.
    pub trim_before: bool,
    /// `-}}`: strip whitespace at the start of the following text.
    pub trim_after: bool,
}

impl<'a> Token<'a> {
    fn text(source: &'a str, start: usize, end: usize) -> Self {
        Self {
            kind: TokenKind::Text,
            body: &source[start..end],
            body_offset: start,
            span: Span::new(start, end),
            trim_before: false,
            trim_after: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Delimiters {
    kind: TokenKind,
    open: &'static str,
    close: &'static str,
    string_aware: bool,
}

const EXPRESSION: Delimiters = Delimiters {
    kind: TokenKind::Expression,
    open: "{{",
    close: "}}",
    string_aware: true,
};

const STATEMENT: Delimiters = Delimiters {
    kind: TokenKind::Statement,
    open: "{%",
    close: "%}",
    string_aware: true,
};

const COMMENT: Delimiters = Delimiters {
    kind: TokenKind::Silent,
    open: "{#",
    close: "#}",
    string_aware: false,
};

/// Tokenizes `source` and applies whitespace control.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some((open, delims)) = find_marker(source, pos) else {
            tokens.push(Token::text(source, pos, source.len()));
            break;
        };

        if open > pos {
            tokens.push(Token::text(source, pos, open));
        }

        let marker = read_marker(source, open, delims)?;
        pos = marker.span.end;

        if marker.kind == TokenKind::Statement && marker.body.trim() == "raw" {
            pos = read_raw(source, marker, &mut tokens)?;
        } else {
            tokens.push(marker);
        }
    }

    apply_whitespace_control(&mut tokens);
    Ok(tokens)
}

/// Finds the next marker opening at or after `from`.
fn find_marker(source: &str, from: usize) -> Option<(usize, Delimiters)> {
    source[from..].match_indices('{').find_map(|(idx, _)| {
        let at = from + idx;
        match source.as_bytes().get(at + 1) {
            Some(b'{') => Some((at, EXPRESSION)),
            Some(b'%') => Some((at, STATEMENT)),
            Some(b'#') => Some((at, COMMENT)),
            _ => None,
        }
    })
}

/// Reads one marker starting at `open`.
fn read_marker(source: &str, open: usize, delims: Delimiters) -> Result<Token<'_>, SyntaxError> {
    let inner_start = open + delims.open.len();
    let close = find_close(source, inner_start, delims).ok_or_else(|| {
        SyntaxError::at(
            source,
            open,
            format!("unclosed `{}` marker, expected `{}`", delims.open, delims.close),
        )
    })?;

    let mut body_start = inner_start;
    let mut body_end = close;

    let trim_before = source[body_start..body_end].starts_with('-');
    if trim_before {
        body_start += 1;
    }
    let trim_after = body_end > body_start && source[body_start..body_end].ends_with('-');
    if trim_after {
        body_end -= 1;
    }

    Ok(Token {
        kind: delims.kind,
        body: &source[body_start..body_end],
        body_offset: body_start,
        span: Span::new(open, close + delims.close.len()),
        trim_before,
        trim_after,
    })
}

/// Finds the closing delimiter, skipping over quoted strings when the marker
/// holds an expression so that `{{ "}}" }}` closes at the right place.
fn find_close(source: &str, from: usize, delims: Delimiters) -> Option<usize> {
    let bytes = source.as_bytes();
    let close = delims.close.as_bytes();
    let mut i = from;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if delims.string_aware && (b == b'"' || b == b'\'') {
                    quote = Some(b);
                } else if bytes[i..].starts_with(close) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }

    None
}

/// Consumes a `{% raw %}` block whose opening marker is `opener`, pushing the
/// verbatim content as text. Returns the position after `{% endraw %}`.
fn read_raw<'a>(
    source: &'a str,
    opener: Token<'a>,
    tokens: &mut Vec<Token<'a>>,
) -> Result<usize, SyntaxError> {
    let content_start = opener.span.end;
    let opener_start = opener.span.start;
    let mut search = content_start;

    while let Some(idx) = source[search..].find("{%") {
        let open = search + idx;
        let Some(close) = source[open + 2..].find("%}").map(|c| open + 2 + c) else {
            break;
        };
        let inner = &source[open + 2..close];
        let trim_before = inner.starts_with('-');
        let trim_after = inner.len() > usize::from(trim_before) && inner.ends_with('-');
        let name = inner.trim_start_matches('-').trim_end_matches('-').trim();

        if name == "endraw" {
            let closer = Token {
                kind: TokenKind::Silent,
                body: name,
                body_offset: open,
                span: Span::new(open, close + 2),
                trim_before,
                trim_after,
            };
            tokens.push(Token {
                kind: TokenKind::Silent,
                ..opener
            });
            tokens.push(Token::text(source, content_start, open));
            tokens.push(closer);
            return Ok(close + 2);
        }

        search = close + 2;
    }

    Err(SyntaxError::at(
        source,
        opener_start,
        "unclosed `raw` block, expected `endraw`",
    ))
}

fn apply_whitespace_control(tokens: &mut [Token<'_>]) {
    for i in 0..tokens.len() {
        if tokens[i].kind != TokenKind::Text {
            continue;
        }

        if i > 0 && tokens[i - 1].trim_after {
            let trimmed = tokens[i].body.trim_start();
            tokens[i].body_offset += tokens[i].body.len() - trimmed.len();
            tokens[i].body = trimmed;
        }
        if tokens.get(i + 1).is_some_and(|next| next.trim_before) {
            tokens[i].body = tokens[i].body.trim_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_bodies(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.body))
            .collect()
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(
            kinds_and_bodies("hello world"),
            vec![(TokenKind::Text, "hello world")]
        );
    }

    #[test]
    fn all_marker_families() {
        assert_eq!(
            kinds_and_bodies("a{{ x }}b{% if y %}c{# note #}"),
            vec![
                (TokenKind::Text, "a"),
                (TokenKind::Expression, " x "),
                (TokenKind::Text, "b"),
                (TokenKind::Statement, " if y "),
                (TokenKind::Text, "c"),
                (TokenKind::Silent, " note "),
            ]
        );
    }

    #[test]
    fn lone_braces_are_text() {
        assert_eq!(
            kinds_and_bodies("fn() { return }"),
            vec![(TokenKind::Text, "fn() { return }")]
        );
    }

    #[test]
    fn closer_inside_string_is_skipped() {
        assert_eq!(
            kinds_and_bodies(r#"{{ a | default("}}") }}"#),
            vec![(TokenKind::Expression, r#" a | default("}}") "#)]
        );
    }

    #[test]
    fn marker_span_covers_delimiters() {
        let tokens = tokenize("ab{{ x }}").unwrap();
        assert_eq!(tokens[1].span, Span::new(2, 9));
        assert_eq!(tokens[1].body_offset, 4);
    }

    #[test]
    fn unclosed_marker_is_an_error() {
        let err = tokenize("text {{ name").unwrap_err();
        assert!(err.message.contains("unclosed `{{`"));
        assert_eq!(err.location.offset, 5);
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        let err = tokenize("{# forever").unwrap_err();
        assert!(err.message.contains("`#}`"));
    }

    #[test]
    fn trim_flags_strip_neighbouring_whitespace() {
        assert_eq!(
            kinds_and_bodies("a  \n {{- x -}} \n b"),
            vec![
                (TokenKind::Text, "a"),
                (TokenKind::Expression, " x "),
                (TokenKind::Text, "b"),
            ]
        );
    }

    #[test]
    fn trim_after_adjusts_offset() {
        let tokens = tokenize("{{ x -}}   y").unwrap();
        assert_eq!(tokens[1].body, "y");
        assert_eq!(tokens[1].body_offset, 11);
    }

    #[test]
    fn raw_block_becomes_text() {
        assert_eq!(
            kinds_and_bodies("{% raw %}{{ not parsed }}{% endraw %}"),
            vec![
                (TokenKind::Silent, " raw "),
                (TokenKind::Text, "{{ not parsed }}"),
                (TokenKind::Silent, "endraw"),
            ]
        );
    }

    #[test]
    fn raw_block_honours_trim_flags() {
        let tokens = tokenize("{% raw -%}  inner  {%- endraw %}").unwrap();
        assert_eq!(tokens[1].body, "inner");
    }

    #[test]
    fn unclosed_raw_block_is_an_error() {
        let err = tokenize("{% raw %}{{ x }}").unwrap_err();
        assert!(err.message.contains("endraw"));
        assert_eq!(err.location.offset, 0);
    }
}
