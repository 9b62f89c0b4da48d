//! Expression lexing and recursive-descent parsing.
//!
//! Expressions appear inside `{{ … }}` and in `if`/`elif`/`for` tags. The
//! grammar is deliberately small: paths, literals, the `default` filter,
//! `not`/`and`/`or`, equality, and parentheses.

use crate::ast::{CompareOp, Expr, ExprKind, Literal, Path, Segment, Span};
use crate::error::{ParseError, Result};

/// Words that can never start a path.
const RESERVED: &[&str] = &["and", "or", "not", "in", "is", "if", "else"];

#[derive(Debug, Clone, PartialEq)]
enum Tok<'a> {
    Ident(&'a str),
    Int(i64),
    Float(f64),
    Str(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Pipe,
    EqEq,
    NotEq,
}

impl Tok<'_> {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("`{}`", name),
            Tok::Int(n) => format!("`{}`", n),
            Tok::Float(n) => format!("`{}`", n),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Dot => "`.`".to_string(),
            Tok::LBracket => "`[`".to_string(),
            Tok::RBracket => "`]`".to_string(),
            Tok::LParen => "`(`".to_string(),
            Tok::RParen => "`)`".to_string(),
            Tok::Comma => "`,`".to_string(),
            Tok::Pipe => "`|`".to_string(),
            Tok::EqEq => "`==`".to_string(),
            Tok::NotEq => "`!=`".to_string(),
        }
    }

    /// Whether a `-` following this token is a binary minus rather than the
    /// sign of a number.
    fn ends_operand(&self) -> bool {
        match self {
            Tok::Ident(name) => !RESERVED.contains(name),
            Tok::Int(_) | Tok::Float(_) | Tok::Str(_) | Tok::RBracket | Tok::RParen => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Lexeme<'a> {
    tok: Tok<'a>,
    span: Span,
}

fn lex(source: &str, start: usize, end: usize) -> Result<Vec<Lexeme<'_>>> {
    let mut out: Vec<Lexeme<'_>> = Vec::new();
    let mut i = start;

    while i < end {
        let Some(c) = source[i..end].chars().next() else {
            break;
        };

        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }

        let tok_start = i;
        let after_dot = matches!(out.last(), Some(Lexeme { tok: Tok::Dot, .. }));
        let negative = c == '-'
            && source[i + 1..end].starts_with(|d: char| d.is_ascii_digit())
            && !out.last().is_some_and(|l| l.tok.ends_operand());

        let tok = if c.is_ascii_alphabetic() || c == '_' {
            i = scan_while(source, i, end, |ch| ch.is_ascii_alphanumeric() || ch == '_');
            Tok::Ident(&source[tok_start..i])
        } else if c.is_ascii_digit() || negative {
            if negative {
                i += 1;
            }
            i = scan_while(source, i, end, |ch| ch.is_ascii_digit());
            let fractional = !after_dot
                && source[i..end].starts_with('.')
                && source[i + 1..end].starts_with(|d: char| d.is_ascii_digit());
            if fractional {
                i = scan_while(source, i + 1, end, |ch| ch.is_ascii_digit());
                let text = &source[tok_start..i];
                let value = text.parse::<f64>().map_err(|_| {
                    ParseError::syntax(source, tok_start, format!("invalid number `{}`", text))
                })?;
                Tok::Float(value)
            } else {
                let text = &source[tok_start..i];
                let value = text.parse::<i64>().map_err(|_| {
                    ParseError::syntax(
                        source,
                        tok_start,
                        format!("integer literal `{}` is out of range", text),
                    )
                })?;
                Tok::Int(value)
            }
        } else if c == '"' || c == '\'' {
            let (value, next) = scan_string(source, i, end, c)?;
            i = next;
            Tok::Str(value)
        } else {
            let two = &source[i..end.min(i + 2)];
            let (tok, len) = match c {
                '.' => (Tok::Dot, 1),
                '[' => (Tok::LBracket, 1),
                ']' => (Tok::RBracket, 1),
                '(' => (Tok::LParen, 1),
                ')' => (Tok::RParen, 1),
                ',' => (Tok::Comma, 1),
                '|' => (Tok::Pipe, 1),
                '=' if two == "==" => (Tok::EqEq, 2),
                '!' if two == "!=" => (Tok::NotEq, 2),
                other => {
                    return Err(ParseError::syntax(
                        source,
                        i,
                        format!("unexpected character `{}` in expression", other),
                    ))
                }
            };
            i += len;
            tok
        };

        out.push(Lexeme {
            tok,
            span: Span::new(tok_start, i),
        });
    }

    Ok(out)
}

fn scan_while(source: &str, from: usize, end: usize, pred: impl Fn(char) -> bool) -> usize {
    source[from..end]
        .char_indices()
        .find(|(_, ch)| !pred(*ch))
        .map_or(end, |(idx, _)| from + idx)
}

/// Reads a quoted string starting at the opening quote. Returns the unescaped
/// value and the position after the closing quote.
fn scan_string(source: &str, start: usize, end: usize, quote: char) -> Result<(String, usize)> {
    let mut value = String::new();
    let mut chars = source[start + 1..end].char_indices();

    while let Some((idx, ch)) = chars.next() {
        if ch == quote {
            return Ok((value, start + 1 + idx + ch.len_utf8()));
        }
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => value.push('\n'),
            Some((_, 't')) => value.push('\t'),
            Some((_, 'r')) => value.push('\r'),
            Some((_, escaped @ ('\\' | '\'' | '"'))) => value.push(escaped),
            Some((_, other)) => {
                value.push('\\');
                value.push(other);
            }
            None => break,
        }
    }

    Err(ParseError::syntax(source, start, "unterminated string literal"))
}

/// Parser over the lexemes of one marker body.
pub(crate) struct ExprParser<'a> {
    source: &'a str,
    toks: Vec<Lexeme<'a>>,
    pos: usize,
    /// Offset reported for errors at the end of the body.
    end: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> ExprParser<'a> {
    /// Lexes `source[start..end]`.
    pub(crate) fn new(source: &'a str, start: usize, end: usize, max_depth: usize) -> Result<Self> {
        Ok(Self {
            source,
            toks: lex(source, start, end)?,
            pos: 0,
            end,
            depth: 0,
            max_depth,
        })
    }

    /// Consumes a leading identifier, returning it with its span.
    pub(crate) fn ident(&mut self) -> Option<(&'a str, Span)> {
        match self.toks.get(self.pos) {
            Some(Lexeme {
                tok: Tok::Ident(name),
                span,
            }) => {
                let found = (*name, *span);
                self.pos += 1;
                Some(found)
            }
            _ => None,
        }
    }

    /// Consumes an identifier that is usable as a variable name.
    pub(crate) fn expect_name(&mut self, what: &str) -> Result<(&'a str, Span)> {
        match self.peek() {
            Some(Tok::Ident(name)) if !RESERVED.contains(name) => {}
            _ => {
                return Err(self.error_at(
                    self.offset(),
                    format!("expected {}, found {}", what, self.found()),
                ))
            }
        }
        self.ident()
            .ok_or_else(|| self.error_at(self.end, format!("expected {}", what)))
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.at_word(keyword) {
            self.pos += 1;
            return Ok(());
        }
        Err(self.error_at(
            self.offset(),
            format!("expected `{}`, found {}", keyword, self.found()),
        ))
    }

    /// Parses a full expression.
    pub(crate) fn expression(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    /// Fails unless every lexeme has been consumed.
    pub(crate) fn finish(&self) -> Result<()> {
        match self.toks.get(self.pos) {
            None => Ok(()),
            Some(lexeme) => Err(self.error_at(
                lexeme.span.start,
                format!("unexpected {} after expression", lexeme.tok.describe()),
            )),
        }
    }

    fn peek(&self) -> Option<&Tok<'a>> {
        self.toks.get(self.pos).map(|l| &l.tok)
    }

    fn bump(&mut self) -> Option<Lexeme<'a>> {
        let lexeme = self.toks.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn eat(&mut self, tok: &Tok<'_>) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(name)) if *name == word)
    }

    fn offset(&self) -> usize {
        self.toks.get(self.pos).map_or(self.end, |l| l.span.start)
    }

    fn found(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_string(), Tok::describe)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.source, offset, message)
    }

    fn expect(&mut self, tok: &Tok<'_>) -> Result<Span> {
        match self.toks.get(self.pos) {
            Some(lexeme) if &lexeme.tok == tok => {
                let span = lexeme.span;
                self.pos += 1;
                Ok(span)
            }
            _ => Err(self.error_at(
                self.offset(),
                format!("expected {}, found {}", tok.describe(), self.found()),
            )),
        }
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::too_deep(self.source, self.offset(), self.max_depth));
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    // Each fold of a chain adds a level to the left-deep tree, so it is
    // charged against the depth bound like a nested group.
    fn parse_or(&mut self) -> Result<Expr> {
        self.descend()?;
        let mut levels = 1;
        let mut left = self.parse_and()?;
        while self.at_word("or") {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let right = self.parse_and()?;
            let span = left.span.to(right.span);
            left = Expr::new(ExprKind::Or(Box::new(left), Box::new(right)), span);
        }
        self.ascend(levels);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut levels = 0;
        let mut left = self.parse_not()?;
        while self.at_word("and") {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let right = self.parse_not()?;
            let span = left.span.to(right.span);
            left = Expr::new(ExprKind::And(Box::new(left), Box::new(right)), span);
        }
        self.ascend(levels);
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if !self.at_word("not") {
            return self.parse_compare();
        }
        let start = self.offset();
        self.pos += 1;
        self.descend()?;
        let inner = self.parse_not()?;
        self.ascend(1);
        let span = Span::new(start, inner.span.end);
        Ok(Expr::new(ExprKind::Not(Box::new(inner)), span))
    }

    fn parse_compare(&mut self) -> Result<Expr> {
        let left = self.parse_filtered()?;
        let op = match self.peek() {
            Some(Tok::EqEq) => CompareOp::Eq,
            Some(Tok::NotEq) => CompareOp::Ne,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_filtered()?;
        let span = left.span.to(right.span);
        Ok(Expr::new(
            ExprKind::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_filtered(&mut self) -> Result<Expr> {
        let mut levels = 0;
        let mut expr = self.parse_primary()?;

        while self.eat(&Tok::Pipe) {
            let offset = self.offset();
            self.descend()?;
            levels += 1;
            let Some((name, name_span)) = self.ident() else {
                return Err(self.error_at(
                    offset,
                    format!("expected a filter name, found {}", self.found()),
                ));
            };
            if name != "default" && name != "d" {
                return Err(self.error_at(offset, format!("unknown filter `{}`", name)));
            }

            let mut end = name_span.end;
            let mut fallback = Expr::new(ExprKind::Literal(Literal::String(String::new())), name_span);
            let mut on_falsy = false;

            if self.eat(&Tok::LParen) {
                if !matches!(self.peek(), Some(Tok::RParen)) {
                    fallback = self.parse_or()?;
                    if self.eat(&Tok::Comma) {
                        let flag_offset = self.offset();
                        let flag = self.parse_or()?;
                        on_falsy = match flag.kind {
                            ExprKind::Literal(Literal::Bool(b)) => b,
                            _ => {
                                return Err(self.error_at(
                                    flag_offset,
                                    "the second argument of `default` must be `true` or `false`",
                                ))
                            }
                        };
                    }
                }
                end = self.expect(&Tok::RParen)?.end;
            }

            let span = Span::new(expr.span.start, end);
            expr = Expr::new(
                ExprKind::Default {
                    value: Box::new(expr),
                    fallback: Box::new(fallback),
                    on_falsy,
                },
                span,
            );
        }

        self.ascend(levels);
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let offset = self.offset();
        let Some(lexeme) = self.bump() else {
            return Err(self.error_at(offset, "expected an expression, found end of expression"));
        };

        let literal = match lexeme.tok {
            Tok::Int(n) => Literal::Int(n),
            Tok::Float(n) => Literal::Float(n),
            Tok::Str(s) => Literal::String(s),
            Tok::Ident("true" | "True") => Literal::Bool(true),
            Tok::Ident("false" | "False") => Literal::Bool(false),
            Tok::Ident("none" | "None" | "null") => Literal::Null,
            Tok::Ident(name) if !RESERVED.contains(&name) => {
                return self.parse_path(name, lexeme.span);
            }
            Tok::LParen => {
                let inner = self.parse_or()?;
                let close = self.expect(&Tok::RParen)?;
                return Ok(Expr::new(inner.kind, Span::new(lexeme.span.start, close.end)));
            }
            other => {
                return Err(self.error_at(
                    offset,
                    format!("expected an expression, found {}", other.describe()),
                ))
            }
        };

        Ok(Expr::new(ExprKind::Literal(literal), lexeme.span))
    }

    fn parse_path(&mut self, root: &str, root_span: Span) -> Result<Expr> {
        let mut segments = Vec::new();
        let mut end = root_span.end;

        loop {
            if self.eat(&Tok::Dot) {
                let offset = self.offset();
                let segment = match self.peek() {
                    Some(Tok::Ident(name)) => Segment::Key(name.to_string()),
                    Some(Tok::Int(n)) => Segment::Index(self.index(*n, offset)?),
                    _ => {
                        return Err(self.error_at(
                            offset,
                            format!("expected an attribute name after `.`, found {}", self.found()),
                        ))
                    }
                };
                segments.push(segment);
                end = self.bump().map_or(end, |l| l.span.end);
            } else if self.eat(&Tok::LBracket) {
                let offset = self.offset();
                let segment = match self.peek() {
                    Some(Tok::Int(n)) => Segment::Index(self.index(*n, offset)?),
                    Some(Tok::Str(key)) => Segment::Key(key.clone()),
                    _ => {
                        return Err(self.error_at(
                            offset,
                            format!("expected an index or key inside `[]`, found {}", self.found()),
                        ))
                    }
                };
                segments.push(segment);
                self.pos += 1;
                end = self.expect(&Tok::RBracket)?.end;
            } else {
                break;
            }
        }

        Ok(Expr::new(
            ExprKind::Path(Path {
                root: root.to_string(),
                segments,
            }),
            Span::new(root_span.start, end),
        ))
    }

    fn index(&self, n: i64, offset: usize) -> Result<usize> {
        usize::try_from(n)
            .map_err(|_| self.error_at(offset, "negative indices are not supported"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<Expr> {
        let mut parser = ExprParser::new(src, 0, src.len(), 16)?;
        let expr = parser.expression()?;
        parser.finish()?;
        Ok(expr)
    }

    fn path(root: &str, segments: Vec<Segment>) -> ExprKind {
        ExprKind::Path(Path {
            root: root.to_string(),
            segments,
        })
    }

    fn message(src: &str) -> String {
        parse(src).unwrap_err().to_string()
    }

    #[test]
    fn simple_variable() {
        assert_eq!(parse("name").unwrap().kind, path("name", vec![]));
    }

    #[test]
    fn dotted_and_indexed_access() {
        let expr = parse(r#"user.items.0["first name"][2]"#).unwrap();
        assert_eq!(
            expr.kind,
            path(
                "user",
                vec![
                    Segment::Key("items".into()),
                    Segment::Index(0),
                    Segment::Key("first name".into()),
                    Segment::Index(2),
                ]
            )
        );
    }

    #[test]
    fn chained_numeric_segments_are_not_floats() {
        let expr = parse("grid.1.2").unwrap();
        assert_eq!(
            expr.kind,
            path("grid", vec![Segment::Index(1), Segment::Index(2)])
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse("42").unwrap().kind, ExprKind::Literal(Literal::Int(42)));
        assert_eq!(parse("-7").unwrap().kind, ExprKind::Literal(Literal::Int(-7)));
        assert_eq!(parse("1.5").unwrap().kind, ExprKind::Literal(Literal::Float(1.5)));
        assert_eq!(parse("True").unwrap().kind, ExprKind::Literal(Literal::Bool(true)));
        assert_eq!(parse("none").unwrap().kind, ExprKind::Literal(Literal::Null));
        assert_eq!(
            parse(r#"'it\'s\n'"#).unwrap().kind,
            ExprKind::Literal(Literal::String("it's\n".into()))
        );
    }

    #[test]
    fn default_filter_with_literal() {
        let expr = parse("name | default('Guest')").unwrap();
        let fallback = expr.fallback().unwrap();
        assert_eq!(fallback.kind, ExprKind::Literal(Literal::String("Guest".into())));
        assert_eq!(expr.root_variable(), Some("name"));
        assert_eq!(expr.span, Span::new(0, 23));
    }

    #[test]
    fn default_filter_alias_and_flag() {
        let expr = parse("title | d('x', true)").unwrap();
        assert!(matches!(expr.kind, ExprKind::Default { on_falsy: true, .. }));
    }

    #[test]
    fn default_without_arguments_falls_back_to_empty() {
        let expr = parse("name | default").unwrap();
        assert_eq!(
            expr.fallback().unwrap().kind,
            ExprKind::Literal(Literal::String(String::new()))
        );
    }

    #[test]
    fn boolean_operators_precedence() {
        let expr = parse("a or not b and c").unwrap();
        let ExprKind::Or(left, right) = expr.kind else {
            panic!("expected or");
        };
        assert_eq!(left.kind, path("a", vec![]));
        assert!(matches!(right.kind, ExprKind::And(..)));
    }

    #[test]
    fn comparison_and_grouping() {
        let expr = parse("(status == 'ok') != false").unwrap();
        assert!(matches!(
            expr.kind,
            ExprKind::Compare {
                op: CompareOp::Ne,
                ..
            }
        ));
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert!(message("name | upper").contains("unknown filter `upper`"));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(message("a b").contains("unexpected `b` after expression"));
    }

    #[test]
    fn unterminated_string() {
        assert!(message("'abc").contains("unterminated string literal"));
    }

    #[test]
    fn reserved_word_is_not_a_variable() {
        assert!(message("and").contains("expected an expression, found `and`"));
    }

    #[test]
    fn stray_character() {
        assert!(message("a = b").contains("unexpected character `=`"));
    }

    #[test]
    fn non_boolean_default_flag() {
        assert!(message("a | default(1, 2)").contains("must be `true` or `false`"));
    }

    #[test]
    fn nesting_is_bounded() {
        let src = format!("{}x{}", "(".repeat(40), ")".repeat(40));
        let err = parse(&src).unwrap_err();
        assert!(matches!(err, ParseError::DepthExceeded { max_depth: 16, .. }));
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        for op in [" or ", " and "] {
            let src = vec!["a"; 20_000].join(op);
            let err = parse(&src).unwrap_err();
            assert!(matches!(err, ParseError::DepthExceeded { max_depth: 16, .. }));
        }
    }

    #[test]
    fn long_filter_chain_is_bounded() {
        let src = format!("a{}", "|d".repeat(30_000));
        let err = parse(&src).unwrap_err();
        assert!(matches!(err, ParseError::DepthExceeded { max_depth: 16, .. }));
    }

    #[test]
    fn short_chains_fit_the_bound() {
        assert!(parse(&vec!["a"; 10].join(" or ")).is_ok());
        assert!(parse(&vec!["a"; 10].join(" and ")).is_ok());
        assert!(parse(&format!("a{}", "|d".repeat(10))).is_ok());
    }

    #[test]
    fn error_offsets_are_absolute() {
        let src = "{{ a | nope }}";
        let mut parser = ExprParser::new(src, 2, 12, 16).unwrap();
        let err = parser.expression().unwrap_err();
        assert_eq!(err.location().offset, 7);
    }
}
