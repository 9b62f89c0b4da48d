//! Assembles the node tree from lexer tokens.
//!
//! Blocks are parsed by recursive descent over the token stream. Each block
//! parser asks [`Parser::parse_body`] for nodes until one of its closing tags
//! shows up, so an unbalanced template surfaces either as an unexpected tag
//! inside some body or as a body that runs off the end of the input.

use crate::ast::{Conditional, Expr, Loop, Node, Span};
use crate::error::{ParseError, Result};
use crate::expr::ExprParser;
use crate::lexer::{self, Token, TokenKind};

const KNOWN_TAGS: &[&str] = &["if", "elif", "else", "endif", "for", "endfor", "endraw"];
const IF_CLOSERS: &[&str] = &["elif", "else", "endif"];
const FOR_CLOSERS: &[&str] = &["else", "endfor"];

#[derive(Debug)]
enum Tag {
    If(Expr),
    Elif(Expr),
    Else,
    EndIf,
    For { variable: String, iterable: Expr },
    EndFor,
}

impl Tag {
    fn name(&self) -> &'static str {
        match self {
            Tag::If(_) => "if",
            Tag::Elif(_) => "elif",
            Tag::Else => "else",
            Tag::EndIf => "endif",
            Tag::For { .. } => "for",
            Tag::EndFor => "endfor",
        }
    }
}

/// A parsed `{% … %}` marker.
#[derive(Debug)]
struct Marker {
    tag: Tag,
    span: Span,
}

pub(crate) fn parse_nodes(source: &str, max_depth: usize) -> Result<Vec<Node>> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let (nodes, _) = parser.parse_body(&[])?;
    Ok(nodes)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    /// Collects nodes until a tag listed in `closers` or the end of input.
    ///
    /// Any other non-opening tag is an error.
    fn parse_body(&mut self, closers: &[&str]) -> Result<(Vec<Node>, Option<Marker>)> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            self.pos += 1;
            match token.kind {
                TokenKind::Text => push_text(&mut nodes, token.body),
                TokenKind::Silent => {}
                TokenKind::Expression => nodes.push(Node::Interpolation(self.interpolation(&token)?)),
                TokenKind::Statement => {
                    let marker = self.statement(&token)?;
                    match marker.tag {
                        Tag::If(condition) => nodes.push(self.parse_if(condition, marker.span)?),
                        Tag::For { variable, iterable } => {
                            nodes.push(self.parse_for(variable, iterable, marker.span)?)
                        }
                        tag if closers.contains(&tag.name()) => {
                            return Ok((
                                nodes,
                                Some(Marker {
                                    tag,
                                    span: marker.span,
                                }),
                            ))
                        }
                        tag => return Err(self.unexpected(tag.name(), marker.span, closers)),
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    /// Parses a branch of the block opened at `opener`, failing if the input
    /// ends before one of `closers`.
    fn parse_branch(
        &mut self,
        block: &str,
        closers: &[&str],
        opener: Span,
    ) -> Result<(Vec<Node>, Marker)> {
        let (nodes, closer) = self.parse_body(closers)?;
        let closer = closer.ok_or_else(|| {
            ParseError::syntax(
                self.source,
                opener.start,
                format!("unclosed `{}` block, expected `end{}`", block, block),
            )
        })?;
        Ok((nodes, closer))
    }

    fn parse_if(&mut self, condition: Expr, span: Span) -> Result<Node> {
        self.enter(span)?;

        let (then_branch, mut closer) = self.parse_branch("if", IF_CLOSERS, span)?;
        let mut elifs = Vec::new();
        let mut else_branch = None;

        loop {
            match closer.tag {
                Tag::Elif(elif_condition) => {
                    let (body, next) = self.parse_branch("if", IF_CLOSERS, span)?;
                    elifs.push((elif_condition, closer.span, body));
                    closer = next;
                }
                Tag::Else => {
                    let (body, _) = self.parse_branch("if", &["endif"], span)?;
                    else_branch = Some(body);
                    break;
                }
                _ => break,
            }
        }

        self.leave();

        for (condition, span, then_branch) in elifs.into_iter().rev() {
            else_branch = Some(vec![Node::Conditional(Conditional {
                condition,
                then_branch,
                else_branch,
                span,
            })]);
        }

        Ok(Node::Conditional(Conditional {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    fn parse_for(&mut self, variable: String, iterable: Expr, span: Span) -> Result<Node> {
        self.enter(span)?;

        let (body, closer) = self.parse_branch("for", FOR_CLOSERS, span)?;
        let else_branch = match closer.tag {
            Tag::Else => Some(self.parse_branch("for", &["endfor"], span)?.0),
            _ => None,
        };

        self.leave();

        Ok(Node::Loop(Loop {
            variable,
            iterable,
            body,
            else_branch,
            span,
        }))
    }

    fn enter(&mut self, span: Span) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::too_deep(self.source, span.start, self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn interpolation(&self, token: &Token<'a>) -> Result<Expr> {
        if token.body.trim().is_empty() {
            return Err(ParseError::syntax(self.source, token.span.start, "empty expression"));
        }
        let end = token.body_offset + token.body.len();
        let mut parser = ExprParser::new(self.source, token.body_offset, end, self.max_depth)?;
        let expr = parser.expression()?;
        parser.finish()?;
        Ok(expr)
    }

    fn statement(&self, token: &Token<'a>) -> Result<Marker> {
        let body = token.body.trim_start();
        let name_start = token.body_offset + (token.body.len() - body.len());
        let name_len = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        let name = &body[..name_len];

        if body.trim().is_empty() {
            return Err(ParseError::syntax(self.source, token.span.start, "empty block tag"));
        }
        if name.is_empty() {
            return Err(ParseError::syntax(
                self.source,
                name_start,
                "expected a block tag name",
            ));
        }
        if !KNOWN_TAGS.contains(&name) {
            return Err(ParseError::syntax(
                self.source,
                token.span.start,
                format!("unknown block tag `{}`", name),
            ));
        }
        if name == "endraw" {
            return Err(self.unexpected(name, token.span, &[]));
        }

        let end = token.body_offset + token.body.len();
        let mut args = ExprParser::new(self.source, name_start + name_len, end, self.max_depth)?;

        let tag = match name {
            "if" => Tag::If(args.expression()?),
            "elif" => Tag::Elif(args.expression()?),
            "else" => Tag::Else,
            "endif" => Tag::EndIf,
            "for" => {
                let (variable, _) = args.expect_name("a loop variable")?;
                args.expect_keyword("in")?;
                Tag::For {
                    variable: variable.to_string(),
                    iterable: args.expression()?,
                }
            }
            _ => Tag::EndFor,
        };
        args.finish()?;

        Ok(Marker {
            tag,
            span: token.span,
        })
    }

    fn unexpected(&self, name: &str, span: Span, closers: &[&str]) -> ParseError {
        let message = match closers.last() {
            Some(expected) => format!("unexpected `{}` tag, expected `{}`", name, expected),
            None => format!("unexpected `{}` tag", name),
        };
        ParseError::syntax(self.source, span.start, message)
    }
}

/// Appends text, merging with a preceding text node.
fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Literal, Path};

    fn parse(source: &str) -> Result<Vec<Node>> {
        parse_nodes(source, 64)
    }

    fn error(source: &str) -> String {
        parse(source).unwrap_err().to_string()
    }

    fn var(name: &str) -> ExprKind {
        ExprKind::Path(Path {
            root: name.to_string(),
            segments: Vec::new(),
        })
    }

    mod structure {
        use super::*;

        #[test]
        fn text_only() {
            assert_eq!(parse("plain").unwrap(), vec![Node::Text("plain".into())]);
        }

        #[test]
        fn empty_source_has_no_nodes() {
            assert!(parse("").unwrap().is_empty());
        }

        #[test]
        fn comments_vanish_and_text_merges() {
            assert_eq!(
                parse("a{# gone #}b").unwrap(),
                vec![Node::Text("ab".into())]
            );
        }

        #[test]
        fn raw_content_is_text() {
            assert_eq!(
                parse("x{% raw %}{% if %}{% endraw %}y").unwrap(),
                vec![Node::Text("x{% if %}y".into())]
            );
        }

        #[test]
        fn interpolation() {
            let nodes = parse("Hi {{ name }}!").unwrap();
            assert_eq!(nodes.len(), 3);
            let Node::Interpolation(expr) = &nodes[1] else {
                panic!("expected interpolation");
            };
            assert_eq!(expr.kind, var("name"));
            assert_eq!(expr.span, Span::new(6, 10));
        }

        #[test]
        fn conditional_with_else() {
            let nodes = parse("{% if a %}yes{% else %}no{% endif %}").unwrap();
            let [Node::Conditional(cond)] = nodes.as_slice() else {
                panic!("expected one conditional");
            };
            assert_eq!(cond.condition.kind, var("a"));
            assert_eq!(cond.then_branch, vec![Node::Text("yes".into())]);
            assert_eq!(cond.else_branch, Some(vec![Node::Text("no".into())]));
            assert_eq!(cond.span, Span::new(0, 10));
        }

        #[test]
        fn elif_chain_nests_in_else_branch() {
            let nodes = parse("{% if a %}1{% elif b %}2{% elif c %}3{% else %}4{% endif %}").unwrap();
            let [Node::Conditional(first)] = nodes.as_slice() else {
                panic!("expected one conditional");
            };
            let Some([Node::Conditional(second)]) = first.else_branch.as_deref() else {
                panic!("expected nested elif");
            };
            assert_eq!(second.condition.kind, var("b"));
            let Some([Node::Conditional(third)]) = second.else_branch.as_deref() else {
                panic!("expected nested elif");
            };
            assert_eq!(third.condition.kind, var("c"));
            assert_eq!(third.else_branch, Some(vec![Node::Text("4".into())]));
        }

        #[test]
        fn long_elif_chain_does_not_count_as_nesting() {
            let source = format!(
                "{{% if a %}}{}{{% endif %}}",
                "{% elif b %}x".repeat(200)
            );
            assert!(parse_nodes(&source, 4).is_ok());
        }

        #[test]
        fn very_long_elif_chain_parses_and_drops() {
            let source = format!(
                "{{% if a %}}{}{{% endif %}}",
                "{% elif b %}x".repeat(100_000)
            );
            let nodes = parse_nodes(&source, 4).unwrap();
            let [Node::Conditional(first)] = nodes.as_slice() else {
                panic!("expected a conditional");
            };
            assert!(first.elif().is_some());
            drop(nodes);
        }

        #[test]
        fn loop_with_else() {
            let nodes = parse("{% for item in items %}{{ item }}{% else %}none{% endfor %}").unwrap();
            let [Node::Loop(l)] = nodes.as_slice() else {
                panic!("expected one loop");
            };
            assert_eq!(l.variable, "item");
            assert_eq!(l.iterable.kind, var("items"));
            assert_eq!(l.else_branch, Some(vec![Node::Text("none".into())]));
        }

        #[test]
        fn whitespace_control_inside_blocks() {
            let nodes = parse("{% if a -%}\n  yes\n{%- endif %}").unwrap();
            let [Node::Conditional(cond)] = nodes.as_slice() else {
                panic!("expected one conditional");
            };
            assert_eq!(cond.then_branch, vec![Node::Text("yes".into())]);
        }

        #[test]
        fn literal_condition() {
            let nodes = parse("{% if true %}x{% endif %}").unwrap();
            let [Node::Conditional(cond)] = nodes.as_slice() else {
                panic!("expected one conditional");
            };
            assert_eq!(cond.condition.kind, ExprKind::Literal(Literal::Bool(true)));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unclosed_if_reports_opener() {
            let err = parse("ab{% if cond %}unclosed").unwrap_err();
            let syntax = err.as_syntax().unwrap();
            assert_eq!(syntax.message, "unclosed `if` block, expected `endif`");
            assert_eq!(syntax.location.offset, 2);
        }

        #[test]
        fn unclosed_for() {
            assert!(error("{% for x in xs %}").contains("unclosed `for` block, expected `endfor`"));
        }

        #[test]
        fn unclosed_else_branch() {
            assert!(error("{% if a %}{% else %}").contains("expected `endif`"));
        }

        #[test]
        fn stray_closers() {
            assert!(error("{% endif %}").contains("unexpected `endif` tag"));
            assert!(error("{% else %}").contains("unexpected `else` tag"));
            assert!(error("{% endraw %}").contains("unexpected `endraw` tag"));
        }

        #[test]
        fn mismatched_closer() {
            assert_eq!(
                error("{% if a %}{% endfor %}"),
                "unexpected `endfor` tag, expected `endif` at line 1, column 11"
            );
        }

        #[test]
        fn elif_after_else() {
            assert!(error("{% if a %}{% else %}{% elif b %}{% endif %}").contains("unexpected `elif`"));
        }

        #[test]
        fn unknown_tag() {
            assert!(error("{% include 'x' %}").contains("unknown block tag `include`"));
        }

        #[test]
        fn empty_markers() {
            assert!(error("a {{ }}").contains("empty expression"));
            assert!(error("{% %}").contains("empty block tag"));
        }

        #[test]
        fn trailing_tokens_in_tags() {
            assert!(error("{% if a %}{% endif extra %}").contains("unexpected `extra`"));
        }

        #[test]
        fn malformed_for() {
            assert!(error("{% for in xs %}{% endfor %}").contains("expected a loop variable"));
            assert!(error("{% for x of xs %}{% endfor %}").contains("expected `in`"));
        }

        #[test]
        fn missing_condition() {
            assert!(error("{% if %}{% endif %}").contains("expected an expression"));
        }

        #[test]
        fn block_nesting_is_bounded() {
            let source = format!("{}{}", "{% if a %}".repeat(5), "{% endif %}".repeat(5));
            let err = parse_nodes(&source, 4).unwrap_err();
            assert!(matches!(err, ParseError::DepthExceeded { max_depth: 4, .. }));
            assert!(parse_nodes(&source, 5).is_ok());
        }

        #[test]
        fn errors_report_line_numbers() {
            let err = parse("line one\nline two {% bogus %}").unwrap_err();
            let location = err.location();
            assert_eq!((location.line, location.column), (2, 10));
        }
    }
}
