//! The node tree produced by the parser.
//!
//! A template is an ordered sequence of [`Node`]s. Block nodes own their
//! branches, so the tree has a single owner and no sharing.

/// Byte range in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// One element of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),
    /// `{{ expr }}`
    Interpolation(Expr),
    /// `{% if %} … {% elif %} … {% else %} … {% endif %}`
    Conditional(Conditional),
    /// `{% for x in expr %} … {% else %} … {% endfor %}`
    Loop(Loop),
}

/// A conditional block.
///
/// An `elif` chain is stored as a nested `Conditional` forming the whole
/// else-branch of its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Expr,
    pub then_branch: Vec<Node>,
    pub else_branch: Option<Vec<Node>>,
    /// Span of the opening `{% if %}` (or `{% elif %}`) marker.
    pub span: Span,
}

impl Conditional {
    /// The `elif` successor, when the else-branch is exactly one conditional.
    pub fn elif(&self) -> Option<&Conditional> {
        match self.else_branch.as_deref() {
            Some([Node::Conditional(next)]) => Some(next),
            _ => None,
        }
    }
}

// Unlinks an `elif` chain one link at a time, so dropping a long chain
// does not recurse once per link.
impl Drop for Conditional {
    fn drop(&mut self) {
        let mut next = self.else_branch.take();
        while let Some(mut nodes) = next {
            next = match nodes.as_mut_slice() {
                [Node::Conditional(link)] => link.else_branch.take(),
                _ => None,
            };
        }
    }
}

/// A loop block.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Name bound to each element inside `body`.
    pub variable: String,
    pub iterable: Expr,
    pub body: Vec<Node>,
    /// Rendered instead of `body` when the loop runs zero times.
    pub else_branch: Option<Vec<Node>>,
    /// Span of the opening `{% for %}` marker.
    pub span: Span,
}

/// An expression together with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Path(Path),
    /// `value | default(fallback)`; `on_falsy` is the optional second argument.
    Default {
        value: Box<Expr>,
        fallback: Box<Expr>,
        on_falsy: bool,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The fallback attached by a trailing `| default(…)` filter, if any.
    pub fn fallback(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Default { fallback, .. } => Some(fallback),
            _ => None,
        }
    }

    /// The variable whose lookup this expression starts from, if it is a
    /// plain path or a defaulted path.
    pub fn root_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Path(path) => Some(&path.root),
            ExprKind::Default { value, .. } => value.root_variable(),
            _ => None,
        }
    }
}

/// A variable reference with optional attribute and index access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub root: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `.name` or `["name"]`
    Key(String),
    /// `.0` or `[0]`
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}
