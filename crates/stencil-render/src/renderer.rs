//! Tree-walking renderer.

use std::borrow::Cow;

use serde_json::{json, Value};
use stencil_parser::{CompareOp, Conditional, Expr, ExprKind, Loop, Node, Template};
use tracing::warn;

use crate::error::{Limit, RenderError, Result};
use crate::scope::{Frame, Scope};
use crate::value::{format_value, is_truthy, literal_value, lookup, values_equal};
use crate::{Context, Limits};

/// Renders `template` against `context` within `limits`.
///
/// Rendering is total with respect to data: missing variables and
/// non-iterable loop targets degrade to empty output. Only bound violations
/// fail.
pub fn render_with(template: &Template, context: &Context, limits: &Limits) -> Result<String> {
    let mut renderer = Renderer {
        scope: Scope::new(context),
        limits,
        out: String::with_capacity(template.source().len()),
        depth: 0,
        iterations: 0,
    };
    renderer.nodes(template.nodes())?;
    Ok(renderer.out)
}

struct Renderer<'c, 'l> {
    scope: Scope<'c>,
    limits: &'l Limits,
    out: String,
    depth: usize,
    iterations: usize,
}

impl Renderer<'_, '_> {
    fn nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Interpolation(expr) => {
                    if let Some(value) = eval(&self.scope, expr) {
                        self.out.push_str(&format_value(&value));
                    }
                }
                Node::Conditional(cond) => self.conditional(cond)?,
                Node::Loop(l) => self.for_loop(l)?,
            }
            self.check_output()?;
        }
        Ok(())
    }

    /// Walks an `if`/`elif` chain without nesting a render level per `elif`.
    fn conditional(&mut self, cond: &Conditional) -> Result<()> {
        let mut current = cond;
        loop {
            if truthy(eval(&self.scope, &current.condition)) {
                return self.block(&current.then_branch);
            }
            match current.else_branch.as_deref() {
                Some([Node::Conditional(next)]) => current = next,
                Some(branch) => return self.block(branch),
                None => return Ok(()),
            }
        }
    }

    fn for_loop(&mut self, l: &Loop) -> Result<()> {
        let items: Box<dyn ExactSizeIterator<Item = Value>> =
            match eval(&self.scope, &l.iterable).as_deref() {
                Some(Value::Array(items)) => Box::new(items.clone().into_iter()),
                Some(Value::Object(map)) => {
                    Box::new(map.keys().cloned().map(Value::String).collect::<Vec<_>>().into_iter())
                }
                Some(Value::String(s)) => Box::new(
                    s.chars()
                        .collect::<Vec<_>>()
                        .into_iter()
                        .map(|c| Value::String(c.to_string())),
                ),
                _ => Box::new(std::iter::empty()),
            };

        if items.len() == 0 {
            return match &l.else_branch {
                Some(branch) => self.block(branch),
                None => Ok(()),
            };
        }

        self.enter()?;
        let length = items.len();
        for (index0, item) in items.enumerate() {
            self.iterations += 1;
            if self.iterations > self.limits.max_iterations {
                warn!(max = self.limits.max_iterations, "loop iteration limit exceeded");
                return Err(RenderError::LimitExceeded {
                    limit: Limit::Iterations,
                    max: self.limits.max_iterations,
                });
            }

            self.scope.push(Frame {
                variable: l.variable.clone(),
                item,
                meta: json!({
                    "index": index0 + 1,
                    "index0": index0,
                    "revindex": length - index0,
                    "revindex0": length - index0 - 1,
                    "first": index0 == 0,
                    "last": index0 + 1 == length,
                    "length": length,
                }),
            });
            let result = self.nodes(&l.body);
            self.scope.pop();
            result?;
        }
        self.leave();
        Ok(())
    }

    fn block(&mut self, nodes: &[Node]) -> Result<()> {
        self.enter()?;
        self.nodes(nodes)?;
        self.leave();
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            warn!(max = self.limits.max_depth, "render nesting limit exceeded");
            return Err(RenderError::LimitExceeded {
                limit: Limit::Depth,
                max: self.limits.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn check_output(&self) -> Result<()> {
        match self.limits.max_output_bytes {
            Some(max) if self.out.len() > max => {
                warn!(max, "rendered output limit exceeded");
                Err(RenderError::LimitExceeded {
                    limit: Limit::OutputBytes,
                    max,
                })
            }
            _ => Ok(()),
        }
    }
}

fn truthy(value: Option<Cow<'_, Value>>) -> bool {
    value.is_some_and(|v| is_truthy(&v))
}

/// Evaluates an expression. `None` means undefined.
fn eval<'s>(scope: &'s Scope<'_>, expr: &Expr) -> Option<Cow<'s, Value>> {
    match &expr.kind {
        ExprKind::Literal(literal) => Some(Cow::Owned(literal_value(literal))),
        ExprKind::Path(path) => {
            let root = scope.lookup(&path.root)?;
            path.segments
                .iter()
                .try_fold(root, |value, segment| lookup(value, segment))
                .map(Cow::Borrowed)
        }
        ExprKind::Default {
            value,
            fallback,
            on_falsy,
        } => match eval(scope, value) {
            Some(v) if !v.is_null() && (!*on_falsy || is_truthy(&v)) => Some(v),
            _ => eval(scope, fallback),
        },
        ExprKind::Not(inner) => Some(Cow::Owned(Value::Bool(!truthy(eval(scope, inner))))),
        ExprKind::And(left, right) => {
            let left = eval(scope, left);
            if left.as_deref().is_some_and(is_truthy) {
                eval(scope, right)
            } else {
                left
            }
        }
        ExprKind::Or(left, right) => {
            let left = eval(scope, left);
            if left.as_deref().is_some_and(is_truthy) {
                left
            } else {
                eval(scope, right)
            }
        }
        ExprKind::Compare { op, left, right } => {
            let left = eval(scope, left).unwrap_or(Cow::Owned(Value::Null));
            let right = eval(scope, right).unwrap_or(Cow::Owned(Value::Null));
            let equal = values_equal(&left, &right);
            Some(Cow::Owned(Value::Bool(match op {
                CompareOp::Eq => equal,
                CompareOp::Ne => !equal,
            })))
        }
    }
}
