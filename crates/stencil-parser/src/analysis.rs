//! Static analysis over a parsed node tree.

use std::collections::HashSet;

use crate::ast::{Expr, ExprKind, Node};

/// Name bound inside every loop body in addition to the loop variable.
pub(crate) const LOOP_OBJECT: &str = "loop";

/// Root names the template reads from its context, in first-occurrence
/// order, without duplicates.
pub(crate) fn free_variables(nodes: &[Node]) -> Vec<String> {
    let mut collector = Collector::default();
    collector.nodes(nodes);
    collector.names
}

#[derive(Default)]
struct Collector<'a> {
    /// Names bound by enclosing loops, innermost last.
    bound: Vec<&'a str>,
    seen: HashSet<&'a str>,
    names: Vec<String>,
}

impl<'a> Collector<'a> {
    fn nodes(&mut self, nodes: &'a [Node]) {
        for node in nodes {
            match node {
                Node::Text(_) => {}
                Node::Interpolation(expr) => self.expr(expr),
                Node::Conditional(cond) => {
                    let mut current = cond;
                    loop {
                        self.expr(&current.condition);
                        self.nodes(&current.then_branch);
                        match current.elif() {
                            Some(next) => current = next,
                            None => {
                                if let Some(branch) = &current.else_branch {
                                    self.nodes(branch);
                                }
                                break;
                            }
                        }
                    }
                }
                Node::Loop(l) => {
                    self.expr(&l.iterable);

                    self.bound.push(&l.variable);
                    self.bound.push(LOOP_OBJECT);
                    self.nodes(&l.body);
                    self.bound.truncate(self.bound.len() - 2);

                    if let Some(branch) = &l.else_branch {
                        self.nodes(branch);
                    }
                }
            }
        }
    }

    fn expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Path(path) => self.reference(&path.root),
            ExprKind::Default {
                value, fallback, ..
            } => {
                self.expr(value);
                self.expr(fallback);
            }
            ExprKind::Not(inner) => self.expr(inner),
            ExprKind::And(left, right) | ExprKind::Or(left, right) => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Compare { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
        }
    }

    fn reference(&mut self, name: &'a str) {
        if self.bound.contains(&name) || !self.seen.insert(name) {
            return;
        }
        self.names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_nodes;

    fn free(source: &str) -> Vec<String> {
        free_variables(&parse_nodes(source, 64).unwrap())
    }

    #[test]
    fn plain_interpolations_in_order() {
        assert_eq!(free("{{ b }}{{ a }}{{ b }}"), ["b", "a"]);
    }

    #[test]
    fn only_root_of_path_counts() {
        assert_eq!(free("{{ user.name }} {{ user['id'] }}"), ["user"]);
    }

    #[test]
    fn default_fallbacks_are_references() {
        assert_eq!(free("{{ title | default(site_name) }}"), ["title", "site_name"]);
        assert_eq!(free("{{ title | default('x') }}"), ["title"]);
    }

    #[test]
    fn conditions_and_branches() {
        assert_eq!(
            free("{% if a and not b %}{{ c }}{% elif d == e %}{% else %}{{ f }}{% endif %}"),
            ["a", "b", "c", "d", "e", "f"]
        );
    }

    #[test]
    fn loop_variable_is_bound_in_body_only() {
        assert_eq!(
            free("{% for item in items %}{{ item.name }}{{ loop.index }}{{ other }}{% endfor %}{{ item }}"),
            ["items", "other", "item"]
        );
    }

    #[test]
    fn iterable_is_outside_loop_scope() {
        assert_eq!(free("{% for x in x %}{{ x }}{% endfor %}"), ["x"]);
    }

    #[test]
    fn for_else_is_outside_loop_scope() {
        assert_eq!(free("{% for x in xs %}{% else %}{{ x }}{% endfor %}"), ["xs", "x"]);
    }

    #[test]
    fn nested_loops_shadow_outer_names() {
        assert_eq!(
            free("{% for row in rows %}{% for cell in row %}{{ cell }}{{ row }}{% endfor %}{% endfor %}"),
            ["rows"]
        );
    }

    #[test]
    fn loop_outside_any_loop_is_free() {
        assert_eq!(free("{{ loop }}"), ["loop"]);
    }

    #[test]
    fn long_elif_chain() {
        let source = format!(
            "{{% if a %}}{}{{% else %}}{{{{ last }}}}{{% endif %}}",
            (0..50_000).map(|i| format!("{{% elif v{} %}}", i % 3)).collect::<String>()
        );
        assert_eq!(free(&source), ["a", "v0", "v1", "v2", "last"]);
    }

    #[test]
    fn literals_reference_nothing() {
        assert!(free("{{ 'x' }}{% if true %}{% endif %}").is_empty());
    }
}
