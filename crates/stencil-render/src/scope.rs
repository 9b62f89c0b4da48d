//! Variable lookup during a render.

use serde_json::Value;

use crate::Context;

/// Bindings introduced by one loop iteration.
pub(crate) struct Frame {
    pub variable: String,
    pub item: Value,
    /// The `loop` object for this iteration.
    pub meta: Value,
}

/// The render-time variable environment: the caller's context plus a stack
/// of loop frames, innermost last.
pub(crate) struct Scope<'c> {
    root: &'c Context,
    frames: Vec<Frame>,
}

impl<'c> Scope<'c> {
    pub fn new(root: &'c Context) -> Self {
        Self {
            root,
            frames: Vec::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if frame.variable == name {
                return Some(&frame.item);
            }
            if name == "loop" {
                return Some(&frame.meta);
            }
        }
        self.root.get(name)
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Context {
        let Value::Object(map) = json!({"x": "root", "loop": "shadowed"}) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn frames_shadow_the_root() {
        let root = context();
        let mut scope = Scope::new(&root);
        assert_eq!(scope.lookup("x"), Some(&json!("root")));

        scope.push(Frame {
            variable: "x".into(),
            item: json!(1),
            meta: json!({"index": 1}),
        });
        assert_eq!(scope.lookup("x"), Some(&json!(1)));
        assert_eq!(scope.lookup("loop"), Some(&json!({"index": 1})));

        scope.pop();
        assert_eq!(scope.lookup("x"), Some(&json!("root")));
        assert_eq!(scope.lookup("loop"), Some(&json!("shadowed")));
    }

    #[test]
    fn loop_refers_to_innermost_frame() {
        let root = Context::new();
        let mut scope = Scope::new(&root);
        scope.push(Frame {
            variable: "outer".into(),
            item: json!("o"),
            meta: json!("outer loop"),
        });
        scope.push(Frame {
            variable: "inner".into(),
            item: json!("i"),
            meta: json!("inner loop"),
        });
        assert_eq!(scope.lookup("loop"), Some(&json!("inner loop")));
        assert_eq!(scope.lookup("outer"), Some(&json!("o")));
        assert_eq!(scope.lookup("missing"), None);
    }
}
