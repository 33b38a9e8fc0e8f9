//! Expression tree traversal: child access, undefined-variable collection,
//! and the leaf paths used by template instantiation.
use super::types::Node;
use crate::context::Context;

impl Node {
    /// Direct children, in evaluation order. Leaves have none.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Fixed(_) | Node::Constant(_) | Node::Variable(_) => vec![],
            Node::Unary(unary) => vec![&unary.arg],
            Node::Binary(binary) => vec![&binary.left, &binary.right],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        match self {
            Node::Fixed(_) | Node::Constant(_) | Node::Variable(_) => vec![],
            Node::Unary(unary) => vec![&mut unary.arg],
            Node::Binary(binary) => vec![&mut binary.left, &mut binary.right],
        }
    }

    /// Replace the child at `index` in place. Panics if this node kind has
    /// no such child; callers are expected to consult `children` first.
    pub fn replace_child(&mut self, index: usize, new: Node) {
        match (self, index) {
            (Node::Unary(unary), 0) => *unary.arg = new,
            (Node::Binary(binary), 0) => *binary.left = new,
            (Node::Binary(binary), 1) => *binary.right = new,
            (_, index) => panic!("no child at index {} for this node kind", index),
        }
    }

    /// Names of undefined variable leaves, left to right, with duplicates
    /// kept if the same variable occurs more than once in the subtree.
    pub fn undefined_variables(&self, ctx: &Context) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_undefined_variables(ctx, &mut names);
        names
    }

    fn collect_undefined_variables(&self, ctx: &Context, names: &mut Vec<String>) {
        match self {
            Node::Variable(variable) => {
                if ctx.get(&variable.name).is_none() {
                    names.push(variable.name.clone());
                }
            }
            Node::Fixed(_) | Node::Constant(_) => {}
            Node::Unary(_) | Node::Binary(_) => {
                for child in self.children() {
                    child.collect_undefined_variables(ctx, names);
                }
            }
        }
    }

    /// Paths (child indices from this node) to every `Variable` leaf,
    /// paired with that variable's name. The template instantiator uses
    /// these to rewire a cloned subtree's variables without capturing a
    /// closure over the parent.
    pub fn variable_paths(&self) -> Vec<(String, Vec<usize>)> {
        let mut paths = Vec::new();
        self.collect_variable_paths(Vec::new(), &mut paths);
        paths
    }

    fn collect_variable_paths(&self, prefix: Vec<usize>, paths: &mut Vec<(String, Vec<usize>)>) {
        match self {
            Node::Variable(variable) => paths.push((variable.name.clone(), prefix)),
            Node::Fixed(_) | Node::Constant(_) => {}
            Node::Unary(_) | Node::Binary(_) => {
                for (index, child) in self.children().into_iter().enumerate() {
                    let mut child_prefix = prefix.clone();
                    child_prefix.push(index);
                    child.collect_variable_paths(child_prefix, paths);
                }
            }
        }
    }

    /// Replace the node reached by following `path` (child indices from
    /// `self`) with `new`. An empty path replaces `self`.
    pub fn replace_at(&mut self, path: &[usize], new: Node) {
        match path.split_first() {
            None => *self = new,
            Some((&index, rest)) => {
                let child = self
                    .children_mut()
                    .into_iter()
                    .nth(index)
                    .expect("path index out of range for this node kind");
                child.replace_at(rest, new);
            }
        }
    }
}
