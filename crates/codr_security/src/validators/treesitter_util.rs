//! Shared tree-sitter plumbing: parse into a concrete grammar, fail closed
//! on parse errors, and provide a depth-first walk with node-text lookup.

use tree_sitter::{Node, Parser, Tree};

pub fn parse(source: &str, language: tree_sitter::Language) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| format!("grammar error: {e}"))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no tree".to_string())?;
    if tree.root_node().has_error() {
        return Err("syntax error".to_string());
    }
    Ok(tree)
}

pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Depth-first walk invoking `visit` on every node in the tree.
pub fn walk<'a>(root: Node<'a>, mut visit: impl FnMut(Node<'a>)) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(node);
        let mut c = node.walk();
        for child in node.children(&mut c) {
            stack.push(child);
        }
    }
}

pub fn find_by_type<'a>(root: Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    walk(root, |n| {
        if n.kind() == kind {
            out.push(n);
        }
    });
    out
}
