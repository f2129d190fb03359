/// Helper utilities for walking the Python syntax tree
use tree_sitter::Node;

/// Source text covered by a node. Empty if the node lies outside `source`.
pub(crate) fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Named children that carry a value, skipping comments and line continuations
pub(crate) fn value_children<'tree>(node: Node<'tree>) -> std::vec::IntoIter<Node<'tree>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'tree>> = node
        .named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "comment" | "line_continuation"))
        .collect();
    children.into_iter()
}

/// First ERROR or MISSING node in document order
pub(crate) fn first_syntax_error<'tree>(root: Node<'tree>) -> Option<Node<'tree>> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    None
}

/// Describe a syntax error node for error messages
pub(crate) fn describe_syntax_error(node: &Node, source: &str) -> String {
    if node.is_missing() {
        return format!("missing '{}'", node.kind());
    }

    let text = node_text(node, source);
    let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
    if snippet.trim().is_empty() {
        "unexpected token".to_string()
    } else {
        format!("unexpected '{}'", snippet.trim())
    }
}
