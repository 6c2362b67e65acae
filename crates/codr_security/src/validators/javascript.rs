use super::treesitter_util::{find_by_type, node_text, parse};
use crate::denylist::{
    JAVASCRIPT_BLOCKED_CALLS, JAVASCRIPT_BLOCKED_MODULES, JAVASCRIPT_DANGEROUS_PATTERNS,
};
use crate::Report;

pub fn validate(code: &str) -> Report {
    let tree = match parse(code, tree_sitter_javascript::LANGUAGE.into()) {
        Ok(tree) => tree,
        Err(reason) => return Report::reject(format!("javascript {reason}")),
    };
    let root = tree.root_node();

    for call in find_by_type(root, "call_expression") {
        let Some(func) = call.child_by_field_name("function") else {
            continue;
        };
        let name = node_text(func, code);
        let base = name.rsplit('.').next().unwrap_or(name);
        if JAVASCRIPT_BLOCKED_CALLS.contains(&base) {
            if base == "require" {
                if let Some(args) = call.child_by_field_name("arguments") {
                    if let Some(first) = args.named_child(0) {
                        let literal = node_text(first, code).trim_matches(|c| c == '\'' || c == '"' || c == '`');
                        if is_blocked_module(literal) {
                            return Report::reject(format!("blocked require: {literal}"));
                        }
                        continue;
                    }
                }
            }
            return Report::reject(format!("blocked call: {base}"));
        }
    }

    for import in find_by_type(root, "import_statement") {
        for string_node in find_by_type(import, "string_fragment") {
            let source = node_text(string_node, code);
            if is_blocked_module(source) {
                return Report::reject(format!("blocked import: {source}"));
            }
        }
    }

    for member in find_by_type(root, "member_expression") {
        let text = node_text(member, code);
        if text.contains("constructor") {
            return Report::reject(format!("blocked constructor access: {text}"));
        }
        for pattern in JAVASCRIPT_DANGEROUS_PATTERNS {
            if text.starts_with(pattern) {
                return Report::reject(format!("blocked member access: {text}"));
            }
        }
    }

    for subscript in find_by_type(root, "subscript_expression") {
        let text = node_text(subscript, code);
        if text.contains("constructor") {
            return Report::reject(format!("blocked constructor access: {text}"));
        }
    }

    Report::accept()
}

fn is_blocked_module(name: &str) -> bool {
    JAVASCRIPT_BLOCKED_MODULES
        .iter()
        .any(|blocked| name == *blocked || name.starts_with(&format!("{blocked}/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_arithmetic() {
        assert!(validate("console.log(1 + 2)").ok);
    }

    #[test]
    fn rejects_eval() {
        assert!(!validate("eval('1+1')").ok);
    }

    #[test]
    fn rejects_require_fs() {
        assert!(!validate("const fs = require('fs')").ok);
    }

    #[test]
    fn rejects_constructor_access() {
        assert!(!validate("x.constructor.constructor('return 1')()").ok);
    }

    #[test]
    fn rejects_process_binding() {
        assert!(!validate("process.binding('fs')").ok);
    }

    #[test]
    fn rejects_syntax_errors_closed() {
        assert!(!validate("function(").ok);
    }
}
