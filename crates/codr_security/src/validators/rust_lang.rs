use super::treesitter_util::{find_by_type, node_text, parse};
use crate::denylist::{RUST_BLOCKED_ATTRIBUTE_FRAGMENTS, RUST_BLOCKED_USE_PREFIXES};
use crate::Report;

pub fn validate(code: &str) -> Report {
    let tree = match parse(code, tree_sitter_rust::LANGUAGE.into()) {
        Ok(tree) => tree,
        Err(reason) => return Report::reject(format!("rust {reason}")),
    };
    let root = tree.root_node();

    for use_decl in find_by_type(root, "use_declaration") {
        let text = node_text(use_decl, code);
        let path = text.trim_start_matches("use").trim().trim_end_matches(';').trim();
        for prefix in RUST_BLOCKED_USE_PREFIXES {
            if path.starts_with(prefix) {
                return Report::reject(format!("blocked use: {path}"));
            }
        }
    }

    if !find_by_type(root, "unsafe_block").is_empty() {
        return Report::reject("blocked unsafe block".to_string());
    }
    for leaf in find_by_type(root, "unsafe") {
        let _ = leaf;
        return Report::reject("blocked unsafe item".to_string());
    }
    if !find_by_type(root, "foreign_mod_item").is_empty() {
        return Report::reject("blocked extern block".to_string());
    }
    if !find_by_type(root, "extern_modifier").is_empty() {
        return Report::reject("blocked extern fn".to_string());
    }

    for attr in find_by_type(root, "attribute_item") {
        let text = node_text(attr, code);
        for fragment in RUST_BLOCKED_ATTRIBUTE_FRAGMENTS {
            if text.contains(fragment) {
                return Report::reject(format!("blocked attribute: {}", text.trim()));
            }
        }
    }

    Report::accept()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_arithmetic() {
        assert!(validate("fn main() { println!(\"{}\", 1 + 2); }").ok);
    }

    #[test]
    fn rejects_std_fs_use() {
        assert!(!validate("use std::fs::File;\nfn main() {}").ok);
    }

    #[test]
    fn rejects_unsafe_block() {
        assert!(!validate("fn main() { unsafe { } }").ok);
    }

    #[test]
    fn rejects_no_mangle_attribute() {
        assert!(!validate("#[no_mangle]\npub fn f() {}").ok);
    }

    #[test]
    fn rejects_extern_block() {
        assert!(!validate("extern \"C\" { fn f(); }\nfn main() {}").ok);
    }

    #[test]
    fn rejects_syntax_errors_closed() {
        assert!(!validate("fn main( {").ok);
    }
}
