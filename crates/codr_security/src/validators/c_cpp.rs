use super::treesitter_util::{find_by_type, node_text, parse};
use crate::denylist::{C_CPP_BLOCKED_CALLS, C_CPP_BLOCKED_INCLUDE_FRAGMENTS};
use crate::Report;

pub fn validate_c(code: &str) -> Report {
    validate(code, tree_sitter_c::LANGUAGE.into(), "c")
}

pub fn validate_cpp(code: &str) -> Report {
    validate(code, tree_sitter_cpp::LANGUAGE.into(), "cpp")
}

fn validate(code: &str, language: tree_sitter::Language, label: &str) -> Report {
    let tree = match parse(code, language) {
        Ok(tree) => tree,
        Err(reason) => return Report::reject(format!("{label} {reason}")),
    };
    let root = tree.root_node();

    for call in find_by_type(root, "call_expression") {
        let Some(func) = call.child_by_field_name("function") else {
            continue;
        };
        let name = node_text(func, code);
        if C_CPP_BLOCKED_CALLS.contains(&name) {
            return Report::reject(format!("blocked call: {name}"));
        }
    }

    for preproc in find_by_type(root, "preproc_include") {
        let text = node_text(preproc, code);
        for fragment in C_CPP_BLOCKED_INCLUDE_FRAGMENTS {
            if text.contains(fragment) {
                return Report::reject(format!("blocked include: {}", text.trim()));
            }
        }
    }

    if !find_by_type(root, "gnu_asm_expression").is_empty() {
        return Report::reject("blocked inline assembly".to_string());
    }

    Report::accept()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hello_world() {
        let code = "#include<stdio.h>\nint main(){printf(\"hi\\n\");return 0;}";
        assert!(validate_c(code).ok);
    }

    #[test]
    fn rejects_system_call() {
        let code = "#include<stdlib.h>\nint main(){system(\"ls\");return 0;}";
        assert!(!validate_c(code).ok);
    }

    #[test]
    fn rejects_unistd_include() {
        let code = "#include<unistd.h>\nint main(){return 0;}";
        assert!(!validate_c(code).ok);
    }

    #[test]
    fn rejects_fork_in_cpp() {
        let code = "#include<iostream>\nint main(){fork();return 0;}";
        assert!(!validate_cpp(code).ok);
    }

    #[test]
    fn rejects_syntax_errors_closed() {
        assert!(!validate_c("int main( {").ok);
    }
}
