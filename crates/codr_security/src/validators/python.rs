//! Python validator: parses with a native AST (no Python interpreter
//! dependency) and rejects source containing anything from the denylist.

use rustpython_ast::Visitor;
use rustpython_parser::{ast, Parse};
use std::collections::HashSet;

use crate::denylist::{PYTHON_BLOCKED_CALLS, PYTHON_BLOCKED_MODULES, PYTHON_SAFE_DUNDERS};
use crate::Report;

pub fn validate(code: &str) -> Report {
    let suite = match ast::Suite::parse(code, "<submission>") {
        Ok(suite) => suite,
        Err(err) => return Report::reject(format!("python syntax error: {err}")),
    };

    let blocked_calls: HashSet<&str> = PYTHON_BLOCKED_CALLS.iter().copied().collect();
    let blocked_modules: HashSet<&str> = PYTHON_BLOCKED_MODULES.iter().copied().collect();
    let safe_dunders: HashSet<&str> = PYTHON_SAFE_DUNDERS.iter().copied().collect();

    let mut walker = PythonWalker {
        blocked_calls,
        blocked_modules,
        safe_dunders,
        violation: None,
    };
    for stmt in suite {
        if walker.violation.is_some() {
            break;
        }
        walker.visit_stmt(stmt);
    }

    match walker.violation {
        Some(reason) => Report::reject(reason),
        None => Report::accept(),
    }
}

struct PythonWalker<'a> {
    blocked_calls: HashSet<&'a str>,
    blocked_modules: HashSet<&'a str>,
    safe_dunders: HashSet<&'a str>,
    violation: Option<String>,
}

impl<'a> PythonWalker<'a> {
    fn reject(&mut self, reason: String) {
        if self.violation.is_none() {
            self.violation = Some(reason);
        }
    }

    fn module_root(module: &str) -> &str {
        module.split('.').next().unwrap_or(module)
    }

    fn is_dunder(name: &str) -> bool {
        name.len() > 4 && name.starts_with("__") && name.ends_with("__")
    }
}

impl<'a> Visitor for PythonWalker<'a> {
    fn visit_stmt_import(&mut self, node: ast::StmtImport) {
        for alias in &node.names {
            let root = Self::module_root(alias.name.as_str());
            if self.blocked_modules.contains(root) {
                self.reject(format!("blocked import: {}", alias.name.as_str()));
            }
        }
        self.generic_visit_stmt_import(node);
    }

    fn visit_stmt_import_from(&mut self, node: ast::StmtImportFrom) {
        if let Some(module) = &node.module {
            let root = Self::module_root(module.as_str());
            if self.blocked_modules.contains(root) {
                self.reject(format!("blocked import: {}", module.as_str()));
            }
        }
        self.generic_visit_stmt_import_from(node);
    }

    fn visit_expr_name(&mut self, node: ast::ExprName) {
        let id = node.id.as_str();
        if self.blocked_calls.contains(id) {
            self.reject(format!("blocked reference: {id}"));
        }
        self.generic_visit_expr_name(node);
    }

    fn visit_expr_attribute(&mut self, node: ast::ExprAttribute) {
        let attr = node.attr.as_str();
        if Self::is_dunder(attr) && !self.safe_dunders.contains(attr) {
            self.reject(format!("blocked dunder attribute access: {attr}"));
        }
        if let ast::Expr::Name(name) = node.value.as_ref() {
            if self.blocked_modules.contains(name.id.as_str()) {
                self.reject(format!(
                    "blocked attribute access on module: {}.{}",
                    name.id.as_str(),
                    attr
                ));
            }
        }
        self.generic_visit_expr_attribute(node);
    }

    fn visit_expr_subscript(&mut self, node: ast::ExprSubscript) {
        if let ast::Expr::Name(name) = node.value.as_ref() {
            if Self::is_dunder(name.id.as_str()) {
                self.reject(format!("blocked subscript on dunder name: {}", name.id.as_str()));
            }
        }
        self.generic_visit_expr_subscript(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_arithmetic() {
        assert!(validate("print(1 + 2)").ok);
    }

    #[test]
    fn rejects_os_import() {
        let report = validate("import os\nos.system('ls')");
        assert!(!report.ok);
        assert!(report.reason.unwrap().contains("os"));
    }

    #[test]
    fn rejects_from_import() {
        assert!(!validate("from subprocess import run").ok);
    }

    #[test]
    fn rejects_eval_call() {
        assert!(!validate("eval('1+1')").ok);
    }

    #[test]
    fn rejects_bare_compile_reference() {
        assert!(!validate("f = compile").ok);
    }

    #[test]
    fn rejects_dunder_attribute_access() {
        assert!(!validate("''.__class__").ok);
    }

    #[test]
    fn allows_safe_dunders() {
        assert!(validate("str(1).__str__()").ok);
    }

    #[test]
    fn rejects_syntax_errors_closed() {
        assert!(!validate("def f(:").ok);
    }
}
