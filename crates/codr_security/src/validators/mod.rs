//! Per-language AST walkers. Python uses a native AST; the other four
//! share a uniform tree-sitter walk.

mod c_cpp;
mod javascript;
mod python;
mod rust_lang;
mod treesitter_util;

use codr_protocol::Language;

use crate::Report;

/// Run the validator for `language` over `code`. Fails closed: a syntax
/// error or unsupported language is a rejection, never a crash.
pub fn validate(code: &str, language: Language) -> Report {
    match language {
        Language::Python => python::validate(code),
        Language::Javascript => javascript::validate(code),
        Language::C => c_cpp::validate_c(code),
        Language::Cpp => c_cpp::validate_cpp(code),
        Language::Rust => rust_lang::validate(code),
    }
}
