//! Routes files to the correct language extractor.
//!
//! Python is the only implemented language. Every other input produces a
//! well-formed empty module model plus an `unsupported_language` violation
//! instead of a failure.

use blastshield_core::types::ast::{module_id_from_path, FileInput, Language, ModuleAST};
use blastshield_core::types::violation::{GraphNodeRef, RuleId, RuleViolation, Severity};

use super::python;

/// Extraction result for one file: the module model plus, when extraction
/// degraded, the synthetic violation describing why.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub ast: ModuleAST,
    pub synthetic: Option<RuleViolation>,
}

/// Stateless extractor front-end.
#[derive(Debug, Default)]
pub struct ParserManager;

impl ParserManager {
    pub fn new() -> Self {
        Self
    }

    /// Extract one file. Never fails: syntax errors and unsupported
    /// languages degrade to markers.
    pub fn extract(&self, input: &FileInput) -> ExtractedFile {
        let language = Language::from_path(&input.path);
        if !language.is_supported() {
            let ast = ModuleAST::empty(
                module_id_from_path(&input.path),
                input.path.clone(),
                language,
                false,
            );
            let synthetic = unsupported_language_violation(&input.path, language);
            return ExtractedFile {
                ast,
                synthetic: Some(synthetic),
            };
        }

        let ast = python::extract(&input.content, &input.path);
        let synthetic = ast.parse_error.then(|| parse_error_violation(&input.path));
        ExtractedFile { ast, synthetic }
    }
}

fn parse_error_violation(path: &str) -> RuleViolation {
    RuleViolation {
        rule_id: RuleId::ParseError,
        severity: Severity::Low,
        file: path.to_string(),
        line: 1,
        end_line: 1,
        title: "File could not be parsed".to_string(),
        description: format!("`{path}` contains a syntax error and was skipped by analysis."),
        evidence: vec![format!("`{path}` failed to parse as Python")],
        affected_function: String::new(),
        graph_node: GraphNodeRef::Unresolved,
    }
}

fn unsupported_language_violation(path: &str, language: Language) -> RuleViolation {
    RuleViolation {
        rule_id: RuleId::UnsupportedLanguage,
        severity: Severity::Low,
        file: path.to_string(),
        line: 1,
        end_line: 1,
        title: "Unsupported source language".to_string(),
        description: format!(
            "`{path}` is {} source, which this engine does not analyse.",
            language.name()
        ),
        evidence: vec![format!("detected language `{}`", language.name())],
        affected_function: String::new(),
        graph_node: GraphNodeRef::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_file_extracts_without_synthetic() {
        let manager = ParserManager::new();
        let out = manager.extract(&FileInput::new("a.py", "def f():\n    return 1\n"));
        assert!(out.synthetic.is_none());
        assert_eq!(out.ast.functions.len(), 1);
    }

    #[test]
    fn typescript_file_yields_unsupported_marker() {
        let manager = ParserManager::new();
        let out = manager.extract(&FileInput::new("a.ts", "export function f() {}"));
        let synthetic = out.synthetic.expect("marker expected");
        assert_eq!(synthetic.rule_id, RuleId::UnsupportedLanguage);
        assert_eq!(synthetic.severity, Severity::Low);
        assert!(out.ast.functions.is_empty());
    }

    #[test]
    fn syntax_error_yields_parse_error_marker() {
        let manager = ParserManager::new();
        let out = manager.extract(&FileInput::new("broken.py", "def broken(:\n"));
        let synthetic = out.synthetic.expect("marker expected");
        assert_eq!(synthetic.rule_id, RuleId::ParseError);
        assert!(out.ast.parse_error);
        assert!(out.ast.functions.is_empty());
    }
}
