//! Language-neutral module model produced by the AST extractor.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A single source file handed to the engine. The engine never reads the
/// filesystem itself; ingestion is a passive input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    pub path: String,
    pub content: String,
}

impl FileInput {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Source language of a file. Only Python is analysed; everything else is
/// reported as an `unsupported_language` violation rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Unknown,
}

impl Language {
    /// Detect language from a file path's extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or("");
        match ext {
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "go" => Self::Go,
            _ => Self::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the engine carries a parser for this language.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Python)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-module extraction result. Cached by `(path, SHA-256(content))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAST {
    /// Module id derived from the path, e.g. `pkg/util.py` → `pkg.util`.
    pub module_id: String,
    pub path: String,
    pub language: Language,
    pub functions: Vec<FunctionDef>,
    pub classes: Vec<ClassDef>,
    pub imports: Vec<ImportStmt>,
    pub module_assignments: Vec<ModuleAssignment>,
    pub parse_error: bool,
}

impl ModuleAST {
    /// An empty module model for files that failed to parse or carry an
    /// unsupported language.
    pub fn empty(module_id: String, path: String, language: Language, parse_error: bool) -> Self {
        Self {
            module_id,
            path,
            language,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            module_assignments: Vec::new(),
            parse_error,
        }
    }

    /// Iterate over all function definitions, including class methods.
    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }
}

/// A class definition; methods are modelled as functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub line: u32,
    pub end_line: u32,
    pub decorators: Vec<Decorator>,
    pub methods: Vec<FunctionDef>,
}

/// A function or method definition with everything the rules consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    /// `module::func`, or `module::Class.method` for methods.
    pub qualified_name: String,
    pub name: String,
    pub line: u32,
    pub end_line: u32,
    pub params: Vec<Param>,
    pub return_annotation: Option<String>,
    pub decorators: Vec<Decorator>,
    pub is_async: bool,
    pub nested: Vec<FunctionDef>,
    pub call_sites: Vec<CallSite>,
    pub global_accesses: Vec<GlobalAccess>,
    /// Simple aliases (`x = y`), the only assignment shape taint tracking
    /// follows.
    pub local_aliases: Vec<LocalAlias>,
    pub loops: Vec<LoopSpan>,
    pub returns: Vec<ReturnSite>,
    /// The last body statement is not a `return`/`raise`, so control can
    /// fall off the end (an implicit `None`).
    pub falls_through: bool,
    pub exceptions: ExceptionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub annotation: Option<String>,
    pub has_default: bool,
}

/// A decorator as written: name plus raw argument expression text.
/// Unknown decorators are treated as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    pub args: Option<String>,
    pub line: u32,
}

/// A call expression inside a function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    /// Callee name as written; may be dotted (`os.system`) and unresolved.
    pub callee: String,
    /// Receiver for method-style calls (`state.append` → `state`).
    pub receiver: Option<String>,
    pub awaited: bool,
    pub line: u32,
    pub args: Vec<CallArg>,
    /// The call is a bare expression statement whose value is discarded.
    pub discarded: bool,
}

/// Argument summary: enough structure for rules to judge literal-ness and
/// to trace parameter flow without keeping the AST alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallArg {
    pub text: String,
    pub is_string_literal: bool,
    pub is_number_literal: bool,
    /// Identifiers appearing anywhere in the argument expression.
    pub names: SmallVec<[String; 2]>,
}

impl CallArg {
    /// True when the argument is a plain literal with no embedded names.
    pub fn is_literal(&self) -> bool {
        (self.is_string_literal || self.is_number_literal) && self.names.is_empty()
    }
}

/// A bare `target = source` assignment between two names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAlias {
    pub target: String,
    pub source: String,
    pub line: u32,
}

/// A read or write of a module-level name inside a function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalAccess {
    pub name: String,
    pub line: u32,
    pub write: bool,
}

/// Line span of a `for`/`while` loop body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopSpan {
    pub line: u32,
    pub end_line: u32,
}

/// One return path out of a function.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReturnSite {
    pub line: u32,
    pub kind: ReturnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    /// `return` with no value.
    Bare,
    /// `return None`.
    NullLiteral,
    Value,
}

/// Per-function exception-handler summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExceptionSummary {
    pub has_try: bool,
    /// A `try` statement is a direct child of the function body.
    pub has_top_level_try: bool,
    pub bare_handlers: u32,
    pub specific_handlers: u32,
    pub reraises: bool,
}

/// An `import` or `from … import …` statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStmt {
    pub module: String,
    pub names: Vec<ImportedName>,
    pub is_from: bool,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// The name this import binds in the importing module.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A module-level assignment with its inferred container kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAssignment {
    pub name: String,
    pub line: u32,
    pub container: ContainerKind,
}

/// Inferred container type of a module-level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    Sequence,
    Mapping,
    Set,
    Scalar,
    Unknown,
}

impl ContainerKind {
    /// Mutable containers participate in shared-state analysis.
    pub fn is_mutable_container(&self) -> bool {
        matches!(self, Self::Sequence | Self::Mapping | Self::Set)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
            Self::Set => "set",
            Self::Scalar => "scalar",
            Self::Unknown => "unknown",
        }
    }
}

/// Derive a dotted module id from a path: `pkg/util.py` → `pkg.util`.
pub fn module_id_from_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./");
    let without_ext = trimmed
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(trimmed);
    without_ext.replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_id_strips_extension_and_joins_dirs() {
        assert_eq!(module_id_from_path("pkg/util.py"), "pkg.util");
        assert_eq!(module_id_from_path("./app.py"), "app");
        assert_eq!(module_id_from_path("a\\b\\c.py"), "a.b.c");
    }

    #[test]
    fn language_detection_from_extension() {
        assert_eq!(Language::from_path("x.py"), Language::Python);
        assert_eq!(Language::from_path("x.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
        assert!(Language::Python.is_supported());
        assert!(!Language::Go.is_supported());
    }
}
