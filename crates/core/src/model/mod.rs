//! Symbol model for the class language: classes, variables, functions.
//!
//! The table owns every [`ClassSymbol`]; inheritance links are plain
//! [`ClassId`] indices re-derived by the linker, so none of the link state
//! is ever serialized.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod table;

pub use table::{ClassId, ClassTable};

/// Per-file parse lifecycle. A class sits in `Parsing` while a background
/// pass owns it; resolution through such a class yields `Pending`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Unparsed,
    Parsing,
    Parsed,
}

/// Where a variable is declared.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    /// Instance variable of a class (`var ...`).
    Member,
    /// Function-body local (`local ...`).
    Local,
    /// Function signature parameter.
    Parameter,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    /// Declaration modifiers as written (`config`, `private`, `out`, ...).
    pub modifiers: Vec<String>,
    /// Declared type name. Resolved against the table lazily, on demand.
    pub type_name: String,
    pub doc: Option<String>,
    pub line: u32,
    pub scope: VarScope,
}

impl VariableSymbol {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    /// `None` for functions without a declared return type.
    pub return_type: Option<String>,
    pub params: Vec<VariableSymbol>,
    pub line: u32,
    pub is_event: bool,
    pub is_const: bool,
    pub doc: Option<String>,
}

impl FunctionSymbol {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// One class declaration, as extracted from a single source file.
///
/// `parent_name` is the parent as written in source; `parent`, `children`,
/// `orphaned` and `cyclic` are owned by the linker and rebuilt on every
/// link pass (and therefore skipped by the snapshot).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub parent_name: Option<String>,
    pub variables: Vec<VariableSymbol>,
    pub functions: Vec<FunctionSymbol>,
    pub file: PathBuf,
    /// Line of the class header declaration.
    pub line: u32,
    pub state: ParseState,

    #[serde(skip)]
    pub parent: Option<ClassId>,
    #[serde(skip)]
    pub children: Vec<ClassId>,
    #[serde(skip)]
    pub orphaned: bool,
    #[serde(skip)]
    pub cyclic: bool,
}

impl ClassSymbol {
    pub fn new(name: impl Into<String>, parent_name: Option<String>, file: PathBuf) -> Self {
        Self {
            name: name.into(),
            parent_name,
            variables: Vec::new(),
            functions: Vec::new(),
            file,
            line: 1,
            state: ParseState::Unparsed,
            parent: None,
            children: Vec::new(),
            orphaned: false,
            cyclic: false,
        }
    }

    /// First member variable with the given name, case-insensitive.
    pub fn find_variable(&self, name: &str) -> Option<&VariableSymbol> {
        self.variables
            .iter()
            .filter(|v| v.scope == VarScope::Member)
            .find(|v| v.is_named(name))
    }

    /// First function/event with the given name, case-insensitive.
    pub fn find_function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions.iter().find(|f| f.is_named(name))
    }

    pub fn has_parsed(&self) -> bool {
        self.state == ParseState::Parsed
    }
}

/// What kind of declared entity a [`Declaration`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Variable,
    Function,
    Local,
    Parameter,
}

/// A resolved declaration: enough to jump to it (file + line) and to keep
/// resolving through it (declared type / return type).
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared type for variables, return type for functions, the class
    /// name itself for classes. `None` for functions without a return type.
    pub type_name: Option<String>,
    pub file: PathBuf,
    pub line: u32,
    pub doc: Option<String>,
    /// Class this declaration originates from, when it has one.
    pub origin: Option<ClassId>,
}

impl Declaration {
    pub fn for_class(id: ClassId, class: &ClassSymbol) -> Self {
        Self {
            name: class.name.clone(),
            kind: SymbolKind::Class,
            type_name: Some(class.name.clone()),
            file: class.file.clone(),
            line: class.line,
            doc: None,
            origin: Some(id),
        }
    }

    pub fn for_variable(var: &VariableSymbol, file: &Path, origin: Option<ClassId>) -> Self {
        let kind = match var.scope {
            VarScope::Member => SymbolKind::Variable,
            VarScope::Local => SymbolKind::Local,
            VarScope::Parameter => SymbolKind::Parameter,
        };
        Self {
            name: var.name.clone(),
            kind,
            type_name: Some(var.type_name.clone()),
            file: file.to_path_buf(),
            line: var.line,
            doc: var.doc.clone(),
            origin,
        }
    }

    pub fn for_function(func: &FunctionSymbol, file: &Path, origin: Option<ClassId>) -> Self {
        Self {
            name: func.name.clone(),
            kind: SymbolKind::Function,
            type_name: func.return_type.clone(),
            file: file.to_path_buf(),
            line: func.line,
            doc: func.doc.clone(),
            origin,
        }
    }
}
