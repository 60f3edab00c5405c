//! Go source units: the syntax tree the generator walks, and loading.
//!
//! The tree is deliberately narrow. It records the package name and every
//! top-level `type` declaration, in source order, with just enough detail
//! about field types for the [`crate::type_map`] rules. Everything else in
//! the file (functions, variables, constants, imports) is parsed only far
//! enough to be skipped.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One parsed Go file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Path the unit was loaded from, as given on the command line.
    pub path: PathBuf,

    /// Name from the `package` clause.
    pub package: String,

    /// Top-level type declarations in source order. Grouped declarations
    /// (`type ( ... )`) are flattened into individual entries.
    pub decls: Vec<TypeDecl>,
}

/// A single `type Name ...` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Declared type name.
    pub name: String,

    /// Doc comment lines, verbatim including the `//` or `/* */` markers.
    pub doc: Vec<String>,

    /// What the name is declared as.
    pub shape: DeclShape,
}

impl TypeDecl {
    /// Fields of the declaration if it is a record (struct) type.
    pub fn record_fields(&self) -> Option<&[Field]> {
        match &self.shape {
            DeclShape::Record(fields) => Some(fields),
            DeclShape::Alias(_) | DeclShape::Defined(_) => None,
        }
    }
}

/// The underlying shape of a type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclShape {
    /// `type T struct { ... }`
    Record(Vec<Field>),

    /// `type T = U`
    Alias(TypeExpr),

    /// `type T U` where `U` is not a struct literal.
    Defined(TypeExpr),
}

/// One struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name, or `None` for an embedded field.
    pub name: Option<String>,

    /// Declared type.
    pub ty: TypeExpr,

    /// Doc comment lines, verbatim.
    pub doc: Vec<String>,
}

impl Field {
    /// A named field without documentation.
    pub fn named(name: impl Into<String>, ty: TypeExpr) -> Self {
        Field {
            name: Some(name.into()),
            ty,
            doc: Vec::new(),
        }
    }

    /// An embedded (anonymous) field.
    pub fn embedded(ty: TypeExpr) -> Self {
        Field {
            name: None,
            ty,
            doc: Vec::new(),
        }
    }

    /// Attach doc comment lines.
    pub fn with_doc<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// A Go type expression, reduced to the shapes the mapper distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A bare identifier such as `string` or `Order`.
    Atomic(String),

    /// `[]T` or `[N]T`.
    SequenceOf(Box<TypeExpr>),

    /// `*T`.
    OptionalOf(Box<TypeExpr>),

    /// `pkg.T`.
    Qualified { namespace: String, name: String },

    /// Anything the mapper has no rule for.
    Other(OtherKind),
}

impl TypeExpr {
    pub fn atomic(name: impl Into<String>) -> Self {
        TypeExpr::Atomic(name.into())
    }

    pub fn sequence_of(inner: TypeExpr) -> Self {
        TypeExpr::SequenceOf(Box::new(inner))
    }

    pub fn optional_of(inner: TypeExpr) -> Self {
        TypeExpr::OptionalOf(Box::new(inner))
    }

    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeExpr::Qualified {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Type shapes with no dedicated mapping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherKind {
    Map,
    Channel,
    Function,
    Interface,
    Struct,
    Generic,
}

impl fmt::Display for OtherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OtherKind::Map => "map",
            OtherKind::Channel => "channel",
            OtherKind::Function => "function",
            OtherKind::Interface => "interface",
            OtherKind::Struct => "struct literal",
            OtherKind::Generic => "generic instantiation",
        };
        f.write_str(s)
    }
}

/// Produces syntax trees for source units.
///
/// The generator never reads files itself; it hands each path to a parser
/// and either walks the returned tree or reports the error and moves on.
pub trait SourceParser {
    fn parse(&self, path: &Path) -> Result<SourceUnit>;
}

/// Parses Go files from disk with the crate's own front end.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoParser;

impl SourceParser for GoParser {
    fn parse(&self, path: &Path) -> Result<SourceUnit> {
        load_source(path)
    }
}

/// Read and parse a Go source file.
pub fn load_source(path: &Path) -> Result<SourceUnit> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    crate::parser::parse_source(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fields_only_for_structs() {
        let record = TypeDecl {
            name: "Person".to_string(),
            doc: vec![],
            shape: DeclShape::Record(vec![Field::named("Name", TypeExpr::atomic("string"))]),
        };
        let alias = TypeDecl {
            name: "ID".to_string(),
            doc: vec![],
            shape: DeclShape::Alias(TypeExpr::atomic("string")),
        };
        let defined = TypeDecl {
            name: "Status".to_string(),
            doc: vec![],
            shape: DeclShape::Defined(TypeExpr::atomic("int")),
        };

        assert_eq!(record.record_fields().map(<[Field]>::len), Some(1));
        assert!(alias.record_fields().is_none());
        assert!(defined.record_fields().is_none());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_source(Path::new("/definitely/not/here.go")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.go"));
    }

    #[test]
    fn field_builders() {
        let f = Field::named("Tags", TypeExpr::sequence_of(TypeExpr::atomic("string")))
            .with_doc(["// Tags on the item."]);
        assert_eq!(f.name.as_deref(), Some("Tags"));
        assert_eq!(f.doc, vec!["// Tags on the item.".to_string()]);

        let e = Field::embedded(TypeExpr::optional_of(TypeExpr::atomic("Base")));
        assert!(e.name.is_none());
    }
}
