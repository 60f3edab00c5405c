//! Maps Go type expressions to Protocol Buffer type strings.
//!
//! # Type Mapping Table
//!
//! | Go type | Proto type | Notes |
//! |---------|-----------|-------|
//! | `string` | `string` | |
//! | `int`, `int32`, `int8`, `int16`, `rune` | `int32` | |
//! | `int64` | `int64` | |
//! | `uint`, `uint8`, `uint16`, `uint32`, `byte` | `uint32` | |
//! | `uint64` | `uint64` | |
//! | `float32` | `float` | |
//! | `float64` | `double` | |
//! | `bool` | `bool` | |
//! | `time.Time` | `google.protobuf.Timestamp` | |
//! | `time.Duration` | `google.protobuf.Duration` | |
//! | `error`, `any` | `string` | |
//! | `Batcher` | `Batch` | Domain marker type |
//! | `[]T`, `[N]T` | `repeated T` | Recursive |
//! | `*T` | `T` | Pointer erased |
//! | `pkg.T` | `pkg.T` | Unless listed above |
//! | Other identifiers | unchanged | Assumed to name another message |
//! | maps, channels, funcs, interfaces, struct literals, generics | `string` | Silent fallback |

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::source::TypeExpr;

/// Proto type used for every shape without a mapping rule.
pub const FALLBACK_TYPE: &str = "string";

lazy_static! {
    static ref BUILTIN_TYPES: BTreeMap<&'static str, &'static str> = BTreeMap::from([
        ("string", "string"),
        ("int", "int32"),
        ("int32", "int32"),
        ("int8", "int32"),
        ("int16", "int32"),
        ("rune", "int32"),
        ("int64", "int64"),
        ("uint", "uint32"),
        ("uint8", "uint32"),
        ("uint16", "uint32"),
        ("uint32", "uint32"),
        ("byte", "uint32"),
        ("uint64", "uint64"),
        ("float32", "float"),
        ("float64", "double"),
        ("bool", "bool"),
        ("time.Time", "google.protobuf.Timestamp"),
        ("time.Duration", "google.protobuf.Duration"),
        ("error", "string"),
        ("any", "string"),
        ("Batcher", "Batch"),
    ]);
}

/// Result of mapping one type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// Proto type text, e.g. `repeated google.protobuf.Timestamp`.
    pub proto: String,

    /// Some part of the expression had no rule and fell back to
    /// [`FALLBACK_TYPE`].
    pub defaulted: bool,
}

/// Go-to-proto type mapper.
///
/// The lookup table is fixed at construction. Mapping never fails: shapes
/// with no rule become [`FALLBACK_TYPE`].
#[derive(Debug, Clone)]
pub struct TypeMapper {
    table: BTreeMap<String, String>,
}

impl Default for TypeMapper {
    fn default() -> Self {
        TypeMapper {
            table: BUILTIN_TYPES
                .iter()
                .map(|(go, proto)| (go.to_string(), proto.to_string()))
                .collect(),
        }
    }
}

impl TypeMapper {
    /// Built-in table extended (and overridden) by `overrides`.
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut mapper = TypeMapper::default();
        mapper.table.extend(overrides);
        mapper
    }

    /// Map a type expression to its proto type string.
    pub fn map_type(&self, expr: &TypeExpr) -> String {
        self.resolve(expr).proto
    }

    /// Map a type expression, also reporting whether the fallback was used.
    pub fn resolve(&self, expr: &TypeExpr) -> MappedType {
        match expr {
            TypeExpr::Atomic(name) => MappedType {
                proto: self.lookup(name).unwrap_or(name).to_string(),
                defaulted: false,
            },
            TypeExpr::SequenceOf(inner) => {
                let inner = self.resolve(inner);
                MappedType {
                    proto: format!("repeated {}", inner.proto),
                    defaulted: inner.defaulted,
                }
            }
            TypeExpr::OptionalOf(inner) => self.resolve(inner),
            TypeExpr::Qualified { namespace, name } => {
                let full = format!("{namespace}.{name}");
                let proto = match self.lookup(&full) {
                    Some(mapped) => mapped.to_string(),
                    None => full,
                };
                MappedType {
                    proto,
                    defaulted: false,
                }
            }
            TypeExpr::Other(_) => MappedType {
                proto: FALLBACK_TYPE.to_string(),
                defaulted: true,
            },
        }
    }

    /// Table entry for a (possibly package-qualified) Go type name.
    pub fn lookup(&self, go_name: &str) -> Option<&str> {
        self.table.get(go_name).map(String::as_str)
    }
}

/// On-disk form of a type-map file.
///
/// ```json
/// { "types": { "decimal.Decimal": "string", "Batcher": "BatchV2" } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeMapFile {
    /// Go type name (bare or `pkg.Type`) to proto type.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

/// Load a type-map file and build a mapper from it.
pub fn load_type_map(path: &Path) -> Result<TypeMapper> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: TypeMapFile = serde_json::from_str(&content)?;

    for (go, proto) in &file.types {
        if go.trim().is_empty() || proto.trim().is_empty() {
            return Err(Error::TypeMap(format!(
                "{}: empty type name in entry {go:?} -> {proto:?}",
                path.display()
            )));
        }
    }

    Ok(TypeMapper::with_overrides(file.types))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::OtherKind;
    use test_case::test_case;

    #[test_case("string", "string")]
    #[test_case("int", "int32")]
    #[test_case("int32", "int32")]
    #[test_case("int64", "int64")]
    #[test_case("float32", "float")]
    #[test_case("float64", "double")]
    #[test_case("bool", "bool")]
    #[test_case("error", "string")]
    #[test_case("Batcher", "Batch")]
    #[test_case("uint64", "uint64")]
    #[test_case("byte", "uint32")]
    #[test_case("any", "string")]
    fn atomic_table_mapping(go: &str, proto: &str) {
        let mapper = TypeMapper::default();
        assert_eq!(mapper.map_type(&TypeExpr::atomic(go)), proto);
    }

    #[test]
    fn unknown_atomic_passes_through() {
        let mapper = TypeMapper::default();
        assert_eq!(mapper.map_type(&TypeExpr::atomic("Order")), "Order");
        assert!(!mapper.resolve(&TypeExpr::atomic("Order")).defaulted);
    }

    #[test]
    fn well_known_qualified_types() {
        let mapper = TypeMapper::default();
        assert_eq!(
            mapper.map_type(&TypeExpr::qualified("time", "Time")),
            "google.protobuf.Timestamp"
        );
        assert_eq!(
            mapper.map_type(&TypeExpr::qualified("time", "Duration")),
            "google.protobuf.Duration"
        );
    }

    #[test]
    fn other_qualified_types_render_verbatim() {
        let mapper = TypeMapper::default();
        assert_eq!(
            mapper.map_type(&TypeExpr::qualified("decimal", "Decimal")),
            "decimal.Decimal"
        );
    }

    #[test]
    fn sequences_and_pointers() {
        let mapper = TypeMapper::default();
        let tags = TypeExpr::sequence_of(TypeExpr::optional_of(TypeExpr::atomic("string")));
        assert_eq!(mapper.map_type(&tags), "repeated string");

        let ptr_to_slice = TypeExpr::optional_of(TypeExpr::sequence_of(TypeExpr::atomic("int")));
        assert_eq!(mapper.map_type(&ptr_to_slice), "repeated int32");

        let nested = TypeExpr::sequence_of(TypeExpr::sequence_of(TypeExpr::qualified(
            "time", "Time",
        )));
        assert_eq!(
            mapper.map_type(&nested),
            "repeated repeated google.protobuf.Timestamp"
        );
    }

    #[test_case(OtherKind::Map)]
    #[test_case(OtherKind::Channel)]
    #[test_case(OtherKind::Function)]
    #[test_case(OtherKind::Interface)]
    #[test_case(OtherKind::Struct)]
    #[test_case(OtherKind::Generic)]
    fn unmapped_shapes_fall_back_to_string(kind: OtherKind) {
        let mapper = TypeMapper::default();
        let mapped = mapper.resolve(&TypeExpr::Other(kind));
        assert_eq!(mapped.proto, "string");
        assert!(mapped.defaulted);
    }

    #[test]
    fn fallback_inside_sequence_is_reported() {
        let mapper = TypeMapper::default();
        let mapped = mapper.resolve(&TypeExpr::sequence_of(TypeExpr::Other(OtherKind::Map)));
        assert_eq!(mapped.proto, "repeated string");
        assert!(mapped.defaulted);
    }

    #[test]
    fn mapping_is_independent_of_call_order() {
        let mapper = TypeMapper::default();
        let exprs = [
            TypeExpr::atomic("int"),
            TypeExpr::Other(OtherKind::Map),
            TypeExpr::qualified("time", "Time"),
            TypeExpr::atomic("int"),
        ];
        let first: Vec<String> = exprs.iter().map(|e| mapper.map_type(e)).collect();
        let second: Vec<String> = exprs.iter().rev().map(|e| mapper.map_type(e)).collect();
        assert_eq!(first[0], first[3]);
        assert_eq!(first, second.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn overrides_extend_and_replace() {
        let mapper = TypeMapper::with_overrides([
            ("decimal.Decimal".to_string(), "string".to_string()),
            ("Batcher".to_string(), "BatchV2".to_string()),
        ]);
        assert_eq!(
            mapper.map_type(&TypeExpr::qualified("decimal", "Decimal")),
            "string"
        );
        assert_eq!(mapper.map_type(&TypeExpr::atomic("Batcher")), "BatchV2");
        assert_eq!(mapper.map_type(&TypeExpr::atomic("int")), "int32");
    }

    #[test]
    fn parse_type_map_file() {
        let file: TypeMapFile =
            serde_json::from_str(r#"{"types": {"uuid.UUID": "string"}}"#).unwrap();
        assert_eq!(file.types["uuid.UUID"], "string");

        let empty: TypeMapFile = serde_json::from_str("{}").unwrap();
        assert!(empty.types.is_empty());

        assert!(serde_json::from_str::<TypeMapFile>(r#"{"typos": {}}"#).is_err());
    }
}
