//! Protocol Buffer code generation from Go source units.
//!
//! Generates proto3 `message` blocks from the struct declarations of each
//! [`SourceUnit`]:
//! - one message per struct, in declaration order
//! - one numbered field per named struct field, in declaration order
//! - doc comments on structs and fields carried over verbatim
//!
//! The generated output is deterministic: identical input always produces
//! byte-identical output.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::source::{Field, SourceParser, SourceUnit, TypeDecl};
use crate::type_map::TypeMapper;

/// Substring marking a path as a Go test file.
pub const DEFAULT_TEST_MARKER: &str = "_test";

/// How field numbers are assigned when a struct has embedded fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NumberingPolicy {
    /// Only emitted fields are numbered: `1..=N` with no gaps.
    #[default]
    Compact,

    /// Every field keeps its declaration position as its number, so an
    /// embedded field leaves a gap where it would have been.
    Positional,
}

/// Generation settings, fixed for a whole run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub numbering: NumberingPolicy,

    /// Paths containing this substring are skipped without parsing.
    /// An empty marker disables the filter.
    pub test_marker: String,

    pub type_map: TypeMapper,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            numbering: NumberingPolicy::default(),
            test_marker: DEFAULT_TEST_MARKER.to_string(),
            type_map: TypeMapper::default(),
        }
    }
}

/// Statistics collected during generation for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationStats {
    pub units_processed: usize,
    pub units_skipped: usize,
    pub parse_failures: usize,
    pub messages_generated: usize,
    pub fields_generated: usize,
    pub anonymous_fields_skipped: usize,
    pub unknown_types_defaulted: usize,
}

/// Generate proto definitions for every source unit in `paths`.
///
/// Each unit is parsed with `parser` and rendered completely before its
/// text is written to `out` in one piece. A unit that fails to parse is
/// reported on `err` and skipped; the remaining units are still processed.
/// Only a failure to write to `out` or `err` aborts the run.
pub fn generate<P, W, E>(
    paths: &[PathBuf],
    parser: &P,
    options: &GenerateOptions,
    out: &mut W,
    err: &mut E,
) -> Result<GenerationStats>
where
    P: SourceParser + ?Sized,
    W: Write + ?Sized,
    E: Write + ?Sized,
{
    let mut stats = GenerationStats::default();

    for path in paths {
        if is_test_unit(path, &options.test_marker) {
            debug!(path = %path.display(), "skipping test unit");
            stats.units_skipped += 1;
            continue;
        }

        let unit = match parser.parse(path) {
            Ok(unit) => unit,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "parse failed, skipping unit");
                stats.parse_failures += 1;
                writeln!(err, "error: {e}").map_err(|source| Error::Write { source })?;
                continue;
            }
        };

        let text = generate_unit(&unit, options, &mut stats);
        out.write_all(text.as_bytes())
            .map_err(|source| Error::Write { source })?;
        stats.units_processed += 1;
        info!(path = %path.display(), decls = unit.decls.len(), "unit processed");
    }

    out.flush().map_err(|source| Error::Write { source })?;
    Ok(stats)
}

fn is_test_unit(path: &std::path::Path, marker: &str) -> bool {
    !marker.is_empty() && path.to_string_lossy().contains(marker)
}

// ── Source walking ─────────────────────────────────────────────────────

/// Render one source unit: a header naming the unit, a blank line, then a
/// message for every struct declaration in source order.
///
/// Declarations that are not structs are ignored.
pub fn generate_unit(
    unit: &SourceUnit,
    options: &GenerateOptions,
    stats: &mut GenerationStats,
) -> String {
    let mut out = String::new();

    writeln!(
        out,
        "// Protobuf definitions generated from {}",
        unit.path.display()
    )
    .unwrap();
    writeln!(out).unwrap();

    for decl in &unit.decls {
        let Some(fields) = decl.record_fields() else {
            debug!(decl = %decl.name, "not a struct, skipping");
            continue;
        };
        write_message(
            &mut out,
            &options.type_map,
            decl,
            fields,
            options.numbering,
            stats,
        );
        stats.messages_generated += 1;
    }

    out
}

// ── Message emission ───────────────────────────────────────────────────

/// Render a struct declaration as a proto message, preceded by its doc
/// comment. Returns `None` if `decl` is not a struct.
pub fn emit_message(
    mapper: &TypeMapper,
    decl: &TypeDecl,
    policy: NumberingPolicy,
) -> Option<String> {
    let fields = decl.record_fields()?;
    let mut out = String::new();
    write_message(
        &mut out,
        mapper,
        decl,
        fields,
        policy,
        &mut GenerationStats::default(),
    );
    Some(out)
}

fn write_message(
    out: &mut String,
    mapper: &TypeMapper,
    decl: &TypeDecl,
    fields: &[Field],
    policy: NumberingPolicy,
    stats: &mut GenerationStats,
) {
    for line in &decl.doc {
        writeln!(out, "{line}").unwrap();
    }
    writeln!(out, "message {} {{", decl.name).unwrap();

    stats.anonymous_fields_skipped += fields.iter().filter(|f| f.name.is_none()).count();

    for (number, field) in assign_field_numbers(fields, policy) {
        let Some(line) = translate_field(mapper, field, number) else {
            continue;
        };
        if line.defaulted {
            debug!(
                record = %decl.name,
                field = ?field.name,
                "no mapping for field type, defaulting to string"
            );
            stats.unknown_types_defaulted += 1;
        }
        writeln!(out, "{}", line.text).unwrap();
        stats.fields_generated += 1;
    }

    writeln!(out, "}}").unwrap();
}

/// Pair each named field with its proto field number.
///
/// Anonymous (embedded) fields never appear in the result. Under
/// [`NumberingPolicy::Compact`] they also take no number; under
/// [`NumberingPolicy::Positional`] they use up their slot.
pub fn assign_field_numbers(fields: &[Field], policy: NumberingPolicy) -> Vec<(u32, &Field)> {
    match policy {
        NumberingPolicy::Compact => fields
            .iter()
            .filter(|f| f.name.is_some())
            .zip(1u32..)
            .map(|(f, n)| (n, f))
            .collect(),
        NumberingPolicy::Positional => fields
            .iter()
            .zip(1u32..)
            .filter(|(f, _)| f.name.is_some())
            .map(|(f, n)| (n, f))
            .collect(),
    }
}

// ── Field translation ──────────────────────────────────────────────────

/// A rendered proto field line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLine {
    /// Doc comment lines followed by the field itself, no trailing newline.
    pub text: String,

    /// The field type had no mapping and fell back to `string`.
    pub defaulted: bool,
}

/// Render one struct field as a numbered proto field line, preceded by its
/// doc comment lines. Returns `None` for embedded fields.
pub fn translate_field(mapper: &TypeMapper, field: &Field, number: u32) -> Option<FieldLine> {
    let name = field.name.as_deref()?;
    let mapped = mapper.resolve(&field.ty);
    Some(FieldLine {
        text: render_field(&field.doc, &mapped.proto, name, number),
        defaulted: mapped.defaulted,
    })
}

fn render_field(doc: &[String], proto_type: &str, name: &str, number: u32) -> String {
    let mut out = String::new();
    for line in doc {
        writeln!(out, "{line}").unwrap();
    }
    write!(out, "  {proto_type} {name} = {number};").unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DeclShape, OtherKind, TypeExpr};

    fn record(name: &str, fields: Vec<Field>) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            doc: vec![],
            shape: DeclShape::Record(fields),
        }
    }

    fn person() -> TypeDecl {
        record(
            "Person",
            vec![
                Field::named("Name", TypeExpr::atomic("string")),
                Field::named("Age", TypeExpr::atomic("int")),
            ],
        )
    }

    #[test]
    fn translate_named_field() {
        let mapper = TypeMapper::default();
        let field = Field::named("Age", TypeExpr::atomic("int64"));
        let line = translate_field(&mapper, &field, 3).unwrap();
        assert_eq!(line.text, "  int64 Age = 3;");
        assert!(!line.defaulted);
    }

    #[test]
    fn translate_field_keeps_doc_lines_verbatim() {
        let mapper = TypeMapper::default();
        let field = Field::named("Created", TypeExpr::qualified("time", "Time"))
            .with_doc(["// Created is set on insert.", "//   (UTC)"]);
        assert_eq!(
            translate_field(&mapper, &field, 1).unwrap().text,
            "// Created is set on insert.\n//   (UTC)\n  google.protobuf.Timestamp Created = 1;"
        );
    }

    #[test]
    fn translate_unknown_type_is_flagged() {
        let mapper = TypeMapper::default();
        let field = Field::named("Attrs", TypeExpr::Other(OtherKind::Map));
        let line = translate_field(&mapper, &field, 2).unwrap();
        assert_eq!(line.text, "  string Attrs = 2;");
        assert!(line.defaulted);
    }

    #[test]
    fn translate_embedded_field_is_empty() {
        let mapper = TypeMapper::default();
        let field = Field::embedded(TypeExpr::atomic("Base"));
        assert!(translate_field(&mapper, &field, 1).is_none());
    }

    #[test]
    fn emit_person_message() {
        let out = emit_message(&TypeMapper::default(), &person(), NumberingPolicy::Compact);
        assert_eq!(
            out.as_deref(),
            Some("message Person {\n  string Name = 1;\n  int32 Age = 2;\n}\n")
        );
    }

    #[test]
    fn emit_message_with_doc_comment() {
        let mut decl = person();
        decl.doc = vec!["// Person is a human.".to_string()];
        let out = emit_message(&TypeMapper::default(), &decl, NumberingPolicy::Compact).unwrap();
        assert!(out.starts_with("// Person is a human.\nmessage Person {\n"));
    }

    #[test]
    fn emit_message_ignores_non_records() {
        let decl = TypeDecl {
            name: "ID".to_string(),
            doc: vec![],
            shape: DeclShape::Alias(TypeExpr::atomic("string")),
        };
        assert!(emit_message(&TypeMapper::default(), &decl, NumberingPolicy::Compact).is_none());
    }

    #[test]
    fn emit_empty_struct() {
        let out = emit_message(
            &TypeMapper::default(),
            &record("Empty", vec![]),
            NumberingPolicy::Compact,
        );
        assert_eq!(out.as_deref(), Some("message Empty {\n}\n"));
    }

    #[test]
    fn compact_numbering_skips_embedded_without_gap() {
        let decl = record(
            "Order",
            vec![
                Field::named("ID", TypeExpr::atomic("string")),
                Field::embedded(TypeExpr::atomic("Base")),
                Field::named("Total", TypeExpr::atomic("float64")),
            ],
        );
        let out = emit_message(&TypeMapper::default(), &decl, NumberingPolicy::Compact).unwrap();
        assert_eq!(
            out,
            "message Order {\n  string ID = 1;\n  double Total = 2;\n}\n"
        );
    }

    #[test]
    fn positional_numbering_leaves_gap_for_embedded() {
        let decl = record(
            "Order",
            vec![
                Field::named("ID", TypeExpr::atomic("string")),
                Field::embedded(TypeExpr::atomic("Base")),
                Field::named("Total", TypeExpr::atomic("float64")),
            ],
        );
        let out = emit_message(&TypeMapper::default(), &decl, NumberingPolicy::Positional).unwrap();
        assert_eq!(
            out,
            "message Order {\n  string ID = 1;\n  double Total = 3;\n}\n"
        );
    }

    #[test]
    fn assign_numbers_by_policy() {
        let fields = vec![
            Field::embedded(TypeExpr::atomic("Base")),
            Field::named("A", TypeExpr::atomic("int")),
            Field::named("B", TypeExpr::atomic("int")),
        ];
        let compact: Vec<u32> = assign_field_numbers(&fields, NumberingPolicy::Compact)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        let positional: Vec<u32> = assign_field_numbers(&fields, NumberingPolicy::Positional)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(compact, vec![1, 2]);
        assert_eq!(positional, vec![2, 3]);
    }

    #[test]
    fn generate_unit_walks_records_in_order() {
        let unit = SourceUnit {
            path: PathBuf::from("models/person.go"),
            package: "models".to_string(),
            decls: vec![
                person(),
                TypeDecl {
                    name: "Status".to_string(),
                    doc: vec![],
                    shape: DeclShape::Defined(TypeExpr::atomic("int")),
                },
                record(
                    "Team",
                    vec![
                        Field::named(
                            "Members",
                            TypeExpr::sequence_of(TypeExpr::optional_of(TypeExpr::atomic(
                                "Person",
                            ))),
                        ),
                        Field::named("Extra", TypeExpr::Other(OtherKind::Map)),
                        Field::embedded(TypeExpr::atomic("Base")),
                    ],
                ),
            ],
        };

        let mut stats = GenerationStats::default();
        let out = generate_unit(&unit, &GenerateOptions::default(), &mut stats);
        assert_eq!(
            out,
            "// Protobuf definitions generated from models/person.go\n\
             \n\
             message Person {\n  string Name = 1;\n  int32 Age = 2;\n}\n\
             message Team {\n  repeated Person Members = 1;\n  string Extra = 2;\n}\n"
        );
        assert_eq!(stats.messages_generated, 2);
        assert_eq!(stats.fields_generated, 4);
        assert_eq!(stats.anonymous_fields_skipped, 1);
        assert_eq!(stats.unknown_types_defaulted, 1);
    }

    #[test]
    fn test_marker_is_case_sensitive_substring() {
        assert!(is_test_unit(&PathBuf::from("pkg/model_test.go"), "_test"));
        assert!(is_test_unit(&PathBuf::from("pkg_test/model.go"), "_test"));
        assert!(!is_test_unit(&PathBuf::from("pkg/model_TEST.go"), "_test"));
        assert!(!is_test_unit(&PathBuf::from("pkg/model_test.go"), ""));
    }
}
