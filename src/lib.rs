//! Generate Protocol Buffer definitions from Go struct declarations.
//!
//! `go-proto-gen` reads Go source files and emits a proto3 `message` for
//! every struct type they declare, so in-process data structures can be
//! moved to a wire-serializable schema without hand-translating each field.
//!
//! # Features
//!
//! - One message per struct, in declaration order
//! - Field numbers assigned from declaration order (compact or positional)
//! - Doc comments on structs and fields carried over verbatim
//! - Slices become `repeated`, pointers are erased, `time.Time` becomes
//!   `google.protobuf.Timestamp`
//! - Types with no mapping (maps, funcs, channels, ...) fall back to `string`
//! - Go `_test` files are skipped; files that fail to parse are reported and
//!   skipped without stopping the run
//! - Conversion function stubs for a struct/message pair
//! - Deterministic output: byte-identical across runs
//!
//! # Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use go_proto_gen::codegen::{self, GenerateOptions};
//! use go_proto_gen::source::GoParser;
//!
//! let paths = vec![PathBuf::from("models/person.go")];
//! let stats = codegen::generate(
//!     &paths,
//!     &GoParser,
//!     &GenerateOptions::default(),
//!     &mut std::io::stdout(),
//!     &mut std::io::stderr(),
//! )?;
//! eprintln!("Generated {} messages", stats.messages_generated);
//! # Ok::<(), go_proto_gen::error::Error>(())
//! ```

pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod stubs;
pub mod type_map;
