//! Go conversion function stubs between a struct and its proto message.
//!
//! The stubs only handle the `nil` case; the body of each conversion is left
//! as a marked placeholder for a person to fill in.

use std::str::FromStr;

use crate::error::{Error, Result};

const TO_PROTO_TEMPLATE: &str = r#"
// To{{proto}}Proto converts {{struct}} to {{proto}}.
func To{{proto}}Proto(s *{{struct}}) *{{proto}} {
	if s == nil {
		return nil
	}
	return &{{proto}}{
		// TODO: Add field mappings here.
	}
}
"#;

const FROM_PROTO_TEMPLATE: &str = r#"
// From{{proto}}Proto converts {{proto}} to {{struct}}.
func From{{proto}}Proto(p *{{proto}}) *{{struct}} {
	if p == nil {
		return nil
	}
	return &{{struct}}{
		// TODO: Add field mappings here.
	}
}
"#;

/// A fixed text skeleton with `{{name}}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    source: &'static str,
}

impl Template {
    pub const fn new(source: &'static str) -> Self {
        Template { source }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Result<Vec<&'static str>> {
        let mut names = Vec::new();
        for segment in segments(self.source) {
            if let Segment::Placeholder(name) = segment? {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Substitute every placeholder from `bindings`.
    ///
    /// Fails if the template names a placeholder with no binding.
    pub fn render(&self, bindings: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in segments(self.source) {
            match segment? {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = bindings
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            Error::Template(format!("no value bound for placeholder '{name}'"))
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn segments(source: &str) -> impl Iterator<Item = Result<Segment<'_>>> {
    let mut rest = source;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(open) = rest.find("{{") else {
            let text = rest;
            rest = "";
            return Some(Ok(Segment::Text(text)));
        };
        if open > 0 {
            let text = &rest[..open];
            rest = &rest[open..];
            return Some(Ok(Segment::Text(text)));
        }
        let Some(close) = rest.find("}}") else {
            rest = "";
            return Some(Err(Error::Template("unterminated placeholder".to_string())));
        };
        let name = rest[2..close].trim();
        rest = &rest[close + 2..];
        if name.is_empty() {
            return Some(Err(Error::Template("empty placeholder name".to_string())));
        }
        Some(Ok(Segment::Placeholder(name)))
    })
}

/// Stub converting a `*struct_name` into a `*proto_name`.
pub fn generate_to_proto(struct_name: &str, proto_name: &str) -> Result<String> {
    Template::new(TO_PROTO_TEMPLATE).render(&[("struct", struct_name), ("proto", proto_name)])
}

/// Stub converting a `*proto_name` back into a `*struct_name`.
pub fn generate_from_proto(proto_name: &str, struct_name: &str) -> Result<String> {
    Template::new(FROM_PROTO_TEMPLATE).render(&[("struct", struct_name), ("proto", proto_name)])
}

/// A struct/message name pair, written `Struct` or `Struct:Message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubPair {
    pub struct_name: String,
    pub proto_name: String,
}

impl StubPair {
    /// Both conversion stubs for this pair.
    pub fn render(&self) -> Result<String> {
        let mut out = generate_to_proto(&self.struct_name, &self.proto_name)?;
        out.push_str(&generate_from_proto(&self.proto_name, &self.struct_name)?);
        Ok(out)
    }
}

impl FromStr for StubPair {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (struct_name, proto_name) = match s.split_once(':') {
            Some((st, pr)) => (st.trim(), pr.trim()),
            None => (s.trim(), s.trim()),
        };
        if struct_name.is_empty() || proto_name.is_empty() {
            return Err(format!("expected STRUCT or STRUCT:MESSAGE, got '{s}'"));
        }
        Ok(StubPair {
            struct_name: struct_name.to_string(),
            proto_name: proto_name.to_string(),
        })
    }
}
