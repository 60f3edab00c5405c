//! Recursive-descent parser for the parts of Go the generator needs.
//!
//! Understands the package clause and top-level `type` declarations (single
//! and grouped, with or without type parameters) in full. `import`, `var`,
//! `const` and `func` declarations are skipped by bracket balancing, which
//! still rejects files whose brackets do not match.

use std::path::Path;

use crate::error::{Error, Result};
use crate::lexer::{self, Lexed, Token, TokenKind, is_keyword};
use crate::source::{DeclShape, Field, OtherKind, SourceUnit, TypeDecl, TypeExpr};

/// Parse Go source text into a [`SourceUnit`].
pub fn parse_source(path: &Path, text: &str) -> Result<SourceUnit> {
    let lexed = lexer::tokenize(path, text)?;
    let mut parser = Parser {
        path,
        lexed: &lexed,
        index: 0,
    };
    parser.parse_file()
}

struct Parser<'a> {
    path: &'a Path,
    lexed: &'a Lexed,
    index: usize,
}

impl<'a> Parser<'a> {
    // ── Token cursor ───────────────────────────────────────────────────

    fn peek(&self, offset: usize) -> &'a Token {
        let lexed: &'a Lexed = self.lexed;
        let tokens = &lexed.tokens;
        // The lexer always terminates the stream with an EOF token.
        &tokens[(self.index + offset).min(tokens.len() - 1)]
    }

    fn current(&self) -> &'a Token {
        self.peek(0)
    }

    fn advance(&mut self) {
        if self.current().kind != TokenKind::Eof {
            self.index += 1;
        }
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.current().is(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<()> {
        if self.eat(text) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{text}'")))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        let token = self.current();
        if token.kind == TokenKind::Ident && !is_keyword(&token.text) {
            self.advance();
            Ok(token.text.clone())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn skip_semicolons(&mut self) {
        while self.eat(";") {}
    }

    fn error_at(&self, token: &Token, message: String) -> Error {
        Error::Parse {
            path: self.path.display().to_string(),
            line: token.line,
            column: token.column,
            message,
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        let found = match token.kind {
            TokenKind::Eof => "EOF".to_string(),
            _ => format!("'{}'", token.text),
        };
        self.error_at(token, format!("expected {expected}, found {found}"))
    }

    // ── File structure ─────────────────────────────────────────────────

    fn parse_file(&mut self) -> Result<SourceUnit> {
        self.skip_semicolons();
        self.expect("package")?;
        let package = self.expect_ident()?;
        self.expect_decl_end()?;

        let mut decls = Vec::new();
        loop {
            let token = self.current();
            if token.kind == TokenKind::Eof {
                break;
            }
            match token.text.as_str() {
                ";" => self.advance(),
                "type" => self.parse_type_decl(&mut decls)?,
                "import" | "var" | "const" | "func" => self.skip_decl()?,
                _ => return Err(self.unexpected("declaration")),
            }
        }

        Ok(SourceUnit {
            path: self.path.to_path_buf(),
            package,
            decls,
        })
    }

    fn expect_decl_end(&mut self) -> Result<()> {
        if self.current().kind == TokenKind::Eof || self.eat(";") {
            Ok(())
        } else {
            Err(self.unexpected("';' or newline"))
        }
    }

    /// Skip an `import`, `var`, `const` or `func` declaration.
    fn skip_decl(&mut self) -> Result<()> {
        self.advance();
        loop {
            let token = self.current();
            match (token.kind, token.text.as_str()) {
                (TokenKind::Eof, _) => return Ok(()),
                (TokenKind::Punct, ";") => {
                    self.advance();
                    return Ok(());
                }
                (TokenKind::Punct, "(" | "[" | "{") => self.skip_balanced()?,
                (TokenKind::Punct, ")" | "]" | "}") => {
                    return Err(self.error_at(token, format!("unexpected '{}'", token.text)));
                }
                _ => self.advance(),
            }
        }
    }

    /// Consume a bracketed group starting at the current opening bracket,
    /// through its matching close.
    fn skip_balanced(&mut self) -> Result<()> {
        let mut stack: Vec<&str> = Vec::new();
        loop {
            let token = self.current();
            match (token.kind, token.text.as_str()) {
                (TokenKind::Eof, _) => {
                    return Err(self.error_at(token, "unexpected EOF".to_string()));
                }
                (TokenKind::Punct, "(") => stack.push(")"),
                (TokenKind::Punct, "[") => stack.push("]"),
                (TokenKind::Punct, "{") => stack.push("}"),
                (TokenKind::Punct, close @ (")" | "]" | "}")) => {
                    if stack.pop() != Some(close) {
                        return Err(self.error_at(token, format!("unexpected '{close}'")));
                    }
                }
                _ if stack.is_empty() => {
                    return Err(self.unexpected("'(', '[' or '{'"));
                }
                _ => {}
            }
            self.advance();
            if stack.is_empty() {
                return Ok(());
            }
        }
    }

    /// Index of the bracket closing the one at `start`, if it is balanced.
    fn matching_close(&self, start: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (offset, token) in self.lexed.tokens[start..].iter().enumerate() {
            match (token.kind, token.text.as_str()) {
                (TokenKind::Eof, _) => return None,
                (TokenKind::Punct, "(" | "[" | "{") => depth += 1,
                (TokenKind::Punct, ")" | "]" | "}") => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(start + offset);
                    }
                }
                _ => {}
            }
        }
        None
    }

    // ── Type declarations ──────────────────────────────────────────────

    fn parse_type_decl(&mut self, decls: &mut Vec<TypeDecl>) -> Result<()> {
        let group_doc = self.lexed.lead_comment(self.index);
        self.advance();

        if self.eat("(") {
            loop {
                self.skip_semicolons();
                if self.eat(")") {
                    break;
                }
                let own_doc = self.lexed.lead_comment(self.index);
                let doc = if own_doc.is_empty() {
                    group_doc.clone()
                } else {
                    own_doc
                };
                decls.push(self.parse_type_spec(doc)?);
                if !self.current().is(")") {
                    self.expect(";")?;
                }
            }
        } else {
            decls.push(self.parse_type_spec(group_doc)?);
        }

        self.expect_decl_end()
    }

    fn parse_type_spec(&mut self, doc: Vec<String>) -> Result<TypeDecl> {
        let name = self.expect_ident()?;

        if self.has_type_params() {
            self.skip_balanced()?;
        }

        let alias = self.eat("=");
        let shape = if !alias && self.current().is("struct") {
            DeclShape::Record(self.parse_struct()?)
        } else if alias {
            DeclShape::Alias(self.parse_type()?)
        } else {
            DeclShape::Defined(self.parse_type()?)
        };

        Ok(TypeDecl { name, doc, shape })
    }

    /// Distinguish `type T[P any] ...` from the array type in `type T [N]E`.
    fn has_type_params(&self) -> bool {
        if !self.current().is("[") {
            return false;
        }
        let first = self.peek(1);
        if first.kind != TokenKind::Ident || is_keyword(&first.text) {
            return false;
        }
        let second = self.peek(2);
        second.kind == TokenKind::Ident || matches!(second.text.as_str(), "," | "~" | "*" | "[" | "(")
    }

    /// Parse `struct { ... }` starting at the `struct` keyword.
    fn parse_struct(&mut self) -> Result<Vec<Field>> {
        self.expect("struct")?;
        self.expect("{")?;

        let mut fields = Vec::new();
        loop {
            self.skip_semicolons();
            if self.eat("}") {
                break;
            }
            let doc = self.lexed.lead_comment(self.index);
            self.parse_field_decl(doc, &mut fields)?;
            if !self.current().is("}") {
                self.expect(";")?;
            }
        }
        Ok(fields)
    }

    fn parse_field_decl(&mut self, doc: Vec<String>, fields: &mut Vec<Field>) -> Result<()> {
        if self.is_embedded_field() {
            let ty = self.parse_type()?;
            fields.push(Field::embedded(ty).with_doc(doc));
        } else {
            let mut names = vec![self.expect_ident()?];
            while self.eat(",") {
                names.push(self.expect_ident()?);
            }
            let ty = self.parse_type()?;
            for (i, name) in names.into_iter().enumerate() {
                let field = Field::named(name, ty.clone());
                fields.push(if i == 0 {
                    field.with_doc(doc.iter().cloned())
                } else {
                    field
                });
            }
        }

        // Struct tags carry no information the generator uses.
        if self.current().kind == TokenKind::String {
            self.advance();
        }
        Ok(())
    }

    /// Whether the field declaration at the cursor has no name, as in
    /// `Base`, `*Base`, `pkg.Base` or `Base[T]`.
    fn is_embedded_field(&self) -> bool {
        let token = self.current();
        if token.is("*") {
            return true;
        }
        if token.kind != TokenKind::Ident {
            return false;
        }

        let next = self.peek(1);
        let ends_field = |t: &Token| {
            t.kind == TokenKind::String || t.kind == TokenKind::Eof || t.is(";") || t.is("}")
        };
        if next.is(".") || ends_field(next) {
            return true;
        }
        if next.is("[") {
            return self
                .matching_close(self.index + 1)
                .and_then(|close| self.lexed.tokens.get(close + 1))
                .is_some_and(ends_field);
        }
        false
    }

    // ── Type expressions ───────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<TypeExpr> {
        let token = self.current();
        match (token.kind, token.text.as_str()) {
            (TokenKind::Punct, "*") => {
                self.advance();
                Ok(TypeExpr::optional_of(self.parse_type()?))
            }
            (TokenKind::Punct, "[") => {
                // `[]T`, `[N]T` and `[...]T` all reduce to a sequence.
                self.skip_balanced()?;
                Ok(TypeExpr::sequence_of(self.parse_type()?))
            }
            (TokenKind::Punct, "(") => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(")")?;
                Ok(inner)
            }
            (TokenKind::Punct, "<-") => {
                self.advance();
                self.expect("chan")?;
                self.parse_type()?;
                Ok(TypeExpr::Other(OtherKind::Channel))
            }
            (TokenKind::Ident, "map") => {
                self.advance();
                if !self.current().is("[") {
                    return Err(self.unexpected("'['"));
                }
                self.skip_balanced()?;
                self.parse_type()?;
                Ok(TypeExpr::Other(OtherKind::Map))
            }
            (TokenKind::Ident, "chan") => {
                self.advance();
                self.eat("<-");
                self.parse_type()?;
                Ok(TypeExpr::Other(OtherKind::Channel))
            }
            (TokenKind::Ident, "func") => {
                self.advance();
                self.skip_signature()?;
                Ok(TypeExpr::Other(OtherKind::Function))
            }
            (TokenKind::Ident, "interface") => {
                self.advance();
                if !self.current().is("{") {
                    return Err(self.unexpected("'{'"));
                }
                self.skip_balanced()?;
                Ok(TypeExpr::Other(OtherKind::Interface))
            }
            (TokenKind::Ident, "struct") => {
                self.parse_struct()?;
                Ok(TypeExpr::Other(OtherKind::Struct))
            }
            (TokenKind::Ident, name) if !is_keyword(name) => {
                self.advance();
                let base = if self.eat(".") {
                    let member = self.expect_ident()?;
                    TypeExpr::qualified(name, member)
                } else {
                    TypeExpr::atomic(name)
                };
                if self.current().is("[") {
                    self.skip_balanced()?;
                    return Ok(TypeExpr::Other(OtherKind::Generic));
                }
                Ok(base)
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// Skip a function signature: parameters and optional result.
    fn skip_signature(&mut self) -> Result<()> {
        if !self.current().is("(") {
            return Err(self.unexpected("'('"));
        }
        self.skip_balanced()?;

        let token = self.current();
        if token.is("(") {
            self.skip_balanced()?;
        } else if self.starts_type(token) {
            self.parse_type()?;
        }
        Ok(())
    }

    fn starts_type(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Ident => {
                !is_keyword(&token.text)
                    || matches!(
                        token.text.as_str(),
                        "map" | "chan" | "func" | "struct" | "interface"
                    )
            }
            TokenKind::Punct => matches!(token.text.as_str(), "*" | "[" | "<-"),
            _ => false,
        }
    }
}
