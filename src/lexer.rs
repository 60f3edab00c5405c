//! Tokenizer for Go source text.
//!
//! Produces the significant tokens of a file with Go's automatic semicolon
//! insertion applied, plus the file's comments grouped the way Go groups
//! them, so the parser can attach doc comments to declarations and fields.

use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::{Error, Result};

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(?P<line_comment>//[^\n]*)",
        r"|(?P<block_comment>/\*(?s:.*?)\*/)",
        r"|(?P<raw_string>`[^`]*`)",
        r#"|(?P<string>"(?:[^"\\\n]|\\.)*")"#,
        r"|(?P<rune>'(?:[^'\\\n]|\\.)+')",
        r#"|(?P<unterminated>/\*|`|"|')"#,
        r"|(?P<number>\.?[0-9](?:[eEpP][+-]|[0-9a-zA-Z_.])*)",
        r"|(?P<ident>[_\p{L}][_\p{L}\p{Nd}]*)",
        r"|(?P<punct>\.\.\.|<<=|>>=|&\^=|&&|\|\||<-|\+\+|--|==|!=|<=|>=|:=|<<|>>|&\^|[-+*/%&|^]=|[-+*/%&|^<>=!~(){}\[\],;.:])",
        r"|(?P<newline>\n)",
        r"|(?P<space>[ \t\r\x0C]+)"
    ))
    .unwrap();
}

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Whether `s` is a reserved Go keyword.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    String,
    Rune,
    Punct,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Eof && self.text == text
    }

    /// Whether a newline after this token ends the statement.
    fn ends_statement(&self) -> bool {
        match self.kind {
            TokenKind::Ident => {
                !is_keyword(&self.text)
                    || matches!(
                        self.text.as_str(),
                        "break" | "continue" | "fallthrough" | "return"
                    )
            }
            TokenKind::Number | TokenKind::String | TokenKind::Rune => true,
            TokenKind::Punct => matches!(self.text.as_str(), "++" | "--" | ")" | "]" | "}"),
            TokenKind::Eof => false,
        }
    }
}

/// Consecutive comments with no token or blank line between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    /// Comment texts, verbatim including markers.
    pub lines: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,

    /// The group starts on the same line as a preceding token
    /// (`X int // note`), so it documents nothing that follows.
    pub trailing: bool,

    /// Index of the first token after the group.
    pub next_token: usize,
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<CommentGroup>,
}

impl Lexed {
    /// Doc comment lines immediately preceding the token at `index`.
    pub fn lead_comment(&self, index: usize) -> Vec<String> {
        let Some(token) = self.tokens.get(index) else {
            return Vec::new();
        };
        self.comments
            .iter()
            .rev()
            .find(|g| g.next_token == index && !g.trailing && g.end_line + 1 == token.line)
            .map(|g| g.lines.clone())
            .unwrap_or_default()
    }
}

/// Tokenize Go source text.
///
/// `path` is only used to label errors. A leading byte order mark is
/// skipped.
pub fn tokenize(path: &Path, text: &str) -> Result<Lexed> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut out = Lexed::default();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;
    let mut last_line_with_token = 0;
    let mut pending_semicolon = false;

    let syntax_error = |message: String, line: usize, column: usize| Error::Parse {
        path: path.display().to_string(),
        line,
        column,
        message,
    };

    for caps in TOKEN_REGEX.captures_iter(text) {
        let Some(mat) = caps.get(0) else {
            continue;
        };
        let part = mat.as_str();

        if mat.start() > last_end {
            let unexpected = &text[last_end..mat.start()];
            return Err(syntax_error(
                format!("invalid character {unexpected:?}"),
                line,
                column,
            ));
        }

        if caps.name("unterminated").is_some() {
            let what = match part {
                "/*" => "comment",
                "'" => "rune literal",
                _ => "string literal",
            };
            return Err(syntax_error(format!("{what} not terminated"), line, column));
        }

        let newlines = part.matches('\n').count();

        if caps.name("line_comment").is_some() || caps.name("block_comment").is_some() {
            push_comment(&mut out, part, line, last_line_with_token == line);
            if newlines > 0 && pending_semicolon {
                push_semicolon(&mut out, line, column);
                pending_semicolon = false;
            }
        } else if caps.name("newline").is_some() {
            if pending_semicolon {
                push_semicolon(&mut out, line, column);
                pending_semicolon = false;
            }
        } else if caps.name("space").is_none() {
            let token = Token {
                kind: token_kind(&caps),
                text: part.to_string(),
                line,
                column,
            };
            pending_semicolon = token.ends_statement();
            last_line_with_token = line + newlines;
            out.tokens.push(token);
        }

        if newlines > 0 {
            line += newlines;
            column = part.rsplit('\n').next().map_or(0, |rest| rest.chars().count()) + 1;
        } else {
            column += part.chars().count();
        }
        last_end = mat.end();
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(syntax_error(
            format!("invalid character {unexpected:?}"),
            line,
            column,
        ));
    }

    if pending_semicolon {
        push_semicolon(&mut out, line, column);
    }
    out.tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
        column,
    });
    Ok(out)
}

fn token_kind(caps: &Captures<'_>) -> TokenKind {
    if caps.name("ident").is_some() {
        TokenKind::Ident
    } else if caps.name("number").is_some() {
        TokenKind::Number
    } else if caps.name("string").is_some() || caps.name("raw_string").is_some() {
        TokenKind::String
    } else if caps.name("rune").is_some() {
        TokenKind::Rune
    } else {
        TokenKind::Punct
    }
}

fn push_semicolon(out: &mut Lexed, line: usize, column: usize) {
    out.tokens.push(Token {
        kind: TokenKind::Punct,
        text: ";".to_string(),
        line,
        column,
    });
}

fn push_comment(out: &mut Lexed, text: &str, line: usize, trailing: bool) {
    let end_line = line + text.matches('\n').count();
    // Carriage returns never survive into comment text.
    let text = text.replace('\r', "");
    let next_token = out.tokens.len();

    if let Some(group) = out.comments.last_mut() {
        let adjacent = group.next_token == next_token && line <= group.end_line + 1;
        if adjacent && !trailing && !group.trailing {
            group.lines.push(text);
            group.end_line = end_line;
            return;
        }
    }

    out.comments.push(CommentGroup {
        lines: vec![text],
        start_line: line,
        end_line,
        trailing,
        next_token,
    });
}
