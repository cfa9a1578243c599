//! The linker script language (spec.md §4.6): a tiny `ENTRY(...)`/`SECTIONS(...)`
//! grammar, tokenized by its own ordered regex table in the same table-driven style as
//! the assembler's tokenizer.

use crate::error::LinkerError;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Whitespace,
    Entry,
    Sections,
    Text,
    Data,
    Bss,
    NumBinary,
    NumHex,
    NumDecimal,
    OpenParen,
    CloseParen,
    Semicolon,
    Comma,
    Equal,
    At,
    Symbol,
}

struct Rule {
    regex: Regex,
    kind: Kind,
}

fn rule(pattern: &str, kind: Kind) -> Rule {
    Rule {
        regex: Regex::new(&format!("^(?:{pattern})")).expect("linker script pattern is valid regex"),
        kind,
    }
}

static TOKEN_SPEC: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"\s+", Kind::Whitespace),
        rule(r"/\*[\s\S]*?\*/", Kind::Whitespace),
        rule(r"//[^\n]*", Kind::Whitespace),
        rule(r"ENTRY\b", Kind::Entry),
        rule(r"SECTIONS\b", Kind::Sections),
        rule(r"\.text\b", Kind::Text),
        rule(r"\.data\b", Kind::Data),
        rule(r"\.bss\b", Kind::Bss),
        rule(r"0b[01]+", Kind::NumBinary),
        rule(r"0x[0-9a-fA-F]+", Kind::NumHex),
        rule(r"[0-9]+", Kind::NumDecimal),
        rule(r"\(", Kind::OpenParen),
        rule(r"\)", Kind::CloseParen),
        rule(r";", Kind::Semicolon),
        rule(r",", Kind::Comma),
        rule(r"=", Kind::Equal),
        rule(r"@", Kind::At),
        rule(r"[a-zA-Z_][a-zA-Z0-9_]*", Kind::Symbol),
    ]
});

struct Token {
    kind: Kind,
    value: String,
}

fn tokenize(source: &str) -> Result<Vec<Token>, LinkerError> {
    let mut rest = source;
    let mut tokens = Vec::new();
    while !rest.is_empty() {
        let mut matched = false;
        for r in TOKEN_SPEC.iter() {
            if let Some(m) = r.regex.find(rest) {
                if r.kind != Kind::Whitespace {
                    tokens.push(Token { kind: r.kind, value: m.as_str().to_string() });
                }
                rest = &rest[m.end()..];
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(LinkerError::UnrecognizedToken { remainder: rest.chars().take(32).collect() });
        }
    }
    Ok(tokens)
}

/// Where a section is placed in the executable (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Text,
    Data,
    Bss,
}

#[derive(Debug, Clone)]
pub struct SectionPlacement {
    pub kind: SectionKind,
    pub physical: bool,
    pub address: Option<u64>,
}

/// A parsed linker script: the entry symbol and the ordered section placement list.
#[derive(Debug, Clone)]
pub struct LinkerScript {
    pub entry: String,
    pub sections: Vec<SectionPlacement>,
}

impl LinkerScript {
    /// `ENTRY(_start) SECTIONS(.text; .data; .bss;)`, all virtual, packed consecutively
    /// (spec.md §4.6: "a default script is used when none is supplied").
    #[must_use]
    pub fn default_script() -> Self {
        Self {
            entry: "_start".to_string(),
            sections: vec![
                SectionPlacement { kind: SectionKind::Text, physical: false, address: None },
                SectionPlacement { kind: SectionKind::Data, physical: false, address: None },
                SectionPlacement { kind: SectionKind::Bss, physical: false, address: None },
            ],
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self, expected: &'static str) -> Result<Token, LinkerError> {
        if self.pos >= self.tokens.len() {
            return Err(LinkerError::UnexpectedEof { expected });
        }
        let tok = self.tokens.remove(self.pos);
        Ok(tok)
    }

    fn expect(&mut self, kind: Kind, expected: &'static str) -> Result<Token, LinkerError> {
        let tok = self.consume(expected)?;
        if tok.kind != kind {
            return Err(LinkerError::UnexpectedToken { expected, found: tok.value });
        }
        Ok(tok)
    }

    fn parse_value(&mut self) -> Result<u64, LinkerError> {
        let tok = self.consume("a numeric literal")?;
        match tok.kind {
            Kind::NumBinary => Ok(u64::from_str_radix(&tok.value[2..], 2).unwrap_or(0)),
            Kind::NumHex => Ok(u64::from_str_radix(&tok.value[2..], 16).unwrap_or(0)),
            Kind::NumDecimal => Ok(tok.value.parse().unwrap_or(0)),
            _ => Err(LinkerError::UnexpectedToken { expected: "a numeric literal", found: tok.value }),
        }
    }

    fn parse_entry(&mut self) -> Result<String, LinkerError> {
        self.consume("ENTRY")?;
        self.expect(Kind::OpenParen, "`(`")?;
        let sym = self.expect(Kind::Symbol, "a symbol name")?;
        self.expect(Kind::CloseParen, "`)`")?;
        Ok(sym.value)
    }

    fn parse_sections(&mut self, physical: &mut bool) -> Result<Vec<SectionPlacement>, LinkerError> {
        self.consume("SECTIONS")?;
        self.expect(Kind::OpenParen, "`(`")?;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(t) if t.kind == Kind::CloseParen => break,
                Some(t) if t.kind == Kind::At => {
                    self.consume("`@`")?;
                    let tag = self.expect(Kind::Symbol, "`P` or `V`")?;
                    match tag.value.as_str() {
                        "P" => *physical = true,
                        "V" => *physical = false,
                        other => return Err(LinkerError::BadPhysicalTag { found: other.to_string() }),
                    }
                    self.expect(Kind::Semicolon, "`;`")?;
                }
                Some(t) => {
                    let kind = match t.kind {
                        Kind::Text => SectionKind::Text,
                        Kind::Data => SectionKind::Data,
                        Kind::Bss => SectionKind::Bss,
                        _ => {
                            return Err(LinkerError::UnexpectedToken {
                                expected: "`.text`, `.data`, `.bss`, or `@`",
                                found: t.value.clone(),
                            })
                        }
                    };
                    self.consume("a section name")?;
                    let mut address = None;
                    if matches!(self.peek(), Some(t) if t.kind == Kind::Equal) {
                        self.consume("`=`")?;
                        address = Some(self.parse_value()?);
                    }
                    self.expect(Kind::Semicolon, "`;`")?;
                    out.push(SectionPlacement { kind, physical: *physical, address });
                }
                None => return Err(LinkerError::UnexpectedEof { expected: "`)`" }),
            }
        }
        self.expect(Kind::CloseParen, "`)`")?;
        Ok(out)
    }
}

/// Parses a complete linker script (spec.md §4.6 grammar).
pub fn parse(source: &str) -> Result<LinkerScript, LinkerError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut entry = "_start".to_string();
    let mut sections = Vec::new();
    let mut physical = false;
    while parser.peek().is_some() {
        match parser.peek().expect("checked above").kind {
            Kind::Entry => entry = parser.parse_entry()?,
            Kind::Sections => sections = parser.parse_sections(&mut physical)?,
            _ => {
                let tok = parser.consume("`ENTRY` or `SECTIONS`")?;
                return Err(LinkerError::UnexpectedToken {
                    expected: "`ENTRY` or `SECTIONS`",
                    found: tok.value,
                });
            }
        }
    }
    Ok(LinkerScript { entry, sections })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_and_sections() {
        let script = parse("ENTRY(_start)\nSECTIONS(\n@P;\n.text;\n.data = 0x1000;\n@V;\n.bss;\n)\n").unwrap();
        assert_eq!(script.entry, "_start");
        assert_eq!(script.sections.len(), 3);
        assert!(script.sections[0].physical);
        assert_eq!(script.sections[0].kind, SectionKind::Text);
        assert!(script.sections[1].physical);
        assert_eq!(script.sections[1].address, Some(0x1000));
        assert!(!script.sections[2].physical);
    }

    #[test]
    fn default_script_is_all_virtual_and_packed() {
        let script = LinkerScript::default_script();
        assert_eq!(script.entry, "_start");
        assert!(script.sections.iter().all(|s| !s.physical && s.address.is_none()));
    }

    #[test]
    fn unknown_physical_tag_is_an_error() {
        let err = parse("SECTIONS(@Q;)").unwrap_err();
        assert!(matches!(err, LinkerError::BadPhysicalTag { .. }));
    }
}
