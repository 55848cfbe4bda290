//! Per-file-type directive scanners.
//!
//! Each scanner walks the logical lines of a file (backslash continuations
//! joined) and appends the references it recognizes to the record. Nothing
//! here resolves names; that is the job of the include resolver.

use alloc::string::String;

use crate::error::{DepError, Location, bail_malformed};
use crate::source::{FileKind, Flags, IncludeKind, ManPage, SourceRecord};

/// Configuration header every template depends on.
pub const CONFIG_HEADER: &str = "config.h";

const FONT_COMMENT: &str = "UComments:";
const FONT_NEWLINE: &str = "+AAoA";
const RC_MAGIC: &str = "@makedep:";

/// Logical lines of a text, numbered by the last physical line they span.
pub struct Lines<'a> {
    rest: &'a str,
    line: u32,
}

impl<'a> Lines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            rest: text,
            line: 0,
        }
    }

    /// Returns the next physical line and whether it ended with a newline.
    fn physical(&mut self) -> Option<(&'a str, bool)> {
        if self.rest.is_empty() {
            return None;
        }
        self.line += 1;
        match self.rest.find('\n') {
            Some(eol) => {
                let line = &self.rest[..eol];
                self.rest = &self.rest[eol + 1..];
                Some((line.strip_suffix('\r').unwrap_or(line), true))
            }
            None => {
                let line = self.rest;
                self.rest = "";
                Some((line, false))
            }
        }
    }
}

impl Iterator for Lines<'_> {
    type Item = (u32, String);

    fn next(&mut self) -> Option<Self::Item> {
        let (first, mut newline) = self.physical()?;
        let mut buffer = String::from(first);
        while newline && buffer.ends_with('\\') {
            buffer.pop();
            match self.physical() {
                Some((next, nl)) => {
                    buffer.push_str(next);
                    newline = nl;
                }
                None => break,
            }
        }
        Some((self.line, buffer))
    }
}

/// Fills `record` from the text of the file it describes.
pub fn scan(record: &mut SourceRecord, text: &str) -> Result<(), DepError> {
    let kind = record.kind();
    let mut scanner = Scanner { record, line: 0 };
    match kind {
        FileKind::C | FileKind::ObjC => scanner.scan_c(text),
        FileKind::Idl => scanner.scan_idl(text),
        FileKind::Rc => scanner.scan_rc(text),
        FileKind::Template => {
            scanner.scan_template(text);
            Ok(())
        }
        FileKind::FontDef => {
            scanner.scan_font(text);
            Ok(())
        }
        FileKind::Other => Ok(()),
    }
}

struct Scanner<'a> {
    record: &'a mut SourceRecord,
    line: u32,
}

impl Scanner<'_> {
    fn add(&mut self, name: &str, kind: IncludeKind) {
        self.record.add_directive(name, self.line, kind);
    }

    fn location(&self) -> Location {
        Location::new(self.record.path.clone(), self.line)
    }

    fn scan_c(&mut self, text: &str) -> Result<(), DepError> {
        for (line, buffer) in Lines::new(text) {
            self.line = line;
            self.cpp_directive(&buffer)?;
        }
        Ok(())
    }

    fn cpp_directive(&mut self, s: &str) -> Result<(), DepError> {
        let Some(s) = s.trim_start().strip_prefix('#') else {
            return Ok(());
        };
        let s = s.trim_start();
        if let Some(rest) = s.strip_prefix("include") {
            self.include_directive(rest)
        } else if let Some(rest) = s.strip_prefix("import")
            && self.record.kind() == FileKind::ObjC
        {
            self.include_directive(rest)
        } else if let Some(rest) = s.strip_prefix("pragma") {
            self.pragma_directive(rest);
            Ok(())
        } else {
            Ok(())
        }
    }

    fn include_directive(&mut self, s: &str) -> Result<(), DepError> {
        let p = s.trim_start();
        let (close, kind) = match p.chars().next() {
            Some('"') => ('"', IncludeKind::Local),
            Some('<') => ('>', IncludeKind::System),
            _ => return Ok(()),
        };
        let p = &p[1..];
        let Some(end) = p.find(close) else {
            bail_malformed!(self.location(), "malformed include directive '{}'", s);
        };
        self.add(&p[..end], kind);
        Ok(())
    }

    /// `#pragma makedep <flags...>`; `depend` swallows the rest of the line.
    fn pragma_directive(&mut self, s: &str) {
        if !s.starts_with([' ', '\t']) {
            return;
        }
        let mut tokens = Tokens::new(s);
        if tokens.next() != Some("makedep") {
            return;
        }

        let kind = self.record.kind();
        let is_idl = kind == FileKind::Idl;
        let is_rc = kind == FileKind::Rc;
        let is_font = kind == FileKind::FontDef;

        while let Some(flag) = tokens.next() {
            match flag {
                "depend" => {
                    while let Some(name) = tokens.next() {
                        self.add(name, IncludeKind::Local);
                    }
                    return;
                }
                "install" => self.record.flags |= Flags::INSTALL,
                _ => {}
            }

            if is_idl {
                self.record.flags |= match flag {
                    "header" => Flags::IDL_HEADER,
                    "proxy" => Flags::IDL_PROXY,
                    "client" => Flags::IDL_CLIENT,
                    "server" => Flags::IDL_SERVER,
                    "ident" => Flags::IDL_IDENT,
                    "typelib" => Flags::IDL_TYPELIB,
                    "register" => Flags::IDL_REGISTER,
                    "regtypelib" => Flags::IDL_REGTYPELIB,
                    _ => Flags::empty(),
                };
            } else if is_rc {
                if flag == "po" {
                    self.record.flags |= Flags::RC_PO;
                }
            } else if is_font {
                if flag == "font" {
                    self.record.flags |= Flags::SFD_FONTS;
                    if let Some(rest) = tokens.rest() {
                        self.record.fonts.push(rest.into());
                    }
                    return;
                }
            } else {
                match flag {
                    "implib" => self.record.flags |= Flags::C_IMPLIB,
                    "unix" => self.record.flags |= Flags::C_UNIX,
                    _ => {}
                }
            }
        }
    }

    fn scan_idl(&mut self, text: &str) -> Result<(), DepError> {
        for (line, buffer) in Lines::new(text) {
            self.line = line;
            let p = buffer.trim_start();

            if let Some(rest) = p.strip_prefix("importlib") {
                let Some(rest) = rest.trim_start().strip_prefix('(') else {
                    continue;
                };
                let Some(rest) = rest.trim_start().strip_prefix('"') else {
                    continue;
                };
                let Some(end) = rest.find('"') else {
                    bail_malformed!(self.location(), "malformed importlib directive");
                };
                self.add(&rest[..end], IncludeKind::ImportLib);
                continue;
            }

            if let Some(rest) = p.strip_prefix("import") {
                let Some(rest) = rest.trim_start().strip_prefix('"') else {
                    continue;
                };
                let Some(end) = rest.find('"') else {
                    bail_malformed!(self.location(), "malformed import directive");
                };
                self.add(&rest[..end], IncludeKind::Import);
                continue;
            }

            if let Some(rest) = p.strip_prefix("cpp_quote") {
                self.cpp_quote(rest)?;
                continue;
            }

            self.cpp_directive(p)?;
        }
        Ok(())
    }

    /// `cpp_quote("#include \"foo.h\"")` or `cpp_quote("#include <foo.h>")`.
    fn cpp_quote(&mut self, s: &str) -> Result<(), DepError> {
        let Some(p) = s.trim_start().strip_prefix('(') else {
            return Ok(());
        };
        let Some(p) = p.trim_start().strip_prefix("\"#") else {
            return Ok(());
        };
        let Some(p) = p.trim_start().strip_prefix("include") else {
            return Ok(());
        };
        let p = p.trim_start();

        let (name, kind) = if let Some(p) = p.strip_prefix("\\\"") {
            match p.find('"') {
                Some(end) if end > 0 && p.as_bytes()[end - 1] == b'\\' => {
                    (&p[..end - 1], IncludeKind::CppQuote)
                }
                _ => bail_malformed!(
                    self.location(),
                    "malformed #include directive inside cpp_quote"
                ),
            }
        } else if let Some(p) = p.strip_prefix('<') {
            match p.find('>') {
                Some(end) => (&p[..end], IncludeKind::CppQuoteSystem),
                None => bail_malformed!(
                    self.location(),
                    "malformed #include directive inside cpp_quote"
                ),
            }
        } else {
            return Ok(());
        };

        self.add(name, kind);
        Ok(())
    }

    fn scan_rc(&mut self, text: &str) -> Result<(), DepError> {
        for (line, buffer) in Lines::new(text) {
            self.line = line;
            let p = buffer.trim_start();

            if let Some(comment) = p.strip_prefix("/*") {
                let Some(p) = comment.trim_start().strip_prefix(RC_MAGIC) else {
                    continue;
                };
                let p = p.trim_start();
                let name = if let Some(p) = p.strip_prefix('"') {
                    p.find('"').map(|end| &p[..end])
                } else {
                    p.find(|c: char| c.is_ascii_whitespace() || c == '*')
                        .map(|end| &p[..end])
                };
                let Some(name) = name else {
                    bail_malformed!(self.location(), "malformed makedep comment");
                };
                self.add(name, IncludeKind::Local);
                continue;
            }

            self.cpp_directive(&buffer)?;
        }
        Ok(())
    }

    fn scan_template(&mut self, text: &str) {
        // rebuild whenever the configuration changes
        self.add(CONFIG_HEADER, IncludeKind::System);

        if !self.record.path.ends_with(".man.in") {
            return;
        }

        for (_, buffer) in Lines::new(text) {
            if !buffer.starts_with(".TH") {
                continue;
            }
            let mut tokens = Tokens::new(&buffer);
            tokens.next();
            let (Some(program), Some(section)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            self.record.man_page = Some(ManPage {
                program: program.into(),
                section: section.into(),
            });
            return;
        }
    }

    /// Pragmas hidden in the `UComments` property, lines separated by `+AAoA`.
    fn scan_font(&mut self, text: &str) {
        for (line, buffer) in Lines::new(text) {
            self.line = line;
            let Some(p) = buffer.strip_prefix(FONT_COMMENT) else {
                continue;
            };
            let mut p = p.trim_start_matches(' ');
            if p.len() > 1 && p.starts_with('"') && p.ends_with('"') {
                p = &p[1..p.len() - 1];
            }
            for segment in p.split(FONT_NEWLINE) {
                let Some(s) = segment.trim_start().strip_prefix('#') else {
                    continue;
                };
                if let Some(rest) = s.trim_start().strip_prefix("pragma") {
                    self.pragma_directive(rest);
                }
            }
            return;
        }
    }
}

/// `strtok`-style splitter on blanks that can hand out the unsplit remainder.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }

    fn rest(&mut self) -> Option<&'a str> {
        let rest = core::mem::take(&mut self.rest);
        (!rest.is_empty()).then_some(rest)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let s = self.rest.trim_start_matches([' ', '\t']);
        if s.is_empty() {
            self.rest = s;
            return None;
        }
        match s.find([' ', '\t']) {
            Some(end) => {
                self.rest = &s[end + 1..];
                Some(&s[..end])
            }
            None => {
                self.rest = "";
                Some(s)
            }
        }
    }
}
