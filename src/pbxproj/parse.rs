//! Parser for the OpenStep-style ASCII property lists Xcode writes
//!
//! Handles `//` and `/* */` comments, quoted and bare strings, arrays,
//! dictionaries and `<hex>` data. Comments are dropped; the writer
//! regenerates the reference comments Xcode expects.

use thiserror::Error;

use super::value::{Dict, Value};
use super::write::is_bare;

/// A syntax error with the 1-based line it was found on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole document. The top-level value must be a dictionary.
pub fn parse(input: &str) -> Result<Dict, SyntaxError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia()?;
    let root = match parser.parse_value()? {
        Value::Dict(dict) => dict,
        _ => return Err(parser.error("top-level value must be a dictionary")),
    };
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after top-level dictionary"));
    }
    Ok(root)
}

/// Characters allowed in an unquoted string
fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '+' | '/' | ':' | '.' | '-')
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn expect(&mut self, wanted: char) -> Result<(), SyntaxError> {
        self.skip_trivia()?;
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", wanted, c))),
            None => Err(self.error(format!("expected '{}', found end of input", wanted))),
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.next() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            self.skip_block_comment()?;
                        }
                        // A bare string such as a path starting with '/'
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        let start = self.line;
        let mut star = false;
        while let Some(c) = self.bump() {
            if star && c == '/' {
                return Ok(());
            }
            star = c == '*';
        }
        Err(SyntaxError {
            line: start,
            message: "unterminated comment".to_string(),
        })
    }

    fn parse_value(&mut self) -> Result<Value, SyntaxError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_dict().map(Value::Dict),
            Some('(') => self.parse_array().map(Value::Array),
            Some('<') => self.parse_data().map(Value::Data),
            Some('"') | Some('\'') => {
                let s = self.parse_quoted()?;
                // Keep quotes the writer would otherwise drop
                Ok(if is_bare(&s) { Value::Quoted(s) } else { Value::String(s) })
            }
            Some(c) if is_bare_char(c) => Ok(Value::String(self.parse_bare())),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_dict(&mut self) -> Result<Dict, SyntaxError> {
        self.expect('{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(dict);
            }
            let key = match self.parse_value()? {
                Value::String(key) | Value::Quoted(key) => key,
                _ => return Err(self.error("dictionary keys must be strings")),
            };
            self.expect('=')?;
            let value = self.parse_value()?;
            self.expect(';')?;
            dict.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, SyntaxError> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                Some(c) => return Err(self.error(format!("expected ',' or ')', found '{}'", c))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_data(&mut self) -> Result<Vec<u8>, SyntaxError> {
        self.expect('<')?;
        let mut digits = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some(c) if c.is_ascii_hexdigit() => digits.push(c),
                Some(c) if c.is_whitespace() => {}
                Some(c) => return Err(self.error(format!("invalid character '{}' in data", c))),
                None => return Err(self.error("unterminated data")),
            }
        }
        if digits.len() % 2 != 0 {
            return Err(self.error("data has an odd number of hex digits"));
        }
        (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| self.error(e.to_string()))
    }

    fn parse_bare(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !is_bare_char(c) {
                break;
            }
            // Stop before a comment glued to the token
            if c == '/' {
                let mut ahead = self.chars.clone();
                ahead.next();
                if matches!(ahead.next(), Some('*') | Some('/')) {
                    break;
                }
            }
            s.push(c);
            self.bump();
        }
        s
    }

    fn parse_quoted(&mut self) -> Result<String, SyntaxError> {
        let start = self.line;
        let quote = self.bump().unwrap_or('"');
        let mut s = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(s),
                Some('\\') => s.push(self.parse_escape()?),
                Some(c) => s.push(c),
                None => {
                    return Err(SyntaxError {
                        line: start,
                        message: "unterminated string".to_string(),
                    })
                }
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, SyntaxError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some(c @ '0'..='7') => self.parse_octal(c),
            Some('U') => {
                let code = self.parse_hex4()?;
                let code = match code {
                    0xD800..=0xDBFF => {
                        // High surrogate: the low half must follow as another \U escape
                        if self.bump() != Some('\\') || self.bump() != Some('U') {
                            return Err(self.error("unpaired surrogate in \\U escape"));
                        }
                        let low = self.parse_hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(self.error("unpaired surrogate in \\U escape"));
                        }
                        0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00)
                    }
                    code => code,
                };
                char::from_u32(code).ok_or_else(|| self.error("invalid \\U escape"))
            }
            Some(c) => Ok(c),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn parse_hex4(&mut self) -> Result<u32, SyntaxError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid \\U escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    /// Up to three octal digits, the first already consumed, read as a code point
    fn parse_octal(&mut self, first: char) -> Result<char, SyntaxError> {
        let mut code = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(digit) => {
                    code = code * 8 + digit;
                    self.bump();
                }
                None => break,
            }
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid octal escape"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_document() {
        let doc = parse(
            r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	classes = {
	};
	objects = {
/* Begin PBXGroup section */
		29B97314FDCFA39411CA2CEA /* CustomTemplate */ = {
			isa = PBXGroup;
			children = (
				301BF56E109A69640062928A /* www */,
			);
			name = CustomTemplate;
			sourceTree = "<group>";
		};
/* End PBXGroup section */
	};
	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
}
"#,
        )
        .unwrap();

        assert_eq!(doc.get_str("archiveVersion"), Some("1"));
        assert!(doc.get_dict("classes").unwrap().is_empty());
        assert_eq!(doc.get_str("rootObject"), Some("29B97313FDCFA39411CA2CEA"));

        let group = doc
            .get_dict("objects")
            .unwrap()
            .get_dict("29B97314FDCFA39411CA2CEA")
            .unwrap();
        assert_eq!(group.get_str("isa"), Some("PBXGroup"));
        assert_eq!(group.get_str("sourceTree"), Some("<group>"));
        assert_eq!(
            group.get_array("children").unwrap(),
            &vec![Value::from("301BF56E109A69640062928A")]
        );
    }

    #[test]
    fn test_parse_escapes() {
        let doc = parse(r#"{ a = "say \"hi\"\n"; b = "\U00e9t\U00e9"; c = 'single'; }"#).unwrap();
        assert_eq!(doc.get_str("a"), Some("say \"hi\"\n"));
        assert_eq!(doc.get_str("b"), Some("été"));
        assert_eq!(doc.get_str("c"), Some("single"));
    }

    #[test]
    fn test_parse_surrogate_pair_and_octal() {
        let doc = parse(r#"{ emoji = "\UD83D\UDE00"; octal = "\101\102\0"; tab = "a\11b"; }"#).unwrap();
        assert_eq!(doc.get_str("emoji"), Some("\u{1F600}"));
        assert_eq!(doc.get_str("octal"), Some("AB\0"));
        assert_eq!(doc.get_str("tab"), Some("a\tb"));
    }

    #[test]
    fn test_unpaired_surrogate() {
        let err = parse(r#"{ a = "\UD83D"; }"#).unwrap_err();
        assert!(err.message.contains("unpaired surrogate"));
        assert!(parse(r#"{ a = "\UD83D\U0041"; }"#).is_err());
        assert!(parse(r#"{ a = "\UDE00"; }"#).is_err());
    }

    #[test]
    fn test_parse_bare_path_and_comment() {
        let doc = parse("{ path = ShareExtension/Info.plist/* trailing */; other = /usr/lib; }").unwrap();
        assert_eq!(doc.get_str("path"), Some("ShareExtension/Info.plist"));
        assert_eq!(doc.get_str("other"), Some("/usr/lib"));
    }

    #[test]
    fn test_parse_data() {
        let doc = parse("{ blob = <0fA1 ff>; }").unwrap();
        assert_eq!(doc.get("blob"), Some(&Value::Data(vec![0x0f, 0xa1, 0xff])));
    }

    #[test]
    fn test_parse_nested_arrays() {
        let doc = parse(r#"{ defs = ( "DEBUG=1", "$(inherited)" ); empty = ( ); }"#).unwrap();
        assert_eq!(doc.get_array("defs").unwrap().len(), 2);
        assert!(doc.get_array("empty").unwrap().is_empty());
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("{\n\ta = 1;\n\tb = ;\n}").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("{ a = 1 }").unwrap_err();
        assert!(err.message.contains("expected ';'"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse("{\n a = \"oops;\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_top_level_must_be_dict() {
        assert!(parse("( a, b )").is_err());
    }
}
