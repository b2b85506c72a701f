//! String- and comment-aware tokenizer for object-literal source text.
//!
//! The scanner and the array field rule both walk text through this lexer,
//! so a quote, brace or bracket inside a string literal is never mistaken
//! for structure by either of them.

/// A lexical token and nothing more - no grammar is implied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `{` or `[`
    Open(char),
    /// `}` or `]`
    Close(char),
    /// A quoted string; `raw` is the content between the quotes, escapes intact
    Str { raw: &'a str, quote: char },
    /// A string missing its closing quote. A `'` or `"` string ends at the
    /// first raw newline and lexing resumes there; a template string runs to
    /// the end of input.
    Unterminated,
    /// Anything else outside strings and comments
    Other(char),
}

impl<'a> Token<'a> {
    /// Unescaped content of a string token
    pub fn string_value(&self) -> Option<String> {
        match self {
            Token::Str { raw, .. } => Some(unescape(raw)),
            _ => None,
        }
    }
}

/// Iterator over `(byte offset, token)` pairs.
///
/// `//` line comments and `/* */` block comments outside strings are skipped.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Lexer { text, pos: 0 }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (usize, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.pos;
            let rest = &self.text[start..];
            let c = rest.chars().next()?;

            match c {
                '/' if rest.starts_with("//") => {
                    self.pos = rest
                        .find('\n')
                        .map(|nl| start + nl)
                        .unwrap_or(self.text.len());
                }
                '/' if rest.starts_with("/*") => {
                    self.pos = rest[2..]
                        .find("*/")
                        .map(|close| start + 2 + close + 2)
                        .unwrap_or(self.text.len());
                }
                '"' | '\'' | '`' => {
                    return match closing_quote(rest, c) {
                        Ok(close) => {
                            self.pos = start + close + 1;
                            Some((
                                start,
                                Token::Str {
                                    raw: &rest[1..close],
                                    quote: c,
                                },
                            ))
                        }
                        Err(stop) => {
                            self.pos = start + stop;
                            Some((start, Token::Unterminated))
                        }
                    };
                }
                '{' | '[' => {
                    self.pos += 1;
                    return Some((start, Token::Open(c)));
                }
                '}' | ']' => {
                    self.pos += 1;
                    return Some((start, Token::Close(c)));
                }
                _ => {
                    self.pos += c.len_utf8();
                    return Some((start, Token::Other(c)));
                }
            }
        }
    }
}

/// Byte index (within `rest`) of the quote closing the string that opens at index 0.
///
/// `Err` holds where an unterminated string stops: its first raw newline,
/// unless it is a template string, which only the end of input stops.
fn closing_quote(rest: &str, quote: char) -> Result<usize, usize> {
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok(i);
        } else if c == '\n' && quote != '`' {
            return Err(i);
        }
    }
    Err(rest.len())
}

/// Resolve backslash escapes in the raw content of a string literal
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16) {
                    Ok(code) if hex.len() == 4 => {
                        for _ in 0..4 {
                            chars.next();
                        }
                        push_code_unit(&mut out, code, &mut chars);
                    }
                    _ => out.push('u'),
                }
            }
            // Line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn push_code_unit(
    out: &mut String,
    code: u32,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) {
    if (0xD800..0xDC00).contains(&code) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
            let low: String = lookahead.take(4).collect();
            if let Ok(low) = u32::from_str_radix(&low, 16) {
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    if let Some(ch) = char::from_u32(combined) {
                        for _ in 0..6 {
                            chars.next();
                        }
                        out.push(ch);
                        return;
                    }
                }
            }
        }
    }
    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
}
