use crate::error::FormatError;
use crate::source::lexer::{Lexer, Token};
use crate::types::RawBlock;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::warn;

static ARRAY_START_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+const\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*\[").unwrap()
});

/// `];` on a line of its own
static ARRAY_END_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\];").unwrap());

static NEXT_EXPORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*export\s").unwrap());

/// Locates the exported array in source text and splits it into top-level object blocks
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    body: Range<usize>,
}

impl<'a> Scanner<'a> {
    /// Find `export const <array> = [ ... ]` in `text`.
    ///
    /// The array ends at the first `];` line before the next `export`, or
    /// failing that at the bracket that balances the opening one. Fails when
    /// the start marker is missing or neither end is found.
    pub fn new(text: &'a str, array: &str) -> Result<Self, FormatError> {
        let open = ARRAY_START_REGEX
            .captures_iter(text)
            .filter(|caps| &caps[1] == array)
            .filter_map(|caps| caps.get(0))
            .find(|m| is_code(text, m.start()))
            .ok_or_else(|| FormatError::MissingArrayStart {
                array: array.to_string(),
            })?;

        let body_start = open.end();
        let rest = &text[body_start..];
        let region = &rest[..NEXT_EXPORT_REGEX.find(rest).map_or(rest.len(), |m| m.start())];

        let body_end = ARRAY_END_REGEX
            .find(region)
            .map(|m| m.end() - 2)
            .or_else(|| closing_bracket(region))
            .map(|close| body_start + close)
            .ok_or_else(|| FormatError::UnclosedArray {
                array: array.to_string(),
                offset: open.end() - 1,
            })?;

        Ok(Scanner {
            text,
            body: body_start..body_end,
        })
    }

    /// Text between the array's brackets
    pub fn body(&self) -> &'a str {
        &self.text[self.body.clone()]
    }

    /// A fresh pass over the blocks in the array body
    pub fn blocks(&self) -> Blocks<'a> {
        Blocks {
            text: self.text,
            body: self.body.clone(),
            offset: self.body.start,
            lexer: Lexer::new(self.body()),
            depth: 0,
            block_start: None,
        }
    }
}

/// True when `pos` starts a token outside any string or comment
fn is_code(text: &str, pos: usize) -> bool {
    Lexer::new(text)
        .take_while(|(start, _)| *start <= pos)
        .any(|(start, token)| start == pos && matches!(token, Token::Other(_)))
}

/// Offset of the `]` that closes an array whose `[` has already been consumed
fn closing_bracket(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (pos, token) in Lexer::new(text) {
        match token {
            Token::Open('[') => depth += 1,
            Token::Close(']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
    }
    None
}

/// Lazy sequence of balanced top-level `{...}` blocks.
///
/// A block still open when input runs out is dropped. A block holding an
/// unterminated string is dropped too, and scanning resumes at the next line
/// that starts with `{`.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    text: &'a str,
    body: Range<usize>,
    /// Offset of the lexer's input within `text`
    offset: usize,
    lexer: Lexer<'a>,
    depth: usize,
    block_start: Option<usize>,
}

impl<'a> Blocks<'a> {
    /// Restart lexing at the first line after `from` whose first non-blank character is `{`
    fn resync(&mut self, from: usize) {
        let rest = &self.text[from..self.body.end];
        let next = rest
            .match_indices('\n')
            .map(|(nl, _)| nl + 1)
            .find(|&line| rest[line..].trim_start_matches([' ', '\t']).starts_with('{'))
            .map_or(self.body.end, |line| from + line);

        self.offset = next;
        self.lexer = Lexer::new(&self.text[next..self.body.end]);
        self.depth = 0;
        self.block_start = None;
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = RawBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((pos, token)) = self.lexer.next() {
            match token {
                Token::Open('{') => {
                    if self.depth == 0 {
                        self.block_start = Some(self.offset + pos);
                    }
                    self.depth += 1;
                }
                Token::Close('}') => {
                    // Stray closer between blocks
                    if self.depth == 0 {
                        continue;
                    }
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(start) = self.block_start.take() {
                            let end = self.offset + pos + 1;
                            return Some(RawBlock {
                                text: &self.text[start..end],
                                start,
                                end,
                            });
                        }
                    }
                }
                Token::Unterminated => {
                    let at = self.offset + pos;
                    warn!(
                        offset = at,
                        "unterminated string; skipping to the next record"
                    );
                    self.resync(at);
                }
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!("// Research entries\nimport x from './x';\n\nexport const research = [{}\n];\n\nexport const other = [];\n", body)
    }

    fn braces_outside_strings(text: &str) -> (usize, usize) {
        Lexer::new(text).fold((0, 0), |(open, close), (_, t)| match t {
            Token::Open('{') => (open + 1, close),
            Token::Close('}') => (open, close + 1),
            _ => (open, close),
        })
    }

    #[test]
    fn test_flat_blocks_balance() {
        let text = wrap(
            r#"
  { id: "a", title: "A {draft}" },
  { id: "b", title: "B", description: "closing } brace" },
  { id: "c", tags: ["x}", "y"] },"#,
        );
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 3);
        let (open, close) = braces_outside_strings(scanner.body());
        assert_eq!(open, close);
        assert_eq!(open + close, 2 * blocks.len());
    }

    #[test]
    fn test_offsets_point_into_input() {
        let text = wrap(r#"{ id: "a" }, { id: "b" }"#);
        let scanner = Scanner::new(&text, "research").unwrap();
        for block in scanner.blocks() {
            assert_eq!(&text[block.start..block.end], block.text);
            assert!(block.text.starts_with('{'));
            assert!(block.text.ends_with('}'));
        }
    }

    #[test]
    fn test_nested_objects_stay_in_one_block() {
        let text = wrap(r#"{ id: "a", meta: { inner: { deep: 1 } } }, { id: "b" }"#);
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.contains("deep: 1"));
        let (open, close) = braces_outside_strings(blocks[0].text);
        assert_eq!((open, close), (3, 3));
    }

    #[test]
    fn test_escaped_quotes_and_comments() {
        let text = wrap(
            r#"
  // Utah's flat tax {
  { id: "a", title: "The \"}\" brace" },
  /* { id: "ghost" } */
  { id: 'b', title: 'it\'s fine' },"#,
        );
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].text.contains("it\\'s fine"));
    }

    #[test]
    fn test_blocks_are_restartable() {
        let text = wrap(r#"{ id: "a" }, { id: "b" }"#);
        let scanner = Scanner::new(&text, "research").unwrap();

        let first: Vec<_> = scanner.blocks().collect();
        let second: Vec<_> = scanner.blocks().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncated_trailing_block_is_dropped() {
        let text = wrap(r#"{ id: "a" }, { id: "b", title: "unfinished""#);
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.contains("\"a\""));
    }

    #[test]
    fn test_only_named_array_is_scanned() {
        let text = "export const tags = [{ id: \"t\" }];\nexport const research = [{ id: \"r\" }];";
        let scanner = Scanner::new(text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.contains("\"r\""));
    }

    #[test]
    fn test_unbalanced_field_array_stays_in_its_block() {
        let text = wrap(
            r#"
  { id: "a", title: "A" },
  {
    id: "b",
    tags: ["x" },
  { id: "c", title: "C" },"#,
        );
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 3);
        assert!(blocks[1].text.contains("\"b\""));
        assert!(blocks[2].text.contains("\"c\""));
    }

    #[test]
    fn test_unterminated_string_skips_to_next_record() {
        let text = wrap(
            r#"
  { id: "a", title: "A" },
  { id: "b", title: 'Utah's tax' },
  { id: "c", title: "C" },"#,
        );
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.contains("\"a\""));
        assert!(blocks[1].text.contains("\"c\""));
        assert_eq!(&text[blocks[1].start..blocks[1].end], blocks[1].text);
    }

    #[test]
    fn test_unterminated_multiline_record_is_skipped_whole() {
        let text = wrap(
            r#"
  {
    id: "b",
    title: 'it's broken',
    state: "UT",
  },
  {
    id: "c",
  },"#,
        );
        let scanner = Scanner::new(&text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.contains("\"c\""));
    }

    #[test]
    fn test_marker_in_comment_is_not_the_array() {
        let text = "// was: export const research = [\nexport const research = [\n  { id: \"a\" },\n];\n";
        let scanner = Scanner::new(text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 1);
        assert!(scanner.body().starts_with("\n  { id"));
    }

    #[test]
    fn test_end_marker_stops_before_next_export() {
        let text = "export const research = [{ id: \"a\" }];\nexport const other = [\n  { id: \"x\" },\n];\n";
        let scanner = Scanner::new(text, "research").unwrap();
        let blocks: Vec<_> = scanner.blocks().collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(scanner.body(), "{ id: \"a\" }");
    }

    #[test]
    fn test_missing_marker_is_format_error() {
        let err = Scanner::new("const research = [{ id: 'a' }];", "research").unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingArrayStart {
                array: "research".to_string()
            }
        );
    }

    #[test]
    fn test_unclosed_array_is_format_error() {
        let err = Scanner::new("export const research = [{ id: 'a' }, ", "research").unwrap_err();
        assert!(matches!(err, FormatError::UnclosedArray { offset: 24, .. }));
    }

    #[test]
    fn test_empty_array_has_no_blocks() {
        let scanner = Scanner::new("export const research = [];", "research").unwrap();
        assert_eq!(scanner.blocks().count(), 0);
    }
}
