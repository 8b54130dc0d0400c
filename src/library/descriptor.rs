//! Library descriptor parsing.
//!
//! The descriptor is a nested key/value text format:
//!
//! ```text
//! "libraryfolders"
//! {
//!     "0" { "path" "/home/me/.local/share/Steam" "label" "" }
//!     "1" { "path" "/mnt/games/SteamLibrary" }
//! }
//! ```
//!
//! Only `"path"` values matter; everything else is skipped, at any depth.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("unterminated string starting on line {0}")]
    UnterminatedString(usize),
    #[error("unbalanced '{{' / '}}' near line {0}")]
    Unbalanced(usize),
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Str(String),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, DescriptorError> {
    let mut out = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1usize;
    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '{' => out.push((Token::Open, line)),
            '}' => out.push((Token::Close, line)),
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '"' => {
                let start = line;
                let mut s = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) => s.push(other),
                            None => break,
                        },
                        '\n' => {
                            line += 1;
                            s.push('\n');
                        }
                        other => s.push(other),
                    }
                }
                if !closed {
                    return Err(DescriptorError::UnterminatedString(start));
                }
                out.push((Token::Str(s), start));
            }
            other => {
                // Bare word: runs until whitespace, brace or quote.
                let mut s = String::from(other);
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || matches!(n, '{' | '}' | '"') {
                        break;
                    }
                    s.push(n);
                    chars.next();
                }
                out.push((Token::Str(s), line));
            }
        }
    }
    Ok(out)
}

/// Extract every `path` value, in document order.
pub fn parse_library_paths(input: &str) -> Result<Vec<PathBuf>, DescriptorError> {
    let tokens = tokenize(input)?;
    let mut paths = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        let (tok, line) = &tokens[i];
        match tok {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth.checked_sub(1).ok_or(DescriptorError::Unbalanced(*line))?;
            }
            Token::Str(key) => {
                // A key is followed by either its value or a block.
                if let Some((Token::Str(value), _)) = tokens.get(i + 1) {
                    if key.eq_ignore_ascii_case("path") {
                        paths.push(PathBuf::from(value));
                    }
                    i += 1;
                }
            }
        }
        i += 1;
    }
    if depth != 0 {
        let last = tokens.last().map(|(_, l)| *l).unwrap_or(1);
        return Err(DescriptorError::Unbalanced(last));
    }
    Ok(paths)
}
