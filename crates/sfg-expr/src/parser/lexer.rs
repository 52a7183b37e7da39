//! Tokenizer for expression text.

use sfg_core::Real;

use crate::error::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(Real),
    Ident(String),
    /// `oo`
    Infinity,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl TokenKind {
    /// Tokens that can begin an operand of an implicit multiplication.
    pub(crate) fn starts_atom(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::Infinity | TokenKind::LParen
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;
        let kind = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'^' => TokenKind::Caret,
            b'%' => TokenKind::Percent,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b'0'..=b'9' | b'.' => {
                pos = scan_number(bytes, pos);
                let text = &src[start..pos];
                let value = text
                    .parse::<Real>()
                    .map_err(|_| ParseError::new(start, ParseErrorKind::InvalidNumber))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let kind = match &src[start..pos] {
                    "oo" => TokenKind::Infinity,
                    name => TokenKind::Ident(name.to_string()),
                };
                tokens.push(Token { kind, offset: start });
                continue;
            }
            _ => {
                let ch = src[start..].chars().next().unwrap_or('\u{FFFD}');
                return Err(ParseError::new(start, ParseErrorKind::UnexpectedChar(ch)));
            }
        };
        tokens.push(Token { kind, offset: start });
        pos += 1;
    }

    Ok(tokens)
}

/// End of the number starting at `pos`. The exponent part is only taken when
/// `e`/`E` is followed by a digit, optionally signed, so `2exp(x)` still
/// splits into `2` and `exp`.
fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    let digits = |bytes: &[u8], mut p: usize| {
        while p < bytes.len() && bytes[p].is_ascii_digit() {
            p += 1;
        }
        p
    };

    pos = digits(bytes, pos);
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos = digits(bytes, pos + 1);
    }
    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let mut p = pos + 1;
        if p < bytes.len() && matches!(bytes[p], b'+' | b'-') {
            p += 1;
        }
        if p < bytes.len() && bytes[p].is_ascii_digit() {
            pos = digits(bytes, p);
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_with_exponents() {
        assert_eq!(kinds("1.5e3"), vec![TokenKind::Number(1500.0)]);
        assert_eq!(kinds("2E-2"), vec![TokenKind::Number(0.02)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5)]);
    }

    #[test]
    fn exponent_needs_digit() {
        assert_eq!(
            kinds("2exp"),
            vec![TokenKind::Number(2.0), TokenKind::Ident("exp".into())]
        );
        assert_eq!(
            kinds("3e"),
            vec![TokenKind::Number(3.0), TokenKind::Ident("e".into())]
        );
    }

    #[test]
    fn operators_and_offsets() {
        let tokens = tokenize("a *  oo").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Star);
        assert_eq!(tokens[1].offset, 2);
        assert_eq!(tokens[2].kind, TokenKind::Infinity);
        assert_eq!(tokens[2].offset, 5);
    }

    #[test]
    fn unknown_character() {
        let err = tokenize("a + $").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar('$'));
    }

    #[test]
    fn lone_dot_is_invalid() {
        let err = tokenize("1 + .").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidNumber);
        assert_eq!(err.offset, 4);
    }
}
