//! Cell symbol representations.
//!
//! A machine is built over exactly one symbol type: `char` for single-character
//! alphabets or [`Token`] for multi-character ones. The choice is made when the
//! machine is parsed or built, so tapes and the engine never inspect a mode flag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use crate::types::{BLANK_SYMBOL, TOKEN_DELIMITER};

/// A symbol that can be stored in a tape cell.
pub trait Symbol: Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize {
    /// The blank symbol every alphabet implicitly contains.
    fn blank() -> Self;

    /// Parses a single comma-separated field of a machine description.
    ///
    /// Returns `None` when the field cannot represent a symbol of this type,
    /// e.g. a multi-character field in single-character mode.
    fn from_field(field: &str) -> Option<Self>;

    /// Splits tape input text into symbols.
    ///
    /// Single characters are split per character, tokens on `|`.
    fn split_input(input: &str) -> Vec<Self>;

    /// Joins symbols back into tape input text; the inverse of [`Symbol::split_input`].
    fn join(symbols: &[Self]) -> String;

    /// Converts this symbol into its multi-character form.
    fn to_token(&self) -> Token {
        Token(self.to_string())
    }

    /// Converts a token back into this symbol type.
    fn from_token(token: &Token) -> Option<Self> {
        Self::from_field(token.as_str())
    }

    fn is_blank(&self) -> bool {
        *self == Self::blank()
    }
}

impl Symbol for char {
    fn blank() -> Self {
        BLANK_SYMBOL
    }

    fn from_field(field: &str) -> Option<Self> {
        let mut chars = field.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if is_field_char(c) => Some(c),
            _ => None,
        }
    }

    fn split_input(input: &str) -> Vec<Self> {
        input.chars().collect()
    }

    fn join(symbols: &[Self]) -> String {
        symbols.iter().collect()
    }
}

/// A multi-character symbol.
///
/// Tokens are never inferred from adjacent characters: in machine text they are
/// separated by commas, in tape input by `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token(value.to_string())
    }
}

impl From<char> for Token {
    fn from(value: char) -> Self {
        Token(value.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Symbol for Token {
    fn blank() -> Self {
        Token::from(BLANK_SYMBOL)
    }

    fn from_field(field: &str) -> Option<Self> {
        (!field.is_empty() && field.chars().all(is_field_char)).then(|| Token::from(field))
    }

    fn split_input(input: &str) -> Vec<Self> {
        input
            .split(TOKEN_DELIMITER)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(Token::from)
            .collect()
    }

    fn join(symbols: &[Self]) -> String {
        symbols
            .iter()
            .map(Token::as_str)
            .collect::<Vec<_>>()
            .join(&TOKEN_DELIMITER.to_string())
    }

    fn to_token(&self) -> Token {
        self.clone()
    }

    fn from_token(token: &Token) -> Option<Self> {
        Some(token.clone())
    }
}

/// Characters that may appear inside a symbol in machine text.
fn is_field_char(c: char) -> bool {
    !c.is_whitespace() && c != ',' && c != TOKEN_DELIMITER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_from_field() {
        assert_eq!(char::from_field("a"), Some('a'));
        assert_eq!(char::from_field("ab"), None);
        assert_eq!(char::from_field(""), None);
        assert_eq!(char::from_field("|"), None);
    }

    #[test]
    fn test_token_split_input() {
        let tokens = Token::split_input("ab|c| ab ");
        assert_eq!(
            tokens,
            vec![Token::from("ab"), Token::from("c"), Token::from("ab")]
        );
        assert_eq!(Token::join(&tokens), "ab|c|ab");
        assert!(Token::split_input("").is_empty());
    }

    #[test]
    fn test_blank_symbols_agree() {
        assert!('_'.is_blank());
        assert!(Token::from("_").is_blank());
        assert_eq!('_'.to_token(), Token::blank());
    }

    #[test]
    fn test_token_serializes_as_string() {
        let json = serde_json::to_string(&Token::from("ab")).unwrap();
        assert_eq!(json, "\"ab\"");
    }
}
