//! Error types for the regex engine
//!
//! Compile-time failures are categorized by the pipeline stage that raised
//! them: scanning, parsing (syntax and range checks), or resolution and
//! compilation (semantic checks). Matching itself never fails; the absence
//! of a match is reported as an empty capture map.

use thiserror::Error;

/// The top-level error type returned by pattern construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegexError {
    /// The pattern contains a byte sequence the scanner does not accept
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// The token stream violates the pattern grammar
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// A range was written back to front
    #[error("range error: {0}")]
    Range(#[from] RangeError),

    /// The pattern is well-formed but meaningless
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
}

/// Errors raised while scanning a pattern into tokens
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The pattern contains a code point outside the supported set
    #[error("character {character:?} at position {position} is not a supported code point")]
    UnsupportedCodePoint {
        /// The offending character
        character: char,
        /// Character offset in the pattern
        position: usize,
    },
}

/// Errors raised by the parser
///
/// Each variant carries the index of the offending token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// A token appeared where the grammar does not allow it
    #[error("unexpected {found} at token {index}: expected {expected}")]
    UnexpectedToken {
        /// Index of the offending token
        index: usize,
        /// Display form of the token that was found
        found: String,
        /// What the parser was looking for
        expected: String,
    },

    /// A group was opened but never closed
    #[error("expected ')' to close group at token {index}")]
    MissingGroupClose { index: usize },

    /// A character group was opened but never closed
    #[error("expected ']' to close character group at token {index}")]
    MissingBracketClose { index: usize },

    /// A range quantifier was opened but never closed
    #[error("expected '}}' to close range quantifier at token {index}")]
    MissingBraceClose { index: usize },

    /// `[]` or `[^]` with no members
    #[error("empty character group at token {index}")]
    EmptyCharacterGroup { index: usize },

    /// A backslash that is not followed by a group number
    #[error("expected integer after '\\' in backreference at token {index}")]
    MissingBackreferenceIndex { index: usize },

    /// `(?<>...)` with nothing between the angle brackets
    #[error("empty group name at token {index}")]
    EmptyGroupName { index: usize },
}

/// Errors raised when a syntactically valid range is out of order
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    /// `{n,m}` with `n > m`
    #[error("range quantifier bounds out of order: {{{low},{up}}}")]
    QuantifierOutOfOrder { low: u32, up: u32 },

    /// `[x-y]` with `x` ordered after `y`
    #[error("character range out of order: {from:?}-{to:?}")]
    CharacterRangeOutOfOrder { from: char, to: char },
}

/// Errors raised by the resolver and the compiler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    /// A quantifier was applied to an anchor or another quantifier
    #[error("the preceding expression `{target}` is not quantifiable")]
    NotQuantifiable { target: String },

    /// A backreference names a group the pattern does not define
    #[error("backreference \\{index} refers to an unknown group (pattern has {group_count})")]
    UnknownGroup { index: usize, group_count: usize },

    /// Two capturing groups share a name
    #[error("duplicate group name '{0}'")]
    DuplicateGroupName(String),

    /// An anchor that is parsed but cannot be compiled
    #[error("anchor `{0}` is not supported")]
    UnsupportedAnchor(&'static str),
}

/// Result type alias for pattern construction
pub type Result<T> = std::result::Result<T, RegexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_display() {
        let err = RegexError::Scan(ScanError::UnsupportedCodePoint {
            character: '\u{0}',
            position: 3,
        });
        assert_eq!(
            err.to_string(),
            "scan error: character '\\0' at position 3 is not a supported code point"
        );
    }

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::MissingBraceClose { index: 4 };
        assert_eq!(
            err.to_string(),
            "expected '}' to close range quantifier at token 4"
        );
    }

    #[test]
    fn test_range_error_display() {
        let err = RangeError::QuantifierOutOfOrder { low: 5, up: 2 };
        assert_eq!(err.to_string(), "range quantifier bounds out of order: {5,2}");
    }

    #[test]
    fn test_semantic_error_from() {
        let err: RegexError = SemanticError::UnknownGroup {
            index: 3,
            group_count: 1,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "semantic error: backreference \\3 refers to an unknown group (pattern has 1)"
        );
    }
}
