//! Abstract syntax tree for regex patterns
//!
//! The tree mirrors the grammar: an `Expression` is a subexpression with an
//! optional alternation tail, a `SubExpression` concatenates items, and
//! quantifiers are wrapper nodes around the expression they repeat. The
//! `Display` impl prints a pattern in canonical form that re-parses to an
//! equal tree.

use std::fmt;

use crate::token::punctuation_kind;

/// A node in the pattern AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The empty pattern (matches the empty string)
    Empty,

    /// A subexpression with an optional `|` alternation tail
    Expression {
        subexpr: Box<Expr>,
        alternation: Option<Box<Expr>>,
    },

    /// A concatenation of items
    SubExpression { items: Vec<Expr> },

    /// `(...)`, `(?:...)`, `(?<name>...)` or `(?>...)`
    Group {
        expr: Box<Expr>,
        non_capturing: bool,
        name: Option<String>,
        atomic: bool,
    },

    /// A single match item (dot, character group, class or literal)
    Match { item: Box<Expr> },

    /// `.`
    AnyChar,

    /// A literal character
    Character(char),

    /// `[...]` or `[^...]`
    CharacterGroup { items: Vec<Expr>, negative: bool },

    /// A `from-to` range inside a character group
    CharRange { from: char, to: char },

    /// `\w`
    AnyWord,
    /// `\W`
    AnyWordInverted,
    /// `\d`
    AnyDigit,
    /// `\D`
    AnyDigitInverted,
    /// `\s`
    AnyWhitespace,
    /// `\S`
    AnyWhitespaceInverted,

    /// `\n` for a group number n
    Backreference(usize),

    /// `^`
    StartOfString,
    /// `$`
    EndOfString,
    /// `\b`
    WordBoundary,
    /// `\B`
    NonWordBoundary,
    /// `\A`
    StartOfStringOnly,
    /// `\Z`
    EndOfStringOnly,
    /// `\z`
    EndOfStringOnlyNotNewline,
    /// `\G`
    PreviousMatchEnd,

    /// `?`
    ZeroOrOne { expr: Box<Expr>, lazy: bool },
    /// `*`
    ZeroOrMore { expr: Box<Expr>, lazy: bool },
    /// `+`
    OneOrMore { expr: Box<Expr>, lazy: bool },
    /// `{n}`, `{n,}` or `{n,m}`
    Range {
        expr: Box<Expr>,
        low: u32,
        up: Option<u32>,
        fixed: bool,
        lazy: bool,
    },
}

impl Expr {
    /// Whether this node is an anchor
    pub fn is_anchor(&self) -> bool {
        matches!(
            self,
            Expr::StartOfString
                | Expr::EndOfString
                | Expr::WordBoundary
                | Expr::NonWordBoundary
                | Expr::StartOfStringOnly
                | Expr::EndOfStringOnly
                | Expr::EndOfStringOnlyNotNewline
                | Expr::PreviousMatchEnd
        )
    }

    /// Whether this node is a quantifier wrapper
    pub fn is_quantifier(&self) -> bool {
        matches!(
            self,
            Expr::ZeroOrOne { .. }
                | Expr::ZeroOrMore { .. }
                | Expr::OneOrMore { .. }
                | Expr::Range { .. }
        )
    }
}

/// Write a literal character, escaping pattern punctuation
fn write_literal(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    if punctuation_kind(c).is_some() {
        write!(f, "\\{c}")
    } else {
        write!(f, "{c}")
    }
}

/// Write a literal character inside a character group
fn write_class_literal(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    if matches!(c, '\\' | ']' | '-' | '^') {
        write!(f, "\\{c}")
    } else {
        write!(f, "{c}")
    }
}

fn lazy_suffix(lazy: bool) -> &'static str {
    if lazy { "?" } else { "" }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => Ok(()),
            Expr::Expression {
                subexpr,
                alternation,
            } => {
                write!(f, "{subexpr}")?;
                if let Some(alt) = alternation {
                    write!(f, "|{alt}")?;
                }
                Ok(())
            }
            Expr::SubExpression { items } => {
                for item in items {
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Expr::Group {
                expr,
                non_capturing,
                name,
                atomic,
            } => {
                if *atomic {
                    write!(f, "(?>{expr})")
                } else if let Some(name) = name {
                    write!(f, "(?<{name}>{expr})")
                } else if *non_capturing {
                    write!(f, "(?:{expr})")
                } else {
                    write!(f, "({expr})")
                }
            }
            Expr::Match { item } => write!(f, "{item}"),
            Expr::AnyChar => write!(f, "."),
            Expr::Character(c) => write_literal(f, *c),
            Expr::CharacterGroup { items, negative } => {
                write!(f, "[")?;
                if *negative {
                    write!(f, "^")?;
                }
                for item in items {
                    match item {
                        Expr::Character(c) => write_class_literal(f, *c)?,
                        Expr::CharRange { from, to } => {
                            write_class_literal(f, *from)?;
                            write!(f, "-")?;
                            write_class_literal(f, *to)?;
                        }
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
            Expr::CharRange { from, to } => {
                write_class_literal(f, *from)?;
                write!(f, "-")?;
                write_class_literal(f, *to)
            }
            Expr::AnyWord => write!(f, "\\w"),
            Expr::AnyWordInverted => write!(f, "\\W"),
            Expr::AnyDigit => write!(f, "\\d"),
            Expr::AnyDigitInverted => write!(f, "\\D"),
            Expr::AnyWhitespace => write!(f, "\\s"),
            Expr::AnyWhitespaceInverted => write!(f, "\\S"),
            Expr::Backreference(n) => write!(f, "\\{n}"),
            Expr::StartOfString => write!(f, "^"),
            Expr::EndOfString => write!(f, "$"),
            Expr::WordBoundary => write!(f, "\\b"),
            Expr::NonWordBoundary => write!(f, "\\B"),
            Expr::StartOfStringOnly => write!(f, "\\A"),
            Expr::EndOfStringOnly => write!(f, "\\Z"),
            Expr::EndOfStringOnlyNotNewline => write!(f, "\\z"),
            Expr::PreviousMatchEnd => write!(f, "\\G"),
            Expr::ZeroOrOne { expr, lazy } => write!(f, "{expr}?{}", lazy_suffix(*lazy)),
            Expr::ZeroOrMore { expr, lazy } => write!(f, "{expr}*{}", lazy_suffix(*lazy)),
            Expr::OneOrMore { expr, lazy } => write!(f, "{expr}+{}", lazy_suffix(*lazy)),
            Expr::Range {
                expr,
                low,
                up,
                fixed,
                lazy,
            } => {
                write!(f, "{expr}")?;
                if *fixed {
                    write!(f, "{{{low}}}")?;
                } else if let Some(up) = up {
                    write!(f, "{{{low},{up}}}")?;
                } else {
                    write!(f, "{{{low},}}")?;
                }
                write!(f, "{}", lazy_suffix(*lazy))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(item: Expr) -> Expr {
        Expr::Match {
            item: Box::new(item),
        }
    }

    #[test]
    fn test_display_literal_escapes_punctuation() {
        assert_eq!(matched(Expr::Character('a')).to_string(), "a");
        assert_eq!(matched(Expr::Character('+')).to_string(), "\\+");
        assert_eq!(matched(Expr::Character('\\')).to_string(), "\\\\");
    }

    #[test]
    fn test_display_quantifiers() {
        let star = Expr::ZeroOrMore {
            expr: Box::new(matched(Expr::Character('a'))),
            lazy: false,
        };
        assert_eq!(star.to_string(), "a*");

        let lazy_range = Expr::Range {
            expr: Box::new(matched(Expr::Character('a'))),
            low: 2,
            up: Some(5),
            fixed: false,
            lazy: true,
        };
        assert_eq!(lazy_range.to_string(), "a{2,5}?");

        let at_least = Expr::Range {
            expr: Box::new(matched(Expr::Character('a'))),
            low: 3,
            up: None,
            fixed: false,
            lazy: false,
        };
        assert_eq!(at_least.to_string(), "a{3,}");
    }

    #[test]
    fn test_display_groups() {
        let group = Expr::Group {
            expr: Box::new(matched(Expr::Character('a'))),
            non_capturing: false,
            name: None,
            atomic: false,
        };
        assert_eq!(group.to_string(), "(a)");

        let named = Expr::Group {
            expr: Box::new(matched(Expr::Character('a'))),
            non_capturing: false,
            name: Some("g1".to_string()),
            atomic: false,
        };
        assert_eq!(named.to_string(), "(?<g1>a)");

        let atomic = Expr::Group {
            expr: Box::new(matched(Expr::Character('a'))),
            non_capturing: true,
            name: None,
            atomic: true,
        };
        assert_eq!(atomic.to_string(), "(?>a)");
    }

    #[test]
    fn test_display_character_group() {
        let group = Expr::CharacterGroup {
            items: vec![
                Expr::CharRange { from: 'a', to: 'z' },
                Expr::AnyDigit,
                Expr::Character('-'),
            ],
            negative: true,
        };
        assert_eq!(group.to_string(), "[^a-z\\d\\-]");
    }

    #[test]
    fn test_display_alternation() {
        let expr = Expr::Expression {
            subexpr: Box::new(matched(Expr::Character('a'))),
            alternation: Some(Box::new(Expr::Expression {
                subexpr: Box::new(matched(Expr::Character('b'))),
                alternation: None,
            })),
        };
        assert_eq!(expr.to_string(), "a|b");
    }

    #[test]
    fn test_anchor_and_quantifier_predicates() {
        assert!(Expr::WordBoundary.is_anchor());
        assert!(Expr::PreviousMatchEnd.is_anchor());
        assert!(!Expr::AnyChar.is_anchor());
        let star = Expr::ZeroOrMore {
            expr: Box::new(Expr::AnyChar),
            lazy: false,
        };
        assert!(star.is_quantifier());
        assert!(!Expr::Empty.is_quantifier());
    }
}
