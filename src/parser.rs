//! Recursive-descent parser for regex patterns
//!
//! Grammar (simplified):
//!
//! ```text
//! Expression      := SubExpression ("|" Expression)?
//! SubExpression   := (Anchor | Group | Match | Backreference)+
//! Match           := ("." | CharacterGroup | CharacterClass | Char) Quantifier?
//! Group           := "(" ("?:" | "?<" GroupName ">" | "?>")? Expression ")" Quantifier?
//! CharacterGroup  := "[" "^"? (CharacterClass | CharacterRange | Literal)+ "]"
//! CharacterRange  := Char "-" Char
//! Quantifier      := ("*" | "+" | "?" | "{" Int ("," Int?)? "}") "?"?
//! Backreference   := "\" Int+
//! ```
//!
//! Inside `[...]` a `-` is a range operator only when both flanks are
//! literal characters and the right flank is not `]`, the end of the
//! pattern, or a class escape; a `^` negates the group only at the opening
//! position. A quantifier token that follows an already-quantified item or
//! an anchor re-wraps that item, leaving the rejection to the resolver.

use crate::ast::Expr;
use crate::error::{RangeError, RegexError, SyntaxError};
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

/// Parser over a scanned token stream
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

const QUANTIFIER_STARTS: &[TokenKind] = &[
    TokenKind::Star,
    TokenKind::Plus,
    TokenKind::Question,
    TokenKind::LeftBrace,
];

const DANGLING_QUANTIFIERS: &[TokenKind] =
    &[TokenKind::Star, TokenKind::Plus, TokenKind::Question];

const ANCHORS: &[TokenKind] = &[
    TokenKind::Caret,
    TokenKind::Dollar,
    TokenKind::WordBound,
    TokenKind::NonWordBound,
    TokenKind::StartOfStringOnly,
    TokenKind::EndOfStringOnly,
];

const CHAR_CLASSES: &[TokenKind] = &[
    TokenKind::AnyWord,
    TokenKind::AnyWordInverted,
    TokenKind::AnyDigit,
    TokenKind::AnyDigitInverted,
    TokenKind::AnyWhitespace,
    TokenKind::AnyWhitespaceInverted,
];

/// Token kinds that begin a match item
fn is_match_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Dot
            | TokenKind::LeftBracket
            | TokenKind::AnyWord
            | TokenKind::AnyWordInverted
            | TokenKind::AnyDigit
            | TokenKind::AnyDigitInverted
            | TokenKind::AnyWhitespace
            | TokenKind::AnyWhitespaceInverted
            | TokenKind::RightBracket
            | TokenKind::RightBrace
            | TokenKind::LeftBrace
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::Minus
            | TokenKind::Int
            | TokenKind::Letter
            | TokenKind::Ascii
            | TokenKind::Char
    )
}

fn is_char_class(kind: TokenKind) -> bool {
    CHAR_CLASSES.contains(&kind)
}

fn char_class_expr(kind: TokenKind) -> Expr {
    match kind {
        TokenKind::AnyWord => Expr::AnyWord,
        TokenKind::AnyWordInverted => Expr::AnyWordInverted,
        TokenKind::AnyDigit => Expr::AnyDigit,
        TokenKind::AnyDigitInverted => Expr::AnyDigitInverted,
        TokenKind::AnyWhitespace => Expr::AnyWhitespace,
        _ => Expr::AnyWhitespaceInverted,
    }
}

/// The character a value-carrying token was scanned from
fn literal_value(token: &Token) -> char {
    token.value.unwrap_or('\0')
}

fn digit_value(token: &Token) -> u32 {
    literal_value(token).to_digit(10).unwrap_or(0)
}

impl<'a> Parser<'a> {
    /// Create a parser over a token stream
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parse the token stream into an AST
    ///
    /// The empty pattern parses to `Expr::Empty`; anything left over after
    /// the top-level expression is an error.
    pub fn parse(&mut self) -> Result<Expr, RegexError> {
        if self.at_end() {
            return Ok(Expr::Empty);
        }
        let expr = self.expression()?;
        if !self.at_end() {
            return Err(self.unexpected("end of pattern"));
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, RegexError> {
        let subexpr = self.subexpression()?;
        let alternation = if self.match_kind(TokenKind::Or) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        Ok(Expr::Expression {
            subexpr: Box::new(subexpr),
            alternation,
        })
    }

    fn subexpression(&mut self) -> Result<Expr, RegexError> {
        let mut items: Vec<Expr> = Vec::new();
        loop {
            if self.match_kinds(ANCHORS) {
                items.push(self.anchor());
            } else if self.match_kind(TokenKind::LeftParen) {
                items.push(self.group()?);
            } else if self.match_match_start() {
                items.push(self.match_expr()?);
            } else if self.match_kind(TokenKind::Escape) {
                items.push(self.backreference()?);
            } else if !items.is_empty() && self.check_any(DANGLING_QUANTIFIERS) {
                // a dangling *, + or ? re-quantifies the previous item;
                // the resolver decides whether that target is legal
                self.advance();
                if let Some(prev) = items.pop() {
                    items.push(self.quantifier(prev)?);
                }
            } else {
                break;
            }
        }
        if items.is_empty() {
            return Err(self.unexpected("a subexpression"));
        }
        Ok(Expr::SubExpression { items })
    }

    fn match_expr(&mut self) -> Result<Expr, RegexError> {
        let prev = self.previous();
        let item = match prev.kind {
            TokenKind::Dot => Expr::AnyChar,
            TokenKind::LeftBracket => self.char_group()?,
            kind if is_char_class(kind) => char_class_expr(kind),
            _ => Expr::Character(literal_value(&prev)),
        };
        let matched = Expr::Match {
            item: Box::new(item),
        };
        if self.match_kinds(QUANTIFIER_STARTS) {
            self.quantifier(matched)
        } else {
            Ok(matched)
        }
    }

    fn quantifier(&mut self, inner: Expr) -> Result<Expr, RegexError> {
        let token = self.previous();
        let inner = Box::new(inner);
        let mut expr = match token.kind {
            TokenKind::LeftBrace => self.range_quantifier(inner)?,
            TokenKind::Star => Expr::ZeroOrMore {
                expr: inner,
                lazy: false,
            },
            TokenKind::Plus => Expr::OneOrMore {
                expr: inner,
                lazy: false,
            },
            _ => Expr::ZeroOrOne {
                expr: inner,
                lazy: false,
            },
        };
        if self.match_kind(TokenKind::Question) {
            match &mut expr {
                Expr::ZeroOrOne { lazy, .. }
                | Expr::ZeroOrMore { lazy, .. }
                | Expr::OneOrMore { lazy, .. }
                | Expr::Range { lazy, .. } => *lazy = true,
                _ => {}
            }
        }
        Ok(expr)
    }

    fn range_quantifier(&mut self, inner: Box<Expr>) -> Result<Expr, RegexError> {
        if !self.match_kind(TokenKind::Int) {
            return Err(self.unexpected("an integer lower bound"));
        }
        let mut low = digit_value(&self.previous());
        while self.match_kind(TokenKind::Int) {
            low = low * 10 + digit_value(&self.previous());
        }
        let mut up = None;
        let mut fixed = true;
        if self.match_kind(TokenKind::Comma) {
            fixed = false;
            if self.match_kind(TokenKind::Int) {
                let mut u = digit_value(&self.previous());
                while self.match_kind(TokenKind::Int) {
                    u = u * 10 + digit_value(&self.previous());
                }
                if low > u {
                    return Err(RangeError::QuantifierOutOfOrder { low, up: u }.into());
                }
                up = Some(u);
            }
        }
        if !self.match_kind(TokenKind::RightBrace) {
            return Err(SyntaxError::MissingBraceClose {
                index: self.current,
            }
            .into());
        }
        Ok(Expr::Range {
            expr: inner,
            low,
            up,
            fixed,
            lazy: false,
        })
    }

    fn group(&mut self) -> Result<Expr, RegexError> {
        let mut non_capturing = false;
        let mut atomic = false;
        let mut name = None;
        if self.check(TokenKind::Question) && self.check_next(TokenKind::Colon) {
            self.advance();
            self.advance();
            non_capturing = true;
        } else if self.check(TokenKind::Question) && self.check_next(TokenKind::Greater) {
            self.advance();
            self.advance();
            non_capturing = true;
            atomic = true;
        } else if self.check(TokenKind::Question) && self.check_next(TokenKind::Less) {
            self.advance();
            self.advance();
            name = Some(self.group_name()?);
        }
        let expr = self.expression()?;
        if !self.match_kind(TokenKind::RightParen) {
            return Err(SyntaxError::MissingGroupClose {
                index: self.current,
            }
            .into());
        }
        let group = Expr::Group {
            expr: Box::new(expr),
            non_capturing,
            name,
            atomic,
        };
        if self.match_kinds(QUANTIFIER_STARTS) {
            self.quantifier(group)
        } else {
            Ok(group)
        }
    }

    fn group_name(&mut self) -> Result<String, RegexError> {
        let mut name = String::new();
        while matches!(
            self.peek().kind,
            TokenKind::Int | TokenKind::Letter | TokenKind::Ascii | TokenKind::Char
        ) {
            let token = self.advance();
            name.push(literal_value(&token));
        }
        if name.is_empty() {
            return Err(SyntaxError::EmptyGroupName {
                index: self.current,
            }
            .into());
        }
        if !self.match_kind(TokenKind::Greater) {
            return Err(self.unexpected("`>` to close the group name"));
        }
        Ok(name)
    }

    fn anchor(&mut self) -> Expr {
        match self.previous().kind {
            TokenKind::Caret => Expr::StartOfString,
            TokenKind::WordBound => Expr::WordBoundary,
            TokenKind::NonWordBound => Expr::NonWordBoundary,
            TokenKind::StartOfStringOnly => Expr::StartOfStringOnly,
            TokenKind::EndOfStringOnly => Expr::EndOfStringOnly,
            _ => Expr::EndOfString,
        }
    }

    fn char_group(&mut self) -> Result<Expr, RegexError> {
        let negative = self.match_kind(TokenKind::Caret);
        if self.check(TokenKind::RightBracket) {
            return Err(SyntaxError::EmptyCharacterGroup {
                index: self.current,
            }
            .into());
        }
        let mut items = Vec::new();
        let mut last_was_char = true;
        while !self.at_end() && !self.check(TokenKind::RightBracket) {
            if self.match_kinds(CHAR_CLASSES) {
                last_was_char = false;
                items.push(char_class_expr(self.previous().kind));
            } else {
                let token = self.advance();
                if last_was_char && self.check(TokenKind::Minus) && self.range_flank_follows() {
                    items.push(self.char_range(token)?);
                } else {
                    items.push(Expr::Character(literal_value(&token)));
                }
                last_was_char = true;
            }
        }
        if self.at_end() {
            return Err(SyntaxError::MissingBracketClose {
                index: self.current,
            }
            .into());
        }
        self.advance();
        Ok(Expr::CharacterGroup { items, negative })
    }

    /// Whether the token after the pending `-` can be a range upper flank
    fn range_flank_follows(&self) -> bool {
        match self.tokens.get(self.current + 1) {
            None => false,
            Some(token) => {
                !matches!(token.kind, TokenKind::Eof | TokenKind::RightBracket)
                    && !is_char_class(token.kind)
            }
        }
    }

    fn char_range(&mut self, from: Token) -> Result<Expr, RegexError> {
        self.advance();
        let to = self.advance();
        let (from, to) = (literal_value(&from), literal_value(&to));
        if from > to {
            return Err(RangeError::CharacterRangeOutOfOrder { from, to }.into());
        }
        Ok(Expr::CharRange { from, to })
    }

    fn backreference(&mut self) -> Result<Expr, RegexError> {
        if !self.match_kind(TokenKind::Int) {
            return Err(SyntaxError::MissingBackreferenceIndex {
                index: self.current,
            }
            .into());
        }
        let mut n = digit_value(&self.previous()) as usize;
        while self.match_kind(TokenKind::Int) {
            n = n * 10 + digit_value(&self.previous()) as usize;
        }
        Ok(Expr::Backreference(n))
    }

    fn unexpected(&self, expected: &str) -> RegexError {
        SyntaxError::UnexpectedToken {
            index: self.current,
            found: self.peek().to_string(),
            expected: expected.to_string(),
        }
        .into()
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> Token {
        self.tokens
            .get(self.current)
            .copied()
            .unwrap_or_else(Token::eof)
    }

    fn previous(&self) -> Token {
        self.tokens
            .get(self.current.wrapping_sub(1))
            .copied()
            .unwrap_or_else(Token::eof)
    }

    fn advance(&mut self) -> Token {
        if !self.at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.at_end() && self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[TokenKind]) -> bool {
        !self.at_end() && kinds.contains(&self.peek().kind)
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        if self.at_end() {
            return false;
        }
        match self.tokens.get(self.current + 1) {
            Some(token) if token.kind != TokenKind::Eof => token.kind == kind,
            _ => false,
        }
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.match_kind(kind) {
                return true;
            }
        }
        false
    }

    fn match_match_start(&mut self) -> bool {
        if !self.at_end() && is_match_start(self.peek().kind) {
            self.advance();
            return true;
        }
        false
    }
}

/// Scan and parse a pattern in one step
pub fn parse(pattern: &str) -> Result<Expr, RegexError> {
    let tokens = Scanner::new(pattern).scan_tokens()?;
    Parser::new(&tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegexError;

    fn roundtrip(pattern: &str) {
        let ast = parse(pattern).unwrap();
        let printed = ast.to_string();
        let reparsed = parse(&printed).unwrap();
        assert_eq!(ast, reparsed, "canonical form {printed:?} of {pattern:?}");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("").unwrap(), Expr::Empty);
    }

    #[test]
    fn test_parse_literals() {
        let ast = parse("abc").unwrap();
        assert_eq!(ast.to_string(), "abc");
    }

    #[test]
    fn test_parse_alternation_is_right_nested() {
        let ast = parse("a|b|c").unwrap();
        let Expr::Expression { alternation, .. } = &ast else {
            panic!("expected expression");
        };
        let Some(tail) = alternation else {
            panic!("expected alternation");
        };
        assert_eq!(tail.to_string(), "b|c");
    }

    #[test]
    fn test_parse_quantifiers() {
        assert_eq!(parse("a*").unwrap().to_string(), "a*");
        assert_eq!(parse("a+?").unwrap().to_string(), "a+?");
        assert_eq!(parse("a{3}").unwrap().to_string(), "a{3}");
        assert_eq!(parse("a{2,}").unwrap().to_string(), "a{2,}");
        assert_eq!(parse("a{2,5}?").unwrap().to_string(), "a{2,5}?");
    }

    #[test]
    fn test_parse_range_quantifier_flags() {
        let ast = parse("a{12}").unwrap();
        let Expr::Expression { subexpr, .. } = ast else {
            panic!();
        };
        let Expr::SubExpression { items } = *subexpr else {
            panic!();
        };
        assert_eq!(
            items[0],
            Expr::Range {
                expr: Box::new(Expr::Match {
                    item: Box::new(Expr::Character('a'))
                }),
                low: 12,
                up: None,
                fixed: true,
                lazy: false,
            }
        );
    }

    #[test]
    fn test_parse_group_forms() {
        assert_eq!(parse("(ab)").unwrap().to_string(), "(ab)");
        assert_eq!(parse("(?:ab)").unwrap().to_string(), "(?:ab)");
        assert_eq!(parse("(?<name>ab)").unwrap().to_string(), "(?<name>ab)");
        assert_eq!(parse("(?>ab)").unwrap().to_string(), "(?>ab)");
    }

    #[test]
    fn test_parse_character_group_ranges() {
        let ast = parse("[a-zA-Z0-9_]").unwrap();
        assert_eq!(ast.to_string(), "[a-zA-Z0-9_]");
    }

    #[test]
    fn test_minus_is_literal_at_edges() {
        let ast = parse("[-a]").unwrap();
        let Expr::Expression { subexpr, .. } = ast else {
            panic!();
        };
        let Expr::SubExpression { items } = *subexpr else {
            panic!();
        };
        let Expr::Match { item } = &items[0] else {
            panic!();
        };
        let Expr::CharacterGroup { items, .. } = item.as_ref() else {
            panic!();
        };
        assert_eq!(items[0], Expr::Character('-'));
        assert_eq!(items[1], Expr::Character('a'));

        let ast = parse("[z-]").unwrap();
        assert!(ast.to_string().contains("z"));
    }

    #[test]
    fn test_minus_before_class_is_literal() {
        let ast = parse(r"[a\d-x]").unwrap();
        let printed = ast.to_string();
        // the '-' after \d must not form a range
        assert_eq!(printed, r"[a\d\-x]");
    }

    #[test]
    fn test_caret_negates_only_at_opening() {
        let ast = parse("[a^]").unwrap();
        let Expr::Expression { subexpr, .. } = ast else {
            panic!();
        };
        let Expr::SubExpression { items } = *subexpr else {
            panic!();
        };
        let Expr::Match { item } = &items[0] else {
            panic!();
        };
        let Expr::CharacterGroup { items, negative } = item.as_ref() else {
            panic!();
        };
        assert!(!negative);
        assert_eq!(items[1], Expr::Character('^'));
    }

    #[test]
    fn test_parse_backreference_multi_digit() {
        let ast = parse(r"(a)\12").unwrap();
        assert!(ast.to_string().contains("\\12"));
    }

    #[test]
    fn test_parse_anchors() {
        assert_eq!(parse("^ab$").unwrap().to_string(), "^ab$");
        assert_eq!(parse(r"\ba\B").unwrap().to_string(), "\\ba\\B");
        assert_eq!(parse(r"\Aa\Z").unwrap().to_string(), "\\Aa\\Z");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("(ab"),
            Err(RegexError::Syntax(SyntaxError::MissingGroupClose { .. }))
        ));
        assert!(matches!(
            parse("[ab"),
            Err(RegexError::Syntax(SyntaxError::MissingBracketClose { .. }))
        ));
        assert!(matches!(
            parse("a{2,5"),
            Err(RegexError::Syntax(SyntaxError::MissingBraceClose { .. }))
        ));
        assert!(matches!(
            parse("[]"),
            Err(RegexError::Syntax(SyntaxError::EmptyCharacterGroup { .. }))
        ));
        assert!(matches!(
            parse(r"(a)\x"),
            Err(RegexError::Syntax(
                SyntaxError::MissingBackreferenceIndex { .. }
            ))
        ));
        assert!(matches!(
            parse("(?<>a)"),
            Err(RegexError::Syntax(SyntaxError::EmptyGroupName { .. }))
        ));
        assert!(matches!(
            parse("a|"),
            Err(RegexError::Syntax(SyntaxError::UnexpectedToken { .. }))
        ));
    }

    #[test]
    fn test_parse_range_errors() {
        assert!(matches!(
            parse("a{5,2}"),
            Err(RegexError::Range(RangeError::QuantifierOutOfOrder {
                low: 5,
                up: 2
            }))
        ));
        assert!(matches!(
            parse("[z-a]"),
            Err(RegexError::Range(RangeError::CharacterRangeOutOfOrder {
                from: 'z',
                to: 'a'
            }))
        ));
    }

    #[test]
    fn test_dangling_quantifier_rewraps() {
        // the parser accepts these; the resolver rejects them
        let ast = parse("a**").unwrap();
        let Expr::Expression { subexpr, .. } = ast else {
            panic!();
        };
        let Expr::SubExpression { items } = *subexpr else {
            panic!();
        };
        assert!(matches!(&items[0], Expr::ZeroOrMore { expr, .. }
            if matches!(expr.as_ref(), Expr::ZeroOrMore { .. })));

        let ast = parse("^*").unwrap();
        let Expr::Expression { subexpr, .. } = ast else {
            panic!();
        };
        let Expr::SubExpression { items } = *subexpr else {
            panic!();
        };
        assert!(matches!(&items[0], Expr::ZeroOrMore { expr, .. }
            if matches!(expr.as_ref(), Expr::StartOfString)));
    }

    #[test]
    fn test_escaped_punctuation_is_literal() {
        let ast = parse(r"\(\)\.").unwrap();
        assert_eq!(ast.to_string(), r"\(\)\.");
    }

    #[test]
    fn test_brace_without_integer_is_error() {
        assert!(parse("a{x}").is_err());
    }

    #[test]
    fn test_canonical_roundtrips() {
        for pattern in [
            "a",
            "abc",
            "a|b|c",
            "(?<g1>a|b)+c*",
            "[a-z\\d]",
            "[-a]",
            "a{2,5}?",
            "a{3}",
            "a{2,}",
            "(?>bc|b)",
            "(?:xy)?",
            "\\.\\*\\\\",
            "^a.b$",
            "(['\"])[a-zA-Z]+\\1",
            "\\ba\\B\\A\\Z",
        ] {
            roundtrip(pattern);
        }
    }
}
