//! Capture-group resolution
//!
//! A second pass over the AST that assigns capture-group ids in source
//! order of `(` (id 0 is the implicit outermost group attached during
//! compilation), records how many groups the pattern defines, collects the
//! id → name map, and validates quantifier targets. Non-capturing and
//! atomic groups receive no id.
//!
//! The compiler assigns ids by the same preorder traversal, so the two
//! passes agree without threading ids through the tree.

use std::collections::{HashMap, HashSet};

use crate::ast::Expr;
use crate::error::{RegexError, SemanticError};

/// The result of resolving a pattern AST
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Number of explicit capturing groups (ids 1..=group_count)
    pub group_count: usize,
    /// Capture id → group name, for named groups only
    pub group_names: HashMap<usize, String>,
}

struct Resolver {
    next_id: usize,
    names: HashMap<usize, String>,
    seen_names: HashSet<String>,
}

/// Resolve group ids and validate the AST
pub fn resolve(ast: &Expr) -> Result<Resolution, RegexError> {
    let mut resolver = Resolver {
        next_id: 1,
        names: HashMap::new(),
        seen_names: HashSet::new(),
    };
    resolver.visit(ast)?;
    Ok(Resolution {
        group_count: resolver.next_id - 1,
        group_names: resolver.names,
    })
}

impl Resolver {
    fn visit(&mut self, expr: &Expr) -> Result<(), RegexError> {
        match expr {
            Expr::Expression {
                subexpr,
                alternation,
            } => {
                self.visit(subexpr)?;
                if let Some(alt) = alternation {
                    self.visit(alt)?;
                }
                Ok(())
            }
            Expr::SubExpression { items } | Expr::CharacterGroup { items, .. } => {
                for item in items {
                    self.visit(item)?;
                }
                Ok(())
            }
            Expr::Group {
                expr,
                non_capturing,
                name,
                atomic,
            } => {
                if !non_capturing && !atomic {
                    let id = self.next_id;
                    self.next_id += 1;
                    if let Some(name) = name {
                        if !self.seen_names.insert(name.clone()) {
                            return Err(SemanticError::DuplicateGroupName(name.clone()).into());
                        }
                        self.names.insert(id, name.clone());
                    }
                }
                self.visit(expr)
            }
            Expr::Match { item } => self.visit(item),
            Expr::ZeroOrOne { expr, .. }
            | Expr::ZeroOrMore { expr, .. }
            | Expr::OneOrMore { expr, .. }
            | Expr::Range { expr, .. } => {
                ensure_quantifiable(expr)?;
                self.visit(expr)
            }
            _ => Ok(()),
        }
    }
}

/// Quantifiers apply to characters, classes, character groups, groups and
/// backreferences; anchors and other quantifiers are rejected
fn ensure_quantifiable(target: &Expr) -> Result<(), RegexError> {
    let inner = match target {
        Expr::Match { item } => item.as_ref(),
        other => other,
    };
    if inner.is_anchor() || inner.is_quantifier() {
        return Err(SemanticError::NotQuantifiable {
            target: inner.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn resolve_pattern(pattern: &str) -> Result<Resolution, RegexError> {
        resolve(&parse(pattern).unwrap())
    }

    #[test]
    fn test_ids_in_source_order() {
        let res = resolve_pattern("(a)(b(c))(d)").unwrap();
        assert_eq!(res.group_count, 4);
    }

    #[test]
    fn test_non_capturing_and_atomic_skip_ids() {
        let res = resolve_pattern("(a)(?:b)(?>c)(d)").unwrap();
        assert_eq!(res.group_count, 2);
    }

    #[test]
    fn test_named_groups() {
        let res = resolve_pattern("(?<first>a)(b)(?<second>c)").unwrap();
        assert_eq!(res.group_count, 3);
        assert_eq!(res.group_names.get(&1).map(String::as_str), Some("first"));
        assert_eq!(res.group_names.get(&2), None);
        assert_eq!(res.group_names.get(&3).map(String::as_str), Some("second"));
    }

    #[test]
    fn test_alternation_orders_ids_left_to_right() {
        let res = resolve_pattern("(?<l>a)|(?<r>b)").unwrap();
        assert_eq!(res.group_names.get(&1).map(String::as_str), Some("l"));
        assert_eq!(res.group_names.get(&2).map(String::as_str), Some("r"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = resolve_pattern("(?<g>a)(?<g>b)").unwrap_err();
        assert!(matches!(
            err,
            RegexError::Semantic(SemanticError::DuplicateGroupName(_))
        ));
    }

    #[test]
    fn test_quantified_quantifier_rejected() {
        let err = resolve_pattern("a**").unwrap_err();
        assert!(matches!(
            err,
            RegexError::Semantic(SemanticError::NotQuantifiable { .. })
        ));
    }

    #[test]
    fn test_quantified_anchor_rejected() {
        for pattern in ["^*", "$+", r"(a)\b?"] {
            let err = resolve_pattern(pattern).unwrap_err();
            assert!(
                matches!(
                    err,
                    RegexError::Semantic(SemanticError::NotQuantifiable { .. })
                ),
                "pattern {pattern:?}"
            );
        }
    }

    #[test]
    fn test_quantified_group_and_backreference_allowed() {
        assert!(resolve_pattern("(ab)+").is_ok());
        assert!(resolve_pattern(r"(a)\1*").is_ok());
        assert!(resolve_pattern("[a-z]{2,4}").is_ok());
    }
}
