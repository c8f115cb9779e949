//! AST → NFA compilation
//!
//! Every AST node compiles to a fragment with one entry and one exit
//! state. Greediness is encoded by transition order alone: greedy loops
//! wire "stay" before "exit", lazy loops the reverse. Counted repetition
//! introduces a shared counter and three zero-width matchers (increment,
//! loop gate, exit gate); the counter is zeroed again on the exit state so
//! outer repetitions observe a fresh loop.
//!
//! The whole compiled pattern is wrapped in capture group 0.

use std::collections::HashMap;

use crate::ast::Expr;
use crate::error::{RegexError, SemanticError};
use crate::matcher::{ClassMatcher, Gate, Matcher, any_char_class, digit_class, whitespace_class, word_class};
use crate::nfa::{Fragment, Nfa, NfaBuilder};
use crate::resolver::Resolution;

/// Compile a resolved AST into an NFA
///
/// `multiline` switches `^`/`$` from string anchors to line anchors.
pub fn compile(ast: &Expr, resolution: &Resolution, multiline: bool) -> Result<Nfa, RegexError> {
    let mut compiler = Compiler {
        builder: NfaBuilder::new(),
        resolution,
        next_group_id: 1,
        multiline,
    };
    let fragment = compiler.compile_expr(ast)?;

    // the implicit outermost capture
    compiler.builder.state_mut(fragment.start).start_groups.push(0);
    compiler.builder.state_mut(fragment.end).end_groups.push(0);

    let mut group_name_map: HashMap<usize, Option<String>> = HashMap::new();
    group_name_map.insert(0, None);
    for id in 1..=resolution.group_count {
        group_name_map.insert(id, resolution.group_names.get(&id).cloned());
    }

    Ok(compiler.builder.finish(fragment, group_name_map))
}

struct Compiler<'a> {
    builder: NfaBuilder,
    resolution: &'a Resolution,
    next_group_id: usize,
    multiline: bool,
}

impl Compiler<'_> {
    fn compile_expr(&mut self, expr: &Expr) -> Result<Fragment, RegexError> {
        match expr {
            Expr::Empty => Ok(self.builder.basic(Matcher::Epsilon)),

            Expr::Expression {
                subexpr,
                alternation,
            } => {
                let first = self.compile_expr(subexpr)?;
                match alternation {
                    None => Ok(first),
                    Some(alt) => {
                        let second = self.compile_expr(alt)?;
                        Ok(self.alternation(first, second))
                    }
                }
            }

            Expr::SubExpression { items } => {
                let mut fragment = None;
                for item in items {
                    let next = self.compile_expr(item)?;
                    fragment = Some(match fragment {
                        None => next,
                        Some(prev) => self.builder.concat(prev, next),
                    });
                }
                match fragment {
                    Some(fragment) => Ok(fragment),
                    None => Ok(self.builder.basic(Matcher::Epsilon)),
                }
            }

            Expr::Group {
                expr,
                non_capturing,
                atomic,
                ..
            } => {
                let group_id = if !non_capturing && !atomic {
                    let id = self.next_group_id;
                    self.next_group_id += 1;
                    Some(id)
                } else {
                    None
                };
                let fragment = self.compile_expr(expr)?;
                if let Some(id) = group_id {
                    self.builder.state_mut(fragment.start).start_groups.push(id);
                    self.builder.state_mut(fragment.end).end_groups.push(id);
                }
                if *atomic {
                    self.builder.state_mut(fragment.end).atomic_end = true;
                }
                Ok(fragment)
            }

            Expr::Match { item } => self.compile_expr(item),

            Expr::AnyChar => Ok(self.builder.basic(Matcher::Class(any_char_class()))),
            Expr::Character(c) => Ok(self.builder.basic(Matcher::Char(*c))),

            Expr::CharacterGroup { items, negative } => {
                let class = character_group_class(items, *negative);
                Ok(self.builder.basic(Matcher::Class(class)))
            }
            Expr::CharRange { from, to } => Ok(self
                .builder
                .basic(Matcher::Class(ClassMatcher::Range(*from, *to)))),

            Expr::AnyWord => Ok(self.builder.basic(Matcher::Class(word_class(false)))),
            Expr::AnyWordInverted => Ok(self.builder.basic(Matcher::Class(word_class(true)))),
            Expr::AnyDigit => Ok(self.builder.basic(Matcher::Class(digit_class(false)))),
            Expr::AnyDigitInverted => Ok(self.builder.basic(Matcher::Class(digit_class(true)))),
            Expr::AnyWhitespace => Ok(self.builder.basic(Matcher::Class(whitespace_class(false)))),
            Expr::AnyWhitespaceInverted => {
                Ok(self.builder.basic(Matcher::Class(whitespace_class(true))))
            }

            Expr::Backreference(n) => {
                if *n == 0 || *n > self.resolution.group_count {
                    return Err(SemanticError::UnknownGroup {
                        index: *n,
                        group_count: self.resolution.group_count,
                    }
                    .into());
                }
                Ok(self.builder.basic(Matcher::Backref(*n)))
            }

            Expr::StartOfString => {
                let matcher = if self.multiline {
                    Matcher::StartOfLine
                } else {
                    Matcher::StartOfString
                };
                Ok(self.builder.basic(matcher))
            }
            Expr::EndOfString => {
                let matcher = if self.multiline {
                    Matcher::EndOfLine
                } else {
                    Matcher::EndOfString
                };
                Ok(self.builder.basic(matcher))
            }
            Expr::StartOfStringOnly => Ok(self.builder.basic(Matcher::StartOfString)),
            Expr::EndOfStringOnly => Ok(self.builder.basic(Matcher::EndOfString)),
            Expr::WordBoundary => Ok(self.builder.basic(Matcher::WordBoundary)),
            Expr::NonWordBoundary => Ok(self.builder.basic(Matcher::NonWordBoundary)),
            Expr::EndOfStringOnlyNotNewline => {
                Err(SemanticError::UnsupportedAnchor("\\z").into())
            }
            Expr::PreviousMatchEnd => Err(SemanticError::UnsupportedAnchor("\\G").into()),

            Expr::ZeroOrOne { expr, lazy } => {
                let inner = self.compile_expr(expr)?;
                Ok(self.optional(inner, *lazy))
            }
            Expr::ZeroOrMore { expr, lazy } => {
                let inner = self.compile_expr(expr)?;
                Ok(self.repeat(inner, *lazy, true))
            }
            Expr::OneOrMore { expr, lazy } => {
                let inner = self.compile_expr(expr)?;
                Ok(self.repeat(inner, *lazy, false))
            }
            Expr::Range {
                expr,
                low,
                up,
                fixed,
                lazy,
            } => {
                let inner = self.compile_expr(expr)?;
                Ok(self.counted(inner, *low, *up, *fixed, *lazy))
            }
        }
    }

    /// `A|B`: a fresh entry chooses a branch (left first), both exits feed
    /// a fresh exit
    fn alternation(&mut self, first: Fragment, second: Fragment) -> Fragment {
        let start = self.builder.add_state();
        let end = self.builder.add_state();
        self.builder.add_transition(start, first.start, Matcher::Epsilon);
        self.builder.add_transition(start, second.start, Matcher::Epsilon);
        self.builder.add_transition(first.end, end, Matcher::Epsilon);
        self.builder.add_transition(second.end, end, Matcher::Epsilon);
        Fragment { start, end }
    }

    /// `A?`: fresh entry and exit, with a skip edge that bypasses the body
    ///
    /// The bypass must not touch the body's states, otherwise a skipped
    /// capturing group would record an empty capture.
    fn optional(&mut self, inner: Fragment, lazy: bool) -> Fragment {
        let start = self.builder.add_state();
        let end = self.builder.add_state();
        if lazy {
            self.builder.add_transition(start, end, Matcher::Epsilon);
            self.builder.add_transition(start, inner.start, Matcher::Epsilon);
        } else {
            self.builder.add_transition(start, inner.start, Matcher::Epsilon);
            self.builder.add_transition(start, end, Matcher::Epsilon);
        }
        self.builder.add_transition(inner.end, end, Matcher::Epsilon);
        Fragment { start, end }
    }

    /// `A*` (with skip edge) and `A+` (without)
    fn repeat(&mut self, inner: Fragment, lazy: bool, skip: bool) -> Fragment {
        let start = self.builder.add_state();
        let end = self.builder.add_state();
        if lazy {
            if skip {
                self.builder.add_transition(start, end, Matcher::Epsilon);
            }
            self.builder.add_transition(start, inner.start, Matcher::Epsilon);
            self.builder.add_transition(inner.end, end, Matcher::Epsilon);
            self.builder.add_transition(inner.end, inner.start, Matcher::Epsilon);
        } else {
            self.builder.add_transition(start, inner.start, Matcher::Epsilon);
            self.builder.add_transition(inner.end, inner.start, Matcher::Epsilon);
            self.builder.add_transition(inner.end, end, Matcher::Epsilon);
            if skip {
                self.builder.add_transition(start, end, Matcher::Epsilon);
            }
        }
        Fragment { start, end }
    }

    /// `A{n}`, `A{n,}` and `A{n,m}` via one shared counter and three
    /// zero-width matchers
    ///
    /// ```text
    /// start --ε--> A ··· A_end --CM--> gate --Exit--> end
    ///                      ^                  |
    ///                      '------Loop--------'
    /// ```
    fn counted(
        &mut self,
        inner: Fragment,
        low: u32,
        up: Option<u32>,
        fixed: bool,
        lazy: bool,
    ) -> Fragment {
        let counter = self.builder.add_counter();
        let start = self.builder.add_state();
        let gate_state = self.builder.add_state();
        let end = self.builder.add_state();
        let gate = Gate {
            counter,
            low,
            up,
            fixed,
        };

        self.builder.add_transition(start, inner.start, Matcher::Epsilon);
        self.builder
            .add_transition(inner.end, gate_state, Matcher::CountIncrement(counter));
        if lazy {
            self.builder
                .add_transition(gate_state, end, Matcher::ExitGate(gate));
            self.builder
                .add_transition(gate_state, inner.start, Matcher::LoopGate(gate));
        } else {
            self.builder
                .add_transition(gate_state, inner.start, Matcher::LoopGate(gate));
            self.builder
                .add_transition(gate_state, end, Matcher::ExitGate(gate));
        }

        // a zero minimum admits zero iterations, bypassing the body
        if low == 0 {
            if lazy {
                self.builder.add_transition_front(start, end, Matcher::Epsilon);
            } else {
                self.builder.add_transition(start, end, Matcher::Epsilon);
            }
        }

        // leaving the loop rearms it for enclosing repetitions
        self.builder.state_mut(end).clear_counters.push(counter);
        Fragment { start, end }
    }
}

/// Fold the members of `[...]` into one composite class
///
/// Literal characters collapse into a single set; ranges and class escapes
/// keep their own matchers.
fn character_group_class(items: &[Expr], negative: bool) -> ClassMatcher {
    let mut matchers = Vec::new();
    let mut chars = Vec::new();
    for item in items {
        match item {
            Expr::Character(c) => chars.push(*c),
            Expr::CharRange { from, to } => matchers.push(ClassMatcher::Range(*from, *to)),
            Expr::AnyWord => matchers.push(word_class(false)),
            Expr::AnyWordInverted => matchers.push(word_class(true)),
            Expr::AnyDigit => matchers.push(digit_class(false)),
            Expr::AnyDigitInverted => matchers.push(digit_class(true)),
            Expr::AnyWhitespace => matchers.push(whitespace_class(false)),
            Expr::AnyWhitespaceInverted => matchers.push(whitespace_class(true)),
            _ => {}
        }
    }
    if !chars.is_empty() {
        matchers.push(ClassMatcher::Chars(chars));
    }
    ClassMatcher::Composite { matchers, negative }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::resolver::resolve;

    fn build(pattern: &str) -> Nfa {
        let ast = parse(pattern).unwrap();
        let resolution = resolve(&ast).unwrap();
        compile(&ast, &resolution, false).unwrap()
    }

    #[test]
    fn test_literal_compiles_to_one_transition() {
        let nfa = build("a");
        assert_eq!(nfa.states.len(), 2);
        assert_eq!(nfa.ending_states.len(), 1);
        assert_eq!(nfa.states[0].start_groups, vec![0]);
        assert_eq!(nfa.states[nfa.ending_states[0]].end_groups, vec![0]);
    }

    #[test]
    fn test_every_state_is_reachable() {
        for pattern in ["abc", "a|b", "(a)*", "a{2,3}", "(?>ab|a)c", "[x-z]+"] {
            let nfa = build(pattern);
            let mut seen = vec![false; nfa.states.len()];
            let mut queue = vec![nfa.initial_state];
            seen[nfa.initial_state] = true;
            while let Some(id) = queue.pop() {
                for &(_, to) in &nfa.states[id].transitions {
                    if !seen[to] {
                        seen[to] = true;
                        queue.push(to);
                    }
                }
            }
            assert!(seen.iter().all(|&s| s), "unreachable state in {pattern:?}");
        }
    }

    #[test]
    fn test_alternation_prefers_left_branch() {
        let nfa = build("a|b");
        let start_transitions = &nfa.states[nfa.initial_state].transitions;
        assert_eq!(start_transitions.len(), 2);
        let left = start_transitions[0].1;
        assert!(matches!(nfa.states[left].transitions[0].0, Matcher::Char('a')));
    }

    #[test]
    fn test_greedy_star_orders_enter_before_skip() {
        let nfa = build("a*");
        let init = &nfa.states[nfa.initial_state];
        // enter edge first, skip edge last
        let enter = init.transitions[0].1;
        assert!(matches!(nfa.states[enter].transitions[0].0, Matcher::Char('a')));
        assert!(nfa.is_ending(init.transitions[1].1));
    }

    #[test]
    fn test_lazy_star_orders_skip_before_enter() {
        let nfa = build("a*?");
        let init = &nfa.states[nfa.initial_state];
        assert!(nfa.is_ending(init.transitions[0].1));
    }

    #[test]
    fn test_counted_range_wires_gate_and_clear() {
        let nfa = build("a{2,5}");
        assert_eq!(nfa.counter_count, 1);
        let end = nfa.ending_states[0];
        assert_eq!(nfa.states[end].clear_counters, vec![0]);

        let increments = nfa
            .states
            .iter()
            .flat_map(|s| &s.transitions)
            .filter(|(m, _)| matches!(m, Matcher::CountIncrement(0)))
            .count();
        assert_eq!(increments, 1);

        // greedy: loop gate outranks exit gate
        let gate_state = nfa
            .states
            .iter()
            .find(|s| {
                s.transitions
                    .iter()
                    .any(|(m, _)| matches!(m, Matcher::LoopGate(_)))
            })
            .expect("gate state");
        assert!(matches!(gate_state.transitions[0].0, Matcher::LoopGate(_)));
        assert!(matches!(gate_state.transitions[1].0, Matcher::ExitGate(_)));
    }

    #[test]
    fn test_lazy_counted_range_prefers_exit() {
        let nfa = build("a{2,5}?");
        let gate_state = nfa
            .states
            .iter()
            .find(|s| {
                s.transitions
                    .iter()
                    .any(|(m, _)| matches!(m, Matcher::ExitGate(_)))
            })
            .expect("gate state");
        assert!(matches!(gate_state.transitions[0].0, Matcher::ExitGate(_)));
    }

    #[test]
    fn test_zero_minimum_gets_bypass() {
        let nfa = build("a{0,2}");
        let init = &nfa.states[nfa.initial_state];
        // greedy: bypass is the lowest-priority edge
        let last = init.transitions.last().expect("transitions");
        assert!(nfa.is_ending(last.1));
    }

    #[test]
    fn test_nested_counters_are_distinct() {
        let nfa = build("(a{2}){3}");
        assert_eq!(nfa.counter_count, 2);
    }

    #[test]
    fn test_atomic_group_flags_exit_state() {
        let nfa = build("a(?>bc|b)c");
        let flagged = nfa.states.iter().filter(|s| s.atomic_end).count();
        assert_eq!(flagged, 1);
    }

    #[test]
    fn test_capture_markers_on_group_bounds() {
        let nfa = build("(?<g1>ab)");
        let opens: Vec<_> = nfa
            .states
            .iter()
            .filter(|s| s.start_groups.contains(&1))
            .collect();
        let closes: Vec<_> = nfa
            .states
            .iter()
            .filter(|s| s.end_groups.contains(&1))
            .collect();
        assert_eq!(opens.len(), 1);
        assert_eq!(closes.len(), 1);
        assert_eq!(nfa.group_name_map.get(&1), Some(&Some("g1".to_string())));
    }

    #[test]
    fn test_backreference_out_of_range_rejected() {
        let ast = parse(r"(a)\2").unwrap();
        let resolution = resolve(&ast).unwrap();
        let err = compile(&ast, &resolution, false).unwrap_err();
        assert!(matches!(
            err,
            RegexError::Semantic(SemanticError::UnknownGroup {
                index: 2,
                group_count: 1
            })
        ));
    }

    #[test]
    fn test_multiline_switches_anchor_matchers() {
        let ast = parse("^a$").unwrap();
        let resolution = resolve(&ast).unwrap();
        let strict = compile(&ast, &resolution, false).unwrap();
        let lines = compile(&ast, &resolution, true).unwrap();

        let has = |nfa: &Nfa, want: fn(&Matcher) -> bool| {
            nfa.states
                .iter()
                .flat_map(|s| &s.transitions)
                .any(|(m, _)| want(m))
        };
        assert!(has(&strict, |m| matches!(m, Matcher::StartOfString)));
        assert!(has(&lines, |m| matches!(m, Matcher::StartOfLine)));
        assert!(has(&lines, |m| matches!(m, Matcher::EndOfLine)));
    }

    #[test]
    fn test_empty_pattern_compiles_to_epsilon() {
        let nfa = build("");
        assert_eq!(nfa.states.len(), 2);
        assert!(matches!(nfa.states[0].transitions[0].0, Matcher::Epsilon));
    }
}
