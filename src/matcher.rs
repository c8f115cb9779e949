//! Transition matchers
//!
//! Every transition in the compiled NFA carries a matcher. A matcher is
//! asked whether it applies at a position and answers with the number of
//! characters it consumes (`None` for no match). Zero-consumption matchers
//! include the epsilon transition, the anchors, and the three counter
//! matchers that realize counted repetition.

use std::collections::HashMap;
use std::fmt;

/// Index of a shared repetition counter
pub type CounterId = usize;

/// Mutable execution context handed to matchers
///
/// `group_matches` is the most-recently-closed span per group id, used for
/// backreference lookup; `counters` holds the live repetition counters.
pub struct MatchContext<'a> {
    pub group_matches: &'a HashMap<usize, (usize, usize)>,
    pub counters: &'a mut [u32],
}

/// Bounds of one counted repetition, shared by its three matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub counter: CounterId,
    pub low: u32,
    pub up: Option<u32>,
    pub fixed: bool,
}

impl Gate {
    /// Whether another loop iteration is admissible
    fn admits_iteration(&self, count: u32) -> bool {
        if self.fixed {
            count < self.low
        } else if let Some(up) = self.up {
            count < up
        } else {
            true
        }
    }

    /// Whether the counter is in the accepting range for termination
    fn admits_exit(&self, count: u32) -> bool {
        if self.fixed {
            count == self.low
        } else if let Some(up) = self.up {
            self.low <= count && count <= up
        } else {
            self.low <= count
        }
    }
}

/// A transition matcher
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Consume one character if it equals `c`
    Char(char),
    /// Always match, consume nothing
    Epsilon,
    /// Position 0 only
    StartOfString,
    /// Position 0 or just after a newline
    StartOfLine,
    /// End of the subject only
    EndOfString,
    /// End of the subject or just before a newline
    EndOfLine,
    /// Between a word character and a non-word character
    WordBoundary,
    /// Everywhere a word boundary is not
    NonWordBoundary,
    /// Consume the text most recently captured by a group; fails when the
    /// group has not captured
    Backref(usize),
    /// Consume one character accepted by a class matcher
    Class(ClassMatcher),
    /// Increment a repetition counter, consume nothing
    CountIncrement(CounterId),
    /// Pass when the loop may run another iteration
    LoopGate(Gate),
    /// Pass when the loop may terminate
    ExitGate(Gate),
}

impl Matcher {
    /// Test this matcher at `pos`, returning the consumed character count
    pub fn matches(&self, chars: &[char], pos: usize, ctx: &mut MatchContext<'_>) -> Option<usize> {
        match self {
            Matcher::Char(c) => (pos < chars.len() && chars[pos] == *c).then_some(1),
            Matcher::Epsilon => Some(0),
            Matcher::StartOfString => (pos == 0).then_some(0),
            Matcher::StartOfLine => (pos == 0 || chars[pos - 1] == '\n').then_some(0),
            Matcher::EndOfString => (pos == chars.len()).then_some(0),
            Matcher::EndOfLine => (pos == chars.len() || chars[pos] == '\n').then_some(0),
            Matcher::WordBoundary => is_word_boundary(chars, pos).then_some(0),
            Matcher::NonWordBoundary => (!is_word_boundary(chars, pos)).then_some(0),
            Matcher::Backref(id) => {
                let &(start, end) = ctx.group_matches.get(id)?;
                let len = end - start;
                if pos + len > chars.len() {
                    return None;
                }
                (chars[start..end] == chars[pos..pos + len]).then_some(len)
            }
            Matcher::Class(class) => {
                (pos < chars.len() && class.matches(chars[pos])).then_some(1)
            }
            Matcher::CountIncrement(counter) => {
                ctx.counters[*counter] += 1;
                Some(0)
            }
            Matcher::LoopGate(gate) => gate.admits_iteration(ctx.counters[gate.counter]).then_some(0),
            Matcher::ExitGate(gate) => gate.admits_exit(ctx.counters[gate.counter]).then_some(0),
        }
    }

    /// Short label for transition dumps
    pub fn label(&self) -> String {
        match self {
            Matcher::Char(c) => c.to_string(),
            Matcher::Epsilon => "ε".to_string(),
            Matcher::StartOfString | Matcher::StartOfLine => "^".to_string(),
            Matcher::EndOfString | Matcher::EndOfLine => "$".to_string(),
            Matcher::WordBoundary => "\\b".to_string(),
            Matcher::NonWordBoundary => "\\B".to_string(),
            Matcher::Backref(id) => format!("\\{id}"),
            Matcher::Class(class) => class.label(),
            Matcher::CountIncrement(_) => "CM".to_string(),
            Matcher::LoopGate(_) => "LM".to_string(),
            Matcher::ExitGate(gate) => {
                if gate.fixed {
                    format!("GM{{{}}}", gate.low)
                } else if let Some(up) = gate.up {
                    format!("GM{{{},{}}}", gate.low, up)
                } else {
                    format!("GM{{{},}}", gate.low)
                }
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A character-set test used by `Matcher::Class`
#[derive(Debug, Clone)]
pub enum ClassMatcher {
    /// Inclusive code-point interval
    Range(char, char),
    /// Explicit character set
    Chars(Vec<char>),
    /// Union of nested matchers, optionally negated
    Composite {
        matchers: Vec<ClassMatcher>,
        negative: bool,
    },
}

impl ClassMatcher {
    /// Whether the class accepts `c`
    pub fn matches(&self, c: char) -> bool {
        match self {
            ClassMatcher::Range(from, to) => *from <= c && c <= *to,
            ClassMatcher::Chars(set) => set.contains(&c),
            ClassMatcher::Composite { matchers, negative } => {
                matchers.iter().any(|m| m.matches(c)) != *negative
            }
        }
    }

    fn label(&self) -> String {
        match self {
            ClassMatcher::Range(from, to) => format!("{from}-{to}"),
            ClassMatcher::Chars(set) => set.iter().collect(),
            ClassMatcher::Composite { matchers, negative } => {
                let mut label = String::new();
                if *negative {
                    label.push('^');
                }
                for m in matchers {
                    label.push_str(&m.label());
                }
                label
            }
        }
    }
}

/// The `\s` character set, before the U+2000..U+200A range
pub const WHITE_SPACE: &[char] = &[
    ' ', '\u{c}', '\n', '\r', '\t', '\u{b}', '\u{a0}', '\u{1680}', '\u{2028}', '\u{2029}',
    '\u{202f}', '\u{205f}', '\u{3000}',
];

/// `\d` / `\D`
pub fn digit_class(negative: bool) -> ClassMatcher {
    ClassMatcher::Composite {
        matchers: vec![ClassMatcher::Range('0', '9')],
        negative,
    }
}

/// `\w` / `\W`
pub fn word_class(negative: bool) -> ClassMatcher {
    ClassMatcher::Composite {
        matchers: vec![
            ClassMatcher::Chars(vec!['_']),
            ClassMatcher::Range('a', 'z'),
            ClassMatcher::Range('A', 'Z'),
            ClassMatcher::Range('0', '9'),
        ],
        negative,
    }
}

/// `\s` / `\S`
pub fn whitespace_class(negative: bool) -> ClassMatcher {
    ClassMatcher::Composite {
        matchers: vec![
            ClassMatcher::Chars(WHITE_SPACE.to_vec()),
            ClassMatcher::Range('\u{2000}', '\u{200a}'),
        ],
        negative,
    }
}

/// `.`: any code point except a line break
pub fn any_char_class() -> ClassMatcher {
    ClassMatcher::Composite {
        matchers: vec![ClassMatcher::Chars(vec!['\n', '\r'])],
        negative: true,
    }
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// A word boundary sits between a `\w` character and anything else
/// (including the subject edges)
pub fn is_word_boundary(chars: &[char], pos: usize) -> bool {
    let left = pos > 0 && is_word_char(chars[pos - 1]);
    let right = pos < chars.len() && is_word_char(chars[pos]);
    left != right
}
