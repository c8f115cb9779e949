//! Backtracking execution and the public regex front-end
//!
//! Execution is a depth-first search over the compiled graph. Each frame
//! carries its own position, capture map and epsilon-visited set; frames
//! are expanded by pushing a state's transitions in reverse order so the
//! highest-priority transition is popped first. Crossing a consuming edge
//! clears the epsilon-visited set. Counters and the most-recently-closed
//! group snapshot are shared across frames: the snapshot feeds
//! backreference lookup, and counters are zeroed only at their loop's exit
//! state and at the start of every computation.

use std::collections::HashMap;

use crate::compiler::compile;
use crate::error::Result;
use crate::matcher::MatchContext;
use crate::nfa::{Nfa, StateId};
use crate::parser::parse;
use crate::resolver::resolve;

/// Matching modes selected at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    /// `^` and `$` match around `\n` instead of only at the subject edges
    pub multiline: bool,
}

/// One captured group of a successful match
///
/// Positions are character indices; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureGroup {
    pub id: usize,
    pub name: Option<String>,
    pub start: usize,
    pub end: usize,
    pub substring: String,
}

/// Dense bitset over state ids, tracking states visited along the current
/// chain of zero-consumption transitions
#[derive(Debug, Clone)]
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    fn new(len: usize) -> Self {
        VisitedSet {
            bits: vec![0; len.div_ceil(64)],
        }
    }

    fn contains(&self, id: StateId) -> bool {
        self.bits[id / 64] & (1 << (id % 64)) != 0
    }

    fn insert(&mut self, id: StateId) {
        self.bits[id / 64] |= 1 << (id % 64);
    }
}

/// In-flight captures: group id → open or closed span
type GroupSpans = HashMap<usize, (usize, Option<usize>)>;

#[derive(Debug, Clone)]
struct Frame {
    pos: usize,
    state: StateId,
    visited: VisitedSet,
    groups: GroupSpans,
}

/// One depth-first backtracking run over a compiled NFA
///
/// The executor owns the mutable scratch the NFA itself must not carry:
/// counter values and the most-recently-closed span per group.
struct Executor<'a> {
    nfa: &'a Nfa,
    chars: &'a [char],
    counters: Vec<u32>,
    group_matches: HashMap<usize, (usize, usize)>,
}

impl<'a> Executor<'a> {
    fn new(nfa: &'a Nfa, chars: &'a [char]) -> Self {
        Executor {
            nfa,
            chars,
            counters: vec![0; nfa.counter_count],
            group_matches: HashMap::new(),
        }
    }

    /// Search for a match anchored at `pos`; returns closed spans per group
    fn compute(&mut self, pos: usize) -> Option<HashMap<usize, (usize, usize)>> {
        if pos > self.chars.len() {
            return None;
        }
        let nfa = self.nfa;
        let mut stack = vec![Frame {
            pos,
            state: nfa.initial_state,
            visited: VisitedSet::new(nfa.states.len()),
            groups: GroupSpans::new(),
        }];

        while let Some(mut frame) = stack.pop() {
            let state = &nfa.states[frame.state];

            for &g in &state.start_groups {
                frame.groups.insert(g, (frame.pos, None));
            }
            for &g in &state.end_groups {
                if let Some(span) = frame.groups.get_mut(&g) {
                    span.1 = Some(frame.pos);
                    self.group_matches.insert(g, (span.0, frame.pos));
                }
            }
            for &c in &state.clear_counters {
                self.counters[c] = 0;
            }

            if nfa.is_ending(frame.state) {
                let closed = frame
                    .groups
                    .into_iter()
                    .filter_map(|(id, (start, end))| end.map(|end| (id, (start, end))))
                    .collect();
                return Some(closed);
            }

            if state.atomic_end {
                // commit: no backtracking past this point
                stack.clear();
            }

            for (matcher, to) in state.transitions.iter().rev() {
                let mut ctx = MatchContext {
                    group_matches: &self.group_matches,
                    counters: &mut self.counters,
                };
                let Some(consumed) = matcher.matches(self.chars, frame.pos, &mut ctx) else {
                    continue;
                };
                if consumed == 0 {
                    if frame.visited.contains(*to) {
                        continue;
                    }
                    let mut visited = frame.visited.clone();
                    visited.insert(frame.state);
                    stack.push(Frame {
                        pos: frame.pos,
                        state: *to,
                        visited,
                        groups: frame.groups.clone(),
                    });
                } else {
                    stack.push(Frame {
                        pos: frame.pos + consumed,
                        state: *to,
                        visited: VisitedSet::new(nfa.states.len()),
                        groups: frame.groups.clone(),
                    });
                }
            }
        }
        None
    }
}

/// A compiled pattern with a positional cursor for repeated `find` calls
///
/// A single instance is not meant for concurrent use: `find` advances an
/// internal cursor and `compute` reuses shared counters.
#[derive(Debug)]
pub struct NfaRegex {
    nfa: Nfa,
    source: String,
    modes: Modes,
    pos: usize,
    groups: HashMap<usize, CaptureGroup>,
}

impl NfaRegex {
    /// Compile a pattern with default modes
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_modes(pattern, Modes::default())
    }

    /// Compile a pattern with explicit modes
    pub fn with_modes(pattern: &str, modes: Modes) -> Result<Self> {
        let ast = parse(pattern)?;
        let resolution = resolve(&ast)?;
        let nfa = compile(&ast, &resolution, modes.multiline)?;
        Ok(NfaRegex {
            nfa,
            source: pattern.to_string(),
            modes,
            pos: 0,
            groups: HashMap::new(),
        })
    }

    /// The pattern this instance was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The modes this instance was compiled with
    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// Number of explicit capturing groups (excluding group 0)
    pub fn group_count(&self) -> usize {
        self.nfa.group_name_map.len().saturating_sub(1)
    }

    /// The captures of the most recent successful computation
    pub fn groups(&self) -> &HashMap<usize, CaptureGroup> {
        &self.groups
    }

    /// Rewind the `find` cursor and forget the last captures
    pub fn reset(&mut self) {
        self.pos = 0;
        self.groups.clear();
    }

    /// Match the pattern anchored at character position `pos`
    ///
    /// Returns the captures keyed by group id, empty when there is no
    /// match. The cursor is not touched.
    pub fn compute(&mut self, subject: &str, pos: usize) -> HashMap<usize, CaptureGroup> {
        let chars: Vec<char> = subject.chars().collect();
        self.compute_chars(&chars, pos)
    }

    /// Find the next match at or after the cursor
    ///
    /// The cursor advances to the end of the match, or one past its start
    /// for a zero-width match, so repeated calls walk the subject.
    pub fn find(&mut self, subject: &str) -> Option<HashMap<usize, CaptureGroup>> {
        let chars: Vec<char> = subject.chars().collect();
        for i in self.pos..chars.len() {
            let groups = self.compute_chars(&chars, i);
            if groups.is_empty() {
                continue;
            }
            let end = groups.get(&0).map(|g| g.end).unwrap_or(i);
            self.pos = end.max(i + 1);
            return Some(groups);
        }
        self.pos = chars.len();
        None
    }

    /// Collect all non-overlapping matches from position 0
    ///
    /// Resets the instance first; empty matches advance by exactly one
    /// position.
    pub fn find_all(&mut self, subject: &str) -> Vec<HashMap<usize, CaptureGroup>> {
        self.reset();
        let chars: Vec<char> = subject.chars().collect();
        let mut matches = Vec::new();
        let mut p = 0;
        while p < chars.len() {
            let groups = self.compute_chars(&chars, p);
            if groups.is_empty() {
                p += 1;
                continue;
            }
            let end = groups.get(&0).map(|g| g.end).unwrap_or(p);
            p = if end == p { p + 1 } else { end };
            matches.push(groups);
        }
        matches
    }

    /// Whether the pattern matches anywhere, without moving the cursor
    pub fn is_match(&mut self, subject: &str) -> bool {
        let chars: Vec<char> = subject.chars().collect();
        (0..=chars.len()).any(|i| !self.compute_chars(&chars, i).is_empty())
    }

    fn compute_chars(&mut self, chars: &[char], pos: usize) -> HashMap<usize, CaptureGroup> {
        let mut executor = Executor::new(&self.nfa, chars);
        let spans = executor.compute(pos);
        let name_map = &self.nfa.group_name_map;
        let groups: HashMap<usize, CaptureGroup> = spans
            .into_iter()
            .flatten()
            .map(|(id, (start, end))| {
                let group = CaptureGroup {
                    id,
                    name: name_map.get(&id).cloned().flatten(),
                    start,
                    end,
                    substring: chars[start..end].iter().collect(),
                };
                (id, group)
            })
            .collect();
        self.groups = groups.clone();
        groups
    }
}
