//! NFA graph representation
//!
//! States live in an arena and refer to each other by index, which keeps
//! the cyclic loop and back-edge structure representable without shared
//! ownership. Transition order within a state is significant: the first
//! transition has the highest priority, and greedy versus lazy repetition
//! is encoded purely through that order.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::matcher::{CounterId, Matcher};

/// Index of a state in the arena
pub type StateId = usize;

/// One NFA state
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Outgoing transitions, highest priority first
    pub transitions: Vec<(Matcher, StateId)>,
    /// Capture groups that open when execution reaches this state
    pub start_groups: Vec<usize>,
    /// Capture groups that close when execution reaches this state
    pub end_groups: Vec<usize>,
    /// Entering this state commits the match so far (atomic groups)
    pub atomic_end: bool,
    /// Counters zeroed when execution reaches this state
    pub clear_counters: Vec<CounterId>,
}

/// A compiled NFA
#[derive(Debug)]
pub struct Nfa {
    pub states: Vec<State>,
    pub initial_state: StateId,
    pub ending_states: Vec<StateId>,
    /// Number of repetition counters the executor must allocate
    pub counter_count: usize,
    /// Capture id → group name (`None` for unnamed groups, including id 0)
    pub group_name_map: HashMap<usize, Option<String>>,
}

impl Nfa {
    /// Whether `state` accepts
    pub fn is_ending(&self, state: StateId) -> bool {
        self.ending_states.contains(&state)
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.states.iter().enumerate() {
            let marker = if self.is_ending(id) {
                "[end]"
            } else if id == self.initial_state {
                "[init]"
            } else {
                ""
            };
            write!(f, "q{id}{marker}:")?;
            for (matcher, to) in &state.transitions {
                write!(f, " -{}-> q{to}", matcher.label())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A partially built NFA: one entry state and one exit state in the arena
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub start: StateId,
    pub end: StateId,
}

/// Arena-backed NFA construction
///
/// Fragments produced here always have a single entry and a single exit
/// state; concatenation fuses the appended fragment's entry into the joint
/// state and leaves the old entry orphaned, and `finish` drops orphans by
/// renumbering the reachable states.
#[derive(Debug, Default)]
pub struct NfaBuilder {
    states: Vec<State>,
    counters: usize,
}

impl NfaBuilder {
    pub fn new() -> Self {
        NfaBuilder::default()
    }

    /// Allocate a fresh state
    pub fn add_state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    /// Allocate a fresh repetition counter
    pub fn add_counter(&mut self) -> CounterId {
        self.counters += 1;
        self.counters - 1
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id]
    }

    /// Append a transition at the lowest priority
    pub fn add_transition(&mut self, from: StateId, to: StateId, matcher: Matcher) {
        self.states[from].transitions.push((matcher, to));
    }

    /// Insert a transition at the highest priority
    pub fn add_transition_front(&mut self, from: StateId, to: StateId, matcher: Matcher) {
        self.states[from].transitions.insert(0, (matcher, to));
    }

    /// Two fresh states joined by one transition
    pub fn basic(&mut self, matcher: Matcher) -> Fragment {
        let start = self.add_state();
        let end = self.add_state();
        self.add_transition(start, end, matcher);
        Fragment { start, end }
    }

    /// Concatenate two fragments
    ///
    /// The second fragment's entry state is fused into the first
    /// fragment's exit: its transitions and group markers move onto the
    /// joint, and the drained entry state becomes unreachable.
    pub fn concat(&mut self, first: Fragment, second: Fragment) -> Fragment {
        let moved = std::mem::take(&mut self.states[second.start].transitions);
        self.states[first.end].transitions.extend(moved);

        let starts = std::mem::take(&mut self.states[second.start].start_groups);
        self.states[first.end].start_groups.extend(starts);
        let ends = std::mem::take(&mut self.states[second.start].end_groups);
        self.states[first.end].end_groups.extend(ends);
        let cleared = std::mem::take(&mut self.states[second.start].clear_counters);
        self.states[first.end].clear_counters.extend(cleared);
        if self.states[second.start].atomic_end {
            self.states[first.end].atomic_end = true;
        }

        Fragment {
            start: first.start,
            end: second.end,
        }
    }

    /// Finalize the arena into an NFA rooted at `fragment`
    ///
    /// States are renumbered in breadth-first discovery order from the
    /// entry state; states orphaned by fusion are dropped, so every state
    /// of the result is reachable from `initial_state`.
    pub fn finish(self, fragment: Fragment, group_name_map: HashMap<usize, Option<String>>) -> Nfa {
        let mut remap: Vec<Option<StateId>> = vec![None; self.states.len()];
        let mut order: Vec<StateId> = Vec::new();
        let mut queue = VecDeque::new();

        remap[fragment.start] = Some(0);
        order.push(fragment.start);
        queue.push_back(fragment.start);
        while let Some(id) = queue.pop_front() {
            for &(_, to) in &self.states[id].transitions {
                if remap[to].is_none() {
                    remap[to] = Some(order.len());
                    order.push(to);
                    queue.push_back(to);
                }
            }
        }

        let mut old_states = self.states;
        let states: Vec<State> = order
            .iter()
            .map(|&old| {
                let mut state = std::mem::take(&mut old_states[old]);
                for (_, to) in &mut state.transitions {
                    // reachable states only ever point at reachable states
                    *to = remap[*to].unwrap_or(0);
                }
                state
            })
            .collect();

        let ending = remap[fragment.end].unwrap_or(0);
        Nfa {
            states,
            initial_state: 0,
            ending_states: vec![ending],
            counter_count: self.counters,
            group_name_map,
        }
    }
}
