//! A backtracking regular-expression engine
//!
//! Patterns compile once into a Thompson-style NFA extended with capture
//! groups, backreferences, counted repetition, atomic groups, anchors and
//! lazy quantifiers; the engine then runs a depth-first backtracking
//! search over the graph.
//!
//! ```
//! use renfa::NfaRegex;
//!
//! let mut re = NfaRegex::new(r"(?<word>[a-z]+)-\d{2,4}").unwrap();
//! let groups = re.compute("item-2024", 0);
//! assert_eq!(groups[&0].substring, "item-2024");
//! assert_eq!(groups[&1].substring, "item");
//! assert_eq!(groups[&1].name.as_deref(), Some("word"));
//! ```

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod nfa;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;

pub use ast::Expr;
pub use engine::{CaptureGroup, Modes, NfaRegex};
pub use error::{RangeError, RegexError, Result, ScanError, SemanticError, SyntaxError};
pub use matcher::{ClassMatcher, Matcher};
pub use nfa::{Nfa, State, StateId};
pub use parser::{Parser, parse};
pub use resolver::{Resolution, resolve};
pub use scanner::Scanner;
pub use token::{Token, TokenKind};
