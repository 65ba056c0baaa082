//! This module defines the core value types shared by the parser, the execution engine
//! and the tape compiler: state labels, directions, transitions, verdicts and error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::symbol::Symbol;
use crate::Rule;

/// The blank symbol. Every alphabet contains it, whether declared or not.
pub const BLANK_SYMBOL: char = '_';
/// Separates multi-character symbols in tape input text.
pub const TOKEN_DELIMITER: char = '|';
/// Lines starting with this character are comments in machine descriptions.
pub const COMMENT_MARKER: char = '#';
/// The step bound used by callers that do not pick their own.
pub const DEFAULT_MAX_STEPS: usize = 10000;

/// The label of a machine state.
///
/// Ordinary states are numbered; the three terminal labels have no outgoing
/// transitions. State `0` is the start state of every machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateLabel {
    Ordinary(u32),
    Accept,
    Reject,
    Halt,
}

impl StateLabel {
    /// The state every run starts in.
    pub const START: StateLabel = StateLabel::Ordinary(0);

    /// Parses a state field: an integer or one of the terminal tokens
    /// `y`/`accept`, `n`/`reject`, `h`/`halt`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "y" | "accept" => Some(StateLabel::Accept),
            "n" | "reject" => Some(StateLabel::Reject),
            "h" | "halt" => Some(StateLabel::Halt),
            _ => token.parse::<u32>().ok().map(StateLabel::Ordinary),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StateLabel::Ordinary(_))
    }

    /// Returns the state number of an ordinary state.
    pub fn ordinary(&self) -> Option<u32> {
        match self {
            StateLabel::Ordinary(state) => Some(*state),
            _ => None,
        }
    }

    /// Returns the verdict a run ending in this state reports.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            StateLabel::Ordinary(_) => None,
            StateLabel::Accept => Some(Verdict::Accept),
            StateLabel::Reject => Some(Verdict::Reject),
            StateLabel::Halt => Some(Verdict::Halt),
        }
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateLabel::Ordinary(state) => write!(f, "{state}"),
            StateLabel::Accept => f.write_str("y"),
            StateLabel::Reject => f.write_str("n"),
            StateLabel::Halt => f.write_str("h"),
        }
    }
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Parses `L`, `R` or `N`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "N" => Some(Direction::Stay),
            _ => None,
        }
    }

    /// The change in head offset.
    pub fn offset(&self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::Stay => "N",
        })
    }
}

/// A single transition rule of a k-tape machine.
///
/// When the machine is in `state` and reads `read` under its k heads, it writes
/// `write`, moves every head by its entry in `directions` and continues in `next_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition<S> {
    /// The ordinary state the rule applies to.
    pub state: u32,
    /// Symbols expected under each head.
    pub read: Vec<S>,
    /// The state the machine transitions to.
    pub next_state: StateLabel,
    /// Symbols written under each head.
    pub write: Vec<S>,
    /// Head movements, one per tape.
    pub directions: Vec<Direction>,
}

impl<S: Symbol> fmt::Display for Transition<S> {
    /// Formats the rule as one line of a machine description:
    /// `q, r_1..r_k, q', w_1, d_1, ..., w_k, d_k`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        for symbol in &self.read {
            write!(f, ",{symbol}")?;
        }
        write!(f, ",{}", self.next_state)?;
        for (symbol, direction) in self.write.iter().zip(&self.directions) {
            write!(f, ",{symbol},{direction}")?;
        }
        Ok(())
    }
}

/// The result of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The machine entered the accept state.
    Accept,
    /// The machine entered the reject state, explicitly or for lack of a transition.
    Reject,
    /// The machine stopped without an accept/reject judgment.
    Halt,
    /// The step bound ran out before a terminal state was reached.
    StepBoundExceeded,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Accept => "accept",
            Verdict::Reject => "reject",
            Verdict::Halt => "halt",
            Verdict::StepBoundExceeded => "step bound exceeded",
        })
    }
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The machine performed a step.
    Continue,
    /// The machine is in a terminal state; nothing was done.
    Halt(Verdict),
}

/// The header counts a machine description declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    States,
    Tapes,
    Alphabet,
    Transitions,
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Count::States => "state count",
            Count::Tapes => "tape count",
            Count::Alphabet => "alphabet size",
            Count::Transitions => "transition count",
        })
    }
}

/// Violations of the machine invariants, independent of where the machine came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("A machine needs at least one tape")]
    NoTapes,
    #[error("Symbol '{0}' is declared twice")]
    DuplicateSymbol(String),
    #[error("Symbol '{0}' is not in the alphabet")]
    UnknownSymbol(String),
    #[error("Expected {expected} symbols and directions per transition, found {found}")]
    Arity { expected: usize, found: usize },
    #[error("Transition for state {state} reading [{read}] is already defined")]
    DuplicateTransition {
        state: u32,
        read: String,
        /// Index of the transition that defined the key first.
        index: usize,
    },
}

/// Errors raised while parsing a machine description. Every variant carries the
/// 1-based line it refers to, when there is one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("Missing header line")]
    MissingHeader,
    #[error("Missing alphabet line")]
    MissingAlphabet,
    #[error("line {line}: malformed header: {reason}")]
    MalformedHeader { line: usize, reason: String },
    #[error("line {line}: '{field}' is not a valid symbol")]
    InvalidSymbol { line: usize, field: String },
    #[error("line {line}: '{field}' is not a direction (expected L, N or R)")]
    InvalidDirection { line: usize, field: String },
    #[error("line {line}: '{field}' is not a state")]
    InvalidState { line: usize, field: String },
    #[error("line {line}: terminal state '{state}' cannot have transitions")]
    TerminalSource { line: usize, state: StateLabel },
    #[error("line {line}: expected {expected} fields, found {found}")]
    Arity {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: DefinitionError,
    },
    #[error("line {line}: duplicate transition, first defined on line {previous}")]
    DuplicateTransition { line: usize, previous: usize },
    #[error("line {line}: declared {count} {declared} does not match the {found} found")]
    CountMismatch {
        line: usize,
        count: Count,
        declared: usize,
        found: usize,
    },
}

impl ParseError {
    /// The line the error refers to.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax(error) => match error.line_col {
                pest::error::LineColLocation::Pos((line, _)) => Some(line),
                pest::error::LineColLocation::Span((line, _), _) => Some(line),
            },
            ParseError::MissingHeader | ParseError::MissingAlphabet => None,
            ParseError::MalformedHeader { line, .. }
            | ParseError::InvalidSymbol { line, .. }
            | ParseError::InvalidDirection { line, .. }
            | ParseError::InvalidState { line, .. }
            | ParseError::TerminalSource { line, .. }
            | ParseError::Arity { line, .. }
            | ParseError::Invalid { line, .. }
            | ParseError::DuplicateTransition { line, .. }
            | ParseError::CountMismatch { line, .. } => Some(*line),
        }
    }
}

/// Errors raised by the tape compiler. No machine is produced when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Compilation needs at least 2 tapes, the machine has {0}")]
    TooFewTapes(usize),
    #[error("Symbol '{0}' is reserved by the single-tape encoding")]
    ReservedSymbol(String),
    #[error("Generated machine is invalid: {0}")]
    Definition(#[from] DefinitionError),
}

/// Errors raised while preparing the input of a run, before any step executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Input symbol '{symbol}' at position {position} is not in the alphabet")]
    UnknownSymbol { symbol: String, position: usize },
}

/// Represents the errors any part of the crate can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    #[error("Machine parsing error: {0}")]
    Parse(#[from] ParseError),
    #[error("Compilation error: {0}")]
    Compile(#[from] CompileError),
    #[error("Input error: {0}")]
    Input(#[from] InputError),
    #[error("File error: {0}")]
    File(String),
    #[error("Machine not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serialization() {
        let left_json = serde_json::to_string(&Direction::Left).unwrap();
        let stay_json = serde_json::to_string(&Direction::Stay).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(stay_json, "\"Stay\"");

        let left: Direction = serde_json::from_str(&left_json).unwrap();
        assert_eq!(left, Direction::Left);
    }

    #[test]
    fn test_state_label_tokens() {
        assert_eq!(StateLabel::from_token("7"), Some(StateLabel::Ordinary(7)));
        assert_eq!(StateLabel::from_token("y"), Some(StateLabel::Accept));
        assert_eq!(StateLabel::from_token("reject"), Some(StateLabel::Reject));
        assert_eq!(StateLabel::from_token("h"), Some(StateLabel::Halt));
        assert_eq!(StateLabel::from_token("-1"), None);
        assert_eq!(StateLabel::from_token("q"), None);

        assert_eq!(StateLabel::Halt.to_string(), "h");
        assert_eq!(StateLabel::Ordinary(12).to_string(), "12");
    }

    #[test]
    fn test_halt_is_not_reject() {
        assert_eq!(StateLabel::Halt.verdict(), Some(Verdict::Halt));
        assert_ne!(StateLabel::Halt.verdict(), StateLabel::Reject.verdict());
        assert_eq!(StateLabel::START.verdict(), None);
    }

    #[test]
    fn test_transition_display() {
        let transition = Transition {
            state: 0,
            read: vec!['1', '_'],
            next_state: StateLabel::Ordinary(2),
            write: vec!['1', '1'],
            directions: vec![Direction::Right, Direction::Stay],
        };

        assert_eq!(transition.to_string(), "0,1,_,2,1,R,1,N");
    }

    #[test]
    fn test_error_display() {
        let error = ParseError::CountMismatch {
            line: 1,
            count: Count::Transitions,
            declared: 3,
            found: 2,
        };

        let message = error.to_string();
        assert!(message.contains("transition count"));
        assert!(message.contains("line 1"));
        assert_eq!(error.line(), Some(1));
    }
}
