//! This module defines [`Machine`], the immutable description of a k-tape Turing Machine,
//! together with the builder that enforces its invariants and the serializer that writes
//! it back in the text format the parser reads.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::symbol::Symbol;
use crate::types::{DefinitionError, Direction, StateLabel, Transition};

/// The declared alphabet of a machine. The blank symbol is always a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet<S: Symbol> {
    symbols: Vec<S>,
    members: HashSet<S>,
}

impl<S: Symbol> Alphabet<S> {
    /// Creates an alphabet from distinct symbols, in declaration order.
    pub fn new(symbols: Vec<S>) -> Result<Self, DefinitionError> {
        let mut members = HashSet::new();
        for symbol in &symbols {
            if !members.insert(symbol.clone()) {
                return Err(DefinitionError::DuplicateSymbol(symbol.to_string()));
            }
        }

        Ok(Self { symbols, members })
    }

    /// The declared symbols, in declaration order.
    pub fn symbols(&self) -> &[S] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &S) -> bool {
        symbol.is_blank() || self.members.contains(symbol)
    }

    /// Every symbol a cell can hold: the declared symbols followed by the blank
    /// when it was not declared.
    pub fn with_blank(&self) -> Vec<S> {
        let mut symbols = self.symbols.clone();
        if !self.members.contains(&S::blank()) {
            symbols.push(S::blank());
        }
        symbols
    }

    /// Number of declared symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// The transition function of a machine: a partial function from
/// `(state, symbols under the heads)` to a [`Transition`].
#[derive(Debug, Clone)]
pub struct TransitionTable<S> {
    entries: Vec<Transition<S>>,
    index: HashMap<u32, HashMap<Vec<S>, usize>>,
}

impl<S: Symbol> TransitionTable<S> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Finds the transition for a state and the symbols under the heads.
    pub fn get(&self, state: u32, read: &[S]) -> Option<&Transition<S>> {
        self.index
            .get(&state)
            .and_then(|by_read| by_read.get(read))
            .map(|&i| &self.entries[i])
    }

    /// Iterates over the transitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<S>> {
        self.entries.iter()
    }

    /// Iterates over the transitions leaving `state`, in declaration order.
    pub fn from_state(&self, state: u32) -> impl Iterator<Item = &Transition<S>> {
        self.entries.iter().filter(move |t| t.state == state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every ordinary state mentioned as a source or a target.
    pub fn states(&self) -> BTreeSet<u32> {
        self.entries
            .iter()
            .flat_map(|t| [Some(t.state), t.next_state.ordinary()])
            .flatten()
            .collect()
    }

    fn insert(&mut self, transition: Transition<S>) -> Result<(), DefinitionError> {
        let by_read = self.index.entry(transition.state).or_default();
        if let Some(&index) = by_read.get(&transition.read) {
            return Err(DefinitionError::DuplicateTransition {
                state: transition.state,
                read: S::join(&transition.read),
                index,
            });
        }

        by_read.insert(transition.read.clone(), self.entries.len());
        self.entries.push(transition);
        Ok(())
    }
}

impl<S: Symbol> PartialEq for TransitionTable<S> {
    /// Two tables are equal when they define the same function, whatever the
    /// declaration order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|t| other.get(t.state, &t.read) == Some(t))
    }
}

/// An immutable k-tape Turing Machine description.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine<S: Symbol> {
    tapes: usize,
    alphabet: Alphabet<S>,
    transitions: TransitionTable<S>,
}

impl<S: Symbol> Machine<S> {
    /// Number of tapes (k).
    pub fn tape_count(&self) -> usize {
        self.tapes
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        &self.alphabet
    }

    pub fn transitions(&self) -> &TransitionTable<S> {
        &self.transitions
    }

    /// Finds the transition for a state and the symbols under the heads.
    pub fn transition(&self, state: u32, read: &[S]) -> Option<&Transition<S>> {
        self.transitions.get(state, read)
    }

    /// Number of distinct ordinary states the transitions mention.
    pub fn state_count(&self) -> usize {
        self.transitions.states().len()
    }
}

impl<S: Symbol> fmt::Display for Machine<S> {
    /// Writes the machine in the description format:
    ///
    /// ```text
    /// states tapes alphabet_size transitions
    /// a,b,c
    /// q,r_1..r_k,q',w_1,d_1,...,w_k,d_k
    /// ```
    ///
    /// An empty alphabet is written as the lone blank so the alphabet line is never empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alphabet = if self.alphabet.is_empty() {
            vec![S::blank().to_string()]
        } else {
            self.alphabet.symbols().iter().map(S::to_string).collect()
        };

        writeln!(
            f,
            "{} {} {} {}",
            self.state_count(),
            self.tapes,
            alphabet.len(),
            self.transitions.len()
        )?;
        writeln!(f, "{}", alphabet.join(","))?;
        for transition in self.transitions.iter() {
            writeln!(f, "{transition}")?;
        }

        Ok(())
    }
}

/// Builds a [`Machine`] one transition at a time, rejecting anything that would
/// break the machine invariants.
#[derive(Debug)]
pub struct MachineBuilder<S: Symbol> {
    tapes: usize,
    alphabet: Alphabet<S>,
    transitions: TransitionTable<S>,
}

impl<S: Symbol> MachineBuilder<S> {
    /// Starts a machine with `tapes` tapes over the declared `alphabet`.
    ///
    /// # Errors
    ///
    /// * `DefinitionError::NoTapes` if `tapes` is zero.
    /// * `DefinitionError::DuplicateSymbol` if the alphabet repeats a symbol.
    pub fn new(tapes: usize, alphabet: Vec<S>) -> Result<Self, DefinitionError> {
        if tapes == 0 {
            return Err(DefinitionError::NoTapes);
        }

        Ok(Self {
            tapes,
            alphabet: Alphabet::new(alphabet)?,
            transitions: TransitionTable::new(),
        })
    }

    /// Adds a transition.
    ///
    /// # Errors
    ///
    /// * `DefinitionError::Arity` if any vector length differs from the tape count.
    /// * `DefinitionError::UnknownSymbol` if a read or written symbol is not in the alphabet.
    /// * `DefinitionError::DuplicateTransition` if the `(state, read)` key already exists.
    pub fn add(&mut self, transition: Transition<S>) -> Result<(), DefinitionError> {
        for found in [
            transition.read.len(),
            transition.write.len(),
            transition.directions.len(),
        ] {
            if found != self.tapes {
                return Err(DefinitionError::Arity {
                    expected: self.tapes,
                    found,
                });
            }
        }

        if let Some(symbol) = transition
            .read
            .iter()
            .chain(&transition.write)
            .find(|symbol| !self.alphabet.contains(*symbol))
        {
            return Err(DefinitionError::UnknownSymbol(symbol.to_string()));
        }

        self.transitions.insert(transition)
    }

    /// Shorthand for [`MachineBuilder::add`] with the transition given field by field.
    pub fn rule(
        &mut self,
        state: u32,
        read: Vec<S>,
        next_state: StateLabel,
        write: Vec<S>,
        directions: Vec<Direction>,
    ) -> Result<(), DefinitionError> {
        self.add(Transition {
            state,
            read,
            next_state,
            write,
            directions,
        })
    }

    pub fn tape_count(&self) -> usize {
        self.tapes
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        &self.alphabet
    }

    pub fn build(self) -> Machine<S> {
        Machine {
            tapes: self.tapes,
            alphabet: self.alphabet,
            transitions: self.transitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction::{Right, Stay};

    fn copy_machine() -> Machine<char> {
        let mut builder = MachineBuilder::new(2, vec!['0', '1']).unwrap();
        builder
            .rule(0, vec!['0', '_'], StateLabel::Ordinary(0), vec!['0', '0'], vec![Right, Right])
            .unwrap();
        builder
            .rule(0, vec!['1', '_'], StateLabel::Ordinary(0), vec!['1', '1'], vec![Right, Right])
            .unwrap();
        builder
            .rule(0, vec!['_', '_'], StateLabel::Halt, vec!['_', '_'], vec![Stay, Stay])
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_lookup() {
        let machine = copy_machine();

        let transition = machine.transition(0, &['1', '_']).unwrap();
        assert_eq!(transition.write, vec!['1', '1']);
        assert!(machine.transition(0, &['1', '1']).is_none());
        assert!(machine.transition(3, &['1', '_']).is_none());
        assert_eq!(machine.state_count(), 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut builder = MachineBuilder::new(1, vec!['a']).unwrap();
        builder
            .rule(0, vec!['a'], StateLabel::Accept, vec!['a'], vec![Stay])
            .unwrap();

        let error = builder
            .rule(0, vec!['a'], StateLabel::Reject, vec!['a'], vec![Stay])
            .unwrap_err();
        assert_eq!(
            error,
            DefinitionError::DuplicateTransition {
                state: 0,
                read: "a".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let mut builder = MachineBuilder::new(1, vec!['a']).unwrap();

        let error = builder
            .rule(0, vec!['a'], StateLabel::Accept, vec!['b'], vec![Stay])
            .unwrap_err();
        assert_eq!(error, DefinitionError::UnknownSymbol("b".to_string()));
    }

    #[test]
    fn test_arity_checked() {
        let mut builder = MachineBuilder::new(2, vec!['a']).unwrap();

        let error = builder
            .rule(0, vec!['a'], StateLabel::Accept, vec!['a'], vec![Stay])
            .unwrap_err();
        assert_eq!(error, DefinitionError::Arity { expected: 2, found: 1 });
    }

    #[test]
    fn test_invalid_alphabets() {
        assert_eq!(
            MachineBuilder::<char>::new(0, vec![]).unwrap_err(),
            DefinitionError::NoTapes
        );
        assert_eq!(
            MachineBuilder::new(1, vec!['a', 'a']).unwrap_err(),
            DefinitionError::DuplicateSymbol("a".to_string())
        );
    }

    #[test]
    fn test_display() {
        let text = copy_machine().to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "1 2 2 3");
        assert_eq!(lines[1], "0,1");
        assert_eq!(lines[2], "0,0,_,0,0,R,0,R");
        assert_eq!(lines[4], "0,_,_,h,_,N,_,N");
    }

    #[test]
    fn test_table_equality_ignores_order() {
        let mut forward = MachineBuilder::new(1, vec!['a']).unwrap();
        let mut backward = MachineBuilder::new(1, vec!['a']).unwrap();
        let rules = [
            (vec!['a'], StateLabel::Accept),
            (vec!['_'], StateLabel::Reject),
        ];

        for (read, next) in rules.iter() {
            forward.rule(0, read.clone(), *next, read.clone(), vec![Stay]).unwrap();
        }
        for (read, next) in rules.iter().rev() {
            backward.rule(0, read.clone(), *next, read.clone(), vec![Stay]).unwrap();
        }

        assert_eq!(forward.build().transitions(), backward.build().transitions());
    }
}
