//! The tape compiler: turns a k-tape [`Machine`] into an equivalent single-tape machine.
//!
//! The compiled machine keeps all k tapes on one tape in the layout described in
//! [`crate::encoder`] and simulates each source step with a fixed sequence of sweeps:
//!
//! 1. **Copying** (once): the raw input, ended by `$`, is shifted one cell right behind
//!    `^`, its first cell is marked, a marked blank segment is laid out for every further
//!    tape and `$` closes the layout.
//! 2. **Reading**: a sweep to `$` collects the marked symbols; the source state and the
//!    symbols seen so far are part of the compiled state.
//! 3. **Writing**: a sweep back to `^` writes the new symbols into the marked cells.
//! 4. **Moving**: a sweep to `$` relocates every marker. A marker leaving its segment
//!    inserts a marked blank and shifts the rest of the tape one cell right.
//! 5. **Cleanup** (once): when the source machine stops, everything but the last
//!    segment is erased and the compiled machine stops in the same terminal state.
//!
//! Every compiled state is a [`Phase`]. States are numbered in the order a
//! breadth-first walk from [`Phase::Start`] discovers them, so the numbering is
//! deterministic and state 0 is the start.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::{
    definition::{Alphabet, Machine, MachineBuilder},
    encoder::{self, Cell},
    machine::TapeMode,
    symbol::{Symbol, Token},
    tape::Tape,
    types::{CompileError, Direction, InputError, StateLabel, Transition},
};

/// Options for [`compile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// The tape mode the compiled machine reproduces. In `RightInfinite` mode a left
    /// move off the first cell of a segment keeps the marker in place.
    pub tape_mode: TapeMode,
}

/// The sweeps of a compiled machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Copying,
    Reading,
    Writing,
    Moving,
    Cleanup,
}

/// Where a [`Phase::Rewind`] continues once it reaches `^`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resume {
    /// Start reading for the given source state.
    Read(u32),
    /// Clean up, then enter the given terminal state.
    Cleanup(StateLabel),
}

/// One state of a compiled machine, described by what it carries.
///
/// `rule` is the index of a source transition in declaration order and `tape` the
/// index of the segment being worked on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Phase<S> {
    /// Replaces the first input cell with `^`.
    Start,
    /// Writes the symbol read on the previous cell, marked if it is the first, until
    /// the `$` ending the input.
    Carry { symbol: S, first: bool },
    /// Writes the separator in front of segment `tape`.
    Separator { tape: usize },
    /// Writes the marked blank that makes up segment `tape`.
    LayBlank { tape: usize },
    /// Writes `$`.
    Terminator,
    /// Moves left to `^`.
    Rewind { resume: Resume },
    /// Collects the marked symbols for source state `state`.
    Read { state: u32, seen: Vec<S> },
    /// Writes the symbols of `rule` into segments `tape` down to 0.
    Write { rule: usize, tape: usize },
    /// Moves the marker of segment `tape`; `done` once it has moved.
    Move { rule: usize, tape: usize, done: bool },
    /// Marks the cell right of the old marker.
    MarkNext { rule: usize, tape: usize },
    /// Marks the cell left of the old marker.
    MarkPrev { rule: usize, tape: usize },
    /// Writes a marked blank at the start of segment `tape`.
    InsertBlank { rule: usize, tape: usize },
    /// Marks the first cell of segment `tape` again.
    Remark { rule: usize, tape: usize },
    /// Writes `carry` and picks up the cell it replaces.
    Shift { rule: usize, tape: usize, carry: Cell<S> },
    /// Moves left over `remaining` separators to continue with segment `tape + 1`.
    Return { rule: usize, tape: usize, remaining: usize },
    /// Erases segment `tape`, or unmarks it if it is the last, then enters `terminal`.
    Cleanup { terminal: StateLabel, tape: usize },
}

impl<S> Phase<S> {
    pub fn stage(&self) -> Stage {
        match self {
            Phase::Start
            | Phase::Carry { .. }
            | Phase::Separator { .. }
            | Phase::LayBlank { .. }
            | Phase::Terminator => Stage::Copying,
            Phase::Rewind {
                resume: Resume::Read(_),
            }
            | Phase::Read { .. } => Stage::Reading,
            Phase::Write { .. } => Stage::Writing,
            Phase::Move { .. }
            | Phase::MarkNext { .. }
            | Phase::MarkPrev { .. }
            | Phase::InsertBlank { .. }
            | Phase::Remark { .. }
            | Phase::Shift { .. }
            | Phase::Return { .. } => Stage::Moving,
            Phase::Rewind {
                resume: Resume::Cleanup(_),
            }
            | Phase::Cleanup { .. } => Stage::Cleanup,
        }
    }
}

impl<S: Symbol> fmt::Display for Phase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => write!(f, "start"),
            Phase::Carry { symbol, first } => {
                write!(f, "carry {symbol}{}", if *first { " (first)" } else { "" })
            }
            Phase::Separator { tape } => write!(f, "separator {tape}"),
            Phase::LayBlank { tape } => write!(f, "lay blank {tape}"),
            Phase::Terminator => write!(f, "terminator"),
            Phase::Rewind {
                resume: Resume::Read(state),
            } => write!(f, "rewind to read {state}"),
            Phase::Rewind {
                resume: Resume::Cleanup(terminal),
            } => write!(f, "rewind to cleanup {terminal}"),
            Phase::Read { state, seen } => write!(f, "read {state} [{}]", S::join(seen)),
            Phase::Write { rule, tape } => write!(f, "write rule {rule} tape {tape}"),
            Phase::Move { rule, tape, done } => {
                write!(f, "move rule {rule} tape {tape}")?;
                if *done {
                    write!(f, " (done)")?;
                }
                Ok(())
            }
            Phase::MarkNext { rule, tape } => write!(f, "mark next rule {rule} tape {tape}"),
            Phase::MarkPrev { rule, tape } => write!(f, "mark previous rule {rule} tape {tape}"),
            Phase::InsertBlank { rule, tape } => write!(f, "insert blank rule {rule} tape {tape}"),
            Phase::Remark { rule, tape } => write!(f, "remark rule {rule} tape {tape}"),
            Phase::Shift { rule, tape, carry } => {
                write!(f, "shift {carry} rule {rule} tape {tape}")
            }
            Phase::Return {
                rule,
                tape,
                remaining,
            } => write!(f, "return {remaining} rule {rule} tape {tape}"),
            Phase::Cleanup { terminal, tape } => write!(f, "cleanup {terminal} tape {tape}"),
        }
    }
}

/// A single-tape machine compiled from a k-tape one, with the codec for its layout.
#[derive(Debug, Clone)]
pub struct CompiledMachine<S: Symbol> {
    machine: Machine<Token>,
    alphabet: Alphabet<S>,
    source_tapes: usize,
    tape_mode: TapeMode,
    phases: Vec<Phase<S>>,
}

impl<S: Symbol> CompiledMachine<S> {
    /// The compiled single-tape machine.
    pub fn machine(&self) -> &Machine<Token> {
        &self.machine
    }

    pub fn into_machine(self) -> Machine<Token> {
        self.machine
    }

    /// Number of tapes of the source machine.
    pub fn source_tapes(&self) -> usize {
        self.source_tapes
    }

    pub fn tape_mode(&self) -> TapeMode {
        self.tape_mode
    }

    /// The phase a compiled state stands for.
    pub fn phase(&self, state: u32) -> Option<&Phase<S>> {
        self.phases.get(state as usize)
    }

    /// Every phase, indexed by compiled state.
    pub fn phases(&self) -> &[Phase<S>] {
        &self.phases
    }

    /// Turns source input into compiled input. See [`encoder::encode_input`].
    ///
    /// # Errors
    ///
    /// Returns `InputError::UnknownSymbol` if the input holds a symbol outside the source
    /// alphabet, just as running the source machine would.
    pub fn encode_input(&self, input: &[S]) -> Result<Vec<Token>, InputError> {
        encoder::encode_input(input, &self.alphabet)
    }

    /// Lays out source tapes the way the compiled machine keeps them.
    pub fn encode_layout(&self, tapes: &[Tape<S>]) -> Vec<Token> {
        encoder::encode_layout(tapes)
    }

    /// Reads the source tapes back from compiled tape cells.
    pub fn decode_layout(&self, cells: &[Token]) -> Option<Vec<Tape<S>>> {
        encoder::decode_layout(cells, self.source_tapes)
    }

    /// Reads the source output (the trimmed last tape) from a compiled tape.
    pub fn decode_output(&self, tape: &Tape<Token>) -> Option<Vec<S>> {
        encoder::decode_output(tape, self.source_tapes)
    }
}

/// Compiles a k-tape machine into an equivalent single-tape machine.
///
/// # Errors
///
/// * `CompileError::TooFewTapes` if the machine has fewer than 2 tapes.
/// * `CompileError::ReservedSymbol` if a source symbol clashes with the layout tokens.
pub fn compile<S: Symbol>(
    machine: &Machine<S>,
    options: CompileOptions,
) -> Result<CompiledMachine<S>, CompileError> {
    let tapes = machine.tape_count();
    if tapes < 2 {
        return Err(CompileError::TooFewTapes(tapes));
    }

    if let Some(symbol) = machine
        .alphabet()
        .symbols()
        .iter()
        .find(|symbol| encoder::is_reserved(*symbol))
    {
        return Err(CompileError::ReservedSymbol(symbol.to_string()));
    }

    let mut compiler = Compiler::new(machine, options.tape_mode)?;
    compiler.intern(Phase::Start);
    while let Some(state) = compiler.queue.pop_front() {
        compiler.expand(state)?;
    }

    Ok(CompiledMachine {
        machine: compiler.builder.build(),
        alphabet: machine.alphabet().clone(),
        source_tapes: tapes,
        tape_mode: options.tape_mode,
        phases: compiler.phases,
    })
}

/// Where a generated transition leads.
enum Target<S> {
    Phase(Phase<S>),
    Terminal(StateLabel),
}

/// The worklist builder behind [`compile`].
struct Compiler<'a, S: Symbol> {
    tapes: usize,
    tape_mode: TapeMode,
    rules: Vec<&'a Transition<S>>,
    /// Rule index by `(state, read)` key.
    keys: HashMap<(u32, Vec<S>), usize>,
    /// Every non-empty prefix of every key, by state.
    prefixes: HashMap<u32, HashSet<Vec<S>>>,
    /// The source alphabet including the blank.
    symbols: Vec<S>,
    phases: Vec<Phase<S>>,
    ids: HashMap<Phase<S>, u32>,
    queue: VecDeque<u32>,
    builder: MachineBuilder<Token>,
}

impl<'a, S: Symbol> Compiler<'a, S> {
    fn new(machine: &'a Machine<S>, tape_mode: TapeMode) -> Result<Self, CompileError> {
        let symbols = machine.alphabet().with_blank();
        let rules: Vec<_> = machine.transitions().iter().collect();

        let mut keys = HashMap::new();
        let mut prefixes: HashMap<u32, HashSet<Vec<S>>> = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            keys.insert((rule.state, rule.read.clone()), index);

            let state_prefixes = prefixes.entry(rule.state).or_default();
            for length in 1..=rule.read.len() {
                state_prefixes.insert(rule.read[..length].to_vec());
            }
        }

        let alphabet = symbols
            .iter()
            .filter(|symbol| !symbol.is_blank())
            .map(|symbol| Cell::Plain(symbol.clone()))
            .chain(symbols.iter().map(|symbol| Cell::Marked(symbol.clone())))
            .chain([Cell::LeftEnd, Cell::Separator, Cell::End])
            .map(|cell| cell.to_token())
            .collect();

        Ok(Self {
            tapes: machine.tape_count(),
            tape_mode,
            rules,
            keys,
            prefixes,
            symbols,
            phases: Vec::new(),
            ids: HashMap::new(),
            queue: VecDeque::new(),
            builder: MachineBuilder::new(1, alphabet)?,
        })
    }

    /// Returns the state number of a phase, queueing it when it is new.
    fn intern(&mut self, phase: Phase<S>) -> u32 {
        if let Some(&id) = self.ids.get(&phase) {
            return id;
        }

        let id = self.phases.len() as u32;
        self.phases.push(phase.clone());
        self.ids.insert(phase, id);
        self.queue.push_back(id);
        id
    }

    fn emit(
        &mut self,
        state: u32,
        read: Cell<S>,
        target: Target<S>,
        write: Cell<S>,
        direction: Direction,
    ) -> Result<(), CompileError> {
        let next_state = match target {
            Target::Phase(phase) => StateLabel::Ordinary(self.intern(phase)),
            Target::Terminal(terminal) => terminal,
        };

        self.builder.rule(
            state,
            vec![read.to_token()],
            next_state,
            vec![write.to_token()],
            vec![direction],
        )?;
        Ok(())
    }

    /// Emits a transition that leaves the cell unchanged.
    fn pass(
        &mut self,
        state: u32,
        read: Cell<S>,
        direction: Direction,
        phase: Phase<S>,
    ) -> Result<(), CompileError> {
        self.emit(state, read.clone(), Target::Phase(phase), read, direction)
    }

    /// Plain and marked cells of every symbol, blank included.
    fn content(&self) -> Vec<Cell<S>> {
        self.symbols
            .iter()
            .map(|symbol| Cell::Plain(symbol.clone()))
            .chain(self.symbols.iter().map(|symbol| Cell::Marked(symbol.clone())))
            .collect()
    }

    /// The cell that ends segment `tape`.
    fn boundary_after(&self, tape: usize) -> Cell<S> {
        if tape + 1 < self.tapes {
            Cell::Separator
        } else {
            Cell::End
        }
    }

    /// Where the machine continues after applying `rule`.
    fn resume_after(&self, rule: usize) -> Resume {
        match self.rules[rule].next_state {
            StateLabel::Ordinary(state) => Resume::Read(state),
            terminal => Resume::Cleanup(terminal),
        }
    }

    fn is_stay(&self, rule: usize, tape: usize) -> bool {
        self.rules[rule].directions[tape] == Direction::Stay
    }

    /// Emits every transition of one phase.
    fn expand(&mut self, state: u32) -> Result<(), CompileError> {
        use Direction::{Left, Right, Stay};

        let phase = self.phases[state as usize].clone();
        let blank = S::blank();
        let symbols = self.symbols.clone();

        match phase {
            Phase::Start => {
                for symbol in symbols {
                    let next = Phase::Carry {
                        symbol: symbol.clone(),
                        first: true,
                    };
                    self.emit(state, Cell::Plain(symbol), Target::Phase(next), Cell::LeftEnd, Right)?;
                }

                // Empty input: segment 0 is a single marked blank
                let next = Phase::LayBlank { tape: 0 };
                self.emit(state, Cell::End, Target::Phase(next), Cell::LeftEnd, Right)?;
            }

            Phase::Carry { symbol, first } => {
                let written = if first {
                    Cell::Marked(symbol)
                } else {
                    Cell::Plain(symbol)
                };

                for read in symbols {
                    let next = Phase::Carry {
                        symbol: read.clone(),
                        first: false,
                    };
                    self.emit(state, Cell::Plain(read), Target::Phase(next), written.clone(), Right)?;
                }

                let next = Phase::Separator { tape: 1 };
                self.emit(state, Cell::End, Target::Phase(next), written, Right)?;
            }

            Phase::Separator { tape } => {
                let next = Phase::LayBlank { tape };
                self.emit(state, Cell::Plain(blank), Target::Phase(next), Cell::Separator, Right)?;
            }

            Phase::LayBlank { tape } => {
                let next = if tape + 1 < self.tapes {
                    Phase::Separator { tape: tape + 1 }
                } else {
                    Phase::Terminator
                };
                let marked = Cell::Marked(blank.clone());
                self.emit(state, Cell::Plain(blank), Target::Phase(next), marked, Right)?;
            }

            Phase::Terminator => {
                let next = Phase::Rewind {
                    resume: Resume::Read(0),
                };
                self.emit(state, Cell::Plain(blank), Target::Phase(next), Cell::End, Left)?;
            }

            Phase::Rewind { resume } => {
                for cell in self.content().into_iter().chain([Cell::Separator, Cell::End]) {
                    self.pass(state, cell, Left, Phase::Rewind { resume })?;
                }

                match resume {
                    Resume::Read(source) => {
                        let next = Phase::Read {
                            state: source,
                            seen: Vec::new(),
                        };
                        self.pass(state, Cell::LeftEnd, Right, next)?;
                    }
                    Resume::Cleanup(terminal) => {
                        let next = Phase::Cleanup { terminal, tape: 0 };
                        self.emit(state, Cell::LeftEnd, Target::Phase(next), Cell::Plain(blank), Right)?;
                    }
                }
            }

            Phase::Read { state: source, seen } => {
                let reject = Phase::Rewind {
                    resume: Resume::Cleanup(StateLabel::Reject),
                };

                for symbol in &symbols {
                    let same = Phase::Read {
                        state: source,
                        seen: seen.clone(),
                    };
                    self.pass(state, Cell::Plain(symbol.clone()), Right, same)?;
                }
                let same = Phase::Read {
                    state: source,
                    seen: seen.clone(),
                };
                self.pass(state, Cell::Separator, Right, same)?;

                if seen.len() < self.tapes {
                    for symbol in &symbols {
                        let mut prefix = seen.clone();
                        prefix.push(symbol.clone());

                        let known = self
                            .prefixes
                            .get(&source)
                            .is_some_and(|prefixes| prefixes.contains(&prefix));
                        let cell = Cell::Marked(symbol.clone());
                        if known {
                            let next = Phase::Read {
                                state: source,
                                seen: prefix,
                            };
                            self.pass(state, cell, Right, next)?;
                        } else {
                            // No transition of this state reads these symbols
                            self.pass(state, cell, Left, reject.clone())?;
                        }
                    }
                } else {
                    let next = match self.keys.get(&(source, seen)) {
                        Some(&rule) => Phase::Write {
                            rule,
                            tape: self.tapes - 1,
                        },
                        None => reject,
                    };
                    self.pass(state, Cell::End, Left, next)?;
                }
            }

            Phase::Write { rule, tape } => {
                let written = self.rules[rule].write[tape].clone();

                for symbol in symbols {
                    let same = Phase::Write { rule, tape };
                    self.pass(state, Cell::Plain(symbol.clone()), Left, same.clone())?;
                    self.emit(
                        state,
                        Cell::Marked(symbol),
                        Target::Phase(same),
                        Cell::Marked(written.clone()),
                        Left,
                    )?;
                }

                if tape > 0 {
                    self.pass(state, Cell::Separator, Left, Phase::Write { rule, tape: tape - 1 })?;
                } else {
                    match self.resume_after(rule) {
                        Resume::Read(_) => {
                            let next = Phase::Move {
                                rule,
                                tape: 0,
                                done: self.is_stay(rule, 0),
                            };
                            self.pass(state, Cell::LeftEnd, Right, next)?;
                        }
                        Resume::Cleanup(terminal) => {
                            let next = Phase::Cleanup { terminal, tape: 0 };
                            self.emit(
                                state,
                                Cell::LeftEnd,
                                Target::Phase(next),
                                Cell::Plain(blank),
                                Right,
                            )?;
                        }
                    }
                }
            }

            Phase::Move { rule, tape, done } => {
                let same = Phase::Move { rule, tape, done };

                for symbol in symbols {
                    self.pass(state, Cell::Plain(symbol.clone()), Right, same.clone())?;

                    let marked = Cell::Marked(symbol.clone());
                    match self.rules[rule].directions[tape] {
                        _ if done => self.pass(state, marked, Right, same.clone())?,
                        Stay => self.pass(state, marked, Right, same.clone())?,
                        Right => {
                            let next = Phase::MarkNext { rule, tape };
                            self.emit(state, marked, Target::Phase(next), Cell::Plain(symbol), Right)?;
                        }
                        Left => {
                            let next = Phase::MarkPrev { rule, tape };
                            self.emit(state, marked, Target::Phase(next), Cell::Plain(symbol), Left)?;
                        }
                    }
                }

                if tape + 1 < self.tapes {
                    let next = Phase::Move {
                        rule,
                        tape: tape + 1,
                        done: self.is_stay(rule, tape + 1),
                    };
                    self.pass(state, Cell::Separator, Right, next)?;
                } else {
                    let next = Phase::Rewind {
                        resume: self.resume_after(rule),
                    };
                    self.pass(state, Cell::End, Left, next)?;
                }
            }

            Phase::MarkNext { rule, tape } => {
                for symbol in symbols {
                    let next = Phase::Move {
                        rule,
                        tape,
                        done: true,
                    };
                    let marked = Cell::Marked(symbol.clone());
                    self.emit(state, Cell::Plain(symbol), Target::Phase(next), marked, Right)?;
                }

                // The marker ran off the end of its segment
                let boundary = self.boundary_after(tape);
                let next = Phase::Shift {
                    rule,
                    tape,
                    carry: boundary.clone(),
                };
                self.emit(state, boundary, Target::Phase(next), Cell::Marked(blank), Right)?;
            }

            Phase::MarkPrev { rule, tape } => {
                for symbol in symbols {
                    let next = Phase::Move {
                        rule,
                        tape,
                        done: true,
                    };
                    let marked = Cell::Marked(symbol.clone());
                    self.emit(state, Cell::Plain(symbol), Target::Phase(next), marked, Right)?;
                }

                let boundary = if tape == 0 {
                    Cell::LeftEnd
                } else {
                    Cell::Separator
                };
                let next = match self.tape_mode {
                    TapeMode::BiInfinite => Phase::InsertBlank { rule, tape },
                    TapeMode::RightInfinite => Phase::Remark { rule, tape },
                };
                self.pass(state, boundary, Right, next)?;
            }

            Phase::InsertBlank { rule, tape } => {
                for symbol in symbols {
                    let next = Phase::Shift {
                        rule,
                        tape,
                        carry: Cell::Plain(symbol.clone()),
                    };
                    let marked = Cell::Marked(blank.clone());
                    self.emit(state, Cell::Plain(symbol), Target::Phase(next), marked, Right)?;
                }
            }

            Phase::Remark { rule, tape } => {
                for symbol in symbols {
                    let next = Phase::Move {
                        rule,
                        tape,
                        done: true,
                    };
                    let marked = Cell::Marked(symbol.clone());
                    self.emit(state, Cell::Plain(symbol), Target::Phase(next), marked, Right)?;
                }
            }

            Phase::Shift { rule, tape, carry } => {
                if carry == Cell::End {
                    let next = if tape + 1 < self.tapes {
                        Phase::Return {
                            rule,
                            tape,
                            remaining: self.tapes - 1 - tape,
                        }
                    } else {
                        Phase::Rewind {
                            resume: self.resume_after(rule),
                        }
                    };
                    self.emit(state, Cell::Plain(blank), Target::Phase(next), Cell::End, Left)?;
                } else {
                    for cell in self.content().into_iter().chain([Cell::Separator, Cell::End]) {
                        let next = Phase::Shift {
                            rule,
                            tape,
                            carry: cell.clone(),
                        };
                        self.emit(state, cell, Target::Phase(next), carry.clone(), Right)?;
                    }
                }
            }

            Phase::Return {
                rule,
                tape,
                remaining,
            } => {
                for cell in self.content() {
                    let same = Phase::Return {
                        rule,
                        tape,
                        remaining,
                    };
                    self.pass(state, cell, Left, same)?;
                }

                if remaining > 1 {
                    let next = Phase::Return {
                        rule,
                        tape,
                        remaining: remaining - 1,
                    };
                    self.pass(state, Cell::Separator, Left, next)?;
                } else {
                    let next = Phase::Move {
                        rule,
                        tape: tape + 1,
                        done: self.is_stay(rule, tape + 1),
                    };
                    self.pass(state, Cell::Separator, Right, next)?;
                }
            }

            Phase::Cleanup { terminal, tape } => {
                let same = Phase::Cleanup { terminal, tape };

                if tape + 1 < self.tapes {
                    for cell in self.content() {
                        self.emit(state, cell, Target::Phase(same.clone()), Cell::Plain(blank.clone()), Right)?;
                    }
                    let next = Phase::Cleanup {
                        terminal,
                        tape: tape + 1,
                    };
                    self.emit(state, Cell::Separator, Target::Phase(next), Cell::Plain(blank), Right)?;
                } else {
                    for symbol in symbols {
                        self.pass(state, Cell::Plain(symbol.clone()), Right, same.clone())?;
                        self.emit(
                            state,
                            Cell::Marked(symbol.clone()),
                            Target::Phase(same.clone()),
                            Cell::Plain(symbol),
                            Right,
                        )?;
                    }
                    self.emit(state, Cell::End, Target::Terminal(terminal), Cell::Plain(blank), Stay)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{run, Config, TuringMachine};
    use crate::parser::{parse, parse_tokens};
    use crate::types::Verdict;

    const COPY: &str = "1 2 2 3\n0,1\n0,0,_,0,0,R,0,R\n0,1,_,0,1,R,1,R\n0,_,_,h,_,N,_,N\n";

    /// Writes the input onto tape 2 backwards by moving its head left.
    const REVERSE: &str = "1 2 2 3\n0,1\n0,0,_,0,0,R,0,L\n0,1,_,0,1,R,1,L\n0,_,_,y,_,N,_,N\n";

    /// Moves head 1 off the left end of its tape, then expects a blank there.
    const STEP_BACK: &str = "2 2 2 2\n0,1\n0,1,_,1,1,L,1,R\n1,_,_,y,0,N,0,N\n";

    const BOUND: usize = 1_000_000;

    fn chars(text: &str) -> Vec<char> {
        char::split_input(text)
    }

    /// Runs `source` directly and compiled, and checks that both agree.
    fn assert_equivalent(source: &str, input: &str, tape_mode: TapeMode) -> Verdict {
        let machine = parse(source).unwrap();
        let config = Config::new(BOUND).with_tape_mode(tape_mode);
        let expected = run(&machine, &chars(input), config).unwrap();

        let compiled = compile(&machine, CompileOptions { tape_mode }).unwrap();
        let encoded = compiled.encode_input(&chars(input)).unwrap();
        let actual = run(compiled.machine(), &encoded, Config::new(BOUND)).unwrap();

        assert_eq!(actual.verdict, expected.verdict, "verdict on {input:?}");
        assert_eq!(
            compiled.decode_output(&actual.tapes[0]),
            Some(expected.output()),
            "output on {input:?}"
        );
        expected.verdict
    }

    #[test]
    fn test_single_tape_machine_rejected() {
        let machine = parse("1 1 1 1\na\n0,a,y,a,N\n").unwrap();

        let error = compile(&machine, CompileOptions::default()).unwrap_err();
        assert_eq!(error, CompileError::TooFewTapes(1));
    }

    #[test]
    fn test_reserved_symbol_rejected() {
        let machine = parse("1 2 2 1\na,$\n0,a,_,y,$,N,_,N\n").unwrap();

        let error = compile(&machine, CompileOptions::default()).unwrap_err();
        assert_eq!(error, CompileError::ReservedSymbol("$".to_string()));
    }

    #[test]
    fn test_compiled_machine_shape() {
        let compiled = compile(&parse(COPY).unwrap(), CompileOptions::default()).unwrap();
        let machine = compiled.machine();

        assert_eq!(machine.tape_count(), 1);
        assert_eq!(compiled.source_tapes(), 2);
        assert_eq!(compiled.phase(0), Some(&Phase::Start));
        assert_eq!(compiled.phases().len(), machine.state_count());

        let alphabet: Vec<&str> = machine.alphabet().symbols().iter().map(Token::as_str).collect();
        assert_eq!(alphabet, vec!["0", "1", "*0", "*1", "*_", "^", "/", "$"]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let machine = parse(REVERSE).unwrap();
        let first = compile(&machine, CompileOptions::default()).unwrap();
        let second = compile(&machine, CompileOptions::default()).unwrap();

        assert_eq!(first.machine().to_string(), second.machine().to_string());
        assert_eq!(first.phases(), second.phases());
    }

    #[test]
    fn test_copy_machine_equivalent() {
        for input in ["", "0", "011", "10110"] {
            assert_eq!(assert_equivalent(COPY, input, TapeMode::BiInfinite), Verdict::Halt);
        }
    }

    #[test]
    fn test_blanks_inside_input_are_copied() {
        assert_eq!(assert_equivalent(COPY, "0_1", TapeMode::BiInfinite), Verdict::Halt);
        assert_eq!(assert_equivalent(COPY, "_", TapeMode::BiInfinite), Verdict::Halt);
        assert_eq!(assert_equivalent(REVERSE, "1__0", TapeMode::BiInfinite), Verdict::Accept);
    }

    #[test]
    fn test_unknown_input_symbol_rejected_before_running() {
        let machine = parse(COPY).unwrap();
        let compiled = compile(&machine, CompileOptions::default()).unwrap();

        for input in ["$", "0^", "01/"] {
            let direct = run(&machine, &chars(input), Config::default()).unwrap_err();
            assert_eq!(compiled.encode_input(&chars(input)).unwrap_err(), direct);
        }
    }

    #[test]
    fn test_left_moves_insert_cells() {
        for input in ["", "1", "011", "0010"] {
            assert_eq!(assert_equivalent(REVERSE, input, TapeMode::BiInfinite), Verdict::Accept);
        }
    }

    #[test]
    fn test_insert_in_first_segment_returns_to_next() {
        assert_eq!(assert_equivalent(STEP_BACK, "1", TapeMode::BiInfinite), Verdict::Accept);
        // No transition for state 0 reading 0
        assert_eq!(assert_equivalent(STEP_BACK, "0", TapeMode::BiInfinite), Verdict::Reject);
    }

    #[test]
    fn test_right_infinite_left_move_stays() {
        // Head 1 stays on the 1, which state 1 has no transition for
        assert_eq!(
            assert_equivalent(STEP_BACK, "1", TapeMode::RightInfinite),
            Verdict::Reject
        );
        // Head 2 keeps overwriting its first cell and reads the 0 written there
        assert_eq!(
            assert_equivalent(REVERSE, "011", TapeMode::RightInfinite),
            Verdict::Reject
        );
        assert_eq!(
            assert_equivalent(REVERSE, "", TapeMode::RightInfinite),
            Verdict::Accept
        );
    }

    #[test]
    fn test_cleanup_leaves_last_segment() {
        let machine = parse(REVERSE).unwrap();
        let compiled = compile(&machine, CompileOptions::default()).unwrap();
        let encoded = compiled.encode_input(&chars("011")).unwrap();
        let outcome = run(compiled.machine(), &encoded, Config::new(BOUND)).unwrap();

        assert_eq!(outcome.state, StateLabel::Accept);
        assert_eq!(outcome.output_text(), "1|1|0");
        assert_eq!(compiled.decode_output(&outcome.tapes[0]), Some(chars("110")));
    }

    #[test]
    fn test_layout_tracks_source_configuration() {
        let machine = parse(REVERSE).unwrap();
        let input = chars("01");

        let mut expected = vec![TuringMachine::new(&machine, &input, Config::new(BOUND))
            .unwrap()
            .snapshot()];
        expected.extend(
            TuringMachine::new(&machine, &input, Config::new(BOUND))
                .unwrap()
                .snapshots(),
        );

        let compiled = compile(&machine, CompileOptions::default()).unwrap();
        let encoded = compiled.encode_input(&input).unwrap();
        let entries: Vec<_> = TuringMachine::new(compiled.machine(), &encoded, Config::new(BOUND))
            .unwrap()
            .snapshots()
            .filter(|snapshot| {
                let phase = snapshot.state.ordinary().and_then(|state| compiled.phase(state));
                matches!(phase, Some(Phase::Read { seen, .. }) if seen.is_empty())
                    && snapshot.tapes[0].head() == 1
            })
            .collect();

        // Every source step but the last, which goes to cleanup instead
        assert_eq!(entries.len(), expected.len() - 1);
        for (entry, source) in entries.iter().zip(&expected) {
            let decoded = compiled.decode_layout(&entry.tapes[0].cells()).unwrap();
            for (decoded, tape) in decoded.iter().zip(&source.tapes) {
                assert_eq!(decoded.cells(), tape.cells());
                assert_eq!(decoded.head_index(), tape.head_index());
            }
        }
    }

    #[test]
    fn test_compiled_machine_round_trips_as_text() {
        let compiled = compile(&parse(STEP_BACK).unwrap(), CompileOptions::default()).unwrap();
        let text = compiled.machine().to_string();

        assert_eq!(&parse_tokens(&text).unwrap(), compiled.machine());
    }

    #[test]
    fn test_token_machine_compiles() {
        let machine = parse_tokens("1 2 2 2\nab,c\n0,ab,_,0,ab,R,c,R\n0,_,_,y,_,N,_,N\n").unwrap();
        let compiled = compile(&machine, CompileOptions::default()).unwrap();

        let input = Token::split_input("ab|ab");
        let encoded = compiled.encode_input(&input).unwrap();
        let outcome = run(compiled.machine(), &encoded, Config::new(BOUND)).unwrap();

        assert!(outcome.accepted());
        assert_eq!(
            compiled.decode_output(&outcome.tapes[0]),
            Some(Token::split_input("c|c"))
        );
    }

    #[test]
    fn test_phase_stages() {
        assert_eq!(Phase::<char>::Start.stage(), Stage::Copying);
        assert_eq!(
            Phase::<char>::Rewind {
                resume: Resume::Cleanup(StateLabel::Halt)
            }
            .stage(),
            Stage::Cleanup
        );
        assert_eq!(Phase::<char>::Write { rule: 0, tape: 1 }.stage(), Stage::Writing);
        assert_eq!(
            Phase::Read {
                state: 2,
                seen: vec!['a']
            }
            .to_string(),
            "read 2 [a]"
        );
    }
}
