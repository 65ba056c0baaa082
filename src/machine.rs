//! This module defines the `TuringMachine` struct, which executes a k-tape [`Machine`]
//! description. It owns the live configuration (state, tapes, step count), applies one
//! transition per step and reports the run as an [`Outcome`].

use serde::{Deserialize, Serialize};

use crate::{
    definition::Machine,
    symbol::Symbol,
    tape::Tape,
    types::{Direction, InputError, StateLabel, Step, Verdict, DEFAULT_MAX_STEPS},
};

/// How far the tapes extend to the left of offset 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TapeMode {
    /// Heads move freely to negative offsets.
    #[default]
    BiInfinite,
    /// Offset 0 is the left end; a left move there leaves the head in place.
    RightInfinite,
}

/// Run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Steps after which a run that has not reached a terminal state is stopped.
    pub max_steps: usize,
    pub tape_mode: TapeMode,
}

impl Config {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            tape_mode: TapeMode::default(),
        }
    }

    pub fn with_tape_mode(mut self, tape_mode: TapeMode) -> Self {
        self.tape_mode = tape_mode;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

/// An immutable copy of the configuration after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot<S: Symbol> {
    /// Number of steps taken so far.
    pub step: usize,
    pub state: StateLabel,
    pub tapes: Vec<Tape<S>>,
}

/// The result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<S: Symbol> {
    pub verdict: Verdict,
    /// Steps taken, including the implicit step into REJECT when a transition is missing.
    pub steps: usize,
    pub tapes: Vec<Tape<S>>,
    /// The state the run stopped in.
    pub state: StateLabel,
}

impl<S: Symbol> Outcome<S> {
    pub fn accepted(&self) -> bool {
        self.verdict == Verdict::Accept
    }

    pub fn rejected(&self) -> bool {
        self.verdict == Verdict::Reject
    }

    /// The contents of the last tape with leading and trailing blanks removed.
    pub fn output(&self) -> Vec<S> {
        self.tapes.last().map(Tape::output).unwrap_or_default()
    }

    /// [`Outcome::output`] rendered as input text.
    pub fn output_text(&self) -> String {
        S::join(&self.output())
    }
}

/// Executes a [`Machine`] on one input.
///
/// The engine borrows the machine description and owns exactly one live configuration,
/// which every [`TuringMachine::step`] advances in place.
#[derive(Debug, Clone)]
pub struct TuringMachine<'m, S: Symbol> {
    machine: &'m Machine<S>,
    config: Config,
    state: StateLabel,
    tapes: Vec<Tape<S>>,
    steps: usize,
}

impl<'m, S: Symbol> TuringMachine<'m, S> {
    /// Creates the initial configuration: state 0, the input on the first tape, every
    /// other tape blank and all heads at offset 0.
    ///
    /// # Errors
    ///
    /// Returns `InputError::UnknownSymbol` if the input holds a symbol outside the
    /// machine alphabet. No step is taken in that case.
    pub fn new(machine: &'m Machine<S>, input: &[S], config: Config) -> Result<Self, InputError> {
        if let Some((position, symbol)) = input
            .iter()
            .enumerate()
            .find(|(_, symbol)| !machine.alphabet().contains(symbol))
        {
            return Err(InputError::UnknownSymbol {
                symbol: symbol.to_string(),
                position,
            });
        }

        let mut tapes = vec![Tape::with_input(input)];
        tapes.resize_with(machine.tape_count(), Tape::new);

        Ok(Self {
            machine,
            config,
            state: StateLabel::START,
            tapes,
            steps: 0,
        })
    }

    /// Executes a single step.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if the machine performed a step.
    /// * `Step::Halt(verdict)` if the machine is in a terminal state or the step bound is
    ///   spent; nothing is done in that case.
    pub fn step(&mut self) -> Step {
        if let Some(verdict) = self.verdict() {
            return Step::Halt(verdict);
        }

        let StateLabel::Ordinary(state) = self.state else {
            return Step::Halt(Verdict::Halt);
        };

        let machine = self.machine;
        match machine.transition(state, &self.symbols()) {
            Some(transition) => {
                for ((tape, symbol), &direction) in self
                    .tapes
                    .iter_mut()
                    .zip(&transition.write)
                    .zip(&transition.directions)
                {
                    tape.write(symbol.clone());
                    Self::shift(tape, direction, self.config.tape_mode);
                }
                self.state = transition.next_state;
            }
            // A missing transition rejects without touching the tapes
            None => self.state = StateLabel::Reject,
        }

        self.steps += 1;
        Step::Continue
    }

    /// Runs until a terminal state is reached or the step bound is spent.
    pub fn run(&mut self) -> Verdict {
        loop {
            if let Step::Halt(verdict) = self.step() {
                return verdict;
            }
        }
    }

    /// Runs to the end and returns the outcome.
    pub fn finish(mut self) -> Outcome<S> {
        let verdict = self.run();

        Outcome {
            verdict,
            steps: self.steps,
            tapes: self.tapes,
            state: self.state,
        }
    }

    /// Turns the machine into an iterator over the configurations after every step.
    pub fn snapshots(self) -> Snapshots<'m, S> {
        Snapshots { machine: self }
    }

    /// The verdict of the run, once there is one.
    pub fn verdict(&self) -> Option<Verdict> {
        self.state.verdict().or_else(|| {
            (self.steps >= self.config.max_steps).then_some(Verdict::StepBoundExceeded)
        })
    }

    /// Copies the current configuration.
    pub fn snapshot(&self) -> Snapshot<S> {
        Snapshot {
            step: self.steps,
            state: self.state,
            tapes: self.tapes.clone(),
        }
    }

    pub fn state(&self) -> StateLabel {
        self.state
    }

    pub fn tapes(&self) -> &[Tape<S>] {
        &self.tapes
    }

    /// Returns the total number of steps executed.
    pub fn step_count(&self) -> usize {
        self.steps
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn machine(&self) -> &'m Machine<S> {
        self.machine
    }

    /// Returns the symbols under every head.
    ///
    /// | a | b | c | tape 1
    /// | d | e |   | tape 2
    ///   0   1   2   offset
    ///
    /// heads [0, 2] will return ['a', '_']
    pub fn symbols(&self) -> Vec<S> {
        self.tapes.iter().map(|tape| tape.read().clone()).collect()
    }

    fn shift(tape: &mut Tape<S>, direction: Direction, mode: TapeMode) {
        if mode == TapeMode::RightInfinite && direction == Direction::Left && tape.head() == 0 {
            return;
        }

        tape.shift(direction);
    }
}

/// A lazy, single-pass stream of [`Snapshot`]s, one per step taken.
///
/// Created by [`TuringMachine::snapshots`]. Dropping the stream early leaves the run
/// unfinished; [`Snapshots::finish`] completes it.
#[derive(Debug, Clone)]
pub struct Snapshots<'m, S: Symbol> {
    machine: TuringMachine<'m, S>,
}

impl<'m, S: Symbol> Snapshots<'m, S> {
    /// The configuration the next snapshot will be taken from.
    pub fn machine(&self) -> &TuringMachine<'m, S> {
        &self.machine
    }

    /// Runs any remaining steps and returns the outcome.
    pub fn finish(self) -> Outcome<S> {
        self.machine.finish()
    }
}

impl<S: Symbol> Iterator for Snapshots<'_, S> {
    type Item = Snapshot<S>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.machine.step() {
            Step::Continue => Some(self.machine.snapshot()),
            Step::Halt(_) => None,
        }
    }
}

/// Runs `machine` on `input` to the end.
///
/// # Errors
///
/// Returns an `InputError` if the input holds a symbol outside the alphabet.
pub fn run<S: Symbol>(
    machine: &Machine<S>,
    input: &[S],
    config: Config,
) -> Result<Outcome<S>, InputError> {
    Ok(TuringMachine::new(machine, input, config)?.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, parse_tokens};
    use crate::symbol::Token;

    const COPY: &str = "1 2 2 3\n0,1\n0,0,_,0,0,R,0,R\n0,1,_,0,1,R,1,R\n0,_,_,h,_,N,_,N\n";

    /// Moves left forever on a single tape.
    const WALK_LEFT: &str = "1 1 1 1\na\n0,_,0,a,L\n";

    fn input(text: &str) -> Vec<char> {
        char::split_input(text)
    }

    #[test]
    fn test_copy_machine_halts_with_copy() {
        let machine = parse(COPY).unwrap();
        let outcome = run(&machine, &input("011"), Config::new(100)).unwrap();

        assert_eq!(outcome.verdict, Verdict::Halt);
        assert_eq!(outcome.state, StateLabel::Halt);
        assert_eq!(outcome.steps, 4);
        assert_eq!(outcome.output(), input("011"));
        assert_eq!(outcome.output_text(), "011");
        assert!(!outcome.accepted());
        assert!(!outcome.rejected());
    }

    #[test]
    fn test_unknown_input_symbol_rejected_before_running() {
        let machine = parse(COPY).unwrap();

        let error = TuringMachine::new(&machine, &input("012"), Config::new(100)).unwrap_err();
        assert_eq!(
            error,
            InputError::UnknownSymbol {
                symbol: "2".to_string(),
                position: 2,
            }
        );
    }

    #[test]
    fn test_missing_transition_rejects_in_one_step() {
        let machine = parse("1 1 2 1\na,b\n0,a,0,a,R\n").unwrap();
        let mut tm = TuringMachine::new(&machine, &input("ab"), Config::new(100)).unwrap();

        assert_eq!(tm.step(), Step::Continue);
        assert_eq!(tm.step(), Step::Continue);
        assert_eq!(tm.state(), StateLabel::Reject);
        assert_eq!(tm.step_count(), 2);
        assert_eq!(tm.tapes()[0].cells(), input("ab"));
        assert_eq!(tm.tapes()[0].head(), 1);

        assert_eq!(tm.step(), Step::Halt(Verdict::Reject));
        assert_eq!(tm.step_count(), 2);
    }

    #[test]
    fn test_accept_and_reject_verdicts() {
        let machine = parse("1 1 2 2\na,b\n0,a,y,a,N\n0,b,n,b,N\n").unwrap();

        let accepted = run(&machine, &input("a"), Config::new(10)).unwrap();
        assert!(accepted.accepted());
        assert_eq!(accepted.steps, 1);

        let rejected = run(&machine, &input("b"), Config::new(10)).unwrap();
        assert!(rejected.rejected());
        assert_eq!(rejected.steps, 1);
    }

    #[test]
    fn test_step_bound_exceeded() {
        let machine = parse(WALK_LEFT).unwrap();
        let outcome = run(&machine, &[], Config::new(5)).unwrap();

        assert_eq!(outcome.verdict, Verdict::StepBoundExceeded);
        assert_eq!(outcome.steps, 5);
        assert_eq!(outcome.state, StateLabel::START);
        assert_eq!(outcome.tapes[0].range(), -5..=0);
    }

    #[test]
    fn test_zero_step_bound() {
        let machine = parse(COPY).unwrap();
        let outcome = run(&machine, &input("0"), Config::new(0)).unwrap();

        assert_eq!(outcome.verdict, Verdict::StepBoundExceeded);
        assert_eq!(outcome.steps, 0);
    }

    #[test]
    fn test_right_infinite_left_move_stays() {
        let machine = parse(WALK_LEFT).unwrap();
        let config = Config::new(3).with_tape_mode(TapeMode::RightInfinite);
        let outcome = run(&machine, &[], config).unwrap();

        // The second step reads the written 'a' and has no transition
        assert_eq!(outcome.verdict, Verdict::Reject);
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.tapes[0].head(), 0);
        assert_eq!(outcome.tapes[0].range(), 0..=0);
        assert_eq!(outcome.tapes[0].read(), &'a');
    }

    #[test]
    fn test_snapshots_match_run() {
        let machine = parse(COPY).unwrap();
        let tm = TuringMachine::new(&machine, &input("10"), Config::new(100)).unwrap();

        let mut snapshots = tm.clone().snapshots();
        let collected: Vec<_> = snapshots.by_ref().collect();
        let outcome = snapshots.finish();

        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].step, 1);
        assert_eq!(collected[0].tapes[1].cells(), vec!['1', '_']);
        assert_eq!(collected[2].state, StateLabel::Halt);
        assert_eq!(outcome, tm.finish());
    }

    #[test]
    fn test_snapshots_are_deterministic() {
        let machine = parse(COPY).unwrap();
        let stream = || {
            TuringMachine::new(&machine, &input("0110"), Config::new(100))
                .unwrap()
                .snapshots()
                .collect::<Vec<_>>()
        };

        assert_eq!(stream(), stream());
    }

    #[test]
    fn test_snapshot_serializes() {
        let machine = parse(COPY).unwrap();
        let tm = TuringMachine::new(&machine, &input("1"), Config::new(100)).unwrap();

        let json = serde_json::to_value(tm.snapshot()).unwrap();
        assert_eq!(json["step"], 0);
        assert_eq!(json["state"], serde_json::json!({ "Ordinary": 0 }));
        assert_eq!(json["tapes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_token_machine() {
        let machine = parse_tokens("1 1 2 2\nab,c\n0,ab,0,c,R\n0,_,y,_,N\n").unwrap();
        let outcome = run(&machine, &Token::split_input("ab|ab"), Config::default()).unwrap();

        assert!(outcome.accepted());
        assert_eq!(outcome.output_text(), "c|c");
    }
}
