//! This crate provides a deterministic multi-tape Turing Machine engine and a compiler that
//! turns any k-tape machine into an equivalent single-tape machine.
//! It includes modules for parsing machine descriptions, running them, compiling them,
//! analyzing them for likely mistakes and managing a catalog of built-in machines.

pub mod analyzer;
pub mod compiler;
pub mod definition;
pub mod encoder;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod symbol;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `Finding` enum from the analyzer module.
pub use analyzer::{analyze, Finding};
/// Re-exports the compiler entry point and its output.
pub use compiler::{compile, CompileOptions, CompiledMachine, Phase, Stage};
/// Re-exports the machine description and its builder.
pub use definition::{Alphabet, Machine, MachineBuilder, TransitionTable};
/// Re-exports the `MachineLoader` struct from the loader module.
pub use loader::MachineLoader;
/// Re-exports the execution engine.
pub use machine::{run, Config, Outcome, Snapshot, Snapshots, TapeMode, TuringMachine};
/// Re-exports the parse functions from the parser module.
pub use parser::{parse, parse_tokens, parse_with};
/// Re-exports `CatalogMachine`, `MachineCatalog`, `MachineInfo` and `MACHINES` from the programs module.
pub use programs::{CatalogMachine, MachineCatalog, MachineInfo, MACHINES};
pub use symbol::{Symbol, Token};
pub use tape::Tape;
/// Re-exports various types related to machine definition and execution from the types module.
pub use types::{
    CompileError, DefinitionError, Direction, InputError, MachineError, ParseError, StateLabel,
    Step, Transition, Verdict, BLANK_SYMBOL, DEFAULT_MAX_STEPS,
};
