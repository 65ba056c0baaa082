//! This module provides the parser for machine descriptions, utilizing the `pest` crate.
//! The grammar in `grammar.pest` splits the text into records of comma-separated fields;
//! the functions here give each record its meaning and validate it.
//!
//! ```text
//! # copy tape 1 onto tape 2
//! 1 2 2 3
//! 0,1
//! 0,0,_,0,0,R,0,R
//! 0,1,_,0,1,R,1,R
//! 0,_,_,h,_,N,_,N
//! ```

use crate::{
    definition::{Machine, MachineBuilder},
    symbol::{Symbol, Token},
    types::{Count, DefinitionError, Direction, ParseError, StateLabel, Transition},
};
use pest::{iterators::Pair, Parser as PestParser};
use pest_derive::Parser as PestParser;

/// Derives a `PestParser` for the machine description grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct MachineParser;

/// One non-comment line of a description.
struct Record<'a> {
    line: usize,
    fields: Vec<&'a str>,
}

/// The four counts declared on the header line.
struct Header {
    line: usize,
    states: usize,
    tapes: usize,
    alphabet: usize,
    transitions: usize,
}

/// Parses a machine description with single-character symbols.
///
/// # Errors
///
/// Returns a `ParseError` naming the offending line when the text is malformed or
/// violates a machine invariant.
pub fn parse(input: &str) -> Result<Machine<char>, ParseError> {
    parse_with(input)
}

/// Parses a machine description with multi-character symbols.
pub fn parse_tokens(input: &str) -> Result<Machine<Token>, ParseError> {
    parse_with(input)
}

/// Parses a machine description over any symbol type.
///
/// This is the main entry point behind [`parse`] and [`parse_tokens`]. The first record
/// is the header, the second the alphabet, every further record one transition. The
/// declared counts are checked against what was actually found.
pub fn parse_with<S: Symbol>(input: &str) -> Result<Machine<S>, ParseError> {
    let mut records = parse_records(input)?.into_iter();

    let header = parse_header(&records.next().ok_or(ParseError::MissingHeader)?)?;
    let alphabet_record = records.next().ok_or(ParseError::MissingAlphabet)?;
    let alphabet = parse_alphabet::<S>(&alphabet_record)?;
    let alphabet_size = alphabet.len();

    let mut builder =
        MachineBuilder::new(header.tapes, alphabet).map_err(|source| ParseError::Invalid {
            line: alphabet_record.line,
            source,
        })?;
    check_count(&header, Count::Alphabet, header.alphabet, alphabet_size)?;

    // Line of every accepted transition, by insertion index
    let mut lines = Vec::new();
    for record in records {
        let transition = parse_transition::<S>(&record, header.tapes)?;
        builder
            .add(transition)
            .map_err(|source| match source {
                DefinitionError::DuplicateTransition { index, .. } => {
                    ParseError::DuplicateTransition {
                        line: record.line,
                        previous: lines[index],
                    }
                }
                source => ParseError::Invalid {
                    line: record.line,
                    source,
                },
            })?;
        lines.push(record.line);
    }

    let machine = builder.build();
    check_count(
        &header,
        Count::Transitions,
        header.transitions,
        machine.transitions().len(),
    )?;
    check_count(&header, Count::States, header.states, machine.state_count())?;

    Ok(machine)
}

/// Runs the grammar and collects every record with its line number.
fn parse_records(input: &str) -> Result<Vec<Record<'_>>, ParseError> {
    let pairs = MachineParser::parse(Rule::machine, input).map_err(Box::new)?;

    Ok(pairs
        .flat_map(Pair::into_inner)
        .filter(|pair| matches!(pair.as_rule(), Rule::header | Rule::record))
        .map(|pair| Record {
            line: pair.as_span().start_pos().line_col().0,
            fields: pair.into_inner().map(|field| field.as_str()).collect(),
        })
        .collect())
}

/// Parses the header record: state count, tape count, alphabet size, transition count.
fn parse_header(record: &Record) -> Result<Header, ParseError> {
    let malformed = |reason: String| ParseError::MalformedHeader {
        line: record.line,
        reason,
    };

    if record.fields.len() != 4 {
        return Err(malformed(format!(
            "expected 4 counts, found {}",
            record.fields.len()
        )));
    }

    let counts = record
        .fields
        .iter()
        .map(|field| {
            field
                .parse::<usize>()
                .map_err(|_| malformed(format!("'{field}' is not a count")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if counts[1] == 0 {
        return Err(malformed("a machine needs at least one tape".to_string()));
    }

    Ok(Header {
        line: record.line,
        states: counts[0],
        tapes: counts[1],
        alphabet: counts[2],
        transitions: counts[3],
    })
}

/// Parses the alphabet record into symbols, keeping their order.
fn parse_alphabet<S: Symbol>(record: &Record) -> Result<Vec<S>, ParseError> {
    record
        .fields
        .iter()
        .map(|field| parse_symbol(field, record.line))
        .collect()
}

/// Parses a transition record:
/// `q, r_1..r_k, q', w_1, d_1, ..., w_k, d_k`.
///
/// Symbol membership and key uniqueness are left to the `MachineBuilder`.
fn parse_transition<S: Symbol>(record: &Record, tapes: usize) -> Result<Transition<S>, ParseError> {
    let line = record.line;
    let fields = &record.fields;

    let expected = 2 + 3 * tapes;
    if fields.len() != expected {
        return Err(ParseError::Arity {
            line,
            expected,
            found: fields.len(),
        });
    }

    let state = match parse_state(fields[0], line)? {
        StateLabel::Ordinary(state) => state,
        terminal => {
            return Err(ParseError::TerminalSource {
                line,
                state: terminal,
            })
        }
    };

    let read = fields[1..=tapes]
        .iter()
        .map(|field| parse_symbol(field, line))
        .collect::<Result<Vec<S>, _>>()?;

    let next_state = parse_state(fields[tapes + 1], line)?;

    let mut write = Vec::with_capacity(tapes);
    let mut directions = Vec::with_capacity(tapes);
    for pair in fields[tapes + 2..].chunks(2) {
        write.push(parse_symbol(pair[0], line)?);
        directions.push(parse_direction(pair[1], line)?);
    }

    Ok(Transition {
        state,
        read,
        next_state,
        write,
        directions,
    })
}

/// Parses a state field, accepting integers and the terminal tokens.
fn parse_state(field: &str, line: usize) -> Result<StateLabel, ParseError> {
    StateLabel::from_token(field).ok_or_else(|| ParseError::InvalidState {
        line,
        field: field.to_string(),
    })
}

/// Parses a direction field: `L`, `N` or `R`.
fn parse_direction(field: &str, line: usize) -> Result<Direction, ParseError> {
    Direction::from_token(field).ok_or_else(|| ParseError::InvalidDirection {
        line,
        field: field.to_string(),
    })
}

fn parse_symbol<S: Symbol>(field: &str, line: usize) -> Result<S, ParseError> {
    S::from_field(field).ok_or_else(|| ParseError::InvalidSymbol {
        line,
        field: field.to_string(),
    })
}

/// Checks a declared header count against the actual one.
fn check_count(
    header: &Header,
    count: Count,
    declared: usize,
    found: usize,
) -> Result<(), ParseError> {
    if declared != found {
        return Err(ParseError::CountMismatch {
            line: header.line,
            count,
            declared,
            found,
        });
    }

    Ok(())
}
