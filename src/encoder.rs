//! The single-tape layout used by compiled machines.
//!
//! k source tapes are laid out on one tape as
//!
//! ```text
//! ^ seg_0 / seg_1 / ... / seg_{k-1} $
//! ```
//!
//! where each segment holds the materialized cells of one source tape and exactly one
//! cell per segment carries the `*` marker of its virtual head. Every cell is a [`Token`];
//! [`Cell`] gives those tokens their meaning.

use std::fmt;

use crate::{
    definition::Alphabet,
    symbol::{Symbol, Token},
    tape::Tape,
    types::InputError,
};

/// Prefix of a marked cell.
pub const MARKER: char = '*';
/// Token in front of the first segment.
pub const LEFT_END: &str = "^";
/// Token between two segments.
pub const SEPARATOR: &str = "/";
/// Token after the last segment.
pub const RIGHT_END: &str = "$";

/// The meaning of one cell of a compiled tape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell<S> {
    /// A source symbol, or the blank.
    Plain(S),
    /// A source symbol under a virtual head.
    Marked(S),
    LeftEnd,
    Separator,
    End,
}

impl<S: Symbol> Cell<S> {
    pub fn to_token(&self) -> Token {
        match self {
            Cell::Plain(symbol) => symbol.to_token(),
            Cell::Marked(symbol) => Token::from(format!("{MARKER}{symbol}").as_str()),
            Cell::LeftEnd => Token::from(LEFT_END),
            Cell::Separator => Token::from(SEPARATOR),
            Cell::End => Token::from(RIGHT_END),
        }
    }

    /// Interprets a compiled tape token. Returns `None` for tokens no layout contains.
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.as_str() {
            LEFT_END => Some(Cell::LeftEnd),
            SEPARATOR => Some(Cell::Separator),
            RIGHT_END => Some(Cell::End),
            text => match text.strip_prefix(MARKER) {
                Some(symbol) => S::from_field(symbol).map(Cell::Marked),
                None => S::from_field(text).map(Cell::Plain),
            },
        }
    }

    /// The source symbol of a plain or marked cell.
    pub fn symbol(&self) -> Option<&S> {
        match self {
            Cell::Plain(symbol) | Cell::Marked(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Whether this cell delimits a segment.
    pub fn is_boundary(&self) -> bool {
        matches!(self, Cell::LeftEnd | Cell::Separator | Cell::End)
    }
}

impl<S: Symbol> fmt::Display for Cell<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_token())
    }
}

/// Whether a source symbol would clash with the layout tokens.
pub fn is_reserved<S: Symbol>(symbol: &S) -> bool {
    let token = symbol.to_token();
    let text = token.as_str();

    text == LEFT_END || text == SEPARATOR || text == RIGHT_END || text.starts_with(MARKER)
}

/// Turns source input into the raw input of a compiled machine: the input symbols
/// followed by `$`, which tells the copying sweep where the input ends.
///
/// # Errors
///
/// Returns `InputError::UnknownSymbol` for the first symbol outside `alphabet`.
pub fn encode_input<S: Symbol>(
    input: &[S],
    alphabet: &Alphabet<S>,
) -> Result<Vec<Token>, InputError> {
    if let Some((position, symbol)) = input
        .iter()
        .enumerate()
        .find(|(_, symbol)| !alphabet.contains(symbol))
    {
        return Err(InputError::UnknownSymbol {
            symbol: symbol.to_string(),
            position,
        });
    }

    Ok(input
        .iter()
        .map(|symbol| symbol.to_token())
        .chain([Cell::<S>::End.to_token()])
        .collect())
}

/// Lays out source tapes as the cells of one compiled tape.
pub fn encode_layout<S: Symbol>(tapes: &[Tape<S>]) -> Vec<Token> {
    let mut cells = vec![Cell::<S>::LeftEnd.to_token()];

    for (i, tape) in tapes.iter().enumerate() {
        if i > 0 {
            cells.push(Cell::<S>::Separator.to_token());
        }

        let head = tape.head_index();
        for (index, symbol) in tape.cells().into_iter().enumerate() {
            let cell = if index == head {
                Cell::Marked(symbol)
            } else {
                Cell::Plain(symbol)
            };
            cells.push(cell.to_token());
        }
    }

    cells.push(Cell::<S>::End.to_token());
    cells
}

/// Reads `tapes` source tapes back from the cells of a compiled tape.
///
/// Blanks before `^` and everything after `$` are ignored. Each decoded tape starts at
/// offset 0. Returns `None` if the cells do not hold a well-formed layout with `tapes`
/// segments.
pub fn decode_layout<S: Symbol>(cells: &[Token], tapes: usize) -> Option<Vec<Tape<S>>> {
    let mut cells = cells
        .iter()
        .skip_while(|token| token.is_blank())
        .map(Cell::<S>::from_token);

    if cells.next()?? != Cell::LeftEnd {
        return None;
    }

    let mut decoded = Vec::with_capacity(tapes);
    let mut segment = Vec::new();
    let mut head = None;

    for cell in cells {
        match cell? {
            Cell::Plain(symbol) => segment.push(symbol),
            Cell::Marked(symbol) => {
                if head.replace(segment.len()).is_some() {
                    return None;
                }
                segment.push(symbol);
            }
            boundary @ (Cell::Separator | Cell::End) => {
                decoded.push(Tape::from_cells(std::mem::take(&mut segment), head.take()?)?);

                if boundary == Cell::End {
                    return (decoded.len() == tapes).then_some(decoded);
                }
            }
            Cell::LeftEnd => return None,
        }
    }

    None
}

/// Reads the source output from a compiled tape.
///
/// A finished compiled run leaves the last segment, unmarked, as the only content; a
/// tape still holding a layout is decoded and its last segment used.
pub fn decode_output<S: Symbol>(tape: &Tape<Token>, tapes: usize) -> Option<Vec<S>> {
    let cells = tape.cells();

    if cells.iter().any(|token| token.as_str() == LEFT_END) {
        return decode_layout::<S>(&cells, tapes)?
            .last()
            .map(Tape::output);
    }

    tape.output()
        .iter()
        .map(|token| match Cell::<S>::from_token(token)? {
            Cell::Plain(symbol) => Some(symbol),
            _ => None,
        })
        .collect()
}
