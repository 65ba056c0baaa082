//! A single unbounded tape with its head.

use serde::Serialize;
use std::collections::VecDeque;
use std::ops::RangeInclusive;

use crate::symbol::Symbol;
use crate::types::Direction;

/// One tape of a Turing Machine.
///
/// Cells are addressed by integer offset. Only a contiguous range of cells is
/// materialized; every access outside that range behaves as if the cell held the
/// blank symbol, and writes or head moves past either end grow the range. The
/// range never shrinks and always contains the head and offset 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tape<S> {
    cells: VecDeque<S>,
    /// Offset of `cells[0]`.
    origin: isize,
    head: isize,
}

impl<S: Symbol> Default for Tape<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Symbol> Tape<S> {
    /// Creates a blank tape with the head at offset 0.
    pub fn new() -> Self {
        Self::with_input(&[])
    }

    /// Creates a tape holding `input` from offset 0 on, with the head at offset 0.
    pub fn with_input(input: &[S]) -> Self {
        let mut cells: VecDeque<S> = input.iter().cloned().collect();
        if cells.is_empty() {
            cells.push_back(S::blank());
        }

        Self {
            cells,
            origin: 0,
            head: 0,
        }
    }

    /// Creates a tape from materialized cells starting at offset 0, with the head on
    /// `cells[head]`. Missing cells up to the head are filled with blanks.
    ///
    /// Returns `None` if `head` is not a valid offset.
    pub fn from_cells(cells: Vec<S>, head: usize) -> Option<Self> {
        let head = isize::try_from(head).ok()?;

        let mut tape = Self::with_input(&cells);
        tape.head = head;
        tape.extend_to(head);
        Some(tape)
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> &S {
        &self.cells[self.index(self.head)]
    }

    /// Writes a symbol under the head.
    pub fn write(&mut self, symbol: S) {
        let index = self.index(self.head);
        self.cells[index] = symbol;
    }

    /// Moves the head by one cell, materializing the cell it lands on.
    pub fn shift(&mut self, direction: Direction) {
        self.head += direction.offset();
        self.extend_to(self.head);
    }

    /// Returns the symbol at any offset without materializing it.
    pub fn peek(&self, offset: isize) -> S {
        if self.range().contains(&offset) {
            self.cells[self.index(offset)].clone()
        } else {
            S::blank()
        }
    }

    /// Writes a symbol at any offset, growing the tape as needed.
    pub fn poke(&mut self, offset: isize, symbol: S) {
        self.extend_to(offset);
        let index = self.index(offset);
        self.cells[index] = symbol;
    }

    /// Returns the head offset.
    pub fn head(&self) -> isize {
        self.head
    }

    /// Returns the head position as an index into [`Tape::cells`].
    pub fn head_index(&self) -> usize {
        self.index(self.head)
    }

    /// Returns the materialized offsets.
    pub fn range(&self) -> RangeInclusive<isize> {
        // A VecDeque never holds more than isize::MAX elements
        self.origin..=self.origin + self.cells.len() as isize - 1
    }

    /// Returns the materialized cells, leftmost first.
    pub fn cells(&self) -> Vec<S> {
        self.cells.iter().cloned().collect()
    }

    /// Returns the tape contents with leading and trailing blanks removed.
    pub fn output(&self) -> Vec<S> {
        let start = self.cells.iter().position(|symbol| !symbol.is_blank());
        let end = self.cells.iter().rposition(|symbol| !symbol.is_blank());

        match (start, end) {
            (Some(start), Some(end)) => self.cells.range(start..=end).cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Renders the materialized cells as input text.
    pub fn render(&self) -> String {
        S::join(&self.cells())
    }

    fn extend_to(&mut self, offset: isize) {
        while offset < self.origin {
            self.cells.push_front(S::blank());
            self.origin -= 1;
        }

        while offset > *self.range().end() {
            self.cells.push_back(S::blank());
        }
    }

    fn index(&self, offset: isize) -> usize {
        (offset - self.origin) as usize
    }
}
