//! The built-in machine catalog: machine descriptions embedded from `machines/`, parsed
//! once and looked up by index or name.

use crate::definition::Machine;
use crate::parser::parse;
use crate::types::MachineError;

/// Embedded machines: key, display name, sample input and description text.
const MACHINE_TEXTS: [(&str, &str, &str, &str); 5] = [
    (
        "copy",
        "Tape copy",
        "011",
        include_str!("../machines/copy.tm"),
    ),
    (
        "binary-palindrome",
        "Binary palindrome",
        "0110",
        include_str!("../machines/binary-palindrome.tm"),
    ),
    (
        "unary-addition",
        "Unary addition",
        "11+111",
        include_str!("../machines/unary-addition.tm"),
    ),
    (
        "binary-increment",
        "Binary increment",
        "1011",
        include_str!("../machines/binary-increment.tm"),
    ),
    (
        "two-tape-equality",
        "Two-tape equality",
        "0110=0110",
        include_str!("../machines/two-tape-equality.tm"),
    ),
];

/// A machine of the built-in catalog.
#[derive(Debug, Clone)]
pub struct CatalogMachine {
    /// The file stem under `machines/`.
    pub key: &'static str,
    pub name: &'static str,
    /// An input the machine is meant to be tried on.
    pub sample: &'static str,
    /// The description text the machine was parsed from.
    pub text: &'static str,
    pub machine: Machine<char>,
}

lazy_static::lazy_static! {
    pub static ref MACHINES: Vec<CatalogMachine> = MACHINE_TEXTS
        .iter()
        .filter_map(|&(key, name, sample, text)| {
            parse(text).ok().map(|machine| CatalogMachine {
                key,
                name,
                sample,
                text,
                machine,
            })
        })
        .collect();
}

pub struct MachineCatalog;

impl MachineCatalog {
    /// Get the number of available machines
    pub fn count() -> usize {
        MACHINES.len()
    }

    /// Get a machine by its index
    pub fn get_by_index(index: usize) -> Result<&'static CatalogMachine, MachineError> {
        MACHINES
            .get(index)
            .ok_or_else(|| MachineError::NotFound(format!("index {index}")))
    }

    /// Get a machine by its key or name, ignoring ASCII case
    pub fn get_by_name(name: &str) -> Result<&'static CatalogMachine, MachineError> {
        MACHINES
            .iter()
            .find(|entry| entry.key == name || entry.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| MachineError::NotFound(name.to_string()))
    }

    /// List all machine names
    pub fn names() -> Vec<&'static str> {
        MACHINES.iter().map(|entry| entry.name).collect()
    }

    /// Get information about a machine by its index
    pub fn info(index: usize) -> Result<MachineInfo, MachineError> {
        let entry = Self::get_by_index(index)?;

        Ok(MachineInfo {
            index,
            key: entry.key,
            name: entry.name,
            sample: entry.sample,
            tapes: entry.machine.tape_count(),
            state_count: entry.machine.state_count(),
            transition_count: entry.machine.transitions().len(),
        })
    }

    /// Search for machines by name
    pub fn search(query: &str) -> Vec<usize> {
        let query = query.to_lowercase();

        MACHINES
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.name.to_lowercase().contains(&query))
            .map(|(index, _)| index)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    pub index: usize,
    pub key: &'static str,
    pub name: &'static str,
    pub sample: &'static str,
    pub tapes: usize,
    pub state_count: usize,
    pub transition_count: usize,
}
