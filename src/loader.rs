//! This module provides the `MachineLoader` struct, responsible for reading machine
//! descriptions from files and directories and writing them back.

use crate::definition::Machine;
use crate::parser::parse_with;
use crate::symbol::{Symbol, Token};
use crate::types::MachineError;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine descriptions.
pub const MACHINE_EXTENSION: &str = "tm";

/// `MachineLoader` is a utility struct for loading and saving machine descriptions.
pub struct MachineLoader;

impl MachineLoader {
    /// Loads a single-character machine from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(Machine<char>)` if the file is read and parsed.
    /// * `Err(MachineError::File)` if the file cannot be read.
    /// * `Err(MachineError::Parse)` if the content is not a valid machine.
    pub fn load_machine(path: &Path) -> Result<Machine<char>, MachineError> {
        Self::load(path)
    }

    /// Loads a multi-character machine from the specified file path.
    pub fn load_machine_tokens(path: &Path) -> Result<Machine<Token>, MachineError> {
        Self::load(path)
    }

    /// Loads a machine over any symbol type from the specified file path.
    pub fn load<S: Symbol>(path: &Path) -> Result<Machine<S>, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::File(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Ok(parse_with(&content)?)
    }

    /// Loads every single-character machine (`.tm` extension) in a directory.
    ///
    /// Directories and files with other extensions are skipped. The results are sorted by
    /// path.
    ///
    /// # Returns
    ///
    /// * One `Result` per `.tm` file: its path and machine, or the error that prevented
    ///   loading it.
    pub fn load_machines(directory: &Path) -> Vec<Result<(PathBuf, Machine<char>), MachineError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::File(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => results.push(Err(MachineError::File(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }

        // Skip directories and files without the machine extension
        paths.retain(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|extension| extension == MACHINE_EXTENSION)
        });
        paths.sort();

        results.extend(paths.into_iter().map(|path| match Self::load_machine(&path) {
            Ok(machine) => Ok((path, machine)),
            Err(e) => Err(MachineError::File(format!(
                "Failed to load machine from {}: {}",
                path.display(),
                e
            ))),
        }));
        results
    }

    /// Writes a machine to a file in the description format.
    pub fn save_machine<S: Symbol>(path: &Path, machine: &Machine<S>) -> Result<(), MachineError> {
        fs::write(path, machine.to_string()).map_err(|e| {
            MachineError::File(format!("Failed to write file {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Count, ParseError};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const ACCEPT_A: &str = "# accepts a\n1 1 1 2\na\n0,a,0,a,R\n0,_,y,_,N\n";

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_valid_machine() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("accept.tm");
        write_file(&file_path, ACCEPT_A);

        let machine = MachineLoader::load_machine(&file_path).unwrap();
        assert_eq!(machine.tape_count(), 1);
        assert_eq!(machine.transitions().len(), 2);
    }

    #[test]
    fn test_load_invalid_machine() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.tm");
        write_file(&file_path, "1 1 1 3\na\n0,a,0,a,R\n0,_,y,_,N\n");

        let error = MachineLoader::load_machine(&file_path).unwrap_err();
        assert!(matches!(
            error,
            MachineError::Parse(ParseError::CountMismatch {
                count: Count::Transitions,
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();

        let error = MachineLoader::load_machine(&dir.path().join("missing.tm")).unwrap_err();
        assert!(matches!(error, MachineError::File(_)));
    }

    #[test]
    fn test_load_token_machine() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("tokens.tm");
        write_file(&file_path, "1 1 2 1\nab,cd\n0,ab,y,cd,N\n");

        let machine = MachineLoader::load_machine_tokens(&file_path).unwrap();
        assert!(machine.alphabet().contains(&Token::from("cd")));
    }

    #[test]
    fn test_load_machines_from_directory() {
        let dir = tempdir().unwrap();

        write_file(&dir.path().join("valid.tm"), ACCEPT_A);
        write_file(&dir.path().join("invalid.tm"), "not a machine");
        // Ignored: wrong extension
        write_file(&dir.path().join("ignored.txt"), ACCEPT_A);

        let results = MachineLoader::load_machines(dir.path());

        // Sorted by path: invalid.tm, valid.tm
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        let (path, machine) = results[1].as_ref().unwrap();
        assert!(path.ends_with("valid.tm"));
        assert_eq!(machine.state_count(), 1);
    }

    #[test]
    fn test_load_machines_missing_directory() {
        let dir = tempdir().unwrap();

        let results = MachineLoader::load_machines(&dir.path().join("nope"));
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("saved.tm");
        let machine = crate::parser::parse(ACCEPT_A).unwrap();

        MachineLoader::save_machine(&file_path, &machine).unwrap();
        let loaded = MachineLoader::load_machine(&file_path).unwrap();

        assert_eq!(loaded, machine);
    }
}
