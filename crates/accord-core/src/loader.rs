//! Loading contract documents from disk.
//!
//! Contracts in one directory that declare an `order` form a scenario named
//! after the directory, stepping through them by ascending order.

use crate::contract::{Contract, ContractDocument, DocumentFormat};
use crate::error::CompileError;
use crate::stub::ScenarioStep;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Contract {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. } | LoadError::Contract { path, .. } => path,
        }
    }
}

/// A contract and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedContract {
    pub file: PathBuf,
    pub contract: Contract,
}

/// True for `.json`, `.yml` and `.yaml` files.
pub fn is_contract_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "json" | "yml" | "yaml"))
}

/// Contract files under `path`, recursively, in sorted order. A file path is
/// returned as is.
pub fn collect_contract_files(path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let io = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io)? {
        let entry_path = entry.map_err(io)?.path();
        if entry_path.is_dir() {
            files.extend(collect_contract_files(&entry_path)?);
        } else if is_contract_file(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse the documents of one file with their `order`. Unnamed contracts are
/// named after the file, with an index when the file holds several.
pub fn read_documents(path: &Path) -> Result<Vec<(Option<u32>, Contract)>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "contract".to_string());
    let located = |source: CompileError| LoadError::Contract {
        path: path.to_path_buf(),
        source,
    };

    let documents = ContractDocument::parse_all(&text, DocumentFormat::from_path(path))
        .map_err(|e| located(e.at(stem.clone(), "")))?;
    let several = documents.len() > 1;
    documents
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            let name = if several { format!("{stem}_{index}") } else { stem.clone() };
            let document = document.with_default_name(name);
            let order = document.order;
            let contract = document.into_contract().map_err(located)?;
            Ok((order, contract))
        })
        .collect()
}

/// Load every contract under `path`, assigning scenario steps per directory.
pub fn load_contracts(path: &Path) -> Result<Vec<LoadedContract>, LoadError> {
    let mut loaded = Vec::new();
    let mut groups: Vec<(PathBuf, Vec<(u32, usize)>)> = Vec::new();

    for file in collect_contract_files(path)? {
        let directory = file.parent().map(Path::to_path_buf).unwrap_or_default();
        for (order, contract) in read_documents(&file)? {
            if let Some(order) = order {
                let index = loaded.len();
                match groups.iter_mut().find(|(dir, _)| *dir == directory) {
                    Some((_, members)) => members.push((order, index)),
                    None => groups.push((directory.clone(), vec![(order, index)])),
                }
            }
            loaded.push(LoadedContract {
                file: file.clone(),
                contract,
            });
        }
    }

    for (directory, mut members) in groups {
        let group = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "default".to_string());
        members.sort();
        let size = members.len() as u32;
        for (step, (_, index)) in members.into_iter().enumerate() {
            loaded[index].contract.scenario = Some(ScenarioStep::new(group.clone(), step as u32, size));
        }
        debug!(scenario = %group, steps = size, "scenario assembled");
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GET: &str = "request:\n  method: GET\n  url: /a\nresponse:\n  status: 200\n";

    #[test]
    fn test_load_names_and_scenarios() {
        let dir = TempDir::new().unwrap();
        let flow = dir.path().join("checkout");
        fs::create_dir(&flow).unwrap();
        fs::write(flow.join("2_pay.yml"), format!("order: 2\n{GET}")).unwrap();
        fs::write(flow.join("1_cart.yml"), format!("order: 1\n{GET}")).unwrap();
        fs::write(dir.path().join("ping.yaml"), GET).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_contracts(dir.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        let find = |name: &str| {
            loaded
                .iter()
                .find(|l| l.contract.name.as_deref() == Some(name))
                .unwrap()
                .contract
                .clone()
        };
        assert_eq!(find("ping").scenario, None);
        assert_eq!(find("1_cart").scenario, Some(ScenarioStep::new("checkout", 0, 2)));
        assert_eq!(find("2_pay").scenario, Some(ScenarioStep::new("checkout", 1, 2)));
    }

    #[test]
    fn test_multi_document_names() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("users.yml");
        fs::write(&file, format!("{GET}---\n{GET}")).unwrap();
        let documents = read_documents(&file).unwrap();
        let names: Vec<_> = documents.iter().map(|(_, c)| c.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["users_0", "users_1"]);
    }

    #[test]
    fn test_invalid_document_names_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, "{\"request\": ").unwrap();
        let err = load_contracts(dir.path()).unwrap_err();
        assert_eq!(err.path(), file.as_path());
        assert!(matches!(err, LoadError::Contract { .. }));
    }
}
