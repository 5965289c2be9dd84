//! Logical-name resolution for template units
//!
//! A name first passes through the alias table, then each candidate is
//! checked against registered units, then probed as a file path. File
//! probing tries the name verbatim and with every handler extension
//! appended, in the current directory and each search directory in
//! registration order. Every path probed is remembered so a failed
//! lookup can say exactly where it looked.

use std::path::{Path, PathBuf};

use crate::error::EngineError;

use super::{ResolvedUnit, TemplateStore};

pub(super) fn resolve(store: &TemplateStore, name: &str) -> Result<ResolvedUnit, EngineError> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(target) = store.alias_target(name) {
        candidates.push(target.to_string());
    }
    candidates.push(name.to_string());

    for candidate in &candidates {
        if let Some(unit) = store.registered(candidate) {
            return Ok(ResolvedUnit::Registered(unit));
        }
    }

    let mut checked = Vec::new();
    for candidate in &candidates {
        if let Some(path) = probe_file(store, candidate, &mut checked) {
            let handler = store.handler_for(&path)?;
            return Ok(ResolvedUnit::File { path, handler });
        }
    }

    Err(EngineError::unit_not_found(name, checked))
}

/// Probes a candidate name against the filesystem, recording every path
/// tried into `checked`
fn probe_file(store: &TemplateStore, candidate: &str, checked: &mut Vec<String>) -> Option<PathBuf> {
    let mut roots: Vec<PathBuf> = vec![PathBuf::new()];
    roots.extend(store.directories().iter().cloned());

    for root in &roots {
        let bare = join(root, candidate);
        if try_path(&bare, checked) {
            return Some(bare);
        }
        if Path::new(candidate).extension().is_none() {
            for ext in store.handler_extensions() {
                let with_ext = join(root, &format!("{candidate}.{ext}"));
                if try_path(&with_ext, checked) {
                    return Some(with_ext);
                }
            }
        }
    }
    None
}

fn join(root: &Path, candidate: &str) -> PathBuf {
    if root.as_os_str().is_empty() {
        PathBuf::from(candidate)
    } else {
        root.join(candidate)
    }
}

fn try_path(path: &Path, checked: &mut Vec<String>) -> bool {
    checked.push(format!("\"{}\"", path.display()));
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_probe_tries_bare_name_and_handler_extensions() {
        let store = TemplateStore::new();
        let mut checked = Vec::new();
        assert!(probe_file(&store, "no_such_unit", &mut checked).is_none());
        assert!(checked.iter().any(|c| c.contains("no_such_unit\"")));
        assert!(checked.iter().any(|c| c.contains("no_such_unit.html")));
        assert!(checked.iter().any(|c| c.contains("no_such_unit.txt")));
    }

    #[test]
    fn test_explicit_extension_skips_auto_extension() {
        let store = TemplateStore::new();
        let mut checked = Vec::new();
        let _ = probe_file(&store, "unit.html", &mut checked);
        assert!(!checked.iter().any(|c| c.contains("unit.html.html")));
    }

    #[test]
    fn test_probe_finds_file_in_search_directory() {
        let dir = std::env::temp_dir().join("slotweave_resolver_test");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("banner.html");
        fs::write(&file, "<hr>").unwrap();

        let mut store = TemplateStore::new();
        store.add_directory(&dir);
        let mut checked = Vec::new();
        let found = probe_file(&store, "banner", &mut checked).unwrap();
        assert_eq!(found, file);

        fs::remove_file(&file).unwrap();
    }
}
