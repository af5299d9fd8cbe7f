//! The `dict` field type's name → word-list lookup.
//!
//! `original_source/interpreter/interpreter.go` shows the system this spec
//! was distilled from supporting `SetCustomDictonaryPath`, an
//! operator-supplied directory of dictionary files that overrides the
//! built-ins; `spec.md` keeps the `dict` field type in its arity/type table
//! (§4.4) but doesn't define where dictionary contents come from, so this is
//! a supplement rather than a redefinition (§3 of `SPEC_FULL.md`).

use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use rand::Rng;

use crate::error::InterpretError;

const FIRST_NAMES: &[&str] = &["Ada", "Grace", "Alan", "Margaret", "Linus", "Barbara", "Guido", "Katherine"];
const LAST_NAMES: &[&str] = &["Lovelace", "Hopper", "Turing", "Hamilton", "Torvalds", "Liskov", "Van Rossum"];
const CITIES: &[&str] = &["Portland", "Austin", "Raleigh", "Boulder", "Madison", "Ann Arbor", "Pittsburgh"];

/// Name → word-list lookup for the `dict` field type.
///
/// Built-in dictionaries are compiled in; a custom directory (one file per
/// dictionary name, newline-separated words) may override or add to them.
/// Looked-up custom files are cached for the lifetime of the registry.
pub struct DictionaryRegistry {
    builtin: HashMap<&'static str, &'static [&'static str]>,
    custom_dir: Option<PathBuf>,
    cache: RefCell<HashMap<String, Vec<String>>>,
}

impl Default for DictionaryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut builtin = HashMap::new();
        builtin.insert("first_names", FIRST_NAMES);
        builtin.insert("last_names", LAST_NAMES);
        builtin.insert("cities", CITIES);
        Self { builtin, custom_dir: None, cache: RefCell::new(HashMap::new()) }
    }

    #[must_use]
    pub fn with_custom_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.custom_dir = Some(dir.into());
        self
    }

    fn load_custom(&self, dir: &Path, name: &str) -> Option<Result<Vec<String>, InterpretError>> {
        let path = dir.join(format!("{name}.txt"));
        if !path.exists() {
            return None;
        }
        Some(fs::read_to_string(&path).map(|content| {
            content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned).collect()
        }).map_err(|e| InterpretError::io(e, path)))
    }

    /// Draws a random word from the named dictionary.
    pub fn sample(&self, name: &str, rng: &mut impl Rng) -> Result<String, InterpretError> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(pick(cached, rng));
        }

        if let Some(dir) = &self.custom_dir {
            if let Some(result) = self.load_custom(dir, name) {
                let words = result?;
                let picked = pick(&words, rng);
                self.cache.borrow_mut().insert(name.to_owned(), words);
                return Ok(picked);
            }
        }

        if let Some(words) = self.builtin.get(name) {
            return Ok(words[rng.gen_range(0..words.len())].to_owned());
        }

        Err(InterpretError::Resolution {
            message: format!("Unknown dictionary {name:?}"),
            pos: None,
        })
    }
}

fn pick(words: &[String], rng: &mut impl Rng) -> String {
    words[rng.gen_range(0..words.len())].clone()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn samples_from_a_builtin_dictionary() {
        let dicts = DictionaryRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let word = dicts.sample("first_names", &mut rng).unwrap();
        assert!(FIRST_NAMES.contains(&word.as_str()));
    }

    #[test]
    fn unknown_dictionary_is_a_resolution_error() {
        let dicts = DictionaryRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = dicts.sample("nonexistent", &mut rng).unwrap_err();
        assert!(matches!(err, InterpretError::Resolution { .. }));
    }

    #[test]
    fn custom_directory_overrides_builtin() {
        let dir = std::env::temp_dir().join(format!("synthgen-dict-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("first_names.txt"), "Override\n").unwrap();

        let dicts = DictionaryRegistry::new().with_custom_dir(&dir);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let word = dicts.sample("first_names", &mut rng).unwrap();
        assert_eq!(word, "Override");

        fs::remove_dir_all(&dir).ok();
    }
}
