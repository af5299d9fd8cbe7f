//! Collector of generated batches keyed by entity type, with per-key or
//! single-file flush (`spec.md` §4.10).

use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

use indexmap::IndexMap;

use crate::generator::Record;

/// Append-only mapping from entity type-tag to the ordered sequence of
/// produced records. Lives for the `Interpreter` instance.
#[derive(Debug, Default)]
pub struct OutputAccumulator {
    batches: IndexMap<String, Vec<Record>>,
}

impl OutputAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self { batches: IndexMap::new() }
    }

    /// Appends `records` under `type_tag`, creating the key if it doesn't
    /// already exist.
    pub fn add_and_append(&mut self, type_tag: impl Into<String>, records: Vec<Record>) {
        self.batches.entry(type_tag.into()).or_default().extend(records);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.batches.keys().map(String::as_str)
    }

    pub fn records(&self, type_tag: &str) -> Option<&[Record]> {
        self.batches.get(type_tag).map(Vec::as_slice)
    }

    pub fn total_records(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    /// Single-destination flush: every key's records, concatenated, one
    /// JSON object per line.
    pub fn write_to_file(&self, dest: &Path) -> io::Result<()> {
        let mut file = File::create(dest)?;
        for records in self.batches.values() {
            write_records(&mut file, records)?;
        }
        Ok(())
    }

    /// File-per-entity flush: `<dir>/<type_tag>.jsonl` for each key.
    pub fn write_file_per_key(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)?;
        for (type_tag, records) in &self.batches {
            let mut file = File::create(dir.join(format!("{type_tag}.jsonl")))?;
            write_records(&mut file, records)?;
        }
        Ok(())
    }
}

fn write_records(writer: &mut impl Write, records: &[Record]) -> io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Record {
        let mut r = Record::new();
        r.insert("name".to_owned(), crate::generator::GeneratedValue::Str(name.to_owned()));
        r
    }

    #[test]
    fn appends_accumulate_under_the_same_key() {
        let mut acc = OutputAccumulator::new();
        acc.add_and_append("Person", vec![record("a")]);
        acc.add_and_append("Person", vec![record("b")]);
        assert_eq!(acc.records("Person").unwrap().len(), 2);
    }

    #[test]
    fn single_file_flush_concatenates_all_keys() {
        let mut acc = OutputAccumulator::new();
        acc.add_and_append("Person", vec![record("a")]);
        acc.add_and_append("Pet", vec![record("rex")]);

        let dest = std::env::temp_dir().join(format!("synthgen-out-{}.jsonl", std::process::id()));
        acc.write_to_file(&dest).unwrap();
        let content = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(content.lines().count(), 2);
        std::fs::remove_file(&dest).ok();
    }

    #[test]
    fn file_per_key_writes_one_file_per_entity_type() {
        let mut acc = OutputAccumulator::new();
        acc.add_and_append("Person", vec![record("a")]);
        acc.add_and_append("Pet", vec![record("rex")]);

        let dir = std::env::temp_dir().join(format!("synthgen-out-dir-{}", std::process::id()));
        acc.write_file_per_key(&dir).unwrap();
        assert!(dir.join("Person.jsonl").exists());
        assert!(dir.join("Pet.jsonl").exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
