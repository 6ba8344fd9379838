//! Data Store collaborator.
//!
//! The import pipeline hands an ordered batch of canonical records to a
//! [`DataStore`] and gets back the row indexes that were committed. The JSON
//! Lines store is the adapter the CLI writes through.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use log::debug;

use crate::{io_utils, transform::CanonicalRecord};

/// One record queued for persistence, tagged with its upload row index.
#[derive(Debug, Clone)]
pub struct CommitCandidate {
    pub row_index: usize,
    pub record: CanonicalRecord,
}

pub trait DataStore {
    /// Persists `batch` in order, returning the row indexes committed.
    fn commit(&mut self, batch: &[CommitCandidate]) -> Result<Vec<usize>>;
}

pub struct JsonLinesStore<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesStore<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesStore<Box<dyn Write>> {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        Ok(Self::new(io_utils::open_output(path)?))
    }
}

impl<W: Write> DataStore for JsonLinesStore<W> {
    fn commit(&mut self, batch: &[CommitCandidate]) -> Result<Vec<usize>> {
        let mut committed = Vec::with_capacity(batch.len());
        for candidate in batch {
            serde_json::to_writer(&mut self.writer, &candidate.record)
                .with_context(|| format!("Writing row {}", candidate.row_index))?;
            self.writer.write_all(b"\n")?;
            committed.push(candidate.row_index);
        }
        self.writer.flush().context("Flushing committed records")?;
        debug!("Committed {} record(s)", committed.len());
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::FieldValue, data::Record, registry::Registry, transform::transform};

    #[test]
    fn json_lines_store_writes_one_object_per_record() {
        let registry = Registry::builtin();
        let batch = ["Ari", "Sam"]
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let record: Record = vec![("name", FieldValue::from(*name))].into_iter().collect();
                CommitCandidate {
                    row_index: idx * 2,
                    record: transform(&record, &registry),
                }
            })
            .collect::<Vec<_>>();

        let mut store = JsonLinesStore::new(Vec::new());
        let committed = store.commit(&batch).expect("commit");
        assert_eq!(committed, vec![0, 2]);

        let output = String::from_utf8(store.into_inner()).unwrap();
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["name"], "Sam");
        assert_eq!(second["status"], "active");
    }
}
