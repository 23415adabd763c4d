//! Secondary indexes over one immutable build collection.

use std::collections::HashMap;

use crate::model::{BuildRecord, BuildType, Difficulty};

/// Positions into the collection, grouped by type and difficulty, plus a
/// lower-cased name lookup.
///
/// Built in a single pass and never patched; a new collection gets a new
/// index.
#[derive(Debug, Default, Clone)]
pub struct BuildIndex {
    by_type: HashMap<BuildType, Vec<usize>>,
    by_difficulty: HashMap<Difficulty, Vec<usize>>,
    by_name: HashMap<String, usize>,
}

impl BuildIndex {
    pub fn build(records: &[BuildRecord]) -> Self {
        let mut index = Self::default();
        for (pos, record) in records.iter().enumerate() {
            index.by_type.entry(record.build_type).or_default().push(pos);
            index.by_difficulty.entry(record.difficulty).or_default().push(pos);
            // First record with a given name wins.
            index.by_name.entry(record.name.to_lowercase()).or_insert(pos);
        }
        index
    }

    /// Positions of `build_type`, ascending. Empty when no record has it.
    pub fn type_positions(&self, build_type: BuildType) -> &[usize] {
        self.by_type.get(&build_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn difficulty_positions(&self, difficulty: Difficulty) -> &[usize] {
        self.by_difficulty.get(&difficulty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Case-insensitive exact name lookup.
    pub fn name_position(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn type_buckets(&self) -> impl Iterator<Item = (BuildType, &[usize])> {
        self.by_type.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn difficulty_buckets(&self) -> impl Iterator<Item = (Difficulty, &[usize])> {
        self.by_difficulty.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

/// One collection together with its indexes.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub records: Vec<BuildRecord>,
    pub index: BuildIndex,
}

impl Snapshot {
    pub fn new(records: Vec<BuildRecord>) -> Self {
        let index = BuildIndex::build(&records);
        Self { records, index }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clone the records at `positions`, in order.
    pub fn materialize(&self, positions: &[usize]) -> Vec<BuildRecord> {
        positions.iter().filter_map(|&pos| self.records.get(pos).cloned()).collect()
    }

    pub fn by_type(&self, build_type: BuildType) -> Vec<BuildRecord> {
        self.materialize(self.index.type_positions(build_type))
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<BuildRecord> {
        self.materialize(self.index.difficulty_positions(difficulty))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&BuildRecord> {
        self.index.name_position(name).and_then(|pos| self.records.get(pos))
    }
}
