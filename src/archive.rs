use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::classify::DescriptorKind;
use crate::domain::DatasetId;
use crate::mapping::Row;

/// The outcome of parsing a single archive entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEntry {
    Descriptor {
        kind: DescriptorKind,
        id: String,
        tree: Value,
    },
    Mapping {
        id: String,
        rows: Vec<Row>,
    },
}

/// One dataset's metadata tarball, rebuilt in memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Archive {
    dataset_id: DatasetId,
    studies: BTreeMap<String, Value>,
    samples: BTreeMap<String, Value>,
    experiments: BTreeMap<String, Value>,
    runs: BTreeMap<String, Value>,
    analyses: BTreeMap<String, Value>,
    mappings: BTreeMap<String, Vec<Row>>,
}

impl Archive {
    pub fn dataset_id(&self) -> &DatasetId {
        &self.dataset_id
    }

    pub fn studies(&self) -> &BTreeMap<String, Value> {
        &self.studies
    }

    pub fn samples(&self) -> &BTreeMap<String, Value> {
        &self.samples
    }

    pub fn experiments(&self) -> &BTreeMap<String, Value> {
        &self.experiments
    }

    pub fn runs(&self) -> &BTreeMap<String, Value> {
        &self.runs
    }

    pub fn analyses(&self) -> &BTreeMap<String, Value> {
        &self.analyses
    }

    pub fn mappings(&self) -> &BTreeMap<String, Vec<Row>> {
        &self.mappings
    }

    pub fn descriptors(&self, kind: DescriptorKind) -> &BTreeMap<String, Value> {
        match kind {
            DescriptorKind::Study => &self.studies,
            DescriptorKind::Sample => &self.samples,
            DescriptorKind::Experiment => &self.experiments,
            DescriptorKind::Run => &self.runs,
            DescriptorKind::Analysis => &self.analyses,
        }
    }

    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            dataset_id: self.dataset_id.to_string(),
            studies: self.studies.len(),
            samples: self.samples.len(),
            experiments: self.experiments.len(),
            runs: self.runs.len(),
            analyses: self.analyses.len(),
            mappings: self.mappings.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub dataset_id: String,
    pub studies: usize,
    pub samples: usize,
    pub experiments: usize,
    pub runs: usize,
    pub analyses: usize,
    pub mappings: usize,
}

/// Collects parsed entries; a later entry replaces an earlier one with the
/// same id in the same category.
#[derive(Debug)]
pub struct ArchiveBuilder {
    archive: Archive,
}

impl ArchiveBuilder {
    pub fn new(dataset_id: DatasetId) -> Self {
        Self {
            archive: Archive {
                dataset_id,
                studies: BTreeMap::new(),
                samples: BTreeMap::new(),
                experiments: BTreeMap::new(),
                runs: BTreeMap::new(),
                analyses: BTreeMap::new(),
                mappings: BTreeMap::new(),
            },
        }
    }

    pub fn accept(&mut self, entry: ParsedEntry) {
        match entry {
            ParsedEntry::Descriptor { kind, id, tree } => {
                let target = match kind {
                    DescriptorKind::Study => &mut self.archive.studies,
                    DescriptorKind::Sample => &mut self.archive.samples,
                    DescriptorKind::Experiment => &mut self.archive.experiments,
                    DescriptorKind::Run => &mut self.archive.runs,
                    DescriptorKind::Analysis => &mut self.archive.analyses,
                };
                target.insert(id, tree);
            }
            ParsedEntry::Mapping { id, rows } => {
                self.archive.mappings.insert(id, rows);
            }
        }
    }

    pub fn build(self) -> Archive {
        self.archive
    }
}
