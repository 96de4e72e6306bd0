use std::fmt;

use serde::Serialize;

pub const MAPPING_SUFFIX: &str = ".map";
pub const XML_SUFFIX: &str = ".xml";

/// The five descriptor families found under `xmls/` in a metadata tarball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Study,
    Sample,
    Experiment,
    Run,
    Analysis,
}

impl DescriptorKind {
    /// Match order when a path could contain more than one segment.
    pub const ALL: [DescriptorKind; 5] = [
        DescriptorKind::Study,
        DescriptorKind::Sample,
        DescriptorKind::Experiment,
        DescriptorKind::Run,
        DescriptorKind::Analysis,
    ];

    pub fn directory_segment(&self) -> &'static str {
        match self {
            DescriptorKind::Study => "/xmls/study/",
            DescriptorKind::Sample => "/xmls/samples/",
            DescriptorKind::Experiment => "/xmls/experiments/",
            DescriptorKind::Run => "/xmls/runs/",
            DescriptorKind::Analysis => "/xmls/analysis/",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            DescriptorKind::Study => ".study.xml",
            DescriptorKind::Sample => ".sample.xml",
            DescriptorKind::Experiment => ".experiment.xml",
            DescriptorKind::Run => ".run.xml",
            DescriptorKind::Analysis => ".analysis.xml",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorKind::Study => "study",
            DescriptorKind::Sample => "sample",
            DescriptorKind::Experiment => "experiment",
            DescriptorKind::Run => "run",
            DescriptorKind::Analysis => "analysis",
        }
    }

    fn identifier(&self, path: &str) -> String {
        let name = file_name(path);
        strip_suffix_ignore_case(name, self.suffix())
            .or_else(|| strip_suffix_ignore_case(name, XML_SUFFIX))
            .unwrap_or(name)
            .to_string()
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCategory {
    Mapping,
    Descriptor(DescriptorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    pub category: EntryCategory,
    pub id: String,
}

/// Routes an archive entry by its path. Returns `None` for anything the
/// archive model does not keep (directories, readmes, stray XML).
pub fn classify(path: &str, is_regular_file: bool) -> Option<ClassifiedEntry> {
    if !is_regular_file {
        return None;
    }

    if ends_with_ignore_case(path, MAPPING_SUFFIX) {
        let name = file_name(path);
        let id = strip_suffix_ignore_case(name, MAPPING_SUFFIX).unwrap_or(name);
        return Some(ClassifiedEntry {
            category: EntryCategory::Mapping,
            id: id.to_string(),
        });
    }

    if !ends_with_ignore_case(path, XML_SUFFIX) {
        return None;
    }

    DescriptorKind::ALL
        .into_iter()
        .find(|kind| path.contains(kind.directory_segment()))
        .map(|kind| ClassifiedEntry {
            category: EntryCategory::Descriptor(kind),
            id: kind.identifier(path),
        })
}

fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn ends_with_ignore_case(value: &str, suffix: &str) -> bool {
    strip_suffix_ignore_case(value, suffix).is_some()
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    if !value.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = value.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
