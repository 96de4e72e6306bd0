//! Accessors over parsed run descriptors (`RUN_SET/RUN/DATA_BLOCK/FILES/FILE`).

use serde::Serialize;
use serde_json::Value;

pub fn run(root: &Value) -> Option<&Value> {
    root.get("RUN_SET")?.get("RUN")
}

pub fn run_date(root: &Value) -> Option<&str> {
    run(root)?.get("run_date")?.as_str()
}

/// Files listed by a run; a single `FILE` element and repeated ones both come
/// back as a list.
pub fn run_files(root: &Value) -> Vec<&Value> {
    let files = run(root)
        .and_then(|run| run.get("DATA_BLOCK"))
        .and_then(|block| block.get("FILES"))
        .and_then(|files| files.get("FILE"));
    match files {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(file) => vec![file],
        None => Vec::new(),
    }
}

pub fn file_type(file: &Value) -> Option<&str> {
    file.get("filetype")?.as_str()
}

pub fn file_name(file: &Value) -> Option<&str> {
    file.get("filename")?.as_str()
}

pub fn checksum(file: &Value) -> Option<&str> {
    file.get("checksum")?.as_str()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFile {
    pub run_id: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub checksum: Option<String>,
}

pub fn list_run_files<'a>(
    runs: impl IntoIterator<Item = (&'a String, &'a Value)>,
) -> Vec<RunFile> {
    runs.into_iter()
        .flat_map(|(run_id, root)| {
            run_files(root).into_iter().map(move |file| RunFile {
                run_id: run_id.clone(),
                file_name: file_name(file).map(str::to_string),
                file_type: file_type(file).map(str::to_string),
                checksum: checksum(file).map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn single_file_is_listed() {
        let root = json!({
            "RUN_SET": {
                "RUN": {
                    "run_date": "2013-01-01",
                    "DATA_BLOCK": { "FILES": { "FILE": { "filename": "x.bam", "filetype": "bam", "checksum": "c1" } } }
                }
            }
        });

        assert_eq!(run_date(&root), Some("2013-01-01"));
        let files = run_files(&root);
        assert_eq!(files.len(), 1);
        assert_eq!(file_name(files[0]), Some("x.bam"));
        assert_eq!(file_type(files[0]), Some("bam"));
        assert_eq!(checksum(files[0]), Some("c1"));
    }

    #[test]
    fn missing_path_yields_nothing() {
        let root = json!({ "STUDY_SET": {} });
        assert!(run(&root).is_none());
        assert!(run_date(&root).is_none());
        assert!(run_files(&root).is_empty());
    }
}
