use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::archive::{Archive, ArchiveSummary};
use crate::domain::FilterType;
use crate::runs::RunFile;

#[derive(Debug, Clone, Serialize)]
pub struct AccessResult {
    pub id: String,
    pub filter: FilterType,
    pub has_access: bool,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_archive(archive: &Archive) -> io::Result<()> {
        Self::print_json(archive)
    }

    pub fn print_summary(summary: &ArchiveSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_run_files(files: &[RunFile]) -> io::Result<()> {
        Self::print_json(&files)
    }

    pub fn print_access(result: &AccessResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_value(value: &Value) -> io::Result<()> {
        Self::print_json(value)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write_json(&mut stdout, value)
    }
}

pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    out.write_all(json.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_result_serializes_filter_lowercase() {
        let mut out = Vec::new();
        let result = AccessResult {
            id: "jdoe".to_string(),
            filter: FilterType::Username,
            has_access: true,
        };
        write_json(&mut out, &result).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"filter\": \"username\""));
        assert!(text.ends_with("}\n"));
    }
}
