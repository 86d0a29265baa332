use std::path::Path;

use rayon::prelude::*;

use crate::{
    client::ClientRecord,
    error::{Error, Result},
};

/// A feed of client records used to seed the index.
pub trait ClientSource {
    fn clients(&self) -> Result<Vec<ClientRecord>>;
}

impl ClientSource for [ClientRecord] {
    fn clients(&self) -> Result<Vec<ClientRecord>> {
        Ok(self.to_vec())
    }
}

impl ClientSource for Vec<ClientRecord> {
    fn clients(&self) -> Result<Vec<ClientRecord>> {
        Ok(self.clone())
    }
}

/// Parse a JSON Lines snapshot, one `ClientRecord` per line.
///
/// Blank lines are skipped. Lines are decoded in parallel; a line that
/// fails to decode, or carries a blank `client_id`, is reported with its
/// 1-indexed line number.
pub fn parse_snapshot(text: &str) -> Result<Vec<ClientRecord>> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    lines
        .par_iter()
        .map(|(idx, line)| -> Result<ClientRecord> {
            let record = serde_json::from_str::<ClientRecord>(line).map_err(
                |source| Error::Snapshot {
                    line: idx + 1,
                    source,
                },
            )?;
            record.validate().map_err(|_| {
                Error::InvalidClient(format!(
                    "snapshot line {}: client_id is blank",
                    idx + 1
                ))
            })?;
            Ok(record)
        })
        .collect()
}

/// Read and parse a JSON Lines snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Vec<ClientRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_snapshot(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_blank_lines() {
        let text = r#"{"client_id": "C.1", "hostname": "Host-1"}

{"client_id": "C.2", "mac_addresses": ["aabbccddee02"]}
"#;
        let records = parse_snapshot(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].client_id, "C.1");
        assert_eq!(records[1].mac_addresses, vec!["aabbccddee02"]);
    }

    #[test]
    fn reports_bad_line_number() {
        let text = "{\"client_id\": \"C.1\"}\n\n{not json}\n";
        match parse_snapshot(text) {
            Err(Error::Snapshot { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected snapshot error, got {other:?}"),
        }
    }

    #[test]
    fn blank_client_id_is_rejected_with_line() {
        let text = "{\"client_id\": \"C.1\"}\n{\"client_id\": \"   \"}\n";
        match parse_snapshot(text) {
            Err(Error::InvalidClient(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected invalid client error, got {other:?}"),
        }
        assert!(matches!(
            parse_snapshot("{\"client_id\": \"\"}"),
            Err(Error::InvalidClient(_))
        ));
    }

    #[test]
    fn empty_snapshot_is_fine() {
        assert!(parse_snapshot("").unwrap().is_empty());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("clients.jsonl");
        std::fs::write(&path, "{\"client_id\": \"C.9\"}\n").unwrap();

        let records = load_snapshot(&path).unwrap();
        assert_eq!(records, vec![ClientRecord::new("C.9")]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_snapshot(&tmp.path().join("nope.jsonl")),
            Err(Error::Io(_))
        ));
    }
}
