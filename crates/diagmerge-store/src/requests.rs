//! Diagnostic request list (`variable,time,space,realm`).

use crate::error::{StoreError, StoreResult};
use diagmerge_types::DiagnosticRequest;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RequestRow {
    variable: String,
    time: String,
    space: String,
    #[serde(default)]
    realm: String,
}

impl From<RequestRow> for DiagnosticRequest {
    fn from(row: RequestRow) -> Self {
        DiagnosticRequest::new(row.variable, row.time.as_str(), row.space.as_str())
            .with_realm(row.realm.trim())
    }
}

pub fn load_requests(path: &Path) -> StoreResult<Vec<DiagnosticRequest>> {
    let file = std::fs::File::open(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_requests(&path.display().to_string(), file)
}

pub fn read_requests<R: Read>(origin: &str, reader: R) -> StoreResult<Vec<DiagnosticRequest>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut requests = Vec::new();
    for row in reader.deserialize::<RequestRow>() {
        let row = row.map_err(|source| StoreError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        if row.variable.is_empty() {
            continue;
        }
        requests.push(row.into());
    }
    Ok(requests)
}
