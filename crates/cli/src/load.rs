//! CSV loading: encoding fallback, delimiter sniffing, header + rows.

use std::path::Path;

use crate::CliError;

/// A CSV file split into header and data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read and parse a CSV file; `~` and `$VAR` in the path are expanded.
pub fn load_csv(path: &Path) -> Result<Dataset, CliError> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| CliError::args(format!("cannot expand path {:?}: {}", raw, e)))?;
    let path = Path::new(expanded.as_ref());

    let content = read_file_as_utf8(path)
        .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    parse_csv(&content, sniff_delimiter(&content))
        .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

/// First record is the header. Rows keep their own width (ragged rows are
/// caught by save validation, not here).
pub fn parse_csv(content: &str, delimiter: u8) -> Result<Dataset, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(record) => record.map_err(|e| e.to_string())?.iter().map(|h| h.trim().to_string()).collect(),
        None => return Err("file is empty".to_string()),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(String::from).collect());
    }

    log::debug!("parsed {} rows x {} columns", rows.len(), header.len());
    Ok(Dataset { header, rows })
}

/// Candidate separators, in tie-break order.
const DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Lines of the file looked at when choosing a delimiter.
const SNIFF_RECORDS: usize = 10;

/// Pick the separator that splits the header into the most columns while
/// keeping the following records the same width.
///
/// A separator that leaves the header as a single column is never chosen;
/// with no viable candidate the file is read as comma-separated.
pub fn sniff_delimiter(content: &str) -> u8 {
    DELIMITERS
        .iter()
        .copied()
        .filter_map(|delim| {
            let widths = record_widths(content, delim);
            let header_width = *widths.first()?;
            if header_width < 2 {
                return None;
            }
            let agreeing = widths.iter().filter(|&&w| w == header_width).count();
            Some((agreeing * header_width, delim))
        })
        // First candidate wins ties
        .fold(None, |best: Option<(usize, u8)>, (score, delim)| match best {
            Some((top, _)) if top >= score => best,
            _ => Some((score, delim)),
        })
        .map(|(_, delim)| delim)
        .unwrap_or(b',')
}

/// Field count of each of the first few records when split on `delim`.
fn record_widths(content: &str, delim: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .take(SNIFF_RECORDS)
        .map_while(|record| record.ok().map(|r| r.len()))
        .collect()
}

/// Read a file as text. A byte-order mark selects the encoding; otherwise
/// UTF-8 is tried and Windows-1252 (spreadsheet exports) is the fallback.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    Ok(decode_text(&bytes))
}

fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
}
