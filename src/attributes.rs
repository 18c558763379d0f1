//! Per-node attribute table: `name,height,length,location,countryprob,isolate`.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use log::{debug, warn};

use crate::error::{MigrationError, Result};

pub const COLUMNS: [&str; 6] = ["name", "height", "length", "location", "countryprob", "isolate"];

#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttributes {
    /// Distance from the deepest tip. Absent (`NA`) on the root row.
    pub height: Option<f64>,
    /// Length of the branch to the parent. Absent (`NA`) on the root row.
    pub length: Option<f64>,
    pub location: String,
    pub countryprob: Option<f64>,
    pub isolate: String,
}

impl NodeAttributes {
    pub fn height(&self, node: &str) -> Result<f64> {
        self.height
            .ok_or_else(|| MigrationError::Parse(format!("node '{}' has no numeric height", node)))
    }

    pub fn length(&self, node: &str) -> Result<f64> {
        self.length
            .ok_or_else(|| MigrationError::Parse(format!("node '{}' has no numeric length", node)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    rows: HashMap<String, NodeAttributes>,
}

impl AttributeTable {
    /// Read a delimited table with a header row. Columns are taken by position.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header = csv_reader.headers()?.clone();
        if header.len() < COLUMNS.len() {
            return Err(MigrationError::Parse(format!(
                "attribute table header has {} columns, expected {}",
                header.len(),
                COLUMNS.join(",")
            )));
        }

        let mut rows = HashMap::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = i + 2;
            if record.len() < COLUMNS.len() {
                return Err(MigrationError::Parse(format!(
                    "attribute table line {} has {} columns, expected {}",
                    line,
                    record.len(),
                    COLUMNS.len()
                )));
            }
            let name = record[0].to_string();
            let attributes = NodeAttributes {
                height: parse_value(&record[1], "height", &name)?,
                length: parse_value(&record[2], "length", &name)?,
                location: record[3].to_string(),
                countryprob: parse_value(&record[4], "countryprob", &name)?,
                isolate: record[5].to_string(),
            };
            if rows.insert(name.clone(), attributes).is_some() {
                warn!("Node {} appears more than once in the attribute table, keeping line {}", name, line);
            }
        }
        debug!("Read {} attribute rows", rows.len());
        Ok(AttributeTable { rows })
    }

    pub fn get(&self, name: &str) -> Option<&NodeAttributes> {
        self.rows.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        self.rows
            .values()
            .map(|a| a.location.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct isolate labels, sorted lexicographically.
    pub fn isolates(&self) -> Vec<&str> {
        self.rows
            .values()
            .map(|a| a.isolate.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// `NA`, `NaN` and empty cells are absent values. Negative numbers are kept:
/// summary trees may carry negative branch lengths.
fn parse_value(cell: &str, column: &str, node: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "NA" {
        return Ok(None);
    }
    let value: f64 = cell.parse().map_err(|_| {
        MigrationError::Parse(format!(
            "node '{}': {} value '{}' is not a number",
            node, column, cell
        ))
    })?;
    if value.is_nan() {
        return Ok(None);
    }
    if value.is_infinite() {
        return Err(MigrationError::Parse(format!(
            "node '{}': {} value '{}' is not finite",
            node, column, cell
        )));
    }
    if value < 0.0 {
        warn!("Node {} has negative {} {}", node, column, value);
    }
    Ok(Some(value))
}
