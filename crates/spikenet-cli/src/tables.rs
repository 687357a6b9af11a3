//! CSV neuron and connection tables
//!
//! Both files start with a header row. The neuron table's first column is
//! the neuron name; the connection table's first three columns are the
//! pre-synaptic name, the post-synaptic name and the weight. Columns are
//! read by position, header names are not interpreted.

use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};
use spikenet_runtime::{ConnectionRow, NeuronTable};

use crate::error::{CliError, CliResult};

fn open(path: &Path) -> CliResult<Reader<File>> {
    if !path.exists() {
        return Err(CliError::missing_resource(format!("{}", path.display())));
    }
    ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(path, source))
}

fn csv_error(path: &Path, source: csv::Error) -> CliError {
    CliError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn field<'r>(path: &Path, row: usize, record: &'r StringRecord, column: usize, what: &str) -> CliResult<&'r str> {
    match record.get(column) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(CliError::InvalidRow {
            path: path.display().to_string(),
            row,
            reason: format!("missing {} (column {})", what, column + 1),
        }),
    }
}

/// Read the neuron table; row order defines neuron indices
pub fn read_neuron_table(path: &Path) -> CliResult<NeuronTable> {
    let mut reader = open(path)?;
    let mut names = Vec::new();
    for (k, result) in reader.records().enumerate() {
        let record = result.map_err(|source| csv_error(path, source))?;
        names.push(field(path, k + 1, &record, 0, "neuron name")?.to_string());
    }
    tracing::debug!("Read {} neurons from {}", names.len(), path.display());
    Ok(NeuronTable::from_names(names)?)
}

/// Read the connection table
pub fn read_connections(path: &Path) -> CliResult<Vec<ConnectionRow>> {
    let mut reader = open(path)?;
    let mut rows = Vec::new();
    for (k, result) in reader.records().enumerate() {
        let row = k + 1;
        let record = result.map_err(|source| csv_error(path, source))?;
        let pre = field(path, row, &record, 0, "pre-synaptic neuron")?;
        let post = field(path, row, &record, 1, "post-synaptic neuron")?;
        let raw_weight = field(path, row, &record, 2, "weight")?;
        let weight: f64 = raw_weight.parse().map_err(|_| CliError::InvalidRow {
            path: path.display().to_string(),
            row,
            reason: format!("weight '{}' is not a number", raw_weight),
        })?;
        rows.push(ConnectionRow::new(pre, post, weight));
    }
    tracing::debug!("Read {} connections from {}", rows.len(), path.display());
    Ok(rows)
}
