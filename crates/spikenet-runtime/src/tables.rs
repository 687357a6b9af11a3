//! Resolution of externally supplied neuron and connection tables
//!
//! The neuron table assigns indices by row order. Connection rows refer to
//! neurons by name and are resolved against it, with weights scaled into
//! millivolts.

use std::collections::HashMap;

use crate::{error::*, topology::Synapse, NeuronId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One row of the connection table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionRow {
    /// Pre-synaptic neuron name
    pub pre: String,
    /// Post-synaptic neuron name
    pub post: String,
    /// Unscaled weight
    pub weight: f64,
}

impl ConnectionRow {
    /// Create a new row
    pub fn new(pre: impl Into<String>, post: impl Into<String>, weight: f64) -> Self {
        Self {
            pre: pre.into(),
            post: post.into(),
            weight,
        }
    }
}

/// Bidirectional mapping between neuron names and indices
#[derive(Debug, Clone, Default)]
pub struct NeuronTable {
    names: Vec<String>,
    index: HashMap<String, NeuronId>,
}

impl NeuronTable {
    /// Build from names in row order; a repeated name is an error
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for name in names {
            let name = name.into();
            let row = table.names.len();
            if let Some(first) = table.index.get(&name) {
                return Err(RuntimeError::DuplicateName {
                    name,
                    first: first.index(),
                    second: row,
                });
            }
            table.index.insert(name.clone(), NeuronId::new(row as u32));
            table.names.push(name);
        }
        Ok(table)
    }

    /// Number of neurons
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a named neuron
    pub fn index_of(&self, name: &str) -> Result<NeuronId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::unknown_neuron(name))
    }

    /// Name of a neuron
    pub fn name(&self, id: NeuronId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Names in index order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolve connection rows into synapses, multiplying weights by `weight_scale`
    pub fn resolve<'a, I>(&self, rows: I, weight_scale: f64) -> Result<Vec<Synapse>>
    where
        I: IntoIterator<Item = &'a ConnectionRow>,
    {
        require_finite("weight_scale", weight_scale)?;
        rows.into_iter()
            .map(|row| {
                Ok(Synapse::new(
                    self.index_of(&row.pre)?,
                    self.index_of(&row.post)?,
                    row.weight * weight_scale,
                ))
            })
            .collect()
    }
}
