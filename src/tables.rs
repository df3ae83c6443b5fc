// ABOUTME: The fixed set of replicated tables and their replication order
// ABOUTME: Table names are resolved at load time; unknown names never reach a run

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReplicationError;

/// A table in the replicated set.
///
/// The set is closed: names coming from configuration or the command line are
/// parsed into this enum up front, so a run only ever sees known tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReplicatedTable {
    Eggs,
    InventoryActions,
    Species,
    EggColors,
    EggSizes,
    Coops,
}

impl ReplicatedTable {
    /// All replicated tables, in run order.
    ///
    /// Order matters only for which tables are already committed when a run
    /// fails part-way; the destination carries no cross-table constraints.
    pub const ALL: [ReplicatedTable; 6] = [
        ReplicatedTable::Eggs,
        ReplicatedTable::InventoryActions,
        ReplicatedTable::Species,
        ReplicatedTable::EggColors,
        ReplicatedTable::EggSizes,
        ReplicatedTable::Coops,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicatedTable::Eggs => "eggs",
            ReplicatedTable::InventoryActions => "inventory_actions",
            ReplicatedTable::Species => "species",
            ReplicatedTable::EggColors => "egg_colors",
            ReplicatedTable::EggSizes => "egg_sizes",
            ReplicatedTable::Coops => "coops",
        }
    }

    /// Destination type of the table's `id` column.
    ///
    /// SQLite rowid aliases are 64-bit regardless of whether the source
    /// declared AUTOINCREMENT, so every table maps its key to BIGINT.
    pub fn identity_type(&self) -> &'static str {
        match self {
            ReplicatedTable::Eggs
            | ReplicatedTable::InventoryActions
            | ReplicatedTable::Species
            | ReplicatedTable::EggColors
            | ReplicatedTable::EggSizes
            | ReplicatedTable::Coops => "BIGINT",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }

    /// Parse a comma-separated list of table names, preserving the given order.
    pub fn parse_list(value: &str) -> Result<Vec<ReplicatedTable>, ReplicationError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ReplicatedTable::from_str)
            .collect()
    }
}

impl fmt::Display for ReplicatedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicatedTable {
    type Err = ReplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ReplicationError::UnknownTable {
                name: value.to_string(),
            })
    }
}

impl TryFrom<String> for ReplicatedTable {
    type Error = ReplicationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReplicatedTable> for String {
    fn from(table: ReplicatedTable) -> Self {
        table.as_str().to_string()
    }
}
