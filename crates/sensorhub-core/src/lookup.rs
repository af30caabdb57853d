//! Device identity lookups.
//!
//! Two read-only tables come from configuration: NMEA 2000 `$source` ids to
//! display names, and hub MAC addresses to locations. Keys are stored
//! lowercased so lookups are case-insensitive.

use std::collections::HashMap;

use tracing::warn;

pub type LookupTable = HashMap<String, String>;

/// Lowercase every key of a table read from configuration.
pub fn normalize_keys(table: HashMap<String, String>) -> LookupTable {
    table
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect()
}

/// Map a raw `$source` to its display name, keeping the raw id when
/// unmapped.
pub fn resolve_source(table: &LookupTable, raw: &str) -> String {
    match table.get(&raw.to_lowercase()) {
        Some(name) => name.clone(),
        None => {
            warn!("Name not found for Source {}", raw);
            raw.to_string()
        }
    }
}

/// Map a MAC address to a location.
pub fn resolve_location(table: &LookupTable, mac: &str) -> Option<String> {
    let location = table.get(&mac.to_lowercase()).cloned();
    if location.is_none() {
        warn!("Location not found for MAC {}", mac);
    }
    location
}
