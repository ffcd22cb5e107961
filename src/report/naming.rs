//! Report file naming.
//!
//! A report is named `{Master_BOL_Number}_{House_BOL_Number}`, with `Unknown`
//! standing in for a missing identifier.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::CollisionPolicy;
use crate::records::{extract_text, Record, HOUSE_BOL_FIELD, MASTER_BOL_FIELD};

pub const UNKNOWN: &str = "Unknown";
pub const REPORT_EXTENSION: &str = "pdf";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("records #{first} and #{second} both resolve to report name '{name}'")]
pub struct DuplicateName {
    pub name: String,
    pub first: usize,
    pub second: usize,
}

/// Primary and secondary identifiers as displayed in the report title.
pub fn identifiers(record: &Record) -> (String, String) {
    let get = |field| extract_text(record, field).unwrap_or_else(|| UNKNOWN.to_string());
    (get(MASTER_BOL_FIELD), get(HOUSE_BOL_FIELD))
}

/// Resolves the base file name (without extension) for a record.
pub fn resolve_name(record: &Record) -> String {
    let (primary, secondary) = identifiers(record);
    format!("{}_{}", file_safe(&primary), file_safe(&secondary))
}

pub fn report_file_name(name: &str) -> String {
    format!("{name}.{REPORT_EXTENSION}")
}

fn file_safe(identifier: &str) -> String {
    let cleaned = sanitize_filename::sanitize(identifier);
    if cleaned.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        cleaned
    }
}

/// Assigns a file name to every record, in record order.
///
/// `None` marks a record whose output would be overwritten by a later record
/// under [`CollisionPolicy::Overwrite`]; it does not need rendering.
pub fn assign_names(
    records: &[Record],
    policy: CollisionPolicy,
) -> Result<Vec<Option<String>>, DuplicateName> {
    let resolved: Vec<String> = records.iter().map(resolve_name).collect();

    match policy {
        CollisionPolicy::Overwrite => {
            let mut last_index: HashMap<&str, usize> = HashMap::new();
            for (index, name) in resolved.iter().enumerate() {
                last_index.insert(name.as_str(), index);
            }
            Ok(resolved
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    if last_index[name.as_str()] == index {
                        Some(name.clone())
                    } else {
                        log::warn!(
                            "Report {} of record #{} is overwritten by a later record",
                            name,
                            index
                        );
                        None
                    }
                })
                .collect())
        }
        CollisionPolicy::Error => {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for (index, name) in resolved.iter().enumerate() {
                if let Some(&first) = seen.get(name.as_str()) {
                    return Err(DuplicateName {
                        name: name.clone(),
                        first,
                        second: index,
                    });
                }
                seen.insert(name.as_str(), index);
            }
            Ok(resolved.into_iter().map(Some).collect())
        }
        CollisionPolicy::Suffix => {
            let mut used: HashSet<String> = HashSet::new();
            let mut assigned = Vec::with_capacity(resolved.len());
            for name in resolved {
                let mut candidate = name.clone();
                let mut n = 2;
                while used.contains(&candidate) {
                    candidate = format!("{name}-{n}");
                    n += 1;
                }
                used.insert(candidate.clone());
                assigned.push(Some(candidate));
            }
            Ok(assigned)
        }
    }
}
