//! Inventory - Load security groups from DescribeSecurityGroups JSON
//!
//! Accepted shapes:
//! - `{"SecurityGroups": [...]}` as printed by `aws ec2 describe-security-groups`
//! - a bare array of security groups
//! - a single security group object

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::security_group::SecurityGroup;

/// Errors that can occur when loading an inventory
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Failed to read inventory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid inventory JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected inventory shape: expected an object or array, got {0}")]
    UnexpectedShape(&'static str),
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse security groups from a JSON document
pub fn parse_inventory(content: &str) -> Result<Vec<SecurityGroup>, InventoryError> {
    let document: Value = serde_json::from_str(content)?;

    let groups = match &document {
        Value::Object(map) => match map.get("SecurityGroups") {
            Some(Value::Array(items)) => items.iter().map(SecurityGroup::from).collect(),
            Some(other) => {
                log::warn!(
                    "SecurityGroups is a {}, not an array; treating inventory as empty",
                    json_type_name(other)
                );
                Vec::new()
            }
            None => vec![SecurityGroup::from(&document)],
        },
        Value::Array(items) => items.iter().map(SecurityGroup::from).collect(),
        other => return Err(InventoryError::UnexpectedShape(json_type_name(other))),
    };

    Ok(groups)
}

/// Read and parse an inventory file
pub fn load_inventory(path: &Path) -> Result<Vec<SecurityGroup>, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let groups = parse_inventory(&content)?;
    log::info!(
        "Loaded {} security groups from {}",
        groups.len(),
        path.display()
    );
    Ok(groups)
}
