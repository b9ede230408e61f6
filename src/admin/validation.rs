/*!
 * Argument Validation
 * Local checks run before a call touches the completion queue
 */

use super::types::{ColumnFamilyModification, GcRule, TableConfig};
use crate::core::limits::{MAX_COLUMN_FAMILY_ID_LEN, MAX_TABLE_ID_LEN};
use std::time::Duration;

pub type ValidationResult = Result<(), String>;

/// Table ids match `[_a-zA-Z0-9][-_.a-zA-Z0-9]*`
pub fn validate_table_id(table_id: &str) -> ValidationResult {
    let mut chars = table_id.chars();
    let first = chars
        .next()
        .ok_or_else(|| "table id must not be empty".to_string())?;

    if table_id.len() > MAX_TABLE_ID_LEN {
        return Err(format!(
            "table id {:?} exceeds {} characters",
            table_id, MAX_TABLE_ID_LEN
        ));
    }
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return Err(format!("table id {:?} has an invalid first character", table_id));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return Err(format!("table id {:?} contains invalid character {:?}", table_id, bad));
    }
    Ok(())
}

pub fn validate_family_id(family_id: &str) -> ValidationResult {
    if family_id.is_empty() {
        return Err("column family id must not be empty".to_string());
    }
    if family_id.len() > MAX_COLUMN_FAMILY_ID_LEN {
        return Err(format!(
            "column family id {:?} exceeds {} characters",
            family_id, MAX_COLUMN_FAMILY_ID_LEN
        ));
    }
    if let Some(bad) = family_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!(
            "column family id {:?} contains invalid character {:?}",
            family_id, bad
        ));
    }
    Ok(())
}

pub fn validate_gc_rule(rule: &GcRule) -> ValidationResult {
    match rule {
        GcRule::MaxNumVersions(0) => Err("max versions must be positive".to_string()),
        GcRule::MaxAge(age) if *age == Duration::ZERO => {
            Err("max age must be positive".to_string())
        }
        GcRule::Intersection(rules) | GcRule::Union(rules) => {
            if rules.is_empty() {
                return Err("nested gc rule list must not be empty".to_string());
            }
            rules.iter().try_for_each(validate_gc_rule)
        }
        _ => Ok(()),
    }
}

pub fn validate_table_config(config: &TableConfig) -> ValidationResult {
    for (family, rule) in &config.column_families {
        validate_family_id(family)?;
        validate_gc_rule(rule)?;
    }
    if config.initial_splits.iter().any(String::is_empty) {
        return Err("initial split keys must not be empty".to_string());
    }
    Ok(())
}

pub fn validate_modifications(modifications: &[ColumnFamilyModification]) -> ValidationResult {
    if modifications.is_empty() {
        return Err("at least one column family modification is required".to_string());
    }
    for modification in modifications {
        validate_family_id(modification.family_id())?;
        if let Some(rule) = modification.rule() {
            validate_gc_rule(rule)?;
        }
    }
    Ok(())
}
