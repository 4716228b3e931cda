//! ltree and lquery literal validation.

use pgql_proto::FieldPath;

use crate::error::{Error, Result};

const MAX_LABEL_LEN: usize = 1000;

/// Validate a label path such as `top.science.astronomy`.
pub fn validate_label_path(path: &FieldPath, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    for label in value.split('.') {
        if label.is_empty() {
            return Err(Error::type_cast(path, "ltree labels must not be empty"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::type_cast(path, "ltree label too long"));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::type_cast(
                path,
                format!("invalid ltree label '{label}'"),
            ));
        }
    }
    Ok(())
}

/// Light validation of an `lquery` pattern. PostgreSQL performs the full
/// parse; this rejects characters that can never appear in one.
pub fn validate_lquery(path: &FieldPath, value: &str) -> Result<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_-.*{},|!@%".contains(c);
    if value.is_empty() || !value.chars().all(allowed) {
        return Err(Error::type_cast(path, format!("invalid lquery '{value}'")));
    }
    Ok(())
}
