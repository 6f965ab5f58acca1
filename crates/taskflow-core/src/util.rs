//! Input checks shared by the task store and the auth flows.

/// Trim a required field, returning a validation message naming it when empty.
pub fn require_field(value: &str, label: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{label} is required."))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_field_names_missing_field() {
        assert_eq!(require_field("  ", "Title"), Err("Title is required.".to_string()));
        assert_eq!(require_field(" Buy milk ", "Title"), Ok("Buy milk".to_string()));
    }
}
