use inventra_core::{AppError, AppResult};
use serde::{Deserialize, Deserializer};

/// Deserializes a patch field so that `null` clears the value and an absent key
/// leaves it untouched. Use with `#[serde(default, deserialize_with = "...")]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims optional free text; blank values become `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim().to_owned();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

/// Resolves a nullable patch field against the current value.
pub(crate) fn patch_text(current: &mut Option<String>, patch: Option<Option<String>>) {
    if let Some(value) = patch {
        *current = optional_text(value);
    }
}

pub(crate) fn optional_email(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    let Some(value) = optional_text(value) else {
        return Ok(None);
    };

    let valid = value
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !valid {
        return Err(AppError::Validation(format!(
            "{field} must be a valid email address"
        )));
    }

    Ok(Some(value.to_lowercase()))
}

pub(crate) fn optional_color(value: Option<String>) -> AppResult<Option<String>> {
    let Some(value) = optional_text(value) else {
        return Ok(None);
    };

    let valid = value.len() == 7
        && value.starts_with('#')
        && value.chars().skip(1).all(|character| character.is_ascii_hexdigit());
    if !valid {
        return Err(AppError::Validation(
            "color must be a hex value like '#1a2b3c'".to_owned(),
        ));
    }

    Ok(Some(value.to_lowercase()))
}

pub(crate) fn non_negative(field: &str, value: i64) -> AppResult<i64> {
    if value < 0 {
        return Err(AppError::Validation(format!(
            "{field} must be zero or greater"
        )));
    }

    Ok(value)
}

pub(crate) fn positive(field: &str, value: i64) -> AppResult<i64> {
    if value <= 0 {
        return Err(AppError::Validation(format!(
            "{field} must be greater than zero"
        )));
    }

    Ok(value)
}

/// Rejects self-references on hierarchical records.
pub(crate) fn parent_reference(
    id: &str,
    parent_id: Option<String>,
) -> AppResult<Option<String>> {
    let parent_id = optional_text(parent_id);
    if parent_id.as_deref() == Some(id) {
        return Err(AppError::Validation(
            "a record cannot be its own parent".to_owned(),
        ));
    }

    Ok(parent_id)
}
