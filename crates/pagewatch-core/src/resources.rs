use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Grouping label assigned when the caller does not supply one.
pub const DEFAULT_GROUP_LABEL: &str = "default";

const MAX_LABEL_LEN: usize = 200;

/// A tracked URL. `url` is always in normalized form and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResource {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub group_label: String,
    pub created_at: DateTime<Utc>,
}

/// Trim an optional display title. Blank titles collapse to `None`.
///
/// # Errors
///
/// Returns [`CoreError::FieldTooLong`] if the trimmed title exceeds 200 characters.
pub fn validate_title(title: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(trimmed) = title.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_LABEL_LEN {
        return Err(CoreError::FieldTooLong {
            field: "title",
            max: MAX_LABEL_LEN,
        });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Resolve the grouping label, falling back to [`DEFAULT_GROUP_LABEL`].
///
/// # Errors
///
/// Returns [`CoreError::BlankField`] for an explicitly supplied blank label, or
/// [`CoreError::FieldTooLong`] when it exceeds 200 characters.
pub fn validate_group_label(label: Option<&str>) -> Result<String, CoreError> {
    let Some(raw) = label else {
        return Ok(DEFAULT_GROUP_LABEL.to_owned());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::BlankField {
            field: "group_label",
        });
    }
    if trimmed.chars().count() > MAX_LABEL_LEN {
        return Err(CoreError::FieldTooLong {
            field: "group_label",
            max: MAX_LABEL_LEN,
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_title_is_none() {
        assert_eq!(validate_title(None), Ok(None));
    }

    #[test]
    fn blank_title_collapses_to_none() {
        assert_eq!(validate_title(Some("   ")), Ok(None));
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(
            validate_title(Some("  Pricing page ")),
            Ok(Some("Pricing page".to_owned()))
        );
    }

    #[test]
    fn overlong_title_is_rejected() {
        let long = "x".repeat(201);
        assert_eq!(
            validate_title(Some(&long)),
            Err(CoreError::FieldTooLong {
                field: "title",
                max: 200
            })
        );
    }

    #[test]
    fn missing_group_label_uses_default() {
        assert_eq!(validate_group_label(None), Ok("default".to_owned()));
    }

    #[test]
    fn blank_group_label_is_rejected() {
        assert_eq!(
            validate_group_label(Some(" ")),
            Err(CoreError::BlankField {
                field: "group_label"
            })
        );
    }
}
