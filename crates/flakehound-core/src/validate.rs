//! Input validation for failure records.

use crate::error::ValidationError;
use crate::model::TestFailure;

/// Check that every record carries its required fields.
///
/// Either all records are accepted or the first offending record is named,
/// along with the field that is empty. Never mutates its input. Timestamp
/// validity is enforced by the type: a `DateTime<Utc>` cannot represent an
/// invalid instant, so unparseable timestamps are rejected at the storage
/// boundary before records reach the pipeline.
pub fn validate_failures(failures: &[TestFailure]) -> Result<(), ValidationError> {
    for (index, failure) in failures.iter().enumerate() {
        let missing = if failure.id.is_empty() {
            Some("id")
        } else if failure.test_title.is_empty() {
            Some("testTitle")
        } else if failure.test_file_path.is_empty() {
            Some("testFilePath")
        } else if failure.error_message.is_empty() {
            Some("errorMessage")
        } else {
            None
        };

        if let Some(field) = missing {
            return Err(ValidationError::MissingField {
                index,
                id: failure.id.clone(),
                field,
            });
        }
    }
    Ok(())
}
