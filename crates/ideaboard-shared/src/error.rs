use thiserror::Error;

/// A single offending field in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// One or more request fields failed validation.
///
/// Displays as `field: message` pairs joined by `, `, the format the HTTP
/// layer returns verbatim in its `error` body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", format_fields(.0))]
pub struct ValidationError(pub Vec<FieldError>);

impl ValidationError {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field,
            message: message.into(),
        }])
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}
