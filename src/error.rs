use thiserror::Error;

pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Registry or migration service unreachable, or it answered with something unreadable
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Malformed schema {url}: {reason}")]
    MalformedSchema { url: String, reason: String },

    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Unsupported file '{0}', expected one of .yaml, .yml or .xlsx")]
    UnsupportedFile(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TemplateError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed_schema(url: &str, reason: impl ToString) -> Self {
        Self::MalformedSchema {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure should be reported back to the uploader as their fault
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TemplateError::MalformedUpload(_) | TemplateError::UnsupportedFile(_)
        )
    }
}

impl From<calamine::XlsxError> for TemplateError {
    fn from(err: calamine::XlsxError) -> Self {
        TemplateError::Workbook(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for TemplateError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        TemplateError::Workbook(err.to_string())
    }
}

impl From<config::ConfigError> for TemplateError {
    fn from(err: config::ConfigError) -> Self {
        TemplateError::Config(err.to_string())
    }
}
