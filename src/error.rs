use reqwest::StatusCode;

/// Coarse classification of a failed bundle service response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Permission,
    Authorization,
    NotFound,
    Usage,
    Server,
}

impl ServiceErrorKind {
    /// Most specific codes first; any other 4xx is a usage error.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::FORBIDDEN => Self::Permission,
            StatusCode::UNAUTHORIZED => Self::Authorization,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::BAD_REQUEST => Self::Usage,
            s if s.is_client_error() => Self::Usage,
            _ => Self::Server,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Request to {url} failed: {message}")]
    MetadataCreation { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    ContentUpload { url: String, message: String },

    #[error("Failed to read {name}: {source}")]
    ReadFile {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to {url} failed: response did not contain a bundle id")]
    MissingBundleId { url: String },
}

impl UploadError {
    /// Text shown to the user in the blocking alert.
    pub fn alert_text(&self) -> String {
        self.to_string()
    }
}
