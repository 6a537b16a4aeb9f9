use thiserror::Error;

/// Convenient result alias for the DEIMOS library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a simulation input fails validation.
    #[error("invalid parameter {field}: {message}")]
    InvalidParameter {
        field: &'static str,
        message: String,
    },

    /// Raised when terrain or landform metadata cannot be retrieved for a site.
    #[error("geodata unavailable: {message}")]
    GeoDataUnavailable { message: String },

    /// Raised when a country population density lookup fails.
    #[error("population density unavailable for {country_code}: {message}")]
    PopulationDensityUnavailable {
        country_code: String,
        message: String,
    },

    /// Raised when an SBDB catalog request fails or returns an unusable payload.
    #[error("catalog request failed: {message}")]
    Catalog { message: String },

    /// Raised when a requested catalog object does not exist.
    #[error("catalog object not found: {designation}")]
    CatalogObjectNotFound { designation: String },

    /// No suitable cache directory could be resolved for catalog downloads.
    #[error("failed to resolve cache directories for catalog data")]
    CacheDirsUnavailable,

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an [`Error::InvalidParameter`] with a formatted message.
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            field,
            message: message.into(),
        }
    }
}
