use image::ImageError;

/// Error type for every fallible operation in the crate.
///
/// Each variant carries a message that can be shown to the user as-is; the
/// UI shell only has to display `to_string()`.
#[derive(Debug)]
pub enum BoardError {
    /// Source image could not be decoded (corrupt or unsupported format).
    Decode(ImageError),
    /// Input rejected before processing (bad dimensions, bad arguments).
    InvalidInput(String),
    /// Malformed hex color string.
    InvalidColor(String),
    /// JSON encode/decode failure at the save or file boundary.
    Json(String),
    Io(std::io::Error),
    /// Pre-save checks failed (empty drawing, blank title).
    Validation(String),
    /// The backend answered `success: false`.
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardError::Decode(e) => write!(f, "Could not decode image: {}", e),
            BoardError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            BoardError::InvalidColor(e) => write!(f, "Invalid color: {}", e),
            BoardError::Json(e) => write!(f, "JSON error: {}", e),
            BoardError::Io(e) => write!(f, "I/O error: {}", e),
            BoardError::Validation(e) => write!(f, "{}", e),
            BoardError::Rejected(e) => write!(f, "Design save failed: {}", e),
        }
    }
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoardError::Decode(e) => Some(e),
            BoardError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for BoardError {
    fn from(e: ImageError) -> Self {
        BoardError::Decode(e)
    }
}

impl From<std::io::Error> for BoardError {
    fn from(e: std::io::Error) -> Self {
        BoardError::Io(e)
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        BoardError::Json(e.to_string())
    }
}
