use miette::Diagnostic;
use thiserror::Error;

/// Main error type for gridslice operations
#[derive(Error, Diagnostic, Debug)]
pub enum GridError {
    #[error("IO error: {0}")]
    #[diagnostic(code(gridslice::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(gridslice::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Parse error: {message}")]
    #[diagnostic(code(gridslice::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid grid geometry: {message}")]
    #[diagnostic(code(gridslice::geometry))]
    InvalidGeometry {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to decode {path} for export: {message}")]
    #[diagnostic(
        code(gridslice::export::decode),
        help("Export aborted; no files were written")
    )]
    ExportDecode {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Export error: {message}")]
    #[diagnostic(code(gridslice::export))]
    Export {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Validation failed: {errors} error(s) in {files} file(s)")]
    #[diagnostic(
        code(gridslice::validate),
        help("Fix the errors listed above and run again")
    )]
    Validation { errors: usize, files: usize },

    #[error("Map record error: {message}")]
    #[diagnostic(code(gridslice::persistence))]
    Persistence {
        message: String,
        #[help]
        help: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, GridError>;
