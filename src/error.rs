use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcsvError {
    #[error("Input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Input is a directory: {}", path.display())]
    InputIsDirectory { path: PathBuf },

    #[error("Output not writable: {}", path.display())]
    OutputNotWritable { path: PathBuf },

    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Codec error: {0}")]
    CodecInit(String),

    #[error("Corrupt compressed stream at byte {offset}: {reason}")]
    StreamCorrupt { offset: u64, reason: String },

    #[error("Compressed stream truncated at byte {offset}: input ended inside a gzip member")]
    Truncated { offset: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Round-trip mismatch for {}: expected {expected}, got {actual}", path.display())]
    VerifyMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("{op} failed on {}: {source}", describe_paths(input, output.as_deref()))]
    Failed {
        op: &'static str,
        input: PathBuf,
        output: Option<PathBuf>,
        source: Box<GcsvError>,
    },
}

fn describe_paths(input: &Path, output: Option<&Path>) -> String {
    match output {
        Some(output) => format!("{} -> {}", input.display(), output.display()),
        None => input.display().to_string(),
    }
}

impl GcsvError {
    /// Returns a user-friendly suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            GcsvError::InputNotFound { .. } => {
                Some("Check the path exists and spelling is correct.")
            }
            GcsvError::InputIsDirectory { .. } => {
                Some("gcsv works on single files; pass a file path.")
            }
            GcsvError::PermissionDenied { .. } => {
                Some("Check file permissions on the input and output paths.")
            }
            GcsvError::OutputNotWritable { .. } => {
                Some("Check that the output directory exists and you have write permission.")
            }
            GcsvError::StreamCorrupt { .. } => Some(
                "The compressed file is damaged or not a gzip stream. \
                 Output written before the error is incomplete.",
            ),
            GcsvError::Truncated { .. } => Some(
                "The compressed file was cut short. \
                 Output written before the error is incomplete.",
            ),
            GcsvError::InvalidConfig(_) => {
                Some("See `gcsv --help` for accepted --block-size and --workers ranges.")
            }
            GcsvError::VerifyMismatch { .. } => {
                Some("Round-trip produced different bytes; please report this input.")
            }
            GcsvError::Failed { source, .. } => source.suggestion(),
            _ => None,
        }
    }

    /// Attach the operation and file names to an error raised mid-stream.
    /// Errors that already name their file pass through unchanged.
    pub fn during(self, op: &'static str, input: &Path, output: Option<&Path>) -> Self {
        match self {
            GcsvError::InputNotFound { .. }
            | GcsvError::InputIsDirectory { .. }
            | GcsvError::OutputNotWritable { .. }
            | GcsvError::PermissionDenied { .. }
            | GcsvError::InvalidConfig(_)
            | GcsvError::VerifyMismatch { .. }
            | GcsvError::Failed { .. } => self,
            other => GcsvError::Failed {
                op,
                input: input.to_path_buf(),
                output: output.map(Path::to_path_buf),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any `Failed` context removed.
    pub fn root_cause(&self) -> &GcsvError {
        match self {
            GcsvError::Failed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Map an open/create failure on `path` to the matching variant.
    pub fn from_open(err: std::io::Error, path: &std::path::Path, writing: bool) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound if !writing => GcsvError::InputNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied if writing => GcsvError::OutputNotWritable {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => GcsvError::PermissionDenied {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::NotFound => GcsvError::OutputNotWritable {
                path: path.to_path_buf(),
            },
            _ => GcsvError::Io { source: err },
        }
    }

    /// True for the data-validity failures raised while decoding.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self.root_cause(),
            GcsvError::StreamCorrupt { .. } | GcsvError::Truncated { .. }
        )
    }
}

impl From<rayon::ThreadPoolBuildError> for GcsvError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        GcsvError::Worker(format!("could not build worker pool: {}", err))
    }
}

impl From<serde_json::Error> for GcsvError {
    fn from(err: serde_json::Error) -> Self {
        GcsvError::Io { source: err.into() }
    }
}

/// Box a `GcsvError` into an `io::Error` so it can cross a `Read` boundary.
impl From<GcsvError> for std::io::Error {
    fn from(err: GcsvError) -> Self {
        match err {
            GcsvError::Io { source } => source,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GcsvError>;

/// Recover a `GcsvError` previously boxed into an `io::Error`.
pub fn from_io(err: std::io::Error) -> GcsvError {
    if !err.get_ref().map_or(false, |inner| inner.is::<GcsvError>()) {
        return GcsvError::Io { source: err };
    }
    match err.into_inner().map(|inner| inner.downcast::<GcsvError>()) {
        Some(Ok(gcsv)) => *gcsv,
        _ => GcsvError::Worker("lost wrapped error".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    #[test]
    fn input_not_found_display_and_suggestion() {
        let err = GcsvError::InputNotFound {
            path: PathBuf::from("/tmp/missing.csv"),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Input not found"));
        assert!(msg.contains("missing.csv"));
        assert_eq!(
            err.suggestion(),
            Some("Check the path exists and spelling is correct.")
        );
    }

    #[test]
    fn corrupt_stream_reports_offset() {
        let err = GcsvError::StreamCorrupt {
            offset: 42,
            reason: "bad magic".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("byte 42"));
        assert!(msg.contains("bad magic"));
        assert!(err.is_corruption());
        assert!(err.suggestion().unwrap().contains("incomplete"));
    }

    #[test]
    fn truncated_is_corruption() {
        let err = GcsvError::Truncated { offset: 7 };
        assert!(err.is_corruption());
        assert!(format!("{}", err).contains("truncated"));
    }

    #[test]
    fn from_open_maps_kinds() {
        let path = Path::new("/x/y.csv");
        let err = GcsvError::from_open(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            path,
            false,
        );
        assert!(matches!(err, GcsvError::InputNotFound { .. }));

        let err = GcsvError::from_open(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
            path,
            true,
        );
        assert!(matches!(err, GcsvError::OutputNotWritable { .. }));

        let err = GcsvError::from_open(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
            path,
            false,
        );
        assert!(matches!(err, GcsvError::PermissionDenied { .. }));
    }

    #[test]
    fn io_error_no_suggestion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err: GcsvError = io_err.into();
        assert!(err.suggestion().is_none());
    }

    #[test]
    fn gcsv_error_survives_io_roundtrip() {
        let err = GcsvError::Truncated { offset: 99 };
        let io_err: std::io::Error = err.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidData);
        match from_io(io_err) {
            GcsvError::Truncated { offset } => assert_eq!(offset, 99),
            other => panic!("Expected Truncated, got: {:?}", other),
        }
    }

    #[test]
    fn context_names_operation_and_files() {
        let err = GcsvError::Truncated { offset: 12 }.during(
            "decompress",
            Path::new("/data/q1.gcsv"),
            Some(Path::new("/data/q1.csv")),
        );
        let msg = format!("{}", err);
        assert!(msg.starts_with("decompress failed on /data/q1.gcsv -> /data/q1.csv"));
        assert!(msg.contains("truncated at byte 12"));
        assert!(err.is_corruption());
        assert!(err.suggestion().unwrap().contains("cut short"));
        assert!(matches!(err.root_cause(), GcsvError::Truncated { offset: 12 }));
    }

    #[test]
    fn context_skips_errors_that_already_name_a_file() {
        let err = GcsvError::InputNotFound {
            path: PathBuf::from("a.csv"),
        }
        .during("compress", Path::new("a.csv"), Some(Path::new("a.gcsv")));
        assert!(matches!(err, GcsvError::InputNotFound { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = GcsvError::from(io).during("compress", Path::new("a.csv"), None);
        assert_eq!(format!("{}", err), "compress failed on a.csv: I/O error: disk full");
    }

    #[test]
    fn plain_io_error_stays_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        match from_io(io_err) {
            GcsvError::Io { source } => assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("Expected Io, got: {:?}", other),
        }
    }
}
