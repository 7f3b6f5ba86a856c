//! Loader errors and the integer status codes they map to.

use std::path::PathBuf;

use thiserror::Error;

/// Status code of a successful load.
pub const LOAD_OK: i32 = 0;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to parse model: {0}")]
    Parse(String),
    #[error("object '{0}' not found in model")]
    ObjectNotFound(String),
    #[error("invalid model data: {0}")]
    InvalidData(String),
    #[error("unsupported model format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("animation '{0}' not found in model")]
    AnimationNotFound(String),
    #[error("skin has {count} bones, limit is {max}")]
    TooManyBones { count: usize, max: usize },
}

pub type LoadResult<T> = Result<T, LoadError>;

impl LoadError {
    /// Non-zero status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::FileNotFound(_) => 1,
            Self::Parse(_) => 2,
            Self::ObjectNotFound(_) => 3,
            Self::InvalidData(_) => 4,
            Self::UnsupportedFormat(_) => 5,
            Self::AnimationNotFound(_) => 6,
            Self::TooManyBones { .. } => 7,
        }
    }
}

impl From<gltf::Error> for LoadError {
    fn from(err: gltf::Error) -> Self {
        match err {
            gltf::Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Self::Parse(format!("missing external resource: {io}"))
            }
            other => Self::Parse(other.to_string()),
        }
    }
}

/// Status code of any load result: [`LOAD_OK`] or [`LoadError::code`].
pub fn status_code<T>(result: &LoadResult<T>) -> i32 {
    match result {
        Ok(_) => LOAD_OK,
        Err(err) => err.code(),
    }
}
