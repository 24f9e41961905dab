use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IoError,
    NoSpace,
    NotFound,
    NotDirectory,
    IsDirectory,
    InvalidArgument,
    NameTooLong,
    AlreadyExists,
    NotEmpty,
    FileTooLarge,
    NotMounted,
    InvalidHandle,
    Corrupted,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::IoError => "device i/o error",
            FsError::NoSpace => "no space left on device",
            FsError::NotFound => "no such file or directory",
            FsError::NotDirectory => "not a directory",
            FsError::IsDirectory => "is a directory",
            FsError::InvalidArgument => "invalid argument",
            FsError::NameTooLong => "file name too long",
            FsError::AlreadyExists => "file exists",
            FsError::NotEmpty => "directory not empty",
            FsError::FileTooLarge => "file too large",
            FsError::NotMounted => "filesystem not mounted",
            FsError::InvalidHandle => "stale or unknown entry handle",
            FsError::Corrupted => "on-disk structure is corrupted",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for FsError {}

impl From<std::io::Error> for FsError {
    fn from(_: std::io::Error) -> Self {
        FsError::IoError
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
