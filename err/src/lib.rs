#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("read-only")]
    ReadOnly,
    #[error("no space left")]
    NoSpace,
    #[error("no such entry")]
    NotFound,
    #[error("invalid argument")]
    Invalid,
    #[error("entry already exists")]
    Exists,
    #[error("not a directory")]
    NotDirectory,
    #[error("operation not supported")]
    Unsupported,
    #[error("out of memory")]
    NoMemory,
    #[error("inconsistent directory metadata")]
    Inconsistent,
    #[error("interleave could not be determined")]
    InterleaveUnknown,
    #[error("compressed image is malformed: {0}")]
    MalformedImage(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps to the negative host-errno value the mount bridge and
    /// statfs-facing code are contracted to return.
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::ReadOnly => -libc_errno::EROFS,
            Error::NoSpace => -libc_errno::ENOSPC,
            Error::NotFound => -libc_errno::ENOENT,
            Error::Invalid => -libc_errno::EINVAL,
            Error::Exists => -libc_errno::EEXIST,
            Error::NotDirectory => -libc_errno::ENOTDIR,
            Error::Unsupported => -libc_errno::ENOSYS,
            Error::NoMemory => -libc_errno::ENOMEM,
            Error::Inconsistent | Error::InterleaveUnknown | Error::MalformedImage(_) => {
                -libc_errno::EINVAL
            }
            Error::Io(_) => -libc_errno::EIO,
        }
    }
}

/// A minimal stand-in for the handful of errno values this crate needs,
/// so the error-to-errno mapping does not pull in a whole libc binding
/// for nine constants.
mod libc_errno {
    pub const EIO: i32 = 5;
    pub const ENOMEM: i32 = 12;
    pub const EEXIST: i32 = 17;
    pub const ENOTDIR: i32 = 20;
    pub const EINVAL: i32 = 22;
    pub const ENOSPC: i32 = 28;
    pub const EROFS: i32 = 30;
    pub const ENOSYS: i32 = 38;
    pub const ENOENT: i32 = 2;
}

pub type Result<T> = core::result::Result<T, Error>;
