use core::fmt::{self, Display};

use block_dev::DeviceError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    NotMounted,
    AlreadyMounted,
    /// 句柄越界或未被使用
    InvalidHandle,
    NotFound,
    /// 没有空闲的索引节点
    TableFull,
    /// 没有空闲的块
    OutOfSpace,
    /// 逻辑块超出直接索引与一级索引的范围
    FileTooLarge,
    /// 读到了从未写过的块
    HoleInFile,
    InvalidName,
    /// 超级块无效或其描述的布局不可能成立
    InvalidSuperBlock,
    /// 无法在该设备上格式化出文件系统
    InvalidGeometry,
    Device(DeviceError),

    BadDescriptor,
    TooManyOpenFiles,
    AlreadyOpen,
    PermissionDenied,
    InvalidMode,
    InvalidSeek,
    TooManyBytes,
    EndOfFile,
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotMounted => "file system is not mounted",
            Self::AlreadyMounted => "file system is already mounted",
            Self::InvalidHandle => "invalid inode handle",
            Self::NotFound => "no such file",
            Self::TableFull => "inode table is full",
            Self::OutOfSpace => "no free block left",
            Self::FileTooLarge => "file too large",
            Self::HoleInFile => "read from a block that was never written",
            Self::InvalidName => "invalid file name",
            Self::InvalidSuperBlock => "invalid superblock",
            Self::InvalidGeometry => "device can't hold a file system with this geometry",
            Self::Device(e) => return write!(f, "device error: {e}"),
            Self::BadDescriptor => "bad file descriptor",
            Self::TooManyOpenFiles => "too many open files",
            Self::AlreadyOpen => "file is already open",
            Self::PermissionDenied => "operation not permitted by open mode",
            Self::InvalidMode => "invalid open mode",
            Self::InvalidSeek => "seek before the start of file",
            Self::TooManyBytes => "too many bytes for a single call",
            Self::EndOfFile => "end of file",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
