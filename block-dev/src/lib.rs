//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、光盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 文件系统只通过块设备驱动读写块设备，且每次读写都是完整的一块。

#![no_std]

use core::any::Any;
use core::fmt::{self, Debug, Display};

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any + Debug {
    /// 读取编号为`block_id`的物理块，`buf`的长度必须等于[`BlockDevice::block_size`]
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 写入编号为`block_id`的物理块，`buf`的长度必须等于[`BlockDevice::block_size`]
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;

    /// 物理块的字节数
    fn block_size(&self) -> usize;

    /// 设备的总字节数
    fn total_size(&self) -> usize;

    /// 设备的物理块数
    #[inline]
    fn total_blocks(&self) -> usize {
        self.total_size() / self.block_size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 块编号超出设备范围
    OutOfRange { block_id: usize },
    /// 缓冲区长度与块大小不符
    BadBuffer,
    /// 底层读写失败
    Io,
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { block_id } => write!(f, "block {block_id} is out of range"),
            Self::BadBuffer => f.write_str("buffer length doesn't match the block size"),
            Self::Io => f.write_str("device I/O failed"),
        }
    }
}

impl core::error::Error for DeviceError {}
