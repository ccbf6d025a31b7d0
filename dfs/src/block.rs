//! 文件系统块的抽象
//!
//! 文件系统块是 DFS 的分配单位，大小为物理块的整数倍；
//! 读写一个文件系统块即按顺序读写它所覆盖的全部物理块。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockDevice, DeviceError};
use derive_more::{Display, From, Into};

use crate::Result;

/// 文件系统块号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// 块适配器：把文件系统块映射到物理块上，除此之外不做任何事
#[derive(Debug)]
pub struct BlockAdapter {
    dev: Arc<dyn BlockDevice>,
    /// 文件系统块的字节数
    block_size: usize,
}

impl BlockAdapter {
    /// 挂载前文件系统块大小未知，暂时视作与物理块等大
    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        let block_size = dev.block_size();
        Self { dev, block_size }
    }

    #[inline]
    pub fn set_block_size(&mut self, block_size: usize) {
        debug_assert_eq!(block_size % self.dev.block_size(), 0);
        self.block_size = block_size;
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn physical_block_size(&self) -> usize {
        self.dev.block_size()
    }

    #[inline]
    pub fn total_size(&self) -> usize {
        self.dev.total_size()
    }

    /// 一个文件系统块包含多少个物理块
    #[inline]
    pub fn ratio(&self) -> usize {
        self.block_size / self.dev.block_size()
    }

    pub fn read(&self, id: BlockId, buf: &mut [u8]) -> Result<()> {
        if buf.len() != self.block_size {
            return Err(DeviceError::BadBuffer.into());
        }

        let first = id.index() * self.ratio();
        for (i, chunk) in buf.chunks_mut(self.dev.block_size()).enumerate() {
            self.dev.read_block(first + i, chunk)?;
        }

        Ok(())
    }

    pub fn write(&self, id: BlockId, buf: &[u8]) -> Result<()> {
        if buf.len() != self.block_size {
            return Err(DeviceError::BadBuffer.into());
        }

        let first = id.index() * self.ratio();
        for (i, chunk) in buf.chunks(self.dev.block_size()).enumerate() {
            self.dev.write_block(first + i, chunk)?;
        }

        Ok(())
    }

    /// 连续读出从`start`开始的`count`个文件系统块
    pub fn read_region(&self, start: u32, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0; count * self.block_size];
        for (i, chunk) in bytes.chunks_mut(self.block_size).enumerate() {
            self.read(BlockId::new(start + i as u32), chunk)?;
        }

        Ok(bytes)
    }

    /// 把`bytes`连续写入从`start`开始的文件系统块，`bytes`须按块对齐
    pub fn write_region(&self, start: u32, bytes: &[u8]) -> Result<()> {
        debug_assert_eq!(bytes.len() % self.block_size, 0);
        for (i, chunk) in bytes.chunks(self.block_size).enumerate() {
            self.write(BlockId::new(start + i as u32), chunk)?;
        }

        Ok(())
    }

    pub fn read_physical(&self, block_id: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; self.dev.block_size()];
        self.dev.read_block(block_id, &mut buf)?;
        Ok(buf)
    }

    pub fn write_physical(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        Ok(self.dev.write_block(block_id, buf)?)
    }
}
