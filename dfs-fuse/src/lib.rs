
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError};

/// 物理块的字节数，与常见磁盘的扇区一致
pub const SECTOR_SIZE: usize = 512;

/// 以宿主机上的文件模拟块设备
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    total_size: usize,
}

impl BlockFile {
    /// 文件的长度即设备的容量，多出的不足一块的部分被忽略
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len() as usize;
        Ok(Self {
            file: Mutex::new(file),
            total_size: len / SECTOR_SIZE * SECTOR_SIZE,
        })
    }

    fn locate(&self, block_id: usize, len: usize) -> Result<u64, DeviceError> {
        if len != SECTOR_SIZE {
            return Err(DeviceError::BadBuffer);
        }
        if (block_id + 1) * SECTOR_SIZE > self.total_size {
            return Err(DeviceError::OutOfRange { block_id });
        }
        Ok((block_id * SECTOR_SIZE) as u64)
    }
}

fn io_error(block_id: usize) -> impl FnOnce(io::Error) -> DeviceError {
    move |e| {
        log::error!("block {block_id}: {e}");
        DeviceError::Io
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let pos = self.locate(block_id, buf.len())?;
        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        file.seek(SeekFrom::Start(pos)).map_err(io_error(block_id))?;
        file.read_exact(buf).map_err(io_error(block_id))
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let pos = self.locate(block_id, buf.len())?;
        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        file.seek(SeekFrom::Start(pos)).map_err(io_error(block_id))?;
        file.write_all(buf).map_err(io_error(block_id))
    }

    fn block_size(&self) -> usize {
        SECTOR_SIZE
    }

    fn total_size(&self) -> usize {
        self.total_size
    }
}
