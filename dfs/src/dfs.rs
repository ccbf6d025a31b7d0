//! # 文件系统层
//!
//! 挂载时把超级块、索引节点表与空闲块位图整体读入内存，
//! 此后的操作只改动内存副本与数据块，卸载时再整体写回。
//!
//! 两把锁分别保护索引节点表与空闲块位图，任何时候都不会同时持有两把锁。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::block::{BlockAdapter, BlockId};
use crate::inode_table::{Handle, InodeTable, check_name};
use crate::layout::{FreeBlockVector, IndirectBlock, SuperBlock};
use crate::translate;
use crate::{DEFAULT_BLOCK_SIZE, DEFAULT_NUM_INODES, SUPERBLOCK_PHYSICAL_BLOCK};
use crate::{Error, Result};

/// 格式化参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// 文件系统块的字节数
    pub block_size: usize,
    pub num_inodes: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            num_inodes: DEFAULT_NUM_INODES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub handle: Handle,
    pub name: String,
    pub size: u32,
}

#[derive(Debug)]
pub struct Dfs {
    pub(crate) disk: BlockAdapter,
    /// 内存中的超级块，仅在挂载期间有效
    pub(crate) super_block: SuperBlock,
    pub(crate) inodes: Mutex<InodeTable>,
    pub(crate) fbv: Mutex<FreeBlockVector>,
}

impl Dfs {
    /// 未挂载的文件系统
    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            disk: BlockAdapter::new(dev),
            super_block: SuperBlock::default(),
            inodes: Mutex::new(InodeTable::new(0)),
            fbv: Mutex::new(FreeBlockVector::new(0, 0)),
        }
    }

    /// 在设备上写入初始布局：清空引导记录与索引节点区域，
    /// 位图中只有元数据块被标记为已分配，最后写入有效的超级块。
    pub fn format(dev: &Arc<dyn BlockDevice>, options: FormatOptions) -> Result<SuperBlock> {
        let sb = SuperBlock::layout(
            dev.block_size(),
            dev.total_size(),
            options.block_size,
            options.num_inodes,
        )?;
        let block_size = sb.block_size as usize;

        let mut disk = BlockAdapter::new(dev.clone());
        disk.set_block_size(block_size);

        // 格式化期间磁盘上的超级块始终无效
        disk.write(BlockId::new(0), &vec![0; block_size])?;
        store_super_block(&disk, &sb)?;
        disk.write_region(sb.inode_start, &vec![0; sb.inode_blocks() * block_size])?;
        let fbv = FreeBlockVector::new(sb.num_blocks, sb.data_start);
        disk.write_region(sb.fbv_start, &fbv.encode(sb.fbv_blocks() * block_size))?;

        let sb = SuperBlock { valid: true, ..sb };
        store_super_block(&disk, &sb)?;

        log::info!(
            "formatted: {} blocks of {} bytes, inodes {}..{}, fbv {}..{}, data {}..{}",
            sb.num_blocks,
            sb.block_size,
            sb.inode_start,
            sb.fbv_start,
            sb.fbv_start,
            sb.data_start,
            sb.data_start,
            sb.num_blocks,
        );

        Ok(sb)
    }

    /// 把元数据读入内存。
    /// 读完后立刻在磁盘上把超级块标记为无效，直到卸载时写回全部元数据。
    pub fn mount(&mut self) -> Result<()> {
        if self.super_block.valid {
            return Err(Error::AlreadyMounted);
        }

        let sb = load_super_block(&self.disk)?;
        if !sb.valid {
            log::warn!("superblock on disk is marked invalid");
            return Err(Error::InvalidSuperBlock);
        }
        if let Err(e) = sb.check(self.disk.physical_block_size(), self.disk.total_size()) {
            log::warn!("superblock describes an impossible layout: {sb:?}");
            return Err(e);
        }

        self.disk.set_block_size(sb.block_size as usize);
        let inode_bytes = self.disk.read_region(sb.inode_start, sb.inode_blocks())?;
        let fbv_bytes = self.disk.read_region(sb.fbv_start, sb.fbv_blocks())?;

        store_super_block(&self.disk, &SuperBlock { valid: false, ..sb })?;

        *self.inodes.get_mut() = InodeTable::decode(&inode_bytes, sb.num_inodes as usize);
        *self.fbv.get_mut() = FreeBlockVector::decode(&fbv_bytes, sb.num_blocks);
        self.super_block = SuperBlock { valid: true, ..sb };

        log::info!(
            "mounted: {} blocks of {} bytes, {} inodes",
            sb.num_blocks,
            sb.block_size,
            sb.num_inodes
        );
        Ok(())
    }

    /// 把内存中的索引节点表与位图写回磁盘，最后写入有效的超级块。
    /// 这是唯一保证持久化的时刻。
    pub fn unmount(&mut self) -> Result<()> {
        self.check_mounted()?;

        let on_disk = load_super_block(&self.disk)?;
        if !on_disk.same_geometry(&self.super_block) {
            log::warn!("superblock on disk changed while mounted: {on_disk:?}");
            return Err(Error::InvalidSuperBlock);
        }

        let sb = self.super_block;
        let block_size = sb.block_size as usize;
        store_super_block(&self.disk, &SuperBlock { valid: false, ..sb })?;

        let inode_bytes = self.inodes.get_mut().encode(sb.inode_blocks() * block_size);
        self.disk.write_region(sb.inode_start, &inode_bytes)?;
        let fbv_bytes = self.fbv.get_mut().encode(sb.fbv_blocks() * block_size);
        self.disk.write_region(sb.fbv_start, &fbv_bytes)?;

        store_super_block(&self.disk, &SuperBlock { valid: true, ..sb })?;
        self.super_block.valid = false;

        log::info!("unmounted");
        Ok(())
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.super_block.valid
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.super_block.block_size as usize
    }

    /// 单个文件的字节数上限
    #[inline]
    pub fn max_file_size(&self) -> usize {
        translate::max_blocks(self.block_size()) * self.block_size()
    }

    pub fn find(&self, name: &str) -> Result<Handle> {
        self.check_mounted()?;
        self.inodes.lock().find(name).ok_or(Error::NotFound)
    }

    /// 文件存在则打开，否则新建一个空文件
    pub fn open(&self, name: &str) -> Result<Handle> {
        self.check_mounted()?;
        check_name(name)?;

        let (handle, created) = self.inodes.lock().open_or_create(name)?;
        if created {
            log::debug!("created {name:?} at inode {handle}");
        }
        Ok(handle)
    }

    /// 删除文件并回收它的全部数据块与索引块
    pub fn delete(&self, handle: Handle) -> Result<()> {
        self.check_mounted()?;

        // 先读出一级索引块，读失败时文件保持原样
        let indirect = self.inodes.lock().get(handle)?.indirect.get();
        let table = match indirect {
            Some(id) => Some(self.load_indirect(id)?),
            None => None,
        };

        let inode = self.inodes.lock().release(handle)?;
        debug_assert_eq!(indirect, inode.indirect.get());
        log::debug!("deleted {:?} at inode {handle}", inode.name);

        // 索引节点锁已释放，再回收数据块
        if let (Some(id), Some(table)) = (indirect, table) {
            table.assigned().for_each(|block| self.free_block(block));
            self.free_block(id);
        }
        inode
            .direct
            .iter()
            .filter_map(|ptr| ptr.get())
            .for_each(|block| self.free_block(block));

        Ok(())
    }

    pub fn size(&self, handle: Handle) -> Result<u32> {
        self.check_mounted()?;
        Ok(self.inodes.lock().get(handle)?.size)
    }

    /// 全部正在使用的文件
    pub fn entries(&self) -> Result<Vec<FileInfo>> {
        self.check_mounted()?;
        Ok(self
            .inodes
            .lock()
            .iter()
            .map(|(handle, inode)| FileInfo {
                handle,
                name: inode.name.clone(),
                size: inode.size,
            })
            .collect())
    }

    pub fn free_blocks(&self) -> Result<usize> {
        self.check_mounted()?;
        Ok(self.fbv.lock().free_count())
    }

    /// 从`offset`开始读满`buf`。
    /// 途经从未写过的块则整个调用失败，不返回部分结果。
    pub fn read(&self, handle: Handle, offset: u32, buf: &mut [u8]) -> Result<usize> {
        self.check_mounted()?;
        self.inodes.lock().get(handle)?;

        let block_size = self.block_size();
        let start = offset as usize;
        let end = start + buf.len(); // exclusive

        let mut block = vec![0; block_size];
        let mut pos = start;
        let mut read_size = 0;
        while pos < end {
            let block_index = pos / block_size;
            let inner = pos % block_size;
            let block_read_size = (block_size - inner).min(end - pos);

            let id = self
                .translate(handle, block_index)?
                .ok_or(Error::HoleInFile)?;
            self.disk.read(id, &mut block)?;
            buf[read_size..read_size + block_read_size]
                .copy_from_slice(&block[inner..inner + block_read_size]);

            pos += block_read_size;
            read_size += block_read_size;
        }

        Ok(read_size)
    }

    /// 从`offset`开始写入`data`，按需分配数据块与索引块。
    /// 只覆盖块的一部分时，先读出旧内容以保留未覆盖的字节；
    /// 新分配的块未覆盖的部分为零。
    pub fn write(&self, handle: Handle, offset: u32, data: &[u8]) -> Result<usize> {
        self.check_mounted()?;
        self.inodes.lock().get(handle)?;

        let block_size = self.block_size();
        let start = offset as usize;
        // 文件大小以 u32 记录
        let end = start
            .checked_add(data.len())
            .filter(|&end| end <= self.max_file_size() && end <= u32::MAX as usize)
            .ok_or(Error::FileTooLarge)?; // exclusive

        let mut block = vec![0; block_size];
        let mut pos = start;
        let mut written_size = 0;
        while pos < end {
            let block_index = pos / block_size;
            let inner = pos % block_size;
            let block_write_size = (block_size - inner).min(end - pos);
            let src = &data[written_size..written_size + block_write_size];

            block.fill(0);
            block[inner..inner + block_write_size].copy_from_slice(src);
            let (id, fresh) = self.allocate_virtual(handle, block_index, &block)?;
            if !fresh {
                if block_write_size < block_size {
                    self.disk.read(id, &mut block)?;
                    block[inner..inner + block_write_size].copy_from_slice(src);
                }
                self.disk.write(id, &block)?;
            }

            pos += block_write_size;
            written_size += block_write_size;
        }

        let mut inodes = self.inodes.lock();
        let inode = inodes.get_mut(handle)?;
        inode.size = inode.size.max(end as u32);

        Ok(written_size)
    }

    /// 查询块是否已分配，仅供核对，分配与释放一律在位图锁内进行
    pub fn is_allocated(&self, id: BlockId) -> bool {
        self.fbv.lock().is_allocated(id)
    }

    #[inline]
    pub(crate) fn check_mounted(&self) -> Result<()> {
        if self.super_block.valid {
            Ok(())
        } else {
            Err(Error::NotMounted)
        }
    }

    /// 分配编号最小的空闲块
    pub(crate) fn alloc_block(&self) -> Result<BlockId> {
        self.check_mounted()?;
        match self.fbv.lock().alloc() {
            Some(id) => {
                log::debug!("alloc block {id}");
                Ok(id)
            }
            None => {
                log::warn!("run out of free blocks");
                Err(Error::OutOfSpace)
            }
        }
    }

    /// 只在挂载期间由删除与分配失败的回退路径调用
    pub(crate) fn free_block(&self, id: BlockId) {
        debug_assert!(self.super_block.valid, "free block {id} while not mounted");
        log::debug!("free block {id}");
        self.fbv.lock().free(id);
    }

    pub(crate) fn load_indirect(&self, id: BlockId) -> Result<IndirectBlock> {
        let mut bytes = vec![0; self.block_size()];
        self.disk.read(id, &mut bytes)?;
        Ok(IndirectBlock::from_bytes(bytes))
    }
}

fn load_super_block(disk: &BlockAdapter) -> Result<SuperBlock> {
    let buf = disk.read_physical(SUPERBLOCK_PHYSICAL_BLOCK)?;
    Ok(SuperBlock::decode(&buf))
}

fn store_super_block(disk: &BlockAdapter, sb: &SuperBlock) -> Result<()> {
    let mut buf = vec![0; disk.physical_block_size()];
    sb.encode(&mut buf);
    disk.write_physical(SUPERBLOCK_PHYSICAL_BLOCK, &buf)
}
