//! # 地址转换层
//!
//! 文件内的逻辑块按序编号，前 [`DIRECT_COUNT`] 块直接记录在索引节点中，
//! 其余的记录在一级索引块里：
//!
//! - 逻辑块 `i < DIRECT_COUNT`：`direct[i]`
//! - 逻辑块 `DIRECT_COUNT <= i < DIRECT_COUNT + 块大小 / 4`：一级索引块的第 `i - DIRECT_COUNT` 项
//!
//! 只支持一级间接索引，再往后的逻辑块一律视为文件过大。

use crate::block::BlockId;
use crate::inode_table::Handle;
use crate::layout::{BlockPtr, IndirectBlock, Inode};
use crate::{DIRECT_COUNT, Dfs, Error, Result};

/// 单个文件最多拥有的数据块数
#[inline]
pub const fn max_blocks(block_size: usize) -> usize {
    DIRECT_COUNT + IndirectBlock::capacity(block_size)
}

/// 逻辑块在索引节点中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Direct(usize),
    Indirect(usize),
}

impl Slot {
    fn locate(block_index: usize, block_size: usize) -> Result<Self> {
        if block_index < DIRECT_COUNT {
            Ok(Self::Direct(block_index))
        } else if block_index < max_blocks(block_size) {
            // 剔去直接索引的部分
            Ok(Self::Indirect(block_index - DIRECT_COUNT))
        } else {
            Err(Error::FileTooLarge)
        }
    }
}

impl Dfs {
    /// 逻辑块对应的文件系统块，未分配则返回空
    pub(crate) fn translate(&self, handle: Handle, block_index: usize) -> Result<Option<BlockId>> {
        match Slot::locate(block_index, self.block_size())? {
            Slot::Direct(i) => Ok(self.inodes.lock().get(handle)?.direct[i].get()),
            Slot::Indirect(i) => {
                let Some(indirect) = self.inodes.lock().get(handle)?.indirect.get() else {
                    return Ok(None);
                };
                Ok(self.load_indirect(indirect)?.get(i).get())
            }
        }
    }

    /// 逻辑块对应的文件系统块，未分配则立即分配。
    ///
    /// 新块先写入`init`，成功后才登记到索引节点或一级索引块中，
    /// 因此失败时文件不会指向内容未知的块。
    /// 第二个返回值表示是否是新分配的块，即块中已是`init`。
    pub(crate) fn allocate_virtual(
        &self,
        handle: Handle,
        block_index: usize,
        init: &[u8],
    ) -> Result<(BlockId, bool)> {
        match Slot::locate(block_index, self.block_size())? {
            Slot::Direct(i) => self.claim(handle, init, |inode| &mut inode.direct[i]),
            Slot::Indirect(i) => {
                let empty = IndirectBlock::new(self.block_size());
                let (indirect, fresh) =
                    self.claim(handle, empty.as_bytes(), |inode| &mut inode.indirect)?;
                let mut table = if fresh {
                    empty
                } else {
                    self.load_indirect(indirect)?
                };

                if let Some(id) = table.get(i).get() {
                    return Ok((id, false));
                }

                let id = self.fill_new_block(init)?;
                table.set(i, id.into());
                // 索引项一旦改变就写回磁盘
                if let Err(e) = self.disk.write(indirect, table.as_bytes()) {
                    self.free_block(id);
                    return Err(e);
                }

                Ok((id, true))
            }
        }
    }

    /// 取得索引节点中某个指针槽位所指的块，槽位为空时分配新块、写入`init`后填入。
    ///
    /// 分配时不持有索引节点锁；若期间槽位已被填上，则退还新块。
    fn claim(
        &self,
        handle: Handle,
        init: &[u8],
        slot: impl Fn(&mut Inode) -> &mut BlockPtr,
    ) -> Result<(BlockId, bool)> {
        let current = slot(self.inodes.lock().get_mut(handle)?).get();
        if let Some(id) = current {
            return Ok((id, false));
        }

        let id = self.fill_new_block(init)?;
        let outcome = self.inodes.lock().get_mut(handle).map(|inode| {
            let ptr = slot(inode);
            match ptr.get() {
                Some(existing) => Some(existing),
                None => {
                    *ptr = id.into();
                    None
                }
            }
        });

        match outcome {
            Ok(None) => Ok((id, true)),
            Ok(Some(existing)) => {
                self.free_block(id);
                Ok((existing, false))
            }
            Err(e) => {
                self.free_block(id);
                Err(e)
            }
        }
    }

    /// 分配一个块并写入`init`，写失败则立即退还
    fn fill_new_block(&self, init: &[u8]) -> Result<BlockId> {
        let id = self.alloc_block()?;
        if let Err(e) = self.disk.write(id, init) {
            self.free_block(id);
            return Err(e);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots() {
        assert_eq!(266, max_blocks(1024));
        assert_eq!(Ok(Slot::Direct(9)), Slot::locate(9, 1024));
        assert_eq!(Ok(Slot::Indirect(0)), Slot::locate(10, 1024));
        assert_eq!(Ok(Slot::Indirect(255)), Slot::locate(265, 1024));
        assert_eq!(Err(Error::FileTooLarge), Slot::locate(266, 1024));
        assert_eq!(Err(Error::FileTooLarge), Slot::locate(138, 512));
    }
}
