//! # 索引节点表
//!
//! 固定容量的索引节点数组，句柄即数组下标。
//! 槽位以`Option`区分是否使用，不依赖字段恰好为零。

use alloc::vec;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};

use crate::layout::{INODE_SIZE, Inode};
use crate::{Error, MAX_FILENAME_LENGTH, Result};

/// 文件句柄，即索引节点在表中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeTable {
    slots: Vec<Option<Inode>>,
}

impl InodeTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// 从索引节点区域的连续字节中解码出`count`个索引节点
    pub fn decode(bytes: &[u8], count: usize) -> Self {
        Self {
            slots: bytes
                .chunks(INODE_SIZE)
                .take(count)
                .map(Inode::decode)
                .collect(),
        }
    }

    /// 编码为`len`字节（索引节点区域的大小），空闲槽位全部为零
    pub fn encode(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0; len.max(self.slots.len() * INODE_SIZE)];
        for (slot, record) in self.slots.iter().zip(bytes.chunks_mut(INODE_SIZE)) {
            if let Some(inode) = slot {
                inode.encode(record);
            }
        }
        bytes.truncate(len);
        bytes
    }

    pub fn find(&self, name: &str) -> Option<Handle> {
        self.iter()
            .find_map(|(handle, inode)| (inode.name == name).then_some(handle))
    }

    /// 文件存在则返回其句柄，否则占用第一个空闲槽位。
    /// 第二个返回值表示是否新建了文件。
    pub fn open_or_create(&mut self, name: &str) -> Result<(Handle, bool)> {
        if let Some(handle) = self.find(name) {
            return Ok((handle, false));
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TableFull)?;
        self.slots[index] = Some(Inode::new(name));

        Ok((Handle(index as u32), true))
    }

    pub fn get(&self, handle: Handle) -> Result<&Inode> {
        self.slots
            .get(handle.index())
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Inode> {
        self.slots
            .get_mut(handle.index())
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    /// 释放槽位，交出索引节点以便回收其数据块
    pub fn release(&mut self, handle: Handle) -> Result<Inode> {
        self.slots
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(Error::InvalidHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Inode)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|inode| (Handle(i as u32), inode)))
    }
}

/// 文件名非空、不含 NUL，且连同结尾的 NUL 放得进索引节点
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_FILENAME_LENGTH || name.contains('\0') {
        return Err(Error::InvalidName);
    }
    Ok(())
}
