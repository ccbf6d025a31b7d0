//! 索引节点与间接索引块
//!
//! 索引节点在磁盘上占 128 字节：
//!
//! | 偏移 | 字段 |
//! |---|---|
//! | 0 | 是否使用 |
//! | 4 | 文件大小 |
//! | 8 | 文件名，以 NUL 结尾 |
//! | 80 | 10 个直接索引 |
//! | 120 | 一级间接索引 |
//! | 124 | 保留 |
//!
//! 块编号 0 属于引导记录，不可能分配给文件，因此磁盘上以 0 表示未分配。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::{get_u32, put_u32};
use crate::{BlockId, DIRECT_COUNT, MAX_FILENAME_LENGTH};

pub const INODE_SIZE: usize = 128;

const NAME_OFFSET: usize = 8;
const DIRECT_OFFSET: usize = NAME_OFFSET + MAX_FILENAME_LENGTH;
const INDIRECT_OFFSET: usize = DIRECT_OFFSET + DIRECT_COUNT * 4;

/// 块指针
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPtr {
    #[default]
    Unassigned,
    Assigned(BlockId),
}

impl BlockPtr {
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Unassigned,
            id => Self::Assigned(BlockId::new(id)),
        }
    }

    #[inline]
    pub fn raw(self) -> u32 {
        match self {
            Self::Unassigned => 0,
            Self::Assigned(id) => id.raw(),
        }
    }

    #[inline]
    pub fn get(self) -> Option<BlockId> {
        match self {
            Self::Unassigned => None,
            Self::Assigned(id) => Some(id),
        }
    }
}

impl From<BlockId> for BlockPtr {
    fn from(id: BlockId) -> Self {
        Self::Assigned(id)
    }
}

/// 内存中的索引节点，只描述正在使用的文件
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inode {
    pub name: String,
    /// 写入过的最大字节偏移（不含）
    pub size: u32,
    pub direct: [BlockPtr; DIRECT_COUNT],
    /// 指向一个一级索引块
    pub indirect: BlockPtr,
}

impl Inode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        let buf = &mut buf[..INODE_SIZE];
        buf.fill(0);

        put_u32(buf, 0, 1);
        put_u32(buf, 4, self.size);
        let name = self.name.as_bytes();
        buf[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
        for (i, ptr) in self.direct.iter().enumerate() {
            put_u32(buf, DIRECT_OFFSET + i * 4, ptr.raw());
        }
        put_u32(buf, INDIRECT_OFFSET, self.indirect.raw());
    }

    /// 未使用的索引节点解码为空
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if get_u32(buf, 0) == 0 {
            return None;
        }

        let name = &buf[NAME_OFFSET..NAME_OFFSET + MAX_FILENAME_LENGTH];
        let name_len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        let mut direct = [BlockPtr::Unassigned; DIRECT_COUNT];
        for (i, ptr) in direct.iter_mut().enumerate() {
            *ptr = BlockPtr::from_raw(get_u32(buf, DIRECT_OFFSET + i * 4));
        }

        Some(Self {
            name: String::from_utf8_lossy(&name[..name_len]).into_owned(),
            size: get_u32(buf, 4),
            direct,
            indirect: BlockPtr::from_raw(get_u32(buf, INDIRECT_OFFSET)),
        })
    }
}

/// 一级索引块：整个块连续存储**块编号**，每个编号都指向一个**数据块**
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectBlock(Vec<u8>);

impl IndirectBlock {
    pub fn new(block_size: usize) -> Self {
        Self(vec![0; block_size])
    }

    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 一个索引块可编号的数量
    #[inline]
    pub const fn capacity(block_size: usize) -> usize {
        block_size / 4
    }

    #[inline]
    pub fn get(&self, index: usize) -> BlockPtr {
        BlockPtr::from_raw(get_u32(&self.0, index * 4))
    }

    #[inline]
    pub fn set(&mut self, index: usize, ptr: BlockPtr) {
        put_u32(&mut self.0, index * 4, ptr.raw());
    }

    /// 全部已分配的块
    pub fn assigned(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..Self::capacity(self.0.len())).filter_map(|i| self.get(i).get())
    }
}
