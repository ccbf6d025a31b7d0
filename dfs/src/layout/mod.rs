//! # 磁盘数据结构层
//!
//! DFS 的磁盘布局（以文件系统块计）：
//! 引导记录与超级块 | 索引节点区域 | 空闲块位图 | 数据块区域
//!
//! 超级块位于物理块 1，其余区域的起止由超级块记录。
//! 所有整数均以小端序存放。

mod super_block;
pub use super_block::SuperBlock;

mod fbv;
pub use fbv::FreeBlockVector;

mod inode;
pub use inode::{BlockPtr, Inode, IndirectBlock, INODE_SIZE};

#[inline]
fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut word = [0; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(word)
}

#[inline]
fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
