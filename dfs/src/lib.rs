#![no_std]

extern crate alloc;

/* DFS 的整体架构，自上而下 */

// 文件描述符层：带读写位置的文件接口
mod file;

// 文件系统层：挂载、卸载以及按字节读写文件
mod dfs;

// 地址转换层：文件内的逻辑块 -> 文件系统块
mod translate;

// 索引节点表：文件名到句柄的映射
mod inode_table;

// 磁盘数据结构层：超级块、索引节点、空闲块位图
mod layout;

// 块适配层：一个文件系统块对应若干个物理块
mod block;

mod error;


pub use self::{
    block::BlockId,
    dfs::{Dfs, FileInfo, FormatOptions},
    error::{Error, Result},
    file::{Fd, FileTable, OpenFlag, Whence},
    inode_table::Handle,
    layout::{BlockPtr, SuperBlock},
};

/// 默认的文件系统块大小，必须是物理块大小的整数倍
pub const DEFAULT_BLOCK_SIZE: usize = 1024;
/// 默认的索引节点数
pub const DEFAULT_NUM_INODES: usize = 128;
/// 超级块所在的物理块
pub const SUPERBLOCK_PHYSICAL_BLOCK: usize = 1;
/// 文件系统的最大字节数
pub const MAX_FILESYSTEM_SIZE: usize = 0x1000_0000;
/// 文件名所占字节数（含结尾的 NUL）
pub const MAX_FILENAME_LENGTH: usize = 72;
/// 直接索引的个数
pub const DIRECT_COUNT: usize = 10;
/// 同时打开的文件数上限
pub const MAX_OPEN_FILES: usize = 32;
/// 文件描述符层单次读写的字节数上限
pub const MAX_READWRITE_BYTES: usize = 1024;
