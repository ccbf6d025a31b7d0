use alloc::vec;
use alloc::vec::Vec;

use super::{SuperBlock, get_u32, put_u32};
use crate::BlockId;

/// 每个字记录的块数
const WORD_BITS: usize = u32::BITS as usize;

/// 空闲块位图，每一位对应一个文件系统块：1 表示已分配，0 表示空闲
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBlockVector {
    words: Vec<u32>,
    /// 位图所指示的块数
    num_blocks: u32,
}

impl FreeBlockVector {
    /// 新建位图，`reserved`之前的块（超级块、索引节点区、位图区）置为已分配
    pub fn new(num_blocks: u32, reserved: u32) -> Self {
        let mut fbv = Self {
            words: vec![0; (num_blocks as usize).div_ceil(WORD_BITS)],
            num_blocks,
        };
        for id in 0..reserved.min(num_blocks) {
            fbv.set(BlockId::new(id));
        }

        fbv
    }

    pub fn decode(bytes: &[u8], num_blocks: u32) -> Self {
        let len = SuperBlock::fbv_bytes(num_blocks as usize);
        let words = (0..len).step_by(4).map(|at| get_u32(bytes, at)).collect();
        Self { words, num_blocks }
    }

    /// 编码为`len`字节（位图区域的大小），多余部分补零
    pub fn encode(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0; len.max(self.words.len() * 4)];
        for (i, &word) in self.words.iter().enumerate() {
            put_u32(&mut bytes, i * 4, word);
        }
        bytes.truncate(len);
        bytes
    }

    /// 从编号 0 开始寻找第一个空闲块，将其置为已分配并返回。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<BlockId> {
        // 寻找还有剩余空间的字，其最低的 0 位就是编号最小的空闲块
        let (word_index, bit) = self
            .words
            .iter()
            .enumerate()
            .find_map(|(i, &bits)| (bits != u32::MAX).then_some((i, bits.trailing_ones())))?;

        let id = (word_index * WORD_BITS) as u32 + bit;
        if id >= self.num_blocks {
            return None;
        }

        self.words[word_index] |= 1 << bit;
        Some(BlockId::new(id))
    }

    /// 释放块。释放空闲块不算错误
    pub fn free(&mut self, id: BlockId) {
        if id.raw() < self.num_blocks {
            let (word_index, bit) = Self::position(id);
            self.words[word_index] &= !(1 << bit);
        }
    }

    pub fn is_allocated(&self, id: BlockId) -> bool {
        if id.raw() >= self.num_blocks {
            return false;
        }
        let (word_index, bit) = Self::position(id);
        self.words[word_index] & (1 << bit) != 0
    }

    pub fn free_count(&self) -> usize {
        (0..self.num_blocks)
            .filter(|&id| !self.is_allocated(BlockId::new(id)))
            .count()
    }

    fn set(&mut self, id: BlockId) {
        let (word_index, bit) = Self::position(id);
        self.words[word_index] |= 1 << bit;
    }

    #[inline]
    fn position(id: BlockId) -> (usize, u32) {
        (id.index() / WORD_BITS, id.raw() % WORD_BITS as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_blocks_are_never_handed_out() {
        let mut fbv = FreeBlockVector::new(100, 19);
        for id in 0..19 {
            assert!(fbv.is_allocated(BlockId::new(id)));
        }
        assert_eq!(Some(BlockId::new(19)), fbv.alloc());
        assert_eq!(Some(BlockId::new(20)), fbv.alloc());
        assert_eq!(79, fbv.free_count());
    }

    #[test]
    fn lowest_free_block_first() {
        let mut fbv = FreeBlockVector::new(100, 2);
        let blocks: Vec<_> = (0..40).map(|_| fbv.alloc().unwrap()).collect();
        assert_eq!(BlockId::new(2), blocks[0]);
        assert_eq!(BlockId::new(41), blocks[39]);

        fbv.free(BlockId::new(35));
        fbv.free(BlockId::new(7));
        assert_eq!(Some(BlockId::new(7)), fbv.alloc());
        assert_eq!(Some(BlockId::new(35)), fbv.alloc());
        assert_eq!(Some(BlockId::new(42)), fbv.alloc());
    }

    #[test]
    fn free_is_idempotent() {
        let mut fbv = FreeBlockVector::new(64, 1);
        let id = fbv.alloc().unwrap();
        fbv.free(id);
        fbv.free(id);
        assert!(!fbv.is_allocated(id));
        assert_eq!(Some(id), fbv.alloc());
    }

    #[test]
    fn exhaustion() {
        // 最后一个字只有一部分位有效
        let mut fbv = FreeBlockVector::new(40, 38);
        assert_eq!(Some(BlockId::new(38)), fbv.alloc());
        assert_eq!(Some(BlockId::new(39)), fbv.alloc());
        assert_eq!(None, fbv.alloc());
    }

    #[test]
    fn encoding() {
        let mut fbv = FreeBlockVector::new(70, 3);
        fbv.alloc();
        fbv.free(BlockId::new(1));

        let bytes = fbv.encode(1024);
        assert_eq!(1024, bytes.len());
        assert_eq!(0b1101, bytes[0]);
        assert_eq!(fbv, FreeBlockVector::decode(&bytes, 70));
    }
}
