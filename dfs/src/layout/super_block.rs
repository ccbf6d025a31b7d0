use super::{INODE_SIZE, get_u32, put_u32};
use crate::{Error, MAX_FILESYSTEM_SIZE, Result, SUPERBLOCK_PHYSICAL_BLOCK};

/// 超级块：
/// - 以`valid`标记元数据是否可信；
/// - 定位其它连续区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuperBlock {
    pub valid: bool,
    /// 文件系统块的字节数
    pub block_size: u32,
    /// 文件系统占据块数
    pub num_blocks: u32,
    pub inode_start: u32,
    pub num_inodes: u32,
    pub fbv_start: u32,
    pub data_start: u32,
}

impl SuperBlock {
    /// 磁盘上所占的字节数
    pub const SIZE: usize = 7 * 4;

    /// 计算在`total_size`字节的设备上格式化出的布局
    pub fn layout(
        physical_block_size: usize,
        total_size: usize,
        block_size: usize,
        num_inodes: usize,
    ) -> Result<Self> {
        if physical_block_size < Self::SIZE
            || block_size == 0
            || block_size % physical_block_size != 0
            || total_size > MAX_FILESYSTEM_SIZE
            || num_inodes == 0
        {
            return Err(Error::InvalidGeometry);
        }

        let ratio = block_size / physical_block_size;
        let num_blocks = total_size / block_size;

        // 索引节点区域紧跟在超级块所在的文件系统块之后
        let inode_start = (SUPERBLOCK_PHYSICAL_BLOCK + 1).div_ceil(ratio);
        let inode_blocks = (num_inodes * INODE_SIZE).div_ceil(block_size);
        let fbv_start = inode_start + inode_blocks;
        let fbv_blocks = Self::fbv_bytes(num_blocks).div_ceil(block_size);
        let data_start = fbv_start + fbv_blocks;

        if data_start >= num_blocks {
            return Err(Error::InvalidGeometry);
        }

        Ok(Self {
            valid: false,
            block_size: block_size as u32,
            num_blocks: num_blocks as u32,
            inode_start: inode_start as u32,
            num_inodes: num_inodes as u32,
            fbv_start: fbv_start as u32,
            data_start: data_start as u32,
        })
    }

    /// 记录`num_blocks`个块的位图所需字节数（按32位字对齐）
    #[inline]
    pub fn fbv_bytes(num_blocks: usize) -> usize {
        num_blocks.div_ceil(32) * 4
    }

    #[inline]
    pub fn inode_blocks(&self) -> usize {
        (self.fbv_start - self.inode_start) as usize
    }

    #[inline]
    pub fn fbv_blocks(&self) -> usize {
        (self.data_start - self.fbv_start) as usize
    }

    /// 校验从磁盘读出的布局能否在该设备上成立
    pub fn check(&self, physical_block_size: usize, total_size: usize) -> Result<()> {
        let block_size = self.block_size as u64;
        let physical_block_size = physical_block_size as u64;

        let geometry_ok = physical_block_size >= Self::SIZE as u64
            && block_size != 0
            && block_size % physical_block_size == 0
            && self.num_inodes != 0;
        if !geometry_ok {
            return Err(Error::InvalidSuperBlock);
        }

        let fs_size = self.num_blocks as u64 * block_size;
        let ratio = block_size / physical_block_size;
        let regions_ok = fs_size <= total_size as u64
            && fs_size <= MAX_FILESYSTEM_SIZE as u64
            && self.inode_start as u64 * ratio > SUPERBLOCK_PHYSICAL_BLOCK as u64
            && self.inode_start < self.fbv_start
            && self.fbv_start < self.data_start
            && self.data_start < self.num_blocks;
        if !regions_ok {
            return Err(Error::InvalidSuperBlock);
        }

        let capacity_ok = self.inode_blocks() as u64 * block_size
            >= self.num_inodes as u64 * INODE_SIZE as u64
            && self.fbv_blocks() as u64 * block_size
                >= Self::fbv_bytes(self.num_blocks as usize) as u64;
        if !capacity_ok {
            return Err(Error::InvalidSuperBlock);
        }

        Ok(())
    }

    /// 除`valid`外的字段是否完全一致
    pub fn same_geometry(&self, other: &Self) -> bool {
        Self { valid: false, ..*self } == Self { valid: false, ..*other }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..Self::SIZE].fill(0);
        put_u32(buf, 0, self.valid as u32);
        put_u32(buf, 4, self.block_size);
        put_u32(buf, 8, self.num_blocks);
        put_u32(buf, 12, self.inode_start);
        put_u32(buf, 16, self.num_inodes);
        put_u32(buf, 20, self.fbv_start);
        put_u32(buf, 24, self.data_start);
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            valid: get_u32(buf, 0) == 1,
            block_size: get_u32(buf, 4),
            num_blocks: get_u32(buf, 8),
            inode_start: get_u32(buf, 12),
            num_inodes: get_u32(buf, 16),
            fbv_start: get_u32(buf, 20),
            data_start: get_u32(buf, 24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        // 16MiB 的磁盘，512 字节的物理块
        let sb = SuperBlock::layout(512, 16 << 20, 1024, 128).unwrap();

        assert_eq!(16384, sb.num_blocks);
        assert_eq!(1, sb.inode_start);
        assert_eq!(16, sb.inode_blocks());
        assert_eq!(17, sb.fbv_start);
        assert_eq!(2, sb.fbv_blocks());
        assert_eq!(19, sb.data_start);
        assert!(sb.check(512, 16 << 20).is_ok());
    }

    #[test]
    fn superblock_never_shares_inode_region() {
        // 文件系统块与物理块等大时，超级块独占文件系统块 1
        let sb = SuperBlock::layout(512, 1 << 20, 512, 16).unwrap();
        assert_eq!(2, sb.inode_start);
    }

    #[test]
    fn bad_geometry() {
        assert_eq!(
            Err(Error::InvalidGeometry),
            SuperBlock::layout(512, 1 << 20, 768, 128)
        );
        assert_eq!(
            Err(Error::InvalidGeometry),
            SuperBlock::layout(512, MAX_FILESYSTEM_SIZE * 2, 1024, 128)
        );
        assert_eq!(
            Err(Error::InvalidGeometry),
            SuperBlock::layout(512, 16 * 1024, 1024, 128)
        );
    }

    #[test]
    fn encoding() {
        let sb = SuperBlock {
            valid: true,
            ..SuperBlock::layout(512, 1 << 20, 1024, 64).unwrap()
        };
        let mut buf = [0xFFu8; 512];
        sb.encode(&mut buf);

        assert_eq!(&[1, 0, 0, 0, 0, 4, 0, 0], &buf[..8]);
        assert_eq!(sb, SuperBlock::decode(&buf));
    }

    #[test]
    fn check_rejects_overlapping_regions() {
        let mut sb = SuperBlock::layout(512, 1 << 20, 1024, 128).unwrap();
        sb.fbv_start = sb.data_start;
        assert_eq!(Err(Error::InvalidSuperBlock), sb.check(512, 1 << 20));

        let mut sb = SuperBlock::layout(512, 1 << 20, 1024, 128).unwrap();
        sb.num_blocks *= 2;
        assert_eq!(Err(Error::InvalidSuperBlock), sb.check(512, 1 << 20));
    }
}
