use dfs::{DEFAULT_BLOCK_SIZE, DEFAULT_NUM_INODES, MAX_FILENAME_LENGTH, SuperBlock};

#[test]
fn on_disk() {
    assert_eq!(28, SuperBlock::SIZE);
    assert_eq!(72, MAX_FILENAME_LENGTH);

    // 256MiB 是上限，位图恰好占 32 个文件系统块
    let sb = SuperBlock::layout(512, 256 << 20, DEFAULT_BLOCK_SIZE, DEFAULT_NUM_INODES).unwrap();
    assert_eq!(262_144, sb.num_blocks);
    assert_eq!(16, sb.inode_blocks());
    assert_eq!(32, sb.fbv_blocks());
    assert_eq!(49, sb.data_start);
}
