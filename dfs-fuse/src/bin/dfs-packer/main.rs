mod cli;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use cli::{Cli, Command, Image};
use dfs::{Dfs, FormatOptions};
use dfs_fuse::BlockFile;

fn main() -> io::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Format {
            image,
            size_kib,
            block_size,
            inodes,
        } => {
            let fd = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&image.image)?;
            fd.set_len(size_kib * 1024)?;

            let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd)?);
            let options = FormatOptions {
                block_size,
                num_inodes: inodes,
            };
            let sb = Dfs::format(&dev, options).map_err(io::Error::other)?;
            println!(
                "{}: {} blocks of {} bytes, {} inodes",
                image.image.display(),
                sb.num_blocks,
                sb.block_size,
                sb.num_inodes
            );
        }

        Command::Put { image, files } => with_mounted(&image, |dfs| {
            for path in &files {
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| io::Error::other(format!("bad file name: {path:?}")))?;
                let data = fs::read(path)?;

                // 覆盖同名文件
                if let Ok(handle) = dfs.find(name) {
                    dfs.delete(handle).map_err(io::Error::other)?;
                }
                let handle = dfs.open(name).map_err(io::Error::other)?;
                dfs.write(handle, 0, &data).map_err(io::Error::other)?;
                log::info!("put {name:?}: {} bytes", data.len());
            }
            Ok(())
        })?,

        Command::Get { image, name, out } => with_mounted(&image, |dfs| {
            let handle = dfs.find(&name).map_err(io::Error::other)?;
            let mut data = vec![0; dfs.size(handle).map_err(io::Error::other)? as usize];
            dfs.read(handle, 0, &mut data).map_err(io::Error::other)?;

            let out = out.unwrap_or_else(|| Path::new(&name).to_path_buf());
            fs::write(&out, &data)?;
            log::info!("get {name:?}: {} bytes -> {}", data.len(), out.display());
            Ok(())
        })?,

        Command::Ls { image } => with_mounted(&image, |dfs| {
            for entry in dfs.entries().map_err(io::Error::other)? {
                println!("{:>4} {:>8} {}", entry.handle, entry.size, entry.name);
            }
            let free = dfs.free_blocks().map_err(io::Error::other)?;
            println!("{free} free blocks of {} bytes", dfs.block_size());
            Ok(())
        })?,

        Command::Rm { image, names } => with_mounted(&image, |dfs| {
            for name in &names {
                let handle = dfs.find(name).map_err(io::Error::other)?;
                dfs.delete(handle).map_err(io::Error::other)?;
                log::info!("rm {name:?}");
            }
            Ok(())
        })?,
    }

    Ok(())
}

/// 挂载镜像执行`f`，无论成败都会卸载
fn with_mounted(image: &Image, f: impl FnOnce(&Dfs) -> io::Result<()>) -> io::Result<()> {
    let fd = OpenOptions::new().read(true).write(true).open(&image.image)?;
    let mut dfs = Dfs::new(Arc::new(BlockFile::new(fd)?));
    dfs.mount().map_err(io::Error::other)?;

    let result = f(&dfs);
    dfs.unmount().map_err(io::Error::other)?;
    result
}
