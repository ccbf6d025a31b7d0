use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Manipulate DFS disk images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct Image {
    /// Disk image file
    #[arg(long, short)]
    pub image: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh image and format it
    Format {
        #[command(flatten)]
        image: Image,

        /// Image size in KiB
        #[arg(long, default_value_t = 4096)]
        size_kib: u64,

        /// File system block size in bytes
        #[arg(long, default_value_t = dfs::DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        /// Number of inodes
        #[arg(long, default_value_t = dfs::DEFAULT_NUM_INODES)]
        inodes: usize,
    },

    /// Copy host files into the image
    Put {
        #[command(flatten)]
        image: Image,

        /// Host files; each is stored under its file name
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Copy a file out of the image
    Get {
        #[command(flatten)]
        image: Image,

        name: String,

        /// Output path, defaults to the file name in the current directory
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// List files in the image
    Ls {
        #[command(flatten)]
        image: Image,
    },

    /// Delete files from the image
    Rm {
        #[command(flatten)]
        image: Image,

        #[arg(required = true)]
        names: Vec<String>,
    },
}
