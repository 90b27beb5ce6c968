//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flashfat")]
#[command(author, version, about = "Sequential file store on a NOR flash image", long_about = None)]
pub struct Cli {
    /// Flash image file to operate on
    #[arg(short, long, global = true, default_value = "flash.bin")]
    pub image: PathBuf,

    /// Flash size in bytes when creating a new image
    #[arg(long, global = true, default_value_t = 8 * 1024 * 1024)]
    pub size: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a blank allocation table to the image
    Format,

    /// List the files in the allocation table
    Ls,

    /// Create a new file from a host file's contents
    Store {
        /// Host file to store
        #[arg(long)]
        input: PathBuf,
    },

    /// Read a file's contents out to a host file
    Cat {
        /// 1-based file index
        index: usize,

        /// Host file to write
        #[arg(long)]
        output: PathBuf,
    },

    /// Remove the most recently created file from the table
    RmLast,

    /// Remove all files from the table
    RmAll,
}
