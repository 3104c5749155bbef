use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dotlayout - byte-exact layout of .NET executables
#[derive(Debug, Parser)]
#[command(name = "dotlayout", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the layout tree: one line per node with its byte range.
    Dump {
        /// Path to the PE file or standalone portable PDB.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Stop descending below this depth.
        #[arg(short, long, value_name = "N")]
        depth: Option<usize>,

        /// Print only the leaves, in file order.
        #[arg(long)]
        leaves: bool,
    },

    /// Compare the layout trees of two files.
    Diff {
        /// The old file.
        #[arg(value_name = "LEFT")]
        left: PathBuf,

        /// The new file.
        #[arg(value_name = "RIGHT")]
        right: PathBuf,

        /// Also compare table row counts and #Strings contents.
        #[arg(long)]
        summary: bool,

        /// Skip the trees of embedded portable PDBs.
        #[arg(long)]
        no_pdb: bool,
    },

    /// List the present metadata tables with row counts and row sizes.
    Tables {
        /// Path to the PE file or standalone portable PDB.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Verify that every byte is covered by exactly one leaf.
    Check {
        /// Path to the PE file or standalone portable PDB.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}
