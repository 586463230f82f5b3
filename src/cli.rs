use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a document or web page and write the comparison report
    Translate {
        /// Path to a .docx or .pdf file, or an http(s) URL
        source: String,

        /// Output directory for the report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Concurrent paragraph translations per backend
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Translate every Word and PDF document in a directory
    Batch {
        /// Input directory containing documents
        input_dir: PathBuf,

        /// Output directory for the reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Concurrent paragraph translations per backend
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Extract the paragraph sequence without translating
    Extract {
        /// Path to a .docx or .pdf file, or an http(s) URL
        source: String,

        /// Output text file; printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the local model files and their status
    Models {
        /// Download all missing model files
        #[arg(long)]
        download: bool,
    },
}
