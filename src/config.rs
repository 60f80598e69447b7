use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::models::GasLogType;

pub const DB_FILE_NAME: &str = "daybook.sqlite";

#[derive(Parser, Debug)]
#[command(name = "daybook", about = "Daily sales and expense ledger")]
pub struct CliArgs {
    /// Directory holding the ledger database
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List records, newest first
    List,
    /// Show one record with its totals
    Show { date: String },
    /// Print a new record pre-filled from the custom structure (default: today)
    New { date: Option<String> },
    /// Save a record from a JSON file (create or replace)
    Save { file: PathBuf },
    /// Delete the record for a date
    Delete { date: String },
    /// Add records from a backup or record-array file without clearing
    Import { file: PathBuf },
    /// Write a backup of all records and the custom structure
    ExportBackup { file: PathBuf },
    /// Replace all local data with a backup
    Restore {
        file: PathBuf,
        /// Confirm the replacement
        #[arg(long)]
        yes: bool,
        /// Also confirm when the backup is older than local data
        #[arg(long)]
        allow_older: bool,
    },
    /// Export records as CSV
    ExportCsv { file: PathBuf },
    /// Monthly totals
    Summary {
        /// Month as YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<String>,
        /// Number of months ending at `month`
        #[arg(long, default_value_t = 1)]
        months: u32,
    },
    /// Show or replace the custom expense structure
    Structure {
        #[command(subcommand)]
        action: StructureAction,
    },
    /// Read or write settings
    Setting {
        #[command(subcommand)]
        action: SettingAction,
    },
    /// Gas cylinder log
    Gas {
        #[command(subcommand)]
        action: GasAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum StructureAction {
    Show,
    /// Replace it from a JSON file; legacy string lists are upgraded
    Set { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum SettingAction {
    /// Print one setting, or all of them
    Get { key: Option<String> },
    /// Store a value; parsed as JSON when possible, else kept as a string
    Set { key: String, value: String },
    Delete { key: String },
}

#[derive(Subcommand, Debug)]
pub enum GasAction {
    List,
    Add {
        #[arg(value_enum)]
        kind: GasKind,
        #[arg(default_value_t = 1)]
        count: i64,
    },
    Delete { id: String },
    Stock,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GasKind {
    Refill,
    Connect,
}

impl From<GasKind> for GasLogType {
    fn from(kind: GasKind) -> Self {
        match kind {
            GasKind::Refill => GasLogType::Refill,
            GasKind::Connect => GasLogType::Connect,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn load(cli: &CliArgs) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(Config {
            data_dir,
            log_level: cli.log_level.clone(),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("daybook"))
        .ok_or_else(|| anyhow!("No platform data directory; pass --data-dir"))
}
