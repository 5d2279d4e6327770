use clap::{Parser, Subcommand, ValueEnum};
use common::OptionSide;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sleet")]
#[command(about = "Sleet - option chain aggregation and vertical spread scanner")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the watchlist on a fixed interval and report the best spreads
    Scan {
        /// Path to the configuration file
        #[arg(short, long, default_value = "sleet.yaml", env = "SLEET_CONFIG")]
        config: PathBuf,

        /// Scan these tickers instead of the configured watchlist
        #[arg(short, long = "ticker")]
        tickers: Vec<String>,

        /// Run a single pass per ticker and exit
        #[arg(long)]
        once: bool,

        /// Override the configured log format
        #[arg(long, value_enum)]
        log_format: Option<LogFormatArg>,
    },

    /// Fetch one option chain and print its spreads
    Chain {
        /// Underlying ticker (e.g., SPY, $SPX)
        ticker: String,

        /// Path to the configuration file
        #[arg(short, long, default_value = "sleet.yaml", env = "SLEET_CONFIG")]
        config: PathBuf,

        /// Which side's spreads to compute
        #[arg(short, long, value_enum, default_value = "both")]
        side: SideArg,

        /// Furthest expiration in days (defaults to the scanner setting)
        #[arg(short, long)]
        days: Option<u32>,

        /// Fetch both sides in one request instead of one request per side
        #[arg(long)]
        combined: bool,

        /// Print the merged chain as JSON instead of spreads
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration without scanning
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "sleet.yaml", env = "SLEET_CONFIG")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "sleet.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideArg {
    /// Call spreads only
    Call,
    /// Put spreads only
    Put,
    /// Both sides
    Both,
}

impl SideArg {
    pub fn sides(&self) -> &'static [OptionSide] {
        match self {
            SideArg::Call => &[OptionSide::Call],
            SideArg::Put => &[OptionSide::Put],
            SideArg::Both => &OptionSide::BOTH,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
