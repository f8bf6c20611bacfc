use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "refscan",
    about = "refscan - extract manifest and subtitle references from embed player pages and build M3U playlists",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Number of retry attempts per request (overrides the configuration)
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract references from a local document
    Scan {
        /// Document file, or "-" for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Base URL relative references resolve against
        #[arg(short, long, conflicts_with = "page_url")]
        base_url: Option<String>,

        /// URL the document was fetched from; its directory becomes the base
        #[arg(short, long)]
        page_url: Option<String>,

        /// List undecoded candidates instead of resolved references
        #[arg(long)]
        candidates: bool,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Fetch one embed page and extract its references
    Extract {
        /// The embed page URL
        #[arg(short, long)]
        url: String,

        /// Referer sent with the request
        #[arg(short, long)]
        referer: Option<String>,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Fetch an episode or film page, follow its embed players and merge their references
    Page {
        /// The page URL
        #[arg(short, long)]
        url: String,

        /// Referer sent with the page request
        #[arg(short, long)]
        referer: Option<String>,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Process multiple embed URLs from a file
    Batch {
        /// Input file containing URLs (one per line, # for comments)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, default_value = "json")]
        output_format: OutputFormat,

        /// Maximum concurrent extractions
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Referer sent with every request
        #[arg(short, long)]
        referer: Option<String>,
    },

    /// Crawl the film catalog and write an M3U playlist
    Crawl {
        /// Catalog site base URL
        #[arg(long)]
        site: Option<String>,

        /// Stop after this many archive pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Playlist path
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,

        /// Maximum concurrent film lookups
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Crawl the series catalog and write per-series and master M3U playlists
    Series {
        /// Series site base URL
        #[arg(long)]
        site: Option<String>,

        /// Stop after this many series
        #[arg(long)]
        max_series: Option<usize>,

        /// Directory for the per-series playlists
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Master playlist path
        #[arg(long)]
        master_file: Option<PathBuf>,

        /// Maximum concurrent series
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Fetch a manifest and describe its variants or segments
    Probe {
        /// Manifest URL
        #[arg(short, long)]
        url: String,

        /// Referer sent with the request
        #[arg(short, long)]
        referer: Option<String>,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table format
    Table,
    /// CSV format
    Csv,
}

impl OutputFormat {
    /// Parses the configured default; unknown names fall back to pretty.
    pub fn from_config(name: &str) -> Self {
        <Self as ValueEnum>::from_str(name, true).unwrap_or_default()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
