//! Clap derive structures for the `poslink` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// poslink -- talk to a retail POS backend from the command line
#[derive(Debug, Parser)]
#[command(
    name = "poslink",
    version,
    about = "Authenticated requests and live notifications for a retail POS backend",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "POSLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL including the API prefix (overrides config)
    #[arg(long, short = 'u', env = "POSLINK_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "POSLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds (overrides config)
    #[arg(long, env = "POSLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Color if stdout is a terminal
    Auto,
    Always,
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token
    Login(LoginArgs),

    /// Forget the stored session token
    Logout,

    /// Show whether a session token is stored
    Token(TokenArgs),

    /// Send an arbitrary request to the backend
    #[command(alias = "req")]
    Request(RequestArgs),

    /// Browse the product catalog
    #[command(alias = "p")]
    Products(ProductsArgs),

    /// Follow live notifications (sales, stock alerts)
    Watch(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username
    #[arg(env = "POSLINK_USERNAME")]
    pub username: String,

    /// Password (prompted for when omitted)
    #[arg(long, env = "POSLINK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Print the token itself
    #[arg(long)]
    pub show: bool,
}

// ── Request ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_enum)]
    pub method: HttpMethod,

    /// Path relative to the base URL, e.g. /dashboard/stats
    pub path: String,

    /// JSON body
    #[arg(long, short = 'd', conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long, short = 'f')]
    pub data_file: Option<PathBuf>,

    /// Extra header, `Name: value` (repeatable)
    #[arg(long = "header", short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Query pair, `key=value` (repeatable)
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE")]
    pub query: Vec<String>,
}

// ── Products ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProductsCommand {
    /// Search and filter products
    #[command(alias = "ls")]
    List(ProductFilter),

    /// Show one product
    Get {
        /// Product ID
        id: String,
    },

    /// Look up a product by barcode
    Barcode {
        /// Scanned code
        code: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortOrderArg {
    Asc,
    Desc,
}

#[derive(Debug, Args)]
pub struct ProductFilter {
    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    #[arg(long)]
    pub min_rating: Option<f64>,

    /// Only products with stock left
    #[arg(long)]
    pub in_stock: bool,

    /// Field to sort by, e.g. price or name
    #[arg(long)]
    pub sort_by: Option<String>,

    #[arg(long, value_enum)]
    pub sort_order: Option<SortOrderArg>,

    #[arg(long)]
    pub page: Option<u32>,

    #[arg(long)]
    pub limit: Option<u32>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print each notification as a JSON line instead of the feed
    #[arg(long)]
    pub json: bool,

    /// Connect without sending the stored session token
    #[arg(long)]
    pub anonymous: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,
}
