use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "stock-bulb")]
#[command(about = "Shows your Kite portfolio P&L as the color of a WiZ bulb")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "stock-bulb.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Check the portfolio once, update the bulb and exit (ignores market hours)
    #[arg(long)]
    pub once: bool,

    /// Show the configuration and color table without touching the network
    #[arg(long)]
    pub dry_run: bool,
}
