use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use stock_bulb::domain::model::{Color, ColorCommand};
use stock_bulb::domain::ports::BulbController;
use stock_bulb::utils::logger;
use stock_bulb::{ColorMap, MonitorConfig, WizBulb};

/// 模擬的損益情境
const SCENARIOS: [(f64, &str); 5] = [
    (5_000.0, "Profit"),
    (-3_000.0, "Loss"),
    (0.0, "Break-even"),
    (15_000.0, "Huge profit"),
    (-12_000.0, "Huge loss"),
];

#[derive(Parser)]
#[command(name = "bulb-check")]
#[command(about = "Check the WiZ bulb connection and preview P&L colors")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "stock-bulb.toml")]
    config: String,

    /// Set this color (red, green, blue, yellow, orange, purple, white)
    #[arg(long)]
    color: Option<Color>,

    /// Brightness used with --color
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(10..=100))]
    brightness: u8,

    /// Play the P&L scenarios through the configured color thresholds
    #[arg(long)]
    scenarios: bool,

    /// Seconds to hold each scenario color
    #[arg(long, default_value_t = 3)]
    hold_seconds: u64,

    /// Turn the bulb off when done
    #[arg(long)]
    off: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_logger("info", args.verbose, false);

    let config = MonitorConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;
    let bulb = WizBulb::from_config(&config.bulb).context("invalid [bulb] section")?;

    println!("🧪 WiZ Bulb Check ({})", bulb.addr());

    let state = bulb
        .state()
        .await
        .with_context(|| format!("cannot reach the bulb at {}", bulb.addr()))?;
    println!(
        "✅ Connected! Bulb is {} (dimming: {})",
        if state.state { "ON" } else { "OFF" },
        state
            .dimming
            .map(|d| d.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );

    if let Some(color) = args.color {
        let command = ColorCommand::Set {
            color,
            brightness: args.brightness,
        };
        bulb.apply(&command).await?;
        println!("💡 Bulb set to {}", command);
    }

    if args.scenarios {
        let color_map =
            ColorMap::from_config(&config.thresholds).context("invalid [thresholds] section")?;
        println!();
        println!("📊 Simulating P&L scenarios...");
        for (pnl, label) in SCENARIOS {
            let command = color_map.command_for(pnl);
            println!("  → {}: ₹{:.2} → {}", label, pnl, command);
            bulb.apply(&command).await?;
            tokio::time::sleep(Duration::from_secs(args.hold_seconds)).await;
        }
    }

    if args.off {
        bulb.apply(&ColorCommand::Off).await?;
        println!("💡 Bulb turned off");
    }

    println!("✅ Check complete");
    Ok(())
}
