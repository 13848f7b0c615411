use clap::Parser;
use stock_bulb::core::market_hours::{format_hm, MarketStatus};
use stock_bulb::domain::ports::BulbController;
use stock_bulb::utils::error::ErrorKind;
use stock_bulb::utils::{logger, validation::Validate};
use stock_bulb::{CliArgs, ColorMap, KiteClient, MarketHours, Monitor, MonitorConfig, WizBulb};

const DRY_RUN_SAMPLES: [f64; 11] = [
    -15_000.0, -10_000.0, -5_000.0, -1_234.5, -100.0, 0.0, 100.0, 1_234.5, 5_000.0, 10_000.0,
    15_000.0,
];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = CliArgs::parse();

    // 載入並驗證配置；配置錯誤是唯一的致命錯誤
    let config = match MonitorConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration validation failed: {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    logger::init_logger(config.log_level(), args.verbose, config.log_json());

    tracing::info!("🚀 Stock Bulb Monitor starting...");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no network traffic");
        if let Err(e) = perform_dry_run(&config) {
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
        return;
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let kite = KiteClient::new(&config.broker);
    let bulb = match WizBulb::from_config(&config.bulb) {
        Ok(bulb) => bulb,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    };

    preflight(&kite, &bulb).await;

    let mut monitor = match Monitor::new(kite, bulb, &config) {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if args.once {
        match monitor.run_once().await {
            Ok(command) => println!("✅ Bulb set to {}", command),
            Err(e) => {
                tracing::error!("❌ Check failed: {} (kind: {:?})", e, e.kind());
                eprintln!("❌ {}", e);
                eprintln!("💡 {}", e.recovery_suggestion());
                std::process::exit(e.exit_code());
            }
        }
        return;
    }

    monitor
        .run_forever(async {
            let _ = shutdown_rx.await;
        })
        .await;
}

/// 啟動前檢查 Kite session 與燈泡連線；失敗只回報，不中止
async fn preflight(kite: &KiteClient, bulb: &WizBulb) {
    match kite.verify_session().await {
        Ok(user) => tracing::info!("✅ Kite session active for {}", user),
        Err(e) if e.kind() == ErrorKind::AuthExpired => {
            tracing::error!("🔐 {}", e);
            tracing::error!("🔧 {}", e.recovery_suggestion());
        }
        Err(e) => tracing::warn!("⚠️ Could not verify Kite session: {}", e),
    }

    match bulb.state().await {
        Ok(state) => tracing::info!(
            "✅ Connected to WiZ bulb at {} (currently {})",
            bulb.addr(),
            if state.state { "ON" } else { "OFF" }
        ),
        Err(e) => {
            tracing::warn!("⚠️ Could not reach the bulb at {}: {}", bulb.addr(), e);
            tracing::warn!("💡 {}", e.recovery_suggestion());
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("⚠️ Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn display_config_summary(config: &MonitorConfig, args: &CliArgs) {
    println!("📋 Configuration Summary:");
    println!("  Broker: {}", config.broker.base_url());
    println!(
        "  Bulb: {}:{}",
        config.bulb.ip.trim(),
        config.bulb.port()
    );
    println!(
        "  Market hours: {} - {} {}{}",
        config.schedule.market_open,
        config.schedule.market_close,
        config.schedule.timezone,
        if config.schedule.weekdays_only() {
            " (Mon-Fri)"
        } else {
            ""
        }
    );
    println!(
        "  Check interval: {}s (closed: {}s)",
        config.schedule.check_interval().as_secs(),
        config.schedule.closed_check_interval().as_secs()
    );

    if args.once {
        println!("  🎯 SINGLE CHECK MODE");
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &MonitorConfig) -> stock_bulb::Result<()> {
    let color_map = ColorMap::from_config(&config.thresholds)?;
    let hours = MarketHours::from_config(&config.schedule)?;

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("🎨 Color table:");
    for pnl in DRY_RUN_SAMPLES {
        println!("  ₹{:>12.2}  →  {}", pnl, color_map.command_for(pnl));
    }

    println!();
    let now = chrono::Utc::now();
    match hours.status(now) {
        MarketStatus::Open => println!("🕐 Market is open now; the bulb would update every check"),
        _ => println!(
            "🌙 Market is closed now; opens in {}",
            format_hm(hours.time_until_open(now))
        ),
    }

    println!();
    println!("✅ Dry run analysis complete.");
    Ok(())
}
