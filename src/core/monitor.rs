use crate::config::MonitorConfig;
use crate::core::clock::SystemClock;
use crate::core::color_map::ColorMap;
use crate::core::market_hours::{format_hm, MarketHours, MarketStatus};
use crate::domain::model::ColorCommand;
use crate::domain::ports::{BulbController, Clock, PortfolioClient};
use crate::utils::error::{ErrorKind, MonitorError, Result};
use std::future::Future;
use std::time::Duration;

const MIN_SLEEP: Duration = Duration::from_secs(1);

/// 輪詢投資組合並更新燈泡的主迴圈
pub struct Monitor<P: PortfolioClient, B: BulbController, C: Clock = SystemClock> {
    portfolio: P,
    bulb: B,
    clock: C,
    color_map: ColorMap,
    hours: MarketHours,
    check_interval: Duration,
    closed_check_interval: Duration,
    significant_change: f64,
    last_pnl: Option<f64>,
    last_command: Option<ColorCommand>,
}

impl<P: PortfolioClient, B: BulbController> Monitor<P, B, SystemClock> {
    pub fn new(portfolio: P, bulb: B, config: &MonitorConfig) -> Result<Self> {
        Ok(Self {
            portfolio,
            bulb,
            clock: SystemClock,
            color_map: ColorMap::from_config(&config.thresholds)?,
            hours: MarketHours::from_config(&config.schedule)?,
            check_interval: config.schedule.check_interval(),
            closed_check_interval: config.schedule.closed_check_interval(),
            significant_change: config.thresholds.significant_change(),
            last_pnl: None,
            last_command: None,
        })
    }
}

impl<P: PortfolioClient, B: BulbController, C: Clock> Monitor<P, B, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Monitor<P, B, C2> {
        Monitor {
            portfolio: self.portfolio,
            bulb: self.bulb,
            clock,
            color_map: self.color_map,
            hours: self.hours,
            check_interval: self.check_interval,
            closed_check_interval: self.closed_check_interval,
            significant_change: self.significant_change,
            last_pnl: self.last_pnl,
            last_command: self.last_command,
        }
    }

    pub fn last_command(&self) -> Option<ColorCommand> {
        self.last_command
    }

    pub fn last_pnl(&self) -> Option<f64> {
        self.last_pnl
    }

    /// 查詢一次損益並更新燈泡；失敗時保留上一次的指令
    pub async fn run_once(&mut self) -> Result<ColorCommand> {
        tracing::info!("📊 Checking portfolio...");
        let snapshot = self.portfolio.snapshot().await?;

        tracing::info!(
            "💼 Positions: {} | Winners: {} | Losers: {}",
            snapshot.position_count,
            snapshot.profitable_positions,
            snapshot.losing_positions
        );
        tracing::info!(
            "💰 Total P&L: ₹{:.2} ({:.2}%)",
            snapshot.total_pnl,
            snapshot.pnl_percentage()
        );

        if let Some(previous) = self.last_pnl {
            let change = (snapshot.total_pnl - previous).abs();
            if change > self.significant_change {
                tracing::info!(
                    "📊 Significant P&L change: ₹{:.2} (from ₹{:.2})",
                    change,
                    previous
                );
            }
        }

        let command = self.color_map.command_for(snapshot.total_pnl);
        self.bulb.apply(&command).await?;

        tracing::info!("💡 Bulb set to {}", command);
        self.last_pnl = Some(snapshot.total_pnl);
        self.last_command = Some(command);
        Ok(command)
    }

    /// 執行一個週期，回傳下一次檢查前應等待的時間
    pub async fn tick(&mut self) -> Duration {
        let now = self.clock.now();
        let status = self.hours.status(now);

        if status == MarketStatus::Open {
            tracing::debug!(
                "🕐 {}",
                self.hours.local_time(now).format("%I:%M:%S %p")
            );
            if let Err(e) = self.run_once().await {
                log_tick_failure(&e);
            }
            tracing::debug!(
                "⏰ Next check in {} seconds",
                self.check_interval.as_secs()
            );
            return self.check_interval;
        }

        let until_open = self.hours.time_until_open(now);
        match status {
            MarketStatus::BeforeOpen => tracing::info!(
                "🌙 Market is not yet open. Opens in {}",
                format_hm(until_open)
            ),
            MarketStatus::AfterClose => tracing::info!(
                "🌙 Market is closed for the day. Opens at {} (in {})",
                self.hours.open.format("%I:%M %p"),
                format_hm(until_open)
            ),
            _ => tracing::info!(
                "🌙 Market is closed today. Opens in {}",
                format_hm(until_open)
            ),
        }

        self.closed_check_interval.min(until_open).max(MIN_SLEEP)
    }

    /// 持續監控直到 `shutdown` 完成；訊號只在週期之間檢查
    pub async fn run_forever<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("🎯 Starting monitoring loop...");

        loop {
            let wait = self.tick().await;
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("⚠️ Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        self.shutdown().await;
    }

    /// 盡力關燈
    pub async fn shutdown(&mut self) {
        tracing::info!("🛑 Shutting down Stock Bulb Monitor...");
        match self.bulb.apply(&ColorCommand::Off).await {
            Ok(()) => {
                self.last_command = Some(ColorCommand::Off);
                tracing::info!("💡 Bulb turned off");
            }
            Err(e) => tracing::warn!("⚠️ Could not turn the bulb off: {}", e),
        }
        tracing::info!("✅ Shutdown complete. Goodbye! 👋");
    }
}

fn log_tick_failure(error: &MonitorError) {
    if error.is_transient() {
        tracing::warn!("⚠️ {} (will retry next check)", error);
        return;
    }

    let icon = if error.kind() == ErrorKind::AuthExpired {
        "🔐"
    } else {
        "❌"
    };
    tracing::error!("{} {}", icon, error);
    tracing::error!("🔧 {}", error.recovery_suggestion());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::domain::model::{BulbState, Color, Position};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const CONFIG: &str = r#"
[broker]
api_key = "kite_key"
access_token = "tok"

[bulb]
ip = "127.0.0.1"

[schedule]
timezone = "Asia/Kolkata"
market_open = "09:15"
market_close = "15:30"
check_interval_seconds = 60
closed_check_interval_seconds = 300
"#;

    #[derive(Clone, Default)]
    struct FakePortfolio {
        responses: Arc<Mutex<VecDeque<Result<f64>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakePortfolio {
        fn with(responses: Vec<Result<f64>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PortfolioClient for FakePortfolio {
        async fn fetch_positions(&self) -> Result<Vec<Position>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().await.pop_front().unwrap_or(Ok(0.0));
            next.map(|pnl| {
                vec![Position {
                    symbol: "NIFTYBEES".to_string(),
                    quantity: 100,
                    average_price: 250.0,
                    last_price: 250.0,
                    pnl,
                    value: 25_000.0,
                }]
            })
        }
    }

    #[derive(Clone, Default)]
    struct FakeBulb {
        applied: Arc<Mutex<Vec<ColorCommand>>>,
        failing: Arc<AtomicBool>,
    }

    impl FakeBulb {
        async fn applied(&self) -> Vec<ColorCommand> {
            self.applied.lock().await.clone()
        }
    }

    #[async_trait]
    impl BulbController for FakeBulb {
        async fn apply(&self, command: &ColorCommand) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(MonitorError::network("bulb", "no reply"));
            }
            self.applied.lock().await.push(*command);
            Ok(())
        }

        async fn state(&self) -> Result<BulbState> {
            Ok(BulbState::default())
        }
    }

    fn ist(hh: u32, mm: u32) -> DateTime<Utc> {
        // Monday
        chrono_tz::Asia::Kolkata
            .with_ymd_and_hms(2026, 10, 19, hh, mm, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn monitor(
        portfolio: &FakePortfolio,
        bulb: &FakeBulb,
        now: DateTime<Utc>,
    ) -> Monitor<FakePortfolio, FakeBulb, FixedClock> {
        let config = MonitorConfig::from_toml_str(CONFIG).unwrap();
        Monitor::new(portfolio.clone(), bulb.clone(), &config)
            .unwrap()
            .with_clock(FixedClock::new(now))
    }

    fn green(brightness: u8) -> ColorCommand {
        ColorCommand::Set {
            color: Color::Green,
            brightness,
        }
    }

    #[tokio::test]
    async fn test_run_once_applies_mapped_command() {
        let portfolio = FakePortfolio::with(vec![Ok(1234.50)]);
        let bulb = FakeBulb::default();
        let mut monitor = monitor(&portfolio, &bulb, ist(10, 0));

        let command = monitor.run_once().await.unwrap();

        assert_eq!(command, green(12));
        assert_eq!(bulb.applied().await, vec![green(12)]);
        assert_eq!(monitor.last_command(), Some(green(12)));
        assert_eq!(monitor.last_pnl(), Some(1234.50));
    }

    #[tokio::test]
    async fn test_portfolio_failure_keeps_previous_command() {
        let portfolio = FakePortfolio::with(vec![
            Ok(5000.0),
            Err(MonitorError::network("broker", "connection refused")),
        ]);
        let bulb = FakeBulb::default();
        let mut monitor = monitor(&portfolio, &bulb, ist(10, 0));

        monitor.run_once().await.unwrap();
        let err = monitor.run_once().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);
        assert_eq!(monitor.last_command(), Some(green(50)));
        assert_eq!(monitor.last_pnl(), Some(5000.0));
        assert_eq!(bulb.applied().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bulb_failure_does_not_record_command() {
        let portfolio = FakePortfolio::with(vec![Ok(-3000.0)]);
        let bulb = FakeBulb::default();
        bulb.failing.store(true, Ordering::SeqCst);
        let mut monitor = monitor(&portfolio, &bulb, ist(10, 0));

        assert!(monitor.run_once().await.is_err());
        assert_eq!(monitor.last_command(), None);
        assert_eq!(monitor.last_pnl(), None);
    }

    #[tokio::test]
    async fn test_tick_outside_hours_makes_no_calls() {
        let portfolio = FakePortfolio::with(vec![Ok(100.0)]);
        let bulb = FakeBulb::default();

        let mut early = monitor(&portfolio, &bulb, ist(8, 0));
        assert_eq!(early.tick().await, Duration::from_secs(300));

        let mut almost = monitor(&portfolio, &bulb, ist(9, 12));
        assert_eq!(almost.tick().await, Duration::from_secs(180));

        let mut late = monitor(&portfolio, &bulb, ist(16, 0));
        assert_eq!(late.tick().await, Duration::from_secs(300));

        assert_eq!(portfolio.calls(), 0);
        assert!(bulb.applied().await.is_empty());
    }

    #[tokio::test]
    async fn test_tick_swallows_failures_and_recovers() {
        let portfolio = FakePortfolio::with(vec![
            Err(MonitorError::AuthExpired {
                message: "Incorrect `api_key` or `access_token`.".to_string(),
            }),
            Ok(-12_000.0),
        ]);
        let bulb = FakeBulb::default();
        let mut monitor = monitor(&portfolio, &bulb, ist(11, 0));

        assert_eq!(monitor.tick().await, Duration::from_secs(60));
        assert_eq!(monitor.last_command(), None);

        assert_eq!(monitor.tick().await, Duration::from_secs(60));
        assert_eq!(
            monitor.last_command(),
            Some(ColorCommand::Set {
                color: Color::Red,
                brightness: 100
            })
        );
        assert_eq!(portfolio.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forever_polls_until_shutdown_then_turns_off() {
        let portfolio = FakePortfolio::with(vec![Ok(0.0), Ok(2500.0), Ok(10_000.0)]);
        let bulb = FakeBulb::default();
        let mut monitor = monitor(&portfolio, &bulb, ist(12, 0));

        monitor
            .run_forever(tokio::time::sleep(Duration::from_secs(150)))
            .await;

        assert_eq!(portfolio.calls(), 3);
        assert_eq!(
            bulb.applied().await,
            vec![
                ColorCommand::Set {
                    color: Color::Blue,
                    brightness: 50
                },
                green(25),
                green(100),
                ColorCommand::Off,
            ]
        );
        assert_eq!(monitor.last_command(), Some(ColorCommand::Off));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forever_closed_market_only_sends_final_off() {
        let portfolio = FakePortfolio::default();
        let bulb = FakeBulb::default();
        let mut monitor = monitor(&portfolio, &bulb, ist(20, 0));

        monitor
            .run_forever(tokio::time::sleep(Duration::from_secs(3600)))
            .await;

        assert_eq!(portfolio.calls(), 0);
        assert_eq!(bulb.applied().await, vec![ColorCommand::Off]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_failure_is_not_fatal() {
        let portfolio = FakePortfolio::default();
        let bulb = FakeBulb::default();
        bulb.failing.store(true, Ordering::SeqCst);
        let mut monitor = monitor(&portfolio, &bulb, ist(20, 0));

        monitor.run_forever(std::future::ready(())).await;

        assert_eq!(monitor.last_command(), None);
    }
}
