use crate::config::ScheduleConfig;
use crate::utils::error::{MonitorError, Result};
use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    Open,
    BeforeOpen,
    AfterClose,
    NonTradingDay,
}

/// 交易時段 (含週末判斷)；開盤與收盤時間皆包含在內
#[derive(Debug, Clone, PartialEq)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub timezone: Tz,
    pub weekdays_only: bool,
}

pub fn parse_hhmm(field_name: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        MonitorError::invalid_config(field_name, value, format!("Expected HH:MM ({})", e))
    })
}

impl MarketHours {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let timezone = config.timezone.trim().parse::<Tz>().map_err(|e| {
            MonitorError::invalid_config(
                "schedule.timezone",
                &config.timezone,
                format!("Unknown timezone: {}", e),
            )
        })?;
        let open = parse_hhmm("schedule.market_open", &config.market_open)?;
        let close = parse_hhmm("schedule.market_close", &config.market_close)?;

        if open >= close {
            return Err(MonitorError::invalid_config(
                "schedule.market_close",
                &config.market_close,
                format!("Must be later than market_open ({})", config.market_open),
            ));
        }

        Ok(Self {
            open,
            close,
            timezone,
            weekdays_only: config.weekdays_only(),
        })
    }

    fn is_trading_day(&self, weekday: Weekday) -> bool {
        !self.weekdays_only || !matches!(weekday, Weekday::Sat | Weekday::Sun)
    }

    pub fn status(&self, now: DateTime<Utc>) -> MarketStatus {
        let local = now.with_timezone(&self.timezone);
        if !self.is_trading_day(local.weekday()) {
            return MarketStatus::NonTradingDay;
        }

        let time = local.time();
        if time < self.open {
            MarketStatus::BeforeOpen
        } else if time > self.close {
            MarketStatus::AfterClose
        } else {
            MarketStatus::Open
        }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == MarketStatus::Open
    }

    /// 距離下一次開盤的時間
    pub fn time_until_open(&self, now: DateTime<Utc>) -> Duration {
        let local = now.with_timezone(&self.timezone);

        for offset in 0..=7 {
            let Some(date) = local.date_naive().checked_add_days(Days::new(offset)) else {
                break;
            };
            if !self.is_trading_day(date.weekday()) {
                continue;
            }
            let Some(candidate) = self
                .timezone
                .from_local_datetime(&date.and_time(self.open))
                .earliest()
            else {
                continue;
            };
            if candidate > local {
                return (candidate - local).to_std().unwrap_or(Duration::ZERO);
            }
        }

        Duration::from_secs(24 * 60 * 60)
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }
}

pub fn format_hm(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    format!("{}h {}m", minutes / 60, minutes % 60)
}
