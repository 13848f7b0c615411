use crate::core::color_map::ColorMap;
use crate::core::market_hours::MarketHours;
use crate::utils::error::{MonitorError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const KITE_BASE_URL: &str = "https://api.kite.trade";
pub const WIZ_PORT: u16 = 38899;
pub const DEFAULT_TOKEN_FILE: &str = "access_token.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub broker: BrokerConfig,
    pub bulb: BulbConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub api_key: String,
    pub access_token: Option<String>,
    pub access_token_file: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulbConfig {
    pub ip: String,
    pub port: Option<u16>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub timezone: String,
    pub market_open: String,
    pub market_close: String,
    pub weekdays_only: Option<bool>,
    pub check_interval_seconds: Option<u64>,
    pub closed_check_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub huge_profit: Option<f64>,
    pub huge_loss: Option<f64>,
    pub break_even_band: Option<f64>,
    pub min_brightness: Option<u8>,
    pub max_brightness: Option<u8>,
    pub break_even_brightness: Option<u8>,
    pub significant_change: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

/// access token 來源
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    Inline(String),
    File(PathBuf),
}

impl MonitorConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MonitorError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MonitorError::ConfigParse {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KITE_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MonitorError::ConfigParse {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("broker.api_key", &self.broker.api_key)?;
        if self.broker.api_key.contains("${") {
            return Err(MonitorError::invalid_config(
                "broker.api_key",
                &self.broker.api_key,
                "Environment variable is not set",
            ));
        }
        validation::validate_url("broker.base_url", self.broker.base_url())?;
        validation::validate_positive_number(
            "broker.timeout_seconds",
            self.broker.timeout().as_secs(),
            1,
        )?;
        if let TokenSource::Inline(token) = self.broker.token_source() {
            validation::validate_non_empty_string("broker.access_token", &token)?;
        }

        self.bulb.socket_addr()?;
        if self.bulb.port() == 0 {
            return Err(MonitorError::invalid_config(
                "bulb.port",
                0,
                "Port cannot be zero",
            ));
        }
        validation::validate_positive_number(
            "bulb.timeout_seconds",
            self.bulb.timeout().as_secs(),
            1,
        )?;

        MarketHours::from_config(&self.schedule)?;
        validation::validate_positive_number(
            "schedule.check_interval_seconds",
            self.schedule.check_interval().as_secs(),
            1,
        )?;
        validation::validate_positive_number(
            "schedule.closed_check_interval_seconds",
            self.schedule.closed_check_interval().as_secs(),
            1,
        )?;

        ColorMap::from_config(&self.thresholds)?;
        if self.thresholds.significant_change() < 0.0 {
            return Err(MonitorError::invalid_config(
                "thresholds.significant_change",
                self.thresholds.significant_change(),
                "Value cannot be negative",
            ));
        }

        validation::validate_log_level("logging.level", self.log_level())?;

        Ok(())
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl BrokerConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(KITE_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(10))
    }

    /// 內嵌 token 優先，否則讀取 token 檔案
    pub fn token_source(&self) -> TokenSource {
        match &self.access_token {
            Some(token) => TokenSource::Inline(token.clone()),
            None => TokenSource::File(PathBuf::from(
                self.access_token_file
                    .as_deref()
                    .unwrap_or(DEFAULT_TOKEN_FILE),
            )),
        }
    }
}

impl BulbConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(WIZ_PORT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(3))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip = validation::validate_ip_address("bulb.ip", &self.ip)?;
        Ok(SocketAddr::new(ip, self.port()))
    }
}

impl ScheduleConfig {
    pub fn weekdays_only(&self) -> bool {
        self.weekdays_only.unwrap_or(true)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.unwrap_or(60))
    }

    pub fn closed_check_interval(&self) -> Duration {
        Duration::from_secs(self.closed_check_interval_seconds.unwrap_or(300))
    }
}

impl ThresholdConfig {
    pub fn significant_change(&self) -> f64 {
        self.significant_change.unwrap_or(1000.0)
    }
}

impl Validate for MonitorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
