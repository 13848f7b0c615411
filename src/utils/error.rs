use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Broker session expired: {message}")]
    AuthExpired { message: String },

    #[error("{service} unreachable: {message}")]
    NetworkUnavailable { service: String, message: String },

    #[error("Broker API returned {status}: {message}")]
    BrokerApi { status: u16, message: String },

    #[error("Unexpected broker response: {message}")]
    BrokerResponse { message: String },

    #[error("Bulb rejected command: {message}")]
    BulbRejected { message: String },

    #[error("Invalid configuration for '{field}' (value: '{value}'): {reason}")]
    ConfigInvalid {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 錯誤分類，決定日誌層級與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthExpired,
    NetworkUnavailable,
    ConfigInvalid,
    Other,
}

impl MonitorError {
    pub fn network(service: &str, message: impl Into<String>) -> Self {
        MonitorError::NetworkUnavailable {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_config(
        field: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        MonitorError::ConfigInvalid {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MonitorError::AuthExpired { .. } => ErrorKind::AuthExpired,
            MonitorError::NetworkUnavailable { .. } => ErrorKind::NetworkUnavailable,
            MonitorError::ConfigInvalid { .. } | MonitorError::ConfigParse { .. } => {
                ErrorKind::ConfigInvalid
            }
            _ => ErrorKind::Other,
        }
    }

    /// 下一個輪詢週期是否可能自行恢復
    pub fn is_transient(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::AuthExpired | ErrorKind::ConfigInvalid
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MonitorError::AuthExpired { .. } => {
                "Log in to Kite again and write the new access token to the configured token file"
            }
            MonitorError::NetworkUnavailable { service, .. } if service == "bulb" => {
                "Check that the bulb is powered on and on the same network as this machine"
            }
            MonitorError::NetworkUnavailable { .. } => {
                "Check your internet connection; the next check will retry automatically"
            }
            MonitorError::BrokerApi { .. } | MonitorError::BrokerResponse { .. } => {
                "The broker API misbehaved; the next check will retry automatically"
            }
            MonitorError::BulbRejected { .. } => {
                "Power-cycle the bulb from the WiZ app and verify its IP address"
            }
            MonitorError::ConfigInvalid { .. } | MonitorError::ConfigParse { .. } => {
                "Fix the configuration file (see stock-bulb.example.toml) and restart"
            }
            MonitorError::IoError(_) => "Check file paths and permissions",
            MonitorError::SerializationError(_) => "Report this as a bug",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::ConfigInvalid => 1,
            ErrorKind::NetworkUnavailable => 2,
            ErrorKind::AuthExpired => 3,
            ErrorKind::Other => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
