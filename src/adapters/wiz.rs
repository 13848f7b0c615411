use crate::config::BulbConfig;
use crate::domain::model::{BulbState, ColorCommand};
use crate::domain::ports::BulbController;
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

const SERVICE: &str = "bulb";

/// WiZ 燈泡可接受的亮度範圍
const MIN_DIMMING: u8 = 10;
const MAX_DIMMING: u8 = 100;

/// WiZ 本地 UDP 控制 (JSON, port 38899)
#[derive(Debug, Clone)]
pub struct WizBulb {
    addr: SocketAddr,
    timeout: Duration,
}

impl WizBulb {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    pub fn from_config(config: &BulbConfig) -> Result<Self> {
        Ok(Self::new(config.socket_addr()?, config.timeout()))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn pilot_params(command: &ColorCommand) -> Value {
        match command {
            ColorCommand::Set { color, brightness } => {
                let (r, g, b) = color.rgb();
                json!({
                    "r": r,
                    "g": g,
                    "b": b,
                    "dimming": (*brightness).clamp(MIN_DIMMING, MAX_DIMMING),
                    "state": true
                })
            }
            ColorCommand::Off => json!({ "state": false }),
        }
    }

    /// 送出一個請求並等待回覆；逾時回傳 `None`
    async fn exchange(&self, message: &Value) -> Result<Option<Value>> {
        let bind_addr = if self.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| MonitorError::network(SERVICE, e.to_string()))?;
        socket
            .connect(self.addr)
            .await
            .map_err(|e| MonitorError::network(SERVICE, e.to_string()))?;

        let payload = serde_json::to_vec(message)?;
        tracing::debug!("💡 Sending {} bytes to {}", payload.len(), self.addr);
        socket
            .send(&payload)
            .await
            .map_err(|e| MonitorError::network(SERVICE, e.to_string()))?;

        let mut buf = [0u8; 1024];
        let len = match tokio::time::timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => return Err(MonitorError::network(SERVICE, e.to_string())),
            Err(_) => return Ok(None),
        };

        let reply: Value = serde_json::from_slice(&buf[..len])?;
        if let Some(error) = reply.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(MonitorError::BulbRejected { message });
        }
        Ok(Some(reply))
    }
}

#[async_trait]
impl BulbController for WizBulb {
    async fn apply(&self, command: &ColorCommand) -> Result<()> {
        let message = json!({
            "method": "setPilot",
            "params": Self::pilot_params(command)
        });

        if self.exchange(&message).await?.is_none() {
            // 燈泡常常不回覆但已套用
            tracing::warn!("⚠️ Bulb response timeout (command may have worked)");
        }
        Ok(())
    }

    async fn state(&self) -> Result<BulbState> {
        let message = json!({ "method": "getPilot", "params": {} });

        let reply = self.exchange(&message).await?.ok_or_else(|| {
            MonitorError::network(
                SERVICE,
                format!("no reply from {} within {:?}", self.addr, self.timeout),
            )
        })?;

        let result = reply
            .get("result")
            .cloned()
            .ok_or_else(|| MonitorError::BulbRejected {
                message: "getPilot reply has no result".to_string(),
            })?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Color;
    use crate::utils::error::ErrorKind;
    use tokio::task::JoinHandle;

    /// 假燈泡：接收一個封包，可選擇回覆，回傳收到的請求
    async fn fake_bulb(reply: Option<Value>) -> (SocketAddr, JoinHandle<Value>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
            let request: Value = serde_json::from_slice(&buf[..len]).unwrap();
            if let Some(reply) = reply {
                socket
                    .send_to(&serde_json::to_vec(&reply).unwrap(), peer)
                    .await
                    .unwrap();
            }
            request
        });

        (addr, handle)
    }

    fn ok_reply() -> Value {
        json!({"method": "setPilot", "env": "pro", "result": {"success": true}})
    }

    #[tokio::test]
    async fn test_set_color_sends_set_pilot() {
        let (addr, handle) = fake_bulb(Some(ok_reply())).await;
        let bulb = WizBulb::new(addr, Duration::from_secs(2));

        bulb.apply(&ColorCommand::Set {
            color: Color::Green,
            brightness: 73,
        })
        .await
        .unwrap();

        let request = handle.await.unwrap();
        assert_eq!(
            request,
            json!({
                "method": "setPilot",
                "params": {"r": 0, "g": 255, "b": 0, "dimming": 73, "state": true}
            })
        );
    }

    #[tokio::test]
    async fn test_dimming_is_clamped_to_bulb_range() {
        let (addr, handle) = fake_bulb(Some(ok_reply())).await;
        let bulb = WizBulb::new(addr, Duration::from_secs(2));

        bulb.apply(&ColorCommand::Set {
            color: Color::Red,
            brightness: 3,
        })
        .await
        .unwrap();

        let request = handle.await.unwrap();
        assert_eq!(request["params"]["dimming"], 10);
        assert_eq!(request["params"]["r"], 255);
    }

    #[tokio::test]
    async fn test_off_command() {
        let (addr, handle) = fake_bulb(Some(ok_reply())).await;
        let bulb = WizBulb::new(addr, Duration::from_secs(2));

        bulb.apply(&ColorCommand::Off).await.unwrap();

        let request = handle.await.unwrap();
        assert_eq!(
            request,
            json!({"method": "setPilot", "params": {"state": false}})
        );
    }

    #[tokio::test]
    async fn test_silent_bulb_is_treated_as_applied() {
        let (addr, handle) = fake_bulb(None).await;
        let bulb = WizBulb::new(addr, Duration::from_millis(200));

        let result = bulb
            .apply(&ColorCommand::Set {
                color: Color::Blue,
                brightness: 50,
            })
            .await;

        assert!(result.is_ok());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_reply_is_rejected() {
        let reply = json!({
            "method": "setPilot",
            "env": "pro",
            "error": {"code": -32600, "message": "Invalid Request"}
        });
        let (addr, _handle) = fake_bulb(Some(reply)).await;
        let bulb = WizBulb::new(addr, Duration::from_secs(2));

        let err = bulb.apply(&ColorCommand::Off).await.unwrap_err();

        assert!(matches!(err, MonitorError::BulbRejected { ref message } if message == "Invalid Request"));
    }

    #[tokio::test]
    async fn test_state_reads_get_pilot_result() {
        let reply = json!({
            "method": "getPilot",
            "env": "pro",
            "result": {"mac": "a8bb50000000", "rssi": -60, "state": true,
                       "sceneId": 0, "r": 255, "g": 0, "b": 0, "dimming": 80}
        });
        let (addr, handle) = fake_bulb(Some(reply)).await;
        let bulb = WizBulb::new(addr, Duration::from_secs(2));

        let state = bulb.state().await.unwrap();

        assert_eq!(handle.await.unwrap()["method"], "getPilot");
        assert!(state.state);
        assert_eq!(state.dimming, Some(80));
        assert_eq!(state.r, Some(255));
    }

    #[tokio::test]
    async fn test_state_timeout_is_network_unavailable() {
        let (addr, _handle) = fake_bulb(None).await;
        let bulb = WizBulb::new(addr, Duration::from_millis(200));

        let err = bulb.state().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);
    }
}
