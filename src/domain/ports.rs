use crate::domain::model::{BulbState, ColorCommand, PnlSnapshot, Position};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait PortfolioClient: Send + Sync {
    async fn fetch_positions(&self) -> Result<Vec<Position>>;

    async fn snapshot(&self) -> Result<PnlSnapshot> {
        let positions = self.fetch_positions().await?;
        Ok(PnlSnapshot::from_positions(&positions))
    }
}

#[async_trait]
pub trait BulbController: Send + Sync {
    async fn apply(&self, command: &ColorCommand) -> Result<()>;
    async fn state(&self) -> Result<BulbState>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
