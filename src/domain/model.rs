use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 單一持倉 (Kite `net` 部位)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "tradingsymbol")]
    pub symbol: String,
    pub quantity: i64,
    pub average_price: f64,
    pub last_price: f64,
    pub pnl: f64,
    pub value: f64,
}

/// 某一時點的投資組合損益
#[derive(Debug, Clone, PartialEq)]
pub struct PnlSnapshot {
    pub total_pnl: f64,
    pub total_value: f64,
    pub position_count: usize,
    pub profitable_positions: usize,
    pub losing_positions: usize,
}

impl PnlSnapshot {
    pub fn from_positions(positions: &[Position]) -> Self {
        Self {
            total_pnl: positions.iter().map(|p| p.pnl).sum(),
            total_value: positions.iter().map(|p| p.value.abs()).sum(),
            position_count: positions.len(),
            profitable_positions: positions.iter().filter(|p| p.pnl > 0.0).count(),
            losing_positions: positions.iter().filter(|p| p.pnl < 0.0).count(),
        }
    }

    pub fn pnl_percentage(&self) -> f64 {
        if self.total_value > 0.0 {
            self.total_pnl / self.total_value * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
    White,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Orange,
        Color::Purple,
        Color::White,
    ];

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Red => (255, 0, 0),
            Color::Green => (0, 255, 0),
            Color::Blue => (0, 0, 255),
            Color::Yellow => (255, 255, 0),
            Color::Orange => (255, 165, 0),
            Color::Purple => (128, 0, 128),
            Color::White => (255, 255, 255),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Orange => "orange",
            Color::Purple => "purple",
            Color::White => "white",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Color::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown color '{}', expected one of: {}",
                    s,
                    Color::ALL.map(Color::name).join(", ")
                )
            })
    }
}

/// 送往燈泡的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCommand {
    Set { color: Color, brightness: u8 },
    Off,
}

impl ColorCommand {
    pub fn color(&self) -> Option<Color> {
        match self {
            ColorCommand::Set { color, .. } => Some(*color),
            ColorCommand::Off => None,
        }
    }

    pub fn brightness(&self) -> u8 {
        match self {
            ColorCommand::Set { brightness, .. } => *brightness,
            ColorCommand::Off => 0,
        }
    }
}

impl fmt::Display for ColorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorCommand::Set { color, brightness } => {
                write!(f, "{} @ {}%", color.name().to_uppercase(), brightness)
            }
            ColorCommand::Off => f.write_str("OFF"),
        }
    }
}

/// 燈泡回報的狀態 (getPilot)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulbState {
    #[serde(default)]
    pub state: bool,
    pub dimming: Option<u8>,
    pub r: Option<u8>,
    pub g: Option<u8>,
    pub b: Option<u8>,
}
