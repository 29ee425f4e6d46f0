use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Midtrans,
    Duitku,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Midtrans => "midtrans",
            GatewayKind::Duitku => "duitku",
        }
    }
}

impl Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midtrans" => Ok(GatewayKind::Midtrans),
            "duitku" => Ok(GatewayKind::Duitku),
            other => Err(anyhow::anyhow!("unsupported payment provider: {other}")),
        }
    }
}
