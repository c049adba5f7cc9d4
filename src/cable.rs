//! Cable taxonomy.
//!
//! `CableType` is the closed set of connector kinds the classifier can report.
//! The remaining types describe a physical cable in the local collection.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// Connector kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableType {
    UsbA,
    UsbC,
    Lightning,
    MicroUsb,
    MiniUsb,
    Usb30,
    Thunderbolt,
}

impl CableType {
    /// All variants in declaration order.
    ///
    /// This order is also the traversal order of the alternative pool.
    pub const ALL: [CableType; 7] = [
        CableType::UsbA,
        CableType::UsbC,
        CableType::Lightning,
        CableType::MicroUsb,
        CableType::MiniUsb,
        CableType::Usb30,
        CableType::Thunderbolt,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            CableType::UsbA => "USB-A",
            CableType::UsbC => "USB-C",
            CableType::Lightning => "Lightning",
            CableType::MicroUsb => "Micro-USB",
            CableType::MiniUsb => "Mini-USB",
            CableType::Usb30 => "USB 3.0",
            CableType::Thunderbolt => "Thunderbolt",
        }
    }

    /// Nominal maximum transfer speed, human readable.
    pub fn max_speed(self) -> &'static str {
        match self {
            CableType::UsbA => "480 Mbps",
            CableType::UsbC => "10 Gbps",
            CableType::Lightning => "480 Mbps",
            CableType::MicroUsb => "480 Mbps",
            CableType::MiniUsb => "480 Mbps",
            CableType::Usb30 => "5 Gbps",
            CableType::Thunderbolt => "40 Gbps",
        }
    }

    /// Nominal maximum transfer speed in megabits per second.
    pub fn max_speed_mbps(self) -> u32 {
        match self {
            CableType::UsbA | CableType::Lightning | CableType::MicroUsb | CableType::MiniUsb => {
                480
            }
            CableType::UsbC => 10_000,
            CableType::Usb30 => 5_000,
            CableType::Thunderbolt => 40_000,
        }
    }

    /// Position in [`CableType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    fn identifier(self) -> &'static str {
        match self {
            CableType::UsbA => "usb_a",
            CableType::UsbC => "usb_c",
            CableType::Lightning => "lightning",
            CableType::MicroUsb => "micro_usb",
            CableType::MiniUsb => "mini_usb",
            CableType::Usb30 => "usb30",
            CableType::Thunderbolt => "thunderbolt",
        }
    }
}

impl fmt::Display for CableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for CableType {
    type Err = anyhow::Error;

    /// Accepts display names ("USB-C") and identifiers ("usb_c"), case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        CableType::ALL
            .into_iter()
            .find(|t| {
                t.display_name().eq_ignore_ascii_case(needle)
                    || t.identifier().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| anyhow!("unknown cable type '{}'", s))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableLength {
    Short,
    Medium,
    Long,
    ExtraLong,
    #[default]
    Unknown,
}

impl CableLength {
    pub fn label(self) -> &'static str {
        match self {
            CableLength::Short => "< 1ft",
            CableLength::Medium => "1-3ft",
            CableLength::Long => "3-6ft",
            CableLength::ExtraLong => "> 6ft",
            CableLength::Unknown => "Unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableCondition {
    New,
    LikeNew,
    #[default]
    Good,
    Fair,
    Poor,
}

impl CableCondition {
    pub fn label(self) -> &'static str {
        match self {
            CableCondition::New => "New",
            CableCondition::LikeNew => "Like New",
            CableCondition::Good => "Good",
            CableCondition::Fair => "Fair",
            CableCondition::Poor => "Poor",
        }
    }
}

/// A physical cable in the local collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cable {
    pub connector: CableType,
    /// Far-end connector, when it differs from `connector`.
    pub other_end: Option<CableType>,
    pub length: CableLength,
    pub condition: CableCondition,
    pub color: String,
    pub brand: Option<String>,
    pub notes: Option<String>,
    pub added_at: SystemTime,
    pub available: bool,
}

impl Cable {
    pub fn new(connector: CableType) -> Self {
        Self {
            connector,
            other_end: None,
            length: CableLength::default(),
            condition: CableCondition::default(),
            color: "Black".to_string(),
            brand: None,
            notes: None,
            added_at: SystemTime::now(),
            available: true,
        }
    }

    pub fn with_other_end(mut self, other_end: CableType) -> Self {
        self.other_end = Some(other_end);
        self
    }

    pub fn with_length(mut self, length: CableLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_condition(mut self, condition: CableCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// "USB-C to Lightning", or just the connector name for same-ended cables.
    pub fn display_name(&self) -> String {
        match self.other_end {
            Some(other) => format!("{} to {}", self.connector, other),
            None => self.connector.to_string(),
        }
    }

    /// Display name plus known length and brand.
    pub fn description(&self) -> String {
        let mut desc = self.display_name();
        if self.length != CableLength::Unknown {
            desc.push_str(&format!(" ({})", self.length.label()));
        }
        if let Some(brand) = &self.brand {
            desc.push_str(&format!(" - {}", brand));
        }
        desc
    }
}
