//! Read-only tea catalog: brewing parameters per tea and brewing style.
//!
//! The built-in table is embedded from `teas.json` and parsed once. Entries
//! are not validated here; a malformed entry is rejected when a
//! [`BrewPlan`](crate::timer::BrewPlan) is built from it.

use std::{fmt, str::FromStr, sync::OnceLock};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const BUILTIN_TEAS: &str = include_str!("teas.json");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TeaCategory {
    Green,
    Black,
    Oolong,
    White,
    Puer,
    Yellow,
    Herbal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrewingStyle {
    #[default]
    Western,
    Gongfu,
}

impl BrewingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrewingStyle::Western => "western",
            BrewingStyle::Gongfu => "gongfu",
        }
    }
}

impl fmt::Display for BrewingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrewingStyle {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "western" => Ok(BrewingStyle::Western),
            "gongfu" | "gong-fu" => Ok(BrewingStyle::Gongfu),
            other => Err(anyhow!("unknown brewing style '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GongfuParams {
    pub temperature: u32,
    pub first_steep_time: u32,
    pub tea_amount: String,
    pub max_infusions: u32,
    #[serde(default)]
    pub rinse_required: bool,
    pub rinse_time: Option<u32>,
    pub rinse_count: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeaType {
    pub id: String,
    pub name: String,
    pub category: TeaCategory,
    pub temperature: u32,
    pub steep_time: u32,
    pub tea_amount: String,
    pub description: String,
    pub brewing_notes: Option<String>,
    pub gongfu: Option<GongfuParams>,
}

/// Rinse step recommended before the first gong-fu infusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rinse {
    pub count: u32,
    pub duration_secs: u32,
}

/// Brewing parameters for one tea resolved against one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewParameters {
    pub style: BrewingStyle,
    pub temperature_c: u32,
    /// Western: the single steep. Gong-fu: the first infusion.
    pub steep_time_secs: u32,
    pub tea_amount: String,
    /// Always 1 for western brews.
    pub max_infusions: u32,
    pub rinse: Option<Rinse>,
}

impl TeaType {
    /// Parameters for `style`, or `None` when the tea has no gong-fu entry.
    pub fn parameters(&self, style: BrewingStyle) -> Option<BrewParameters> {
        match style {
            BrewingStyle::Western => Some(BrewParameters {
                style,
                temperature_c: self.temperature,
                steep_time_secs: self.steep_time,
                tea_amount: self.tea_amount.clone(),
                max_infusions: 1,
                rinse: None,
            }),
            BrewingStyle::Gongfu => self.gongfu.as_ref().map(|gongfu| BrewParameters {
                style,
                temperature_c: gongfu.temperature,
                steep_time_secs: gongfu.first_steep_time,
                tea_amount: gongfu.tea_amount.clone(),
                max_infusions: gongfu.max_infusions,
                rinse: gongfu.rinse_required.then(|| Rinse {
                    count: gongfu.rinse_count.unwrap_or(1),
                    duration_secs: gongfu.rinse_time.unwrap_or(0),
                }),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    teas: Vec<TeaType>,
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self> {
        let teas: Vec<TeaType> =
            serde_json::from_str(raw).context("failed to parse tea catalog")?;
        Ok(Self { teas })
    }

    /// The embedded catalog, parsed on first use.
    pub fn builtin() -> Result<&'static Catalog> {
        static BUILTIN: OnceLock<Catalog> = OnceLock::new();
        if let Some(catalog) = BUILTIN.get() {
            return Ok(catalog);
        }
        let parsed = Catalog::from_json(BUILTIN_TEAS)?;
        Ok(BUILTIN.get_or_init(|| parsed))
    }

    pub fn teas(&self) -> &[TeaType] {
        &self.teas
    }

    pub fn get_tea_by_id(&self, id: &str) -> Option<&TeaType> {
        self.teas.iter().find(|tea| tea.id == id)
    }
}

pub fn celsius_to_fahrenheit(celsius: u32) -> u32 {
    (f64::from(celsius) * 9.0 / 5.0 + 32.0).round() as u32
}

/// `80` → `"80°C (176°F)"`
pub fn format_temperature(celsius: u32) -> String {
    format!("{}°C ({}°F)", celsius, celsius_to_fahrenheit(celsius))
}
