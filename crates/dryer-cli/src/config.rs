//! Configuration loading and management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use dryer_core::enrich::MODE_FLAGS;
use dryer_core::pivot::default_tables;
use dryer_core::{
    AggregationProfile, ClassificationRules, CoreError, EnrichOptions, GreedyNearest, GroupSchema,
    PivotOptions, Reduction, minutes_offset, seconds_offset,
};
use dryer_io::PertenOptions;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Alarm channels of the controller.
pub const ALARM_CHANNELS: [&str; 7] = [
    "MIDDLE_LEVEL_ALARM",
    "HIGH_LEVEL_ALARM",
    "BURNER_HIGH_ALARM",
    "HOPPER_FULL_ALARM",
    "LOW_AIR_PRESSURE_ALARM",
    "GENERAL_ALARM",
    "AIR_OVERHEATED",
];

/// Fan set points, logged in hundredths of a hertz.
const FAN_CHANNELS: [&str; 2] = ["UPPER_FAN_SET_HZ", "LOWER_FAN_SET_HZ"];

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory that commands write to unless given an explicit output.
    pub output_dir: PathBuf,
    pub classification: ClassificationRules,
    pub reconcile: ReconcileConfig,
    /// Named aggregation profiles.
    pub aggregation: BTreeMap<String, AggregationProfile>,
    pub alarms: AlarmConfig,
    /// Mode flags in resolution order.
    pub modes: Vec<String>,
    pub pivot: PivotConfig,
    pub perten: PertenOptions,
}

/// Reconciler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub groups: GroupSchema,
    /// Grain-change cooldown; unset disables it.
    #[serde(default)]
    pub cooldown_minutes: Option<i64>,
    /// Clock correction added to lab reading timestamps.
    #[serde(default)]
    pub event_offset_seconds: i64,
    pub mass_factor: f64,
}

impl ReconcileConfig {
    pub fn strategy(&self) -> Result<GreedyNearest, CoreError> {
        Ok(GreedyNearest {
            cooldown: self.cooldown_minutes.map(minutes_offset).transpose()?,
        })
    }

    pub fn event_offset(&self) -> Result<Duration, CoreError> {
        seconds_offset(self.event_offset_seconds)
    }
}

/// Alarm segmentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    pub channels: Vec<String>,
    /// Clock correction added to segment start and end.
    #[serde(default)]
    pub offset_minutes: i64,
}

impl AlarmConfig {
    pub fn offset(&self) -> Result<Duration, CoreError> {
        minutes_offset(self.offset_minutes)
    }
}

/// Controller log pivot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// Table name to the channels it holds.
    pub tables: BTreeMap<String, Vec<String>>,
    pub duration_channels: Vec<String>,
    #[serde(default)]
    pub window: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl PivotConfig {
    pub fn options(&self) -> PivotOptions {
        PivotOptions {
            window: self.window,
            duration_channels: self.duration_channels.clone(),
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn default_profiles() -> BTreeMap<String, AggregationProfile> {
    let settings = AggregationProfile::with_channels(
        FAN_CHANNELS,
        Reduction::ScaleAndRound {
            factor: 0.01,
            decimals: 1,
        },
    );
    BTreeMap::from([
        ("default".to_string(), AggregationProfile::default()),
        (
            "mode".to_string(),
            AggregationProfile::with_channels(MODE_FLAGS, Reduction::LastNonEmpty),
        ),
        (
            "alarms".to_string(),
            AggregationProfile::with_channels(ALARM_CHANNELS, Reduction::LogicalOr),
        ),
        ("settings".to_string(), settings),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            classification: ClassificationRules::default(),
            reconcile: ReconcileConfig {
                groups: GroupSchema::default(),
                cooldown_minutes: None,
                event_offset_seconds: 0,
                mass_factor: EnrichOptions::default().mass_factor,
            },
            aggregation: default_profiles(),
            alarms: AlarmConfig {
                channels: strings(&ALARM_CHANNELS),
                offset_minutes: 0,
            },
            modes: strings(&MODE_FLAGS),
            pivot: PivotConfig {
                tables: default_tables(),
                duration_channels: PivotOptions::default().duration_channels,
                window: None,
            },
            perten: PertenOptions::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources override earlier ones: built-in defaults, the user
    /// config file, `config_path`, then `DRYER_*` environment variables
    /// (`__` separates nested keys).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("DRYER_").split("__"));

        figment.extract()
    }

    /// Returns the aggregation profile called `name`.
    pub fn profile(&self, name: &str) -> Option<&AggregationProfile> {
        self.aggregation.get(name)
    }

    /// Derived-column settings for the reconciled table.
    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            mass_factor: self.reconcile.mass_factor,
            mode_flags: self.modes.clone(),
            ..EnrichOptions::default()
        }
    }

    /// `explicit` if given, otherwise `file_name` inside the output directory.
    pub fn output_path(&self, explicit: Option<&Path>, file_name: &str) -> PathBuf {
        explicit.map_or_else(|| self.output_dir.join(file_name), Path::to_path_buf)
    }
}

/// Returns the platform-specific config directory for dryer.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dryer"))
}
