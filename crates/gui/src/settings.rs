//! Application settings and measurement-unit formatting

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

const SETTINGS_FILE: &str = "settings.json";

// ── Units ───────────────────────────────────────────────────

/// Length unit used for display; scene values are millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    Millimeters,
    Centimeters,
    Meters,
    Inches,
    Feet,
}

impl LengthUnit {
    pub fn abbrev(&self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "mm",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Meters => "m",
            LengthUnit::Inches => "in",
            LengthUnit::Feet => "ft",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "Millimeters",
            LengthUnit::Centimeters => "Centimeters",
            LengthUnit::Meters => "Meters",
            LengthUnit::Inches => "Inches",
            LengthUnit::Feet => "Feet",
        }
    }

    /// Millimeters per one unit
    pub fn to_mm(&self) -> f64 {
        match self {
            LengthUnit::Millimeters => 1.0,
            LengthUnit::Centimeters => 10.0,
            LengthUnit::Meters => 1000.0,
            LengthUnit::Inches => 25.4,
            LengthUnit::Feet => 304.8,
        }
    }

    pub fn all() -> &'static [LengthUnit] {
        &[
            LengthUnit::Millimeters,
            LengthUnit::Centimeters,
            LengthUnit::Meters,
            LengthUnit::Inches,
            LengthUnit::Feet,
        ]
    }

    /// Imperial units are conventionally written without a leading zero
    fn prefers_leading_zero(&self) -> bool {
        !matches!(self, LengthUnit::Inches | LengthUnit::Feet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegreesMode {
    #[default]
    Degrees,
    DegreesMinutes,
    DegreesMinutesSeconds,
}

impl DegreesMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            DegreesMode::Degrees => "Degrees",
            DegreesMode::DegreesMinutes => "Degrees, minutes",
            DegreesMode::DegreesMinutesSeconds => "Degrees, minutes, seconds",
        }
    }

    fn preferred_precision(&self) -> usize {
        match self {
            DegreesMode::Degrees => 1,
            DegreesMode::DegreesMinutes | DegreesMode::DegreesMinutesSeconds => 0,
        }
    }
}

/// What kind of unit setting changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitChange {
    Length,
    Angle,
}

/// Measurement-unit configuration of the UI.
///
/// Setters that alter the length unit or the angle mode notify
/// [`UnitSettings::changed`]. Clones start without subscribers.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSettings {
    /// `0.1` when set, `.1` otherwise
    pub show_leading_zero: bool,
    pub thousands_separator: Option<char>,
    ui_length_unit: Option<LengthUnit>,
    degrees_mode: DegreesMode,
    pub length_precision: usize,
    pub angle_precision: usize,
    pub ratio_precision: usize,
    #[serde(skip)]
    changed: Signal<UnitChange>,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            show_leading_zero: true,
            thousands_separator: None,
            ui_length_unit: Some(LengthUnit::Millimeters),
            degrees_mode: DegreesMode::Degrees,
            length_precision: 3,
            angle_precision: 1,
            ratio_precision: 2,
            changed: Signal::new(),
        }
    }
}

impl Clone for UnitSettings {
    fn clone(&self) -> Self {
        Self {
            show_leading_zero: self.show_leading_zero,
            thousands_separator: self.thousands_separator,
            ui_length_unit: self.ui_length_unit,
            degrees_mode: self.degrees_mode,
            length_precision: self.length_precision,
            angle_precision: self.angle_precision,
            ratio_precision: self.ratio_precision,
            changed: Signal::new(),
        }
    }
}

impl UnitSettings {
    pub fn changed(&self) -> &Signal<UnitChange> {
        &self.changed
    }

    /// Restore defaults; subscribers stay connected and are notified of both
    /// length and angle changes.
    pub fn reset_to_defaults(&mut self) {
        let defaults = Self::default();
        self.show_leading_zero = defaults.show_leading_zero;
        self.thousands_separator = defaults.thousands_separator;
        self.ui_length_unit = defaults.ui_length_unit;
        self.degrees_mode = defaults.degrees_mode;
        self.length_precision = defaults.length_precision;
        self.angle_precision = defaults.angle_precision;
        self.ratio_precision = defaults.ratio_precision;
        self.changed.emit(&UnitChange::Length);
        self.changed.emit(&UnitChange::Angle);
    }

    /// `None` means values are shown without a unit
    pub fn ui_length_unit(&self) -> Option<LengthUnit> {
        self.ui_length_unit
    }

    pub fn set_ui_length_unit(&mut self, unit: Option<LengthUnit>, set_preferred_leading_zero: bool) {
        if set_preferred_leading_zero {
            self.show_leading_zero = unit.is_none_or(|u| u.prefers_leading_zero());
        }
        if self.ui_length_unit != unit {
            self.ui_length_unit = unit;
            self.changed.emit(&UnitChange::Length);
        }
    }

    pub fn degrees_mode(&self) -> DegreesMode {
        self.degrees_mode
    }

    pub fn set_degrees_mode(&mut self, mode: DegreesMode, set_preferred_precision: bool) {
        if set_preferred_precision {
            self.angle_precision = mode.preferred_precision();
        }
        if self.degrees_mode != mode {
            self.degrees_mode = mode;
            self.changed.emit(&UnitChange::Angle);
        }
    }

    // ── Formatting ──────────────────────────────────────────

    /// Format a length given in millimeters.
    pub fn format_length(&self, mm: f64) -> String {
        match self.ui_length_unit {
            Some(unit) => format!(
                "{} {}",
                self.format_number(mm / unit.to_mm(), self.length_precision),
                unit.abbrev()
            ),
            None => self.format_number(mm, self.length_precision),
        }
    }

    /// Format an angle given in radians.
    pub fn format_angle(&self, radians: f64) -> String {
        let degrees = radians.to_degrees();
        let sign = if degrees < 0.0 { "-" } else { "" };
        let abs = degrees.abs();
        match self.degrees_mode {
            DegreesMode::Degrees => format!("{}°", self.format_number(degrees, self.angle_precision)),
            DegreesMode::DegreesMinutes => {
                let (mut whole, minutes) = split_sexagesimal(abs);
                let mut minutes = round_to(minutes, self.angle_precision);
                if minutes >= 60.0 {
                    whole += 1;
                    minutes -= 60.0;
                }
                format!("{sign}{whole}°{}'", self.format_number(minutes, self.angle_precision))
            }
            DegreesMode::DegreesMinutesSeconds => {
                let (mut whole, minutes) = split_sexagesimal(abs);
                let (mut minutes, seconds) = split_sexagesimal(minutes);
                let mut seconds = round_to(seconds, self.angle_precision);
                if seconds >= 60.0 {
                    minutes += 1;
                    seconds -= 60.0;
                }
                if minutes >= 60 {
                    whole += 1;
                    minutes -= 60;
                }
                format!(
                    "{sign}{whole}°{minutes}'{}\"",
                    self.format_number(seconds, self.angle_precision)
                )
            }
        }
    }

    /// Format a dimensionless ratio as a percentage.
    pub fn format_ratio(&self, value: f64) -> String {
        format!("{}%", self.format_number(value * 100.0, self.ratio_precision))
    }

    fn format_number(&self, value: f64, precision: usize) -> String {
        let text = format!("{:.*}", precision, value.abs());
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (text.as_str(), None),
        };

        let mut out = String::new();
        let is_zero = text.chars().all(|c| c == '0' || c == '.');
        if value < 0.0 && !is_zero {
            out.push('-');
        }
        if int_part != "0" || self.show_leading_zero || frac_part.is_none() {
            match self.thousands_separator {
                Some(sep) => out.push_str(&group_thousands(int_part, sep)),
                None => out.push_str(int_part),
            }
        }
        if let Some(frac) = frac_part {
            out.push('.');
            out.push_str(frac);
        }
        out
    }
}

/// Whole units and the remainder in sixtieths
fn split_sexagesimal(value: f64) -> (u64, f64) {
    (value.trunc() as u64, value.fract() * 60.0)
}

fn round_to(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

fn group_thousands(digits: &str, sep: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

// ── Display settings ────────────────────────────────────────

/// Grid display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSettings {
    pub visible: bool,
    /// Cell size in scene units
    pub size: f32,
    /// Number of lines in each direction from origin
    pub range: i32,
    pub opacity: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            visible: true,
            size: 1.0,
            range: 10,
            opacity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisSettings {
    pub visible: bool,
    pub length: f32,
}

impl Default for AxisSettings {
    fn default() -> Self {
        Self {
            visible: true,
            length: 1.5,
        }
    }
}

/// Viewport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportSettings {
    pub background_color: [u8; 3],
    /// Pick tolerance for points and lines, in pixels
    pub pick_tolerance: f32,
    pub antialiasing: bool,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            background_color: [30, 30, 35],
            pick_tolerance: 6.0,
            antialiasing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    pub font_size: f32,
    /// Extra scale applied on top of the window's pixels-per-point
    pub scale: f32,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            scale: 1.0,
        }
    }
}

/// All application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub units: UnitSettings,
    pub grid: GridSettings,
    pub axes: AxisSettings,
    pub viewport: ViewportSettings,
    pub ui: UiSettings,
}

impl AppSettings {
    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "meshview", "meshview")
    }

    /// Load settings from the config directory, or defaults if missing
    pub fn load() -> Self {
        let Some(dirs) = Self::project_dirs() else {
            return Self::default();
        };
        let path = dirs.config_dir().join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring malformed settings {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) {
        let Some(dirs) = Self::project_dirs() else {
            return;
        };
        let config_dir = dirs.config_dir();
        if let Err(e) = std::fs::create_dir_all(config_dir) {
            tracing::warn!("Cannot create {}: {e}", config_dir.display());
            return;
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(config_dir.join(SETTINGS_FILE), json) {
                    tracing::warn!("Failed to save settings: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize settings: {e}"),
        }
    }
}
