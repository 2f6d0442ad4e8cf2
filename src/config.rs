use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

/// A 24-bit RGB color, written as `#rrggbb` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pixel value on a 24-bit TrueColor visual.
    pub fn pixel(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub bindings: HashMap<String, String>,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Options of the stack layout. Missing keys keep their defaults.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Border colour for the focused window.
    pub border_focus: Color,
    /// Border colour for un-focused windows.
    pub border_normal: Color,
    pub border_width: u32,
    /// Split default for the left and right column.
    pub autosplit: [bool; 2],
    /// Add new windows to the column with fewer clients.
    pub fair: bool,
    pub margin: u32,
    /// Drop margins and borders while only one column exists.
    pub max_single: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            border_focus: Color::rgb(0x00, 0x00, 0xff),
            border_normal: Color::rgb(0x00, 0x00, 0x00),
            border_width: 1,
            autosplit: [false, false],
            fair: false,
            margin: 0,
            max_single: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        // Default Keybinds
        bindings.insert("Mod+Return".to_string(), "Spawn xterm".to_string());
        bindings.insert("Mod+p".to_string(), "Spawn dmenu_run".to_string());
        bindings.insert("Mod+Shift+q".to_string(), "KillFocused".to_string());
        bindings.insert("Mod+Control+q".to_string(), "Quit".to_string());
        bindings.insert("Mod+Tab".to_string(), "FocusNext".to_string());
        bindings.insert("Mod+Shift+Tab".to_string(), "FocusPrev".to_string());
        bindings.insert("Mod+j".to_string(), "FocusDown".to_string());
        bindings.insert("Mod+k".to_string(), "FocusUp".to_string());
        bindings.insert("Mod+Control+j".to_string(), "ShuffleDown".to_string());
        bindings.insert("Mod+Control+k".to_string(), "ShuffleUp".to_string());
        bindings.insert("Mod+Space".to_string(), "NextColumn".to_string());
        bindings.insert("Mod+Control+Space".to_string(), "PreviousColumn".to_string());
        bindings.insert("Mod+Shift+Space".to_string(), "Rotate".to_string());
        bindings.insert("Mod+Shift+l".to_string(), "ClientToNext".to_string());
        bindings.insert("Mod+Shift+h".to_string(), "ClientToPrevious".to_string());
        bindings.insert("Mod+Shift+Return".to_string(), "ToggleSplit".to_string());
        bindings.insert("Mod+i".to_string(), "Info".to_string());

        // Workspaces 1-9
        for i in 1..=9 {
            bindings.insert(format!("Mod+{}", i), format!("Workspace {}", i));
            bindings.insert(format!("Mod+Shift+{}", i), format!("MoveToWorkspace {}", i));
        }

        Self {
            bindings,
            layout: LayoutConfig::default(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("stackwm").join("stackwm.toml"))
            .unwrap_or_else(|| PathBuf::from("stackwm.toml"))
    }

    /// Loads the user config on top of the defaults, falling back to the
    /// defaults when the file is missing or broken.
    pub fn load() -> Self {
        let config_path = Self::path();

        if !config_path.exists() {
            log::info!("Config not found at {:?}, using defaults", config_path);
            return Self::default();
        }

        match Self::from_file(&config_path) {
            Ok(config) => {
                log::info!("Loaded config from {:?}", config_path);
                log::info!(
                    "Borders: {}px, focus {} normal {}",
                    config.layout.border_width,
                    config.layout.border_focus,
                    config.layout.border_normal
                );
                config
            }
            Err(e) => {
                log::error!("{}", e);
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses `content` and merges its bindings over the default ones.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed = toml::from_str::<Config>(content)?;
        let mut config = Self::default();
        for (key, value) in parsed.bindings {
            config.bindings.insert(key, value);
        }
        config.layout = parsed.layout;
        Ok(config)
    }
}
