use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
pub const APP_NAME: &str = "userdeck";

pub const DEFAULT_API_URL: &str = "https://randomuser.me/api/";
pub const DEFAULT_RESULTS: u32 = 12;
pub const DEFAULT_NATIONALITY: &str = "us";

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the settings came from, `None` when running on defaults.
    pub config_path: Option<PathBuf>,
    pub api: ApiConfig,
    pub keys: Keys,
    pub ui: UiConfig,
    pub photos: PhotoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            api: ApiConfig::default(),
            keys: Keys::default(),
            ui: UiFile::default().into(),
            photos: PhotosFile::default().into(),
        }
    }
}

impl Config {
    /// Where the settings came from, for display.
    pub fn origin(&self) -> String {
        match &self.config_path {
            Some(path) => path.display().to_string(),
            None => "built-in defaults".to_string(),
        }
    }
}

// =============================================================================
// API Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub url: String,
    pub results: u32,
    /// Restrict generated users to one nationality (e.g. "us").
    pub nationality: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            results: DEFAULT_RESULTS,
            nationality: Some(DEFAULT_NATIONALITY.to_string()),
        }
    }
}

// =============================================================================
// Photo Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct PhotoConfig {
    pub enabled: bool,
    pub cache_dir: Option<PathBuf>,
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
    pub gallery: UiGallery,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

#[derive(Debug, Clone)]
pub struct UiGallery {
    pub columns: u16,
    pub card_height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Work everywhere except the search line and popups
    pub global: GlobalKeys,
    /// Keys while typing in the search line
    pub search_input: SearchInputKeys,
    /// Card grid navigation
    pub gallery: GalleryKeys,
    /// Detail modal navigation
    pub modal: ModalKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub search: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchInputKeys {
    pub cancel: Vec<String>,
    pub submit: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GalleryKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub open: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub close: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            search: vec!["/".into()],
            help: vec!["F1".into(), "?".into()],
        }
    }
}

impl Default for SearchInputKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            submit: vec!["Enter".into()],
        }
    }
}

impl Default for GalleryKeys {
    fn default() -> Self {
        Self {
            next: vec!["l".into(), "Right".into(), "Tab".into()],
            prev: vec!["h".into(), "Left".into(), "Backtab".into()],
            up: vec!["k".into(), "Up".into()],
            down: vec!["j".into(), "Down".into()],
            open: vec!["Enter".into(), "Space".into()],
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            next: vec!["l".into(), "Right".into(), "Tab".into()],
            prev: vec!["h".into(), "Left".into(), "Backtab".into()],
            close: vec!["Escape".into(), "q".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

impl Default for KeyBinding {
    fn default() -> Self {
        KeyBinding::Multiple(vec![])
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    search_input: SearchInputKeysFile,
    gallery: GalleryKeysFile,
    modal: ModalKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    search: KeyBinding,
    help: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            search: KeyBinding::Multiple(defaults.search),
            help: KeyBinding::Multiple(defaults.help),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchInputKeysFile {
    cancel: KeyBinding,
    submit: KeyBinding,
}

impl Default for SearchInputKeysFile {
    fn default() -> Self {
        let defaults = SearchInputKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            submit: KeyBinding::Multiple(defaults.submit),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GalleryKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    up: KeyBinding,
    down: KeyBinding,
    open: KeyBinding,
}

impl Default for GalleryKeysFile {
    fn default() -> Self {
        let defaults = GalleryKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            up: KeyBinding::Multiple(defaults.up),
            down: KeyBinding::Multiple(defaults.down),
            open: KeyBinding::Multiple(defaults.open),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    close: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            close: KeyBinding::Multiple(defaults.close),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                search: file.global.search.into_vec(),
                help: file.global.help.into_vec(),
            },
            search_input: SearchInputKeys {
                cancel: file.search_input.cancel.into_vec(),
                submit: file.search_input.submit.into_vec(),
            },
            gallery: GalleryKeys {
                next: file.gallery.next.into_vec(),
                prev: file.gallery.prev.into_vec(),
                up: file.gallery.up.into_vec(),
                down: file.gallery.down.into_vec(),
                open: file.gallery.open.into_vec(),
            },
            modal: ModalKeys {
                next: file.modal.next.into_vec(),
                prev: file.modal.prev.into_vec(),
                close: file.modal.close.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Single characters preserve case (since 'M' means Shift+m, different from 'm').
/// Multi-character key names are case-insensitive (Enter, ENTER, enter are the same).
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Global keys stay live while the gallery has focus, so they are checked
/// together with the gallery context.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    check_context_collisions(
        &[
            ("quit", &keys.global.quit),
            ("search", &keys.global.search),
            ("help", &keys.global.help),
            ("next", &keys.gallery.next),
            ("prev", &keys.gallery.prev),
            ("up", &keys.gallery.up),
            ("down", &keys.gallery.down),
            ("open", &keys.gallery.open),
        ],
        "gallery",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.search_input.cancel),
            ("submit", &keys.search_input.submit),
        ],
        "search_input",
    )?;

    check_context_collisions(
        &[
            ("next", &keys.modal.next),
            ("prev", &keys.modal.prev),
            ("close", &keys.modal.close),
        ],
        "modal",
    )?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    api: ApiFile,
    keys: KeysFile,
    ui: UiFile,
    photos: PhotosFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ApiFile {
    url: String,
    results: u32,
    nationality: Option<String>,
}

impl Default for ApiFile {
    fn default() -> Self {
        let defaults = ApiConfig::default();
        Self {
            url: defaults.url,
            results: defaults.results,
            nationality: defaults.nationality,
        }
    }
}

impl ApiFile {
    fn into_config(self) -> Result<ApiConfig> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            bail!("`api.url` must not be empty");
        }
        if self.results == 0 {
            bail!("`api.results` must be at least 1");
        }
        let nationality = self
            .nationality
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_ascii_lowercase);
        Ok(ApiConfig {
            url,
            results: self.results,
            nationality,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PhotosFile {
    enabled: bool,
    cache_dir: Option<PathBuf>,
}

impl Default for PhotosFile {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
        }
    }
}

impl From<PhotosFile> for PhotoConfig {
    fn from(file: PhotosFile) -> Self {
        Self {
            enabled: file.enabled,
            cache_dir: file.cache_dir.as_deref().map(expand_tilde),
        }
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load settings from `explicit` or the default location.
///
/// A missing default file is not an error; an explicitly named one is.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let mut config =
        parse(&raw).with_context(|| format!("invalid configuration in {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

pub fn parse(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: None,
        api: cfg_file.api.into_config()?,
        keys,
        ui: cfg_file.ui.into(),
        photos: cfg_file.photos.into(),
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in_context(value, "", &["api", "keys", "ui", "photos"]);

    if let Some(api) = table.get("api") {
        warn_unknown_in_context(api, "api", &["url", "results", "nationality"]);
    }
    if let Some(photos) = table.get("photos") {
        warn_unknown_in_context(photos, "photos", &["enabled", "cache_dir"]);
    }
    if let Some(keys) = table.get("keys").and_then(toml::Value::as_table) {
        let known: HashSet<&str> = ["global", "search_input", "gallery", "modal"].into();
        for (context, section) in keys {
            let actions: &[&str] = match context.as_str() {
                "global" => &["quit", "search", "help"],
                "search_input" => &["cancel", "submit"],
                "gallery" => &["next", "prev", "up", "down", "open"],
                "modal" => &["next", "prev", "close"],
                _ => &[],
            };
            if known.contains(context.as_str()) {
                warn_unknown_in_context(section, &format!("keys.{context}"), actions);
            } else {
                tracing::warn!("unknown configuration key `keys.{}`", context);
            }
        }
    }
    if let Some(ui) = table.get("ui") {
        warn_unknown_in_context(ui, "ui", &["colors", "gallery"]);
        if let Some(colors) = ui.get("colors") {
            warn_unknown_in_context(
                colors,
                "ui.colors",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                ],
            );
        }
        if let Some(gallery) = ui.get("gallery") {
            warn_unknown_in_context(gallery, "ui.gallery", &["columns", "card_height"]);
        }
    }
}

fn warn_unknown_in_context(value: &toml::Value, context: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            if context.is_empty() {
                tracing::warn!("unknown configuration key `{}`", key);
            } else {
                tracing::warn!("unknown configuration key `{}.{}`", context, key);
            }
        }
    }
}

// =============================================================================
// UI file types
// =============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
    gallery: UiGalleryFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiGalleryFile {
    columns: u16,
    card_height: u16,
}

impl Default for UiGalleryFile {
    fn default() -> Self {
        Self {
            columns: 3,
            card_height: 8,
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let columns = if file.gallery.columns == 0 {
            3
        } else {
            file.gallery.columns
        };
        // border + name + email + location
        let card_height = file.gallery.card_height.max(5);
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                separator: file.colors.separator,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
            gallery: UiGallery {
                columns,
                card_height,
            },
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}
