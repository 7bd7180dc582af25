#![allow(unused_imports)]
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WmError;

/// Default path searched when no path is given on the command line.
/// Mirrors `blinklad-rdwm`'s fixed `PATH` constant, but resolved relative to
/// `$XDG_CONFIG_HOME` (falling back to `$HOME/.config`) instead of a single
/// developer's home directory.
pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("ridgewm/config.toml");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config/ridgewm/config.toml");
    }
    PathBuf::from("ridgewm.toml")
}

/// A single `[[keys]]` entry.
///
/// `action` names a command in the compiled-in registry (`commands.rs`);
/// resolution happens once at startup (`commands::resolve_keys`), not per
/// keypress, and an unknown action name is a load-time configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBinding {
    /// Modifier names: any of "shift", "control"/"ctrl", "mod1"/"alt",
    /// "mod4"/"super".
    #[serde(default)]
    pub mods: Vec<String>,
    /// An X keysym name, e.g. "Return", "j", "Tab".
    pub key: String,
    pub action: String,
    #[serde(default)]
    pub arg: ArgSpec,
}

/// A single `[[buttons]]` entry. `click` names the bar region or
/// window-class click target from spec.md §4.6's `ButtonPress` handler: one
/// of "tagbar", "ltsymbol", "status", "title", "clientwin", "rootwin".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub click: String,
    #[serde(default)]
    pub mods: Vec<String>,
    pub button: u32,
    pub action: String,
    #[serde(default)]
    pub arg: ArgSpec,
}

/// A static matching rule seeding a newly-managed client's tags, floating
/// flag, and monitor (spec.md §4.6 `manage`, step 3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Rule {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: u32,
    #[serde(default)]
    pub is_floating: bool,
    /// `-1` means "do not force a monitor".
    #[serde(default = "default_rule_monitor")]
    pub monitor: i32,
}

fn default_rule_monitor() -> i32 {
    -1
}

/// A layout entry: `name` resolves to a [`crate::layout::LayoutKind`] and
/// `symbol` is the glyph drawn in the bar's layout-symbol region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub name: String,
    pub symbol: String,
}

/// A `#rrggbb`-style hex triplet: `[border, foreground, background]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    pub border: String,
    pub foreground: String,
    pub background: String,
}

/// Either an int, float, string, or string-list argument, matching the
/// `Arg` union named in spec.md §4.7 — the TOML-deserializable precursor to
/// `commands::Arg`, which also carries an opaque pointer variant that only
/// ever arises internally (never from config).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    Int(i32),
    Float(f64),
    Str(String),
    List(Vec<String>),
    None,
}

impl Default for ArgSpec {
    fn default() -> Self {
        ArgSpec::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tags: Vec<String>,
    pub layouts: Vec<LayoutSpec>,
    pub keys: Vec<KeyBinding>,
    pub buttons: Vec<ButtonBinding>,
    pub rules: Vec<Rule>,
    /// `[normal, selected]`.
    pub colors: [ColorScheme; 2],
    pub fonts: Vec<String>,

    pub borderpx: i32,
    pub snap: i32,
    pub show_bar: bool,
    pub top_bar: bool,
    pub mfact: f64,
    pub masters_count: i32,
    pub gap_px: i32,
    pub resize_hints: bool,
    pub lock_fullscreen: bool,

    pub dmenucmd: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tags: (1..=9).map(|i| i.to_string()).collect(),
            layouts: vec![
                LayoutSpec { name: "tile".into(), symbol: "[]=".into() },
                LayoutSpec { name: "floating".into(), symbol: "><>".into() },
                LayoutSpec { name: "monocle".into(), symbol: "[M]".into() },
            ],
            keys: Vec::new(),
            buttons: Vec::new(),
            rules: Vec::new(),
            colors: [
                ColorScheme {
                    border: "#444444".into(),
                    foreground: "#bbbbbb".into(),
                    background: "#222222".into(),
                },
                ColorScheme {
                    border: "#eeeeee".into(),
                    foreground: "#eeeeee".into(),
                    background: "#005577".into(),
                },
            ],
            fonts: vec!["monospace:size=10".into()],
            borderpx: 1,
            snap: 32,
            show_bar: true,
            top_bar: true,
            mfact: 0.55,
            masters_count: 1,
            gap_px: 0,
            resize_hints: true,
            lock_fullscreen: true,
            dmenucmd: vec!["dmenu_run".into(), "-m".into(), "0".into()],
        }
    }
}

impl Config {
    /// Loads from `path` if given, else [`default_config_path`]. A missing
    /// file falls back to [`Config::default`] with a logged warning; a
    /// present-but-unparsable file is a fatal [`WmError::Config`], matching
    /// spec.md's treatment of bad static configuration as a startup concern
    /// rather than a runtime one.
    pub fn load(path: Option<&Path>) -> Result<Self, WmError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!(
                    "no config at {}: {} — using built-in defaults",
                    path.display(),
                    e
                );
                return Ok(Config::default());
            }
        };
        toml::from_str(&contents).map_err(|e| WmError::Config(format!("{}: {}", path.display(), e)))
    }

    /// The `dmenucmd` slot that `spawn` overwrites with the selected
    /// monitor's digit before exec'ing (spec.md §4.7 `spawn`).
    pub fn dmenu_monitor_slot(&self) -> Option<usize> {
        self.dmenucmd.iter().position(|a| a == "-m").map(|i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_nonzero_tags_and_valid_mfact() {
        let cfg = Config::default();
        assert!(!cfg.tags.is_empty());
        assert!(cfg.mfact >= 0.05 && cfg.mfact <= 0.95);
    }

    #[test]
    fn parses_minimal_toml() {
        let toml_src = r#"
            tags = ["1", "2", "3"]
            mfact = 0.6

            [[keys]]
            mods = ["mod4"]
            key = "j"
            action = "focus_stack"
            arg = 1
        "#;
        let cfg: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.tags.len(), 3);
        assert_eq!(cfg.keys.len(), 1);
        assert_eq!(cfg.keys[0].action, "focus_stack");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load(Some(Path::new("/nonexistent/ridgewm.toml"))).unwrap();
        assert_eq!(cfg.masters_count, 1);
    }

    #[test]
    fn unparsable_file_is_a_config_error() {
        let dir = std::env::temp_dir().join("ridgewm-config-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        fs::write(&path, "this is not [ valid toml").unwrap();
        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(WmError::Config(_))));
    }
}
