use std::{collections::HashMap, env, fs, path::PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use derive_deref::{Deref, DerefMut};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize, de::Deserializer};

use directories::BaseDirs;

use crate::action::Action;

/// Input mode: which keybinding table applies. One mode per focus surface.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Main,
    Global,
    ChatPopup,
    ColumnPicker,
    GroupedColumns,
    Upload,
    MessageDialog,
}

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub keybindings: KeyBindings,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Load configuration: embedded defaults, overlaid by the user file
    /// (`~/.chartchat-config.json5`, created on first run) or an explicit
    /// `--config` path. User bindings win; unbound defaults are filled in.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let default_config: Config = json5::from_str(CONFIG)
            .map_err(|e| config::ConfigError::Message(format!("embedded config: {e}")))?;
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_str().unwrap_or_default())?
            .set_default("config_dir", config_dir.to_str().unwrap_or_default())?;

        let home_cfg = default_home_config_path();
        let selected_path = if let Some(p) = config_path {
            expand_tilde(p)
        } else {
            if !home_cfg.exists() {
                if let Some(parent) = home_cfg.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                let _ = fs::write(&home_cfg, CONFIG);
            }
            home_cfg
        };

        builder = builder.add_source(
            config::File::from(selected_path)
                .format(config::FileFormat::Json5)
                .required(true),
        );

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        for (mode, default_bindings) in default_config.keybindings.0.iter() {
            let user_bindings = cfg.keybindings.0.entry(*mode).or_default();
            for (key, action) in default_bindings.iter() {
                user_bindings
                    .entry(key.clone())
                    .or_insert_with(|| action.clone());
            }
        }

        Ok(cfg)
    }

    /// Build instructions string from a list of (mode, action) tuples
    pub fn actions_to_instructions(&self, actions: &[(Mode, Action)]) -> String {
        actions
            .iter()
            .map(|(mode, action)| {
                let friendly_name = self.action_to_friendly_name(action);
                if let Some(key) = self.key_for_action(*mode, action) {
                    format!("{key}: {friendly_name}")
                } else {
                    friendly_name.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }

    /// Convert an action to a friendly name
    pub fn action_to_friendly_name(&self, action: &Action) -> &'static str {
        match action {
            Action::Escape => "Cancel",
            Action::Enter => "Confirm",
            Action::Backspace => "Backspace",
            Action::Up => "Up",
            Action::Down => "Down",
            Action::Left => "Left",
            Action::Right => "Right",
            Action::Tab => "Tab",
            Action::ToggleInstructions => "Toggle Instructions",

            Action::OpenChatPopup => "Chat",
            Action::CloseChatPopup => "Close Chat",
            Action::OpenColumnPicker => "Pick Column",
            Action::OpenGroupedColumns => "Grouped Columns",
            Action::OpenUploadDialog => "Upload",
            Action::RefreshColumns => "Refresh Columns",
            Action::ToggleShowValues => "Toggle Values",
            Action::ToggleAutoAnalyze => "Toggle Auto-Analyze",
            Action::SelectChartType(_) => "Chart Type",

            Action::ToggleItem => "Toggle",
            Action::SelectAll => "Select All",
            Action::ClearAll => "Clear All",
            Action::ToggleIncludeSelected => "Include Selected",

            Action::SuggestPrompt(_) => "Suggestion",
            Action::CopyLastReply => "Copy Reply",
            Action::ExportTranscript => "Export Transcript",

            Action::Quit => "Quit",
            Action::Suspend => "Suspend",
            Action::DialogClose => "Close",

            _ => "Unknown",
        }
    }

    /// Resolve an action for a full key sequence for a given mode.
    pub fn action_for_keys(&self, mode: Mode, keys: &[KeyEvent]) -> Option<Action> {
        let map = self.keybindings.0.get(&mode)?;
        map.get(&keys.to_vec()).cloned()
    }

    /// Resolve an action for a single key event for a given mode.
    pub fn action_for_key(&self, mode: Mode, key: KeyEvent) -> Option<Action> {
        if key.kind != crossterm::event::KeyEventKind::Press {
            return None;
        }
        self.action_for_keys(mode, &[key])
    }

    /// Find the key for a given action in a specific mode
    pub fn key_for_action(&self, mode: Mode, action: &Action) -> Option<String> {
        let mode_bindings = self.keybindings.0.get(&mode)?;
        for (key_sequence, bound_action) in mode_bindings.iter() {
            if bound_action == action {
                return Some(
                    key_sequence
                        .iter()
                        .map(key_event_to_string)
                        .collect::<Vec<_>>()
                        .join(" "),
                );
            }
        }
        None
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with("~") {
            if let Some(base) = BaseDirs::new() {
                return PathBuf::from(s.replacen("~", base.home_dir().to_str().unwrap_or(""), 1));
            }
        }
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".chartchat-config.json5");
    }
    PathBuf::from(".chartchat-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}

#[derive(Clone, Debug, Default, Deref, DerefMut)]
pub struct KeyBindings(pub HashMap<Mode, HashMap<Vec<KeyEvent>, Action>>);

impl<'de> Deserialize<'de> for KeyBindings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed_map = HashMap::<Mode, HashMap<String, Action>>::deserialize(deserializer)?;

        let keybindings: HashMap<Mode, HashMap<Vec<KeyEvent>, Action>> = parsed_map
            .into_iter()
            .map(|(mode, inner_map)| {
                let converted_inner_map: HashMap<Vec<KeyEvent>, Action> = inner_map
                    .into_iter()
                    .filter_map(|(key_string, action)| {
                        parse_key_sequence(&key_string)
                            .ok()
                            .map(|seq| (seq, action))
                    })
                    .collect();
                (mode, converted_inner_map)
            })
            .collect();

        Ok(KeyBindings(keybindings))
    }
}

fn parse_key_event(raw: &str) -> Result<KeyEvent, String> {
    let raw_lower = raw.to_ascii_lowercase();
    let (remaining, modifiers) = extract_modifiers(&raw_lower);
    parse_key_code_with_modifiers(remaining, modifiers)
}

fn extract_modifiers(raw: &str) -> (&str, KeyModifiers) {
    let mut modifiers = KeyModifiers::empty();
    let mut current = raw;

    loop {
        match current {
            rest if rest.starts_with("ctrl-") => {
                modifiers.insert(KeyModifiers::CONTROL);
                current = &rest[5..];
            }
            rest if rest.starts_with("alt-") => {
                modifiers.insert(KeyModifiers::ALT);
                current = &rest[4..];
            }
            rest if rest.starts_with("shift-") => {
                modifiers.insert(KeyModifiers::SHIFT);
                current = &rest[6..];
            }
            _ => break,
        };
    }

    (current, modifiers)
}

fn parse_key_code_with_modifiers(
    raw: &str,
    mut modifiers: KeyModifiers,
) -> Result<KeyEvent, String> {
    let c = match raw {
        "esc" => KeyCode::Esc,
        "enter" => KeyCode::Enter,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "backtab" => {
            modifiers.insert(KeyModifiers::SHIFT);
            KeyCode::BackTab
        }
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        "f1" => KeyCode::F(1),
        "f2" => KeyCode::F(2),
        "f3" => KeyCode::F(3),
        "f4" => KeyCode::F(4),
        "f5" => KeyCode::F(5),
        "f6" => KeyCode::F(6),
        "f7" => KeyCode::F(7),
        "f8" => KeyCode::F(8),
        "f9" => KeyCode::F(9),
        "f10" => KeyCode::F(10),
        "f11" => KeyCode::F(11),
        "f12" => KeyCode::F(12),
        "space" => KeyCode::Char(' '),
        "hyphen" => KeyCode::Char('-'),
        "minus" => KeyCode::Char('-'),
        "tab" => KeyCode::Tab,
        c if c.len() == 1 => {
            let mut c = c.chars().next().unwrap();
            if modifiers.contains(KeyModifiers::SHIFT) {
                c = c.to_ascii_uppercase();
            }
            KeyCode::Char(c)
        }
        _ => return Err(format!("Unable to parse {raw}")),
    };
    Ok(KeyEvent::new(c, modifiers))
}

pub fn key_event_to_string(key_event: &KeyEvent) -> String {
    let char;
    let key_code = match key_event.code {
        KeyCode::Backspace => "backspace",
        KeyCode::Enter => "enter",
        KeyCode::Left => "left",
        KeyCode::Right => "right",
        KeyCode::Up => "up",
        KeyCode::Down => "down",
        KeyCode::Home => "home",
        KeyCode::End => "end",
        KeyCode::PageUp => "pageup",
        KeyCode::PageDown => "pagedown",
        KeyCode::Tab => "tab",
        KeyCode::BackTab => "backtab",
        KeyCode::Delete => "delete",
        KeyCode::Insert => "insert",
        KeyCode::F(c) => {
            char = format!("f({c})");
            &char
        }
        KeyCode::Char(' ') => "space",
        KeyCode::Char(c) => {
            char = c.to_string();
            &char
        }
        KeyCode::Esc => "esc",
        _ => "",
    };

    let mut modifiers = Vec::with_capacity(3);

    if key_event.modifiers.intersects(KeyModifiers::CONTROL) {
        modifiers.push("ctrl");
    }

    if key_event.modifiers.intersects(KeyModifiers::SHIFT) {
        modifiers.push("shift");
    }

    if key_event.modifiers.intersects(KeyModifiers::ALT) {
        modifiers.push("alt");
    }

    let mut key = modifiers.join("-");

    if !key.is_empty() {
        key.push('-');
    }
    key.push_str(key_code);

    key
}

pub fn parse_key_sequence(raw: &str) -> Result<Vec<KeyEvent>, String> {
    if raw.chars().filter(|c| *c == '>').count() != raw.chars().filter(|c| *c == '<').count() {
        return Err(format!("Unable to parse `{raw}`"));
    }
    let raw = if !raw.contains("><") {
        let raw = raw.strip_prefix('<').unwrap_or(raw);
        let raw = raw.strip_suffix('>').unwrap_or(raw);
        raw
    } else {
        raw
    };
    let sequences = raw
        .split("><")
        .map(|seq| {
            if let Some(s) = seq.strip_prefix('<') {
                s
            } else if let Some(s) = seq.strip_suffix('>') {
                s
            } else {
                seq
            }
        })
        .collect::<Vec<_>>();

    sequences.into_iter().map(parse_key_event).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let cfg: Config = json5::from_str(CONFIG).unwrap();
        assert!(!cfg.keybindings.0.is_empty());
        let global = cfg.keybindings.0.get(&Mode::Global).unwrap();
        let ctrl_c = parse_key_sequence("<ctrl-c>").unwrap();
        assert_eq!(global.get(&ctrl_c), Some(&Action::Quit));
    }

    #[test]
    fn chart_type_bindings_carry_payloads() {
        let cfg: Config = json5::from_str(CONFIG).unwrap();
        let main = cfg.keybindings.0.get(&Mode::Main).unwrap();
        let three = parse_key_sequence("<3>").unwrap();
        assert_eq!(
            main.get(&three),
            Some(&Action::SelectChartType(crate::api::ChartType::Histogram))
        );
    }

    #[test]
    fn test_parse_key_event() {
        assert_eq!(
            parse_key_event("enter").unwrap(),
            KeyEvent::new(KeyCode::Enter, KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_event("ctrl-a").unwrap(),
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)
        );
        assert_eq!(
            parse_key_event("shift-esc").unwrap(),
            KeyEvent::new(KeyCode::Esc, KeyModifiers::SHIFT)
        );
        assert_eq!(
            parse_key_event("alt-enter").unwrap(),
            KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT)
        );
        assert!(parse_key_event("invalid-key").is_err());
    }

    #[test]
    fn test_key_event_round_trip() {
        let event = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::CONTROL);
        let raw = key_event_to_string(&event);
        assert_eq!(raw, "ctrl-y");
        assert_eq!(parse_key_event(&raw).unwrap(), event);
    }

    #[test]
    fn test_parse_key_sequence() {
        let seq = parse_key_sequence("<ctrl-x><q>").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0], KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(seq[1], KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty()));
    }

    #[test]
    fn instructions_name_bound_keys() {
        let cfg: Config = json5::from_str(CONFIG).unwrap();
        let text = cfg.actions_to_instructions(&[
            (Mode::Global, Action::Quit),
            (Mode::ColumnPicker, Action::Enter),
        ]);
        assert!(text.contains("Quit"));
        assert!(text.contains("enter: Confirm"));
    }
}
