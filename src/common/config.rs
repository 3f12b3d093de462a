use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::bus::command::Command;
use crate::layout_engine::Orientation;

pub const DEFAULT_HISTORY_CAPACITY: usize = 64;
pub const DEFAULT_MAX_EVENT_CASCADE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub settings: Settings,
    pub workspaces: Vec<WorkspaceConfig>,
    pub keybindings: Vec<Keybinding>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub gaps: GapSettings,
    /// Orientation given to newly created workspaces.
    pub default_orientation: Orientation,
    /// How many command names the bus remembers.
    pub history_capacity: usize,
    /// Upper bound on event reactions processed for one command.
    pub max_event_cascade: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gaps: GapSettings::default(),
            default_orientation: Orientation::Horizontal,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_event_cascade: DEFAULT_MAX_EVENT_CASCADE,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GapSettings {
    /// Pixels between adjacent tiled siblings.
    pub inner: i32,
    /// Pixels between a monitor edge and its workspace.
    pub outer: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub name: String,
    /// Index into the monitor list, in the order monitors were added.
    #[serde(default)]
    pub bind_to_monitor: Option<usize>,
    /// Keep the workspace even when it is empty and hidden.
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keybinding {
    pub bindings: Vec<String>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub commands: Vec<Command>,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("canopy").join("config.toml"))
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> { toml::to_string(self) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;
        if settings.gaps.inner < 0 || settings.gaps.outer < 0 {
            return Err(ConfigError::Invalid("gaps must not be negative".into()));
        }
        if settings.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1".into()));
        }
        if settings.max_event_cascade == 0 {
            return Err(ConfigError::Invalid("max_event_cascade must be at least 1".into()));
        }
        for (i, ws) in self.workspaces.iter().enumerate() {
            if ws.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("workspace #{i} has an empty name")));
            }
            if self.workspaces[..i].iter().any(|other| other.name == ws.name) {
                return Err(ConfigError::Invalid(format!(
                    "workspace {:?} is declared twice",
                    ws.name
                )));
            }
        }
        if let Some(kb) = self.keybindings.iter().find(|kb| kb.bindings.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "keybinding for {:?} has no key combination",
                kb.commands.iter().map(ToString::to_string).collect::<Vec<_>>()
            )));
        }
        Ok(())
    }

    pub fn workspace_config(&self, name: &str) -> Option<&WorkspaceConfig> {
        self.workspaces.iter().find(|ws| ws.name == name)
    }

    pub fn keep_alive(&self, name: &str) -> bool {
        self.workspace_config(name).is_some_and(|ws| ws.keep_alive)
    }

    /// Commands bound to a key combination such as `alt+shift+h`.
    pub fn commands_for(&self, binding: &str) -> Option<&[Command]> {
        self.keybindings
            .iter()
            .find(|kb| kb.bindings.iter().any(|b| b.eq_ignore_ascii_case(binding)))
            .map(|kb| kb.commands.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::{Dimension, Direction};

    const SAMPLE: &str = r#"
[settings]
gaps = { inner = 8, outer = 4 }
default_orientation = "vertical"
history_capacity = 10

[[workspaces]]
name = "web"
bind_to_monitor = 1
keep_alive = true

[[workspaces]]
name = "code"

[[keybindings]]
bindings = ["alt+l"]
commands = ["focus right"]

[[keybindings]]
bindings = ["alt+u", "alt+shift+u"]
commands = ["resize width +5%", "set floating"]
"#;

    #[test]
    fn parses_full_config() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.settings.gaps, GapSettings { inner: 8, outer: 4 });
        assert_eq!(config.settings.default_orientation, Orientation::Vertical);
        assert_eq!(config.settings.history_capacity, 10);
        assert_eq!(config.settings.max_event_cascade, DEFAULT_MAX_EVENT_CASCADE);
        assert!(config.keep_alive("web"));
        assert!(!config.keep_alive("code"));
        assert_eq!(config.workspace_config("web").unwrap().bind_to_monitor, Some(1));
        assert_eq!(
            config.commands_for("ALT+L"),
            Some(&[Command::Focus { direction: Direction::Right }][..])
        );
        assert_eq!(
            config.commands_for("alt+shift+u").unwrap()[0],
            Command::Resize {
                target: None,
                dimension: Dimension::Width,
                amount: "+5%".into(),
            }
        );
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn rejects_unknown_commands_and_fields() {
        let bad_command = "[[keybindings]]\nbindings = [\"a\"]\ncommands = [\"explode\"]\n";
        assert!(matches!(Config::parse(bad_command), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::parse("[settings]\ncolour = 1\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_semantically_invalid_values() {
        let negative = "[settings]\ngaps = { inner = -1 }\n";
        assert!(matches!(Config::parse(negative), Err(ConfigError::Invalid(_))));
        let duplicate = "[[workspaces]]\nname = \"a\"\n[[workspaces]]\nname = \"a\"\n";
        assert!(matches!(Config::parse(duplicate), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = Config::parse(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::read(file.path()).unwrap();
        assert_eq!(config.workspaces.len(), 2);

        let missing = file.path().with_extension("missing");
        let err = Config::read(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains(&missing.display().to_string()));
    }
}
