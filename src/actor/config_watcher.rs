//! Reloads the config file when it changes on disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, new_debouncer};
use tracing::{debug, info, warn};

use crate::actor::reactor::ReactorHandle;
use crate::bus::Command;
use crate::common::config::Config;

const DEBOUNCE: Duration = Duration::from_millis(200);

pub struct ConfigWatcher {
    path: PathBuf,
    reactor: ReactorHandle,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf, reactor: ReactorHandle) -> Self { Self { path, reactor } }

    /// Watches the directory containing the config file so that editors
    /// which save by renaming a temporary file are noticed too.
    pub fn spawn(self) -> anyhow::Result<JoinHandle<()>> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(DEBOUNCE, tx)?;
        let dir = self.path.parent().unwrap_or(&self.path).to_path_buf();
        debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %self.path.display(), "watching config file");

        let file_name = self.path.file_name().map(OsString::from).unwrap_or_default();
        let thread = thread::Builder::new().name("config-watcher".to_string()).spawn(move || {
            let _debouncer = debouncer;
            for result in rx {
                match result {
                    Ok(events) if touches(&events, &file_name) => self.reload(),
                    Ok(_) => {}
                    Err(err) => warn!(%err, "config watch error"),
                }
            }
            debug!("config watcher stopped");
        })?;
        Ok(thread)
    }

    fn reload(&self) {
        match load(&self.path) {
            Some(config) => self.reactor.submit(Command::ReloadConfig { config: Box::new(config) }),
            None => debug!("keeping the current config"),
        }
    }
}

fn touches(events: &[DebouncedEvent], file_name: &OsString) -> bool {
    events.iter().any(|e| e.path.file_name() == Some(file_name.as_os_str()))
}

/// Reads and validates the file, logging instead of returning errors.
fn load(path: &Path) -> Option<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "config file removed");
        return None;
    }
    Config::read(path).inspect_err(|err| warn!(%err, "ignoring invalid config")).ok()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use notify_debouncer_mini::DebouncedEventKind;
    use test_log::test;

    use super::*;

    #[test]
    fn only_events_for_the_config_file_count() {
        let event = |path: &str| DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        };
        let name = OsString::from("config.toml");
        assert!(touches(&[event("/a/other.toml"), event("/a/config.toml")], &name));
        assert!(!touches(&[event("/a/config.toml.swp")], &name));
        assert!(!touches(&[], &name));
    }

    #[test]
    fn broken_or_missing_files_are_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load(&path), None);

        std::fs::File::create(&path).unwrap().write_all(b"[settings\n").unwrap();
        assert_eq!(load(&path), None);

        std::fs::write(&path, "[settings.gaps]\ninner = 4\n").unwrap();
        assert_eq!(load(&path).map(|c| c.settings.gaps.inner), Some(4));
    }
}
