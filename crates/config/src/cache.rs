// TTL cache around the settings file

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::settings::Settings;

/// Settings handle that rereads the file at most once per TTL window.
/// Long-running loops poll it every iteration; the TTL keeps operator
/// edits taking effect within a minute without hitting disk each pass.
pub struct CachedSettings {
    path: PathBuf,
    ttl: Duration,
    state: Option<(Instant, Settings)>,
}

impl CachedSettings {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self {
            path,
            ttl,
            state: None,
        }
    }

    pub fn at_default_location() -> Self {
        Self::new(Settings::config_path(), Self::DEFAULT_TTL)
    }

    /// Current settings, rereading the file if the cached copy is stale.
    pub fn get(&mut self) -> &Settings {
        let stale = match &self.state {
            Some((loaded_at, _)) => loaded_at.elapsed() >= self.ttl,
            None => true,
        };
        if stale {
            self.state = Some((Instant::now(), Settings::load_from(&self.path)));
        }
        &self.state.as_ref().unwrap().1
    }

    /// Drop the cached copy so the next `get` rereads the file. Called
    /// after a save, so the writer sees its own update immediately.
    pub fn invalidate(&mut self) {
        self.state = None;
    }
}
