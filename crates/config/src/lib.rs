// Configuration loading

pub mod cache;
pub mod settings;

pub use cache::CachedSettings;
pub use settings::Settings;
