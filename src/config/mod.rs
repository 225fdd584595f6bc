pub mod settings;
pub mod versions;

pub use settings::AppConfig;
pub use versions::VersionTable;
