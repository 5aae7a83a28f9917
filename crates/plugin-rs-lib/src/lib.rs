pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod host;
pub use host::VersionOracle;

pub mod catalog;
pub use catalog::Catalog;
pub use catalog::CatalogCache;

pub mod relationship_resolver;
pub mod installation;

pub mod manager;
pub use manager::PluginManager;
