pub mod settings;

pub use settings::{EndpointSettings, DEFAULT_FILE_STEM, ENV_PREFIX};
