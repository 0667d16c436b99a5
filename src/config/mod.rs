pub mod app;

pub use app::{AppConfig, GeneratorConfig, OAuthConfig};
