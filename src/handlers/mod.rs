pub mod oauth_handlers;

pub use oauth_handlers::{oauth_protected_resource_metadata, options_handler};
