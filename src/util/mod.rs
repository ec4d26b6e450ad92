//! Feed link validation shared by configuration seeding and the CLI.

mod url_validator;

pub use url_validator::{validate_feed_url, validate_public_feed_url, UrlValidationError};
