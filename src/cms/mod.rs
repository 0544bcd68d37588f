//! Document and credential management core.
//!
//! Nothing in here knows about HTTP. Handlers pass in plain strings and
//! bytes and get back values or explicit failure reasons.

pub mod credentials;
pub mod gate;
pub mod render;
pub mod repository;
pub mod validate;

pub use credentials::{CredentialError, CredentialStore};
pub use gate::{is_signed_in, require_signed_in, HomeRedirect, SessionView, SIGN_IN_REQUIRED};
pub use render::{render, ContentKind, Payload, RenderError, Rendered};
pub use repository::{DocumentRepository, RepositoryError};
pub use validate::{error_for_filename, error_for_signup, FilenameError, SignupError};
