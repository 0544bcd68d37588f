//! Naming rules for documents and new accounts.
//!
//! Every validator returns `None` when the input is acceptable, or the first
//! rule it breaks. Rules are checked in a fixed order and the first failure
//! wins, so an empty name is always reported as missing even though it also
//! lacks an extension.

use std::collections::HashMap;

/// Extensions accepted for documents created or copied through the editor.
pub const TEXT_EXTENSIONS: [&str; 2] = [".md", ".txt"];

/// Extensions served as images. Uploads are the only way to store these.
pub const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".JPG", ".png"];

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Returns the extension of `name`, including the leading dot.
///
/// Leading dots belong to the stem, so `.profile` has no extension while
/// `notes.` has the bare extension `"."`.
pub fn extension(name: &str) -> Option<&str> {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    name[stem_start..]
        .rfind('.')
        .map(|idx| &name[stem_start + idx..])
}

/// Why a document name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameError {
    Missing,
    NoExtension,
    UnsupportedFormat,
    AlreadyExists,
}

impl FilenameError {
    /// The message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            FilenameError::Missing => "A name is required.",
            FilenameError::NoExtension => "Must specify file extension.",
            FilenameError::UnsupportedFormat => "File format not supported!",
            FilenameError::AlreadyExists => "File already exists!",
        }
    }
}

impl std::fmt::Display for FilenameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for FilenameError {}

/// Validates the destination name of a new or copied document.
pub fn error_for_filename(name: &str, existing: &[String]) -> Option<FilenameError> {
    if name.is_empty() {
        return Some(FilenameError::Missing);
    }

    match extension(name) {
        None => Some(FilenameError::NoExtension),
        Some(ext) if !TEXT_EXTENSIONS.contains(&ext) => Some(FilenameError::UnsupportedFormat),
        Some(_) if existing.iter().any(|n| n == name) => Some(FilenameError::AlreadyExists),
        Some(_) => None,
    }
}

/// Why a sign-up attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupError {
    UsernameTaken(String),
    UsernameMissing,
    PasswordMismatch,
    PasswordTooShort,
}

impl std::fmt::Display for SignupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignupError::UsernameTaken(name) => write!(f, "{} is already taken.", name),
            SignupError::UsernameMissing => write!(f, "A username is required."),
            SignupError::PasswordMismatch => write!(f, "Passwords do not match."),
            SignupError::PasswordTooShort => write!(
                f,
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            ),
        }
    }
}

impl std::error::Error for SignupError {}

/// Validates a requested username against the loaded credentials.
pub fn error_for_new_username(
    username: &str,
    credentials: &HashMap<String, String>,
) -> Option<SignupError> {
    if credentials.contains_key(username) {
        Some(SignupError::UsernameTaken(username.to_string()))
    } else if username.is_empty() {
        Some(SignupError::UsernameMissing)
    } else {
        None
    }
}

/// Validates a requested password and its confirmation.
pub fn error_for_new_password(password: &str, password_confirm: &str) -> Option<SignupError> {
    if password != password_confirm {
        Some(SignupError::PasswordMismatch)
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        Some(SignupError::PasswordTooShort)
    } else {
        None
    }
}

/// Runs both sign-up validators, reporting the username problem first.
pub fn error_for_signup(
    username: &str,
    password: &str,
    password_confirm: &str,
    credentials: &HashMap<String, String>,
) -> Option<SignupError> {
    error_for_new_username(username, credentials)
        .or_else(|| error_for_new_password(password, password_confirm))
}
