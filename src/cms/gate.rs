//! Sign-in gate for mutating operations.
//!
//! The gate only decides; the HTTP layer performs the redirect and stores
//! the flash message.

/// Message shown when a signed-out user attempts a protected operation.
pub const SIGN_IN_REQUIRED: &str = "You must be signed in to do that.";

/// Read access to the signed-in identity of a session.
pub trait SessionView {
    /// The signed-in username, if any.
    fn username(&self) -> Option<&str>;
}

impl SessionView for Option<String> {
    fn username(&self) -> Option<&str> {
        self.as_deref()
    }
}

/// Decision to send the client back to the home page with a flash message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeRedirect {
    pub message: String,
}

impl HomeRedirect {
    pub const LOCATION: &'static str = "/";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// True iff the session carries a username.
pub fn is_signed_in(session: &impl SessionView) -> bool {
    session.username().is_some()
}

/// Fails with a redirect decision unless the session is signed in.
pub fn require_signed_in(session: &impl SessionView) -> Result<(), HomeRedirect> {
    if is_signed_in(session) {
        Ok(())
    } else {
        Err(HomeRedirect::new(SIGN_IN_REQUIRED))
    }
}
