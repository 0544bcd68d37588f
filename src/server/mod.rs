//! HTTP layer: sessions, pages, and the router.

pub mod routes;
pub mod sessions;
pub mod views;

pub use routes::router;
pub use sessions::{SessionData, SessionStore, SESSION_COOKIE};

use crate::cms::{
    CredentialError, CredentialStore, DocumentRepository, HomeRedirect, RenderError,
    RepositoryError, SessionView,
};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: DocumentRepository,
    pub credentials: CredentialStore,
    pub sessions: Arc<SessionStore>,
}

/// The current request's session, added to request extensions by
/// [`session_middleware`].
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: Option<String>,
}

impl SessionView for Session {
    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// Flash message a handler wants stored on the session, carried in response
/// extensions.
#[derive(Debug, Clone)]
struct FlashMessage(String);

/// Replacement session id issued by a handler, carried in response
/// extensions. The middleware moves the flash to it and sets the cookie.
#[derive(Debug, Clone)]
struct RotatedSession(String);

impl IntoResponse for HomeRedirect {
    fn into_response(self) -> Response {
        let mut response =
            (StatusCode::FOUND, [(header::LOCATION, HomeRedirect::LOCATION)]).into_response();
        response.extensions_mut().insert(FlashMessage(self.message));
        response
    }
}

/// Loads or creates the session for every request.
///
/// New sessions get their cookie set on the way out, and any flash message
/// attached to the response is stored for the next page.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar.get(SESSION_COOKIE).and_then(|cookie| {
        let id = cookie.value().to_string();
        state.sessions.touch(&id).map(|data| Session {
            id,
            username: data.username,
        })
    });

    let (session, is_new) = match existing {
        Some(session) => (session, false),
        None => {
            let id = state.sessions.create();
            (Session { id, username: None }, true)
        }
    };

    let id = session.id.clone();
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;

    let (id, set_cookie) = match response.extensions_mut().remove::<RotatedSession>() {
        Some(RotatedSession(rotated)) => (rotated, true),
        None => (id, is_new),
    };

    if let Some(FlashMessage(message)) = response.extensions_mut().remove::<FlashMessage>() {
        state.sessions.set_message(&id, message);
    }

    if set_cookie {
        let cookie = Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}

/// Handler failure.
///
/// User-facing failures become a redirect home with a flash message; storage
/// faults end the request with a generic 500.
#[derive(Debug)]
pub enum AppError {
    Redirect(HomeRedirect),
    Repository(RepositoryError),
    Credentials(CredentialError),
    Template(askama::Error),
    Task(tokio::task::JoinError),
    BadRequest(String),
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Template(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Task(err)
    }
}

impl From<HomeRedirect> for AppError {
    fn from(redirect: HomeRedirect) -> Self {
        AppError::Redirect(redirect)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(name) | RepositoryError::InvalidName(name) => {
                AppError::Redirect(HomeRedirect::new(format!("{} does not exist.", name)))
            }
            err @ RepositoryError::IoFailure(_, _) => AppError::Repository(err),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        tracing::warn!("{}", err);
        match err {
            RenderError::UnsupportedFormat(name) => {
                AppError::Redirect(HomeRedirect::new(format!("{} cannot be displayed.", name)))
            }
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Credentials(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Redirect(redirect) => redirect.into_response(),
            AppError::BadRequest(e) => {
                tracing::warn!("Bad request: {}", e);
                (StatusCode::BAD_REQUEST, "Bad Request").into_response()
            }
            AppError::Repository(e) => {
                tracing::error!("Document storage failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            AppError::Credentials(e) => {
                tracing::error!("Credential store failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            AppError::Template(e) => {
                tracing::error!("Failed to render template: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            AppError::Task(e) => {
                tracing::error!("Blocking task failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
