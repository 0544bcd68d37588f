//! Request handlers and the router.
//!
//! # Endpoints
//!
//! - `GET /`: document index
//! - `GET|POST /users/signup`, `GET|POST /users/signin`, `POST /users/signout`
//! - `GET /new`, `POST /create`: create an empty document (auth required)
//! - `POST /copy`: write a duplicate under a new name (auth required)
//! - `GET|POST /upload`: store an image (auth required)
//! - `GET /{filename}`: view a document
//! - `GET /{filename}/edit`, `GET /{filename}/copy`: edit and duplicate forms (auth required)
//! - `POST /{filename}`, `POST /{filename}/delete`: replace or remove (auth required)

use super::{session_middleware, views, AppError, AppState, RotatedSession, Session};
use crate::cms::{
    error_for_filename, error_for_signup, render, require_signed_in, ContentKind,
    CredentialError, DocumentRepository, HomeRedirect, Payload, RepositoryError,
};
use askama::Template;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use serde::Deserialize;
use std::io::Write;
use tower::ServiceExt;
use tower_http::{services::ServeFile, trace::TraceLayer};

/// Largest accepted request body, sized for image uploads.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/users/signup", get(signup_form).post(signup))
        .route("/users/signin", get(signin_form).post(signin))
        .route("/users/signout", post(signout))
        .route("/new", get(new_form))
        .route("/create", post(create))
        .route("/copy", post(copy))
        .route("/upload", get(upload_form).post(upload))
        .route("/{filename}", get(view).post(update))
        .route("/{filename}/edit", get(edit_form))
        .route("/{filename}/copy", get(copy_form))
        .route("/{filename}/delete", post(delete))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn page(template: impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

/// Renders an HTML page with a 422 status.
fn unprocessable(template: impl Template) -> Result<Response, AppError> {
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page(template)?).into_response())
}

fn flash(message: impl Into<String>) -> Response {
    HomeRedirect::new(message).into_response()
}

// ============================================================================
// Index
// ============================================================================

async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    let files = state.repo.list()?;
    let message = state.sessions.take_message(&session.id);

    Ok(page(views::index(
        &files,
        session.username.as_deref(),
        message.as_deref(),
    ))?
    .into_response())
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Deserialize)]
struct SignupForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_confirm: String,
}

#[derive(Debug, Deserialize)]
struct SigninForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn signup_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>, AppError> {
    let message = state.sessions.take_message(&session.id);
    page(views::signup("", message.as_deref()))
}

async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let username = form.username.clone();
    let credentials = state.credentials.clone();

    // Argon2 runs on the blocking pool.
    let rejected = tokio::task::spawn_blocking(move || {
        let existing = credentials.load()?;
        if let Some(error) = error_for_signup(
            &form.username,
            &form.password,
            &form.password_confirm,
            &existing,
        ) {
            return Ok(Some(error));
        }
        credentials.append(&form.username, &form.password)?;
        Ok::<_, CredentialError>(None)
    })
    .await??;

    if let Some(error) = rejected {
        return unprocessable(views::signup(&username, Some(&error.to_string())));
    }

    tracing::info!("Signed up {}", username);

    Ok(flash(
        "You are now signed up! Please sign in to access more features.",
    ))
}

async fn signin_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>, AppError> {
    let message = state.sessions.take_message(&session.id);
    page(views::signin("", message.as_deref()))
}

async fn signin(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<SigninForm>,
) -> Result<Response, AppError> {
    let credentials = state.credentials.clone();
    let username = form.username.clone();
    let password = form.password;
    let valid =
        tokio::task::spawn_blocking(move || credentials.verify(&username, &password)).await??;

    if valid {
        // Signing in always issues a fresh session id.
        let id = state.sessions.rotate(&session.id);
        state.sessions.sign_in(&id, &form.username);
        tracing::info!("{} signed in", form.username);

        let mut response = flash("Welcome!");
        response.extensions_mut().insert(RotatedSession(id));
        Ok(response)
    } else {
        tracing::info!("Rejected sign-in for {}", form.username);
        unprocessable(views::signin(&form.username, Some("Invalid Credentials")))
    }
}

async fn signout(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    state.sessions.sign_out(&session.id);
    flash("You have been signed out.")
}

// ============================================================================
// Creating and copying
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateForm {
    #[serde(default)]
    filename: String,
}

#[derive(Debug, Deserialize)]
struct CopyForm {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpdateForm {
    #[serde(default)]
    content: String,
}

async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;
    let message = state.sessions.take_message(&session.id);
    Ok(page(views::new_document("", message.as_deref()))?.into_response())
}

/// Checks a name for a new document: the filename rules first, then the
/// repository's name guard.
fn new_name_error(state: &AppState, name: &str) -> Result<Option<String>, AppError> {
    if let Some(error) = error_for_filename(name, &state.repo.list()?) {
        return Ok(Some(error.message().to_string()));
    }
    match DocumentRepository::validate_name(name) {
        Ok(()) => Ok(None),
        Err(_) => Ok(Some(format!("{} is not a valid file name.", name))),
    }
}

async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<CreateForm>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    if let Some(message) = new_name_error(&state, &form.filename)? {
        return unprocessable(views::new_document(&form.filename, Some(&message)));
    }

    state.repo.write(&form.filename, b"")?;
    tracing::info!("Created {}", form.filename);

    Ok(flash(format!("{} has been created.", form.filename)))
}

async fn copy(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<CopyForm>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    if let Some(message) = new_name_error(&state, &form.filename)? {
        return unprocessable(views::copy(
            &form.source,
            &form.filename,
            &form.content,
            Some(&message),
        ));
    }

    state
        .repo
        .copy(&form.source, &form.filename, form.content.as_bytes())?;
    tracing::info!("Copied {} to {}", form.source, form.filename);

    Ok(flash(format!("The file was copied to {}.", form.filename)))
}

// ============================================================================
// Uploads
// ============================================================================

async fn upload_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;
    let message = state.sessions.take_message(&session.id);
    Ok(page(views::upload(message.as_deref()))?.into_response())
}

/// Strips any client-side directory from an uploaded file's name.
fn upload_basename(filename: &str) -> &str {
    filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename)
}

async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = match field.file_name().map(upload_basename) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => break,
        };

        // Stage the upload on disk before it enters the repository.
        let mut staged = tempfile::NamedTempFile::new().map_err(|e| {
            AppError::Repository(RepositoryError::IoFailure(std::env::temp_dir(), e))
        })?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            staged.write_all(&chunk).map_err(|e| {
                AppError::Repository(RepositoryError::IoFailure(staged.path().to_path_buf(), e))
            })?;
        }

        return match state.repo.store_upload(&filename, staged.path()) {
            Ok(()) => {
                tracing::info!("Uploaded {}", filename);
                Ok(flash(format!("{} has been uploaded.", filename)))
            }
            Err(RepositoryError::InvalidName(name)) => unprocessable(views::upload(Some(
                &format!("{} is not a valid file name.", name),
            ))),
            Err(e) => Err(e.into()),
        };
    }

    unprocessable(views::upload(Some("Please choose an image.")))
}

// ============================================================================
// Single documents
// ============================================================================

async fn view(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    if !state.repo.exists(&filename)? {
        return Err(RepositoryError::NotFound(filename).into());
    }

    let kind = ContentKind::of(&filename)?;
    if let ContentKind::Image(_) = kind {
        return serve_image(&state, &filename, &kind).await;
    }

    let rendered = render(&filename, state.repo.read(&filename)?)?;

    let response = match (rendered.mime_type(), rendered.payload) {
        (_, Payload::Html(html)) => {
            let message = state.sessions.take_message(&session.id);
            page(views::markdown(&filename, &html, message.as_deref()))?.into_response()
        }
        (Some(mime), Payload::Raw(bytes)) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
        (None, Payload::Raw(bytes)) => bytes.into_response(),
    };

    Ok(response)
}

/// Streams an image from disk with its extension-derived content type.
async fn serve_image(
    state: &AppState,
    filename: &str,
    kind: &ContentKind,
) -> Result<Response, AppError> {
    let path = state.repo.path_of(filename)?;

    let mut response = match ServeFile::new(path).oneshot(Request::new(Body::empty())).await {
        Ok(response) => response.map(Body::new),
        Err(infallible) => match infallible {},
    };

    if response.status().is_success() {
        if let Some(value) = kind
            .mime_type()
            .and_then(|mime| HeaderValue::from_str(&mime).ok())
        {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }

    Ok(response)
}

async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    let content = state.repo.read(&filename)?;
    let message = state.sessions.take_message(&session.id);

    Ok(page(views::edit(
        &filename,
        &String::from_utf8_lossy(&content),
        message.as_deref(),
    ))?
    .into_response())
}

async fn copy_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    let content = state.repo.read(&filename)?;
    let message = state.sessions.take_message(&session.id);

    Ok(page(views::copy(
        &filename,
        "",
        &String::from_utf8_lossy(&content),
        message.as_deref(),
    ))?
    .into_response())
}

async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(filename): Path<String>,
    Form(form): Form<UpdateForm>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    if !state.repo.exists(&filename)? {
        return Err(RepositoryError::NotFound(filename).into());
    }

    state.repo.write(&filename, form.content.as_bytes())?;
    tracing::info!("Updated {}", filename);

    Ok(flash(format!("{} has been updated.", filename)))
}

async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    require_signed_in(&session)?;

    state.repo.delete(&filename)?;
    tracing::info!("Deleted {}", filename);

    Ok(flash(format!("{} has been deleted.", filename)))
}
