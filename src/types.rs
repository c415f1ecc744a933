use std::collections::HashMap;

use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Redirect, Responder};
use rocket_dyn_templates::Template;
use serde::Serialize;

/// Failures that escape a handler. Everything here ends in a status code:
/// a missing row is a 404 through the catcher, the rest are 500s.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("password hashing failed")]
    PasswordHash,
    #[error("template rendering failed")]
    Render,
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            AppError::Database(DieselError::NotFound) => Err(Status::NotFound),
            other => {
                log::error!("request failed: {}", other);
                Err(Status::InternalServerError)
            }
        }
    }
}

/// Field-level validation messages, accumulated per form field and
/// redisplayed with the form. Not an error in the `AppError` sense: the
/// response is a 200 with the form re-rendered.
#[derive(Debug, Default, Serialize)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, field: K, message: V) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(field: K, message: V) -> Self {
        let mut errors = ValidationError::default();
        errors.add_error(field, message);
        errors
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flat `"field: message"` lines for the template error panel.
    pub fn flatten(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .0
            .iter()
            .flat_map(|(field, messages)| {
                messages.iter().map(move |m| format!("{}: {}", field, m))
            })
            .collect();
        lines.sort();
        lines
    }
}

/// Form validation against current database state (uniqueness and
/// existence checks), accumulating every field error rather than failing
/// on the first. The outer `Result` is for the queries themselves.
pub trait Validate {
    fn validate(&self, conn: &mut SqliteConnection) -> diesel::QueryResult<ValidationError>;
}

/// A handler outcome that either renders a page or bounces the browser
/// somewhere else (login, a post's detail view, a profile).
#[derive(rocket::Responder)]
pub enum PageResult {
    Page(Template),
    Redirect(Redirect),
}

/// Redirect to the login form, preserving the originally requested path.
pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(format!("/auth/login?next={}", next))
}
