use lazy_static::lazy_static;
use regex::Regex;

use crate::types::ValidationError;

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).unwrap()
    };
    static ref USERNAME_RE: Regex = Regex::new(r"\A[A-Za-z0-9@.+_-]+\z").unwrap();
}

pub fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::from(
            "email",
            format!("invalid email: {}", email),
        ))
    }
}

pub fn validate_username_format(username: &str) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    if username.len() < 3 {
        errors.add_error("username", "username must be at least 3 characters");
    }
    if !USERNAME_RE.is_match(username) {
        errors.add_error(
            "username",
            "letters, digits and @ . + - _ only",
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        Err(ValidationError::from(
            "password",
            "password must be at least 8 characters",
        ))
    } else {
        Ok(())
    }
}
