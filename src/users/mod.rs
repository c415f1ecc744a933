use diesel::dsl::{exists, select};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::response::Redirect;
use rocket::{get, post};
use rocket_dyn_templates::{context, Template};

use crate::db::schema::users;
use crate::db::{Db, Pool};
use crate::types::{login_redirect, AppError, PageResult, Validate, ValidationError};

pub mod models;
mod utils;

pub use models::User;

pub const USER_COOKIE: &str = "user_id";

/// The session rides a private cookie holding the user id. A missing or
/// stale cookie is a *forward*, so public routes fall through to their
/// anonymous variants and protected ones to their login redirects.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<User, ()> {
        let id = request
            .cookies()
            .get_private(USER_COOKIE)
            .and_then(|cookie| cookie.value().parse::<i32>().ok());
        let Some(id) = id else {
            return Outcome::Forward(Status::Unauthorized);
        };
        let Some(pool) = request.rocket().state::<Pool>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };
        let Ok(mut conn) = pool.get() else {
            return Outcome::Error((Status::ServiceUnavailable, ()));
        };
        match User::try_load_by_id(id, &mut conn) {
            Ok(Some(user)) => Outcome::Success(user),
            _ => Outcome::Forward(Status::Unauthorized),
        }
    }
}

#[derive(Debug, rocket::FromForm)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl Validate for SignupForm {
    fn validate(&self, conn: &mut SqliteConnection) -> QueryResult<ValidationError> {
        let mut errors = ValidationError::default();
        if let Err(e) = utils::validate_username_format(&self.username) {
            errors.merge(e);
        }
        if let Err(e) = utils::validate_email_format(&self.email) {
            errors.merge(e);
        }
        if let Err(e) = utils::validate_password(&self.password) {
            errors.merge(e);
        }
        if self.password != self.password_confirm {
            errors.add_error("password_confirm", "passwords do not match");
        }

        let username_taken = select(exists(
            users::table.filter(users::username.eq(&self.username)),
        ))
        .get_result::<bool>(conn)?;
        if username_taken {
            errors.add_error("username", "username already taken");
        }

        let email_taken = select(exists(
            users::table.filter(users::email.eq(&self.email)),
        ))
        .get_result::<bool>(conn)?;
        if email_taken {
            errors.add_error("email", "email already registered");
        }

        Ok(errors)
    }
}

#[get("/signup")]
pub fn signup_page(user: Option<User>) -> Template {
    Template::render(
        "users/signup",
        context! {
            user: user,
            errors: Vec::<String>::new(),
            form: context! { username: "", email: "" },
        },
    )
}

#[post("/signup", data = "<form>")]
pub fn signup(mut db: Db, form: Form<SignupForm>) -> Result<PageResult, AppError> {
    let conn = &mut *db;
    let errors = form.validate(conn)?;
    if !errors.is_empty() {
        return Ok(PageResult::Page(Template::render(
            "users/signup",
            context! {
                user: None::<User>,
                errors: errors.flatten(),
                form: context! { username: &form.username, email: &form.email },
            },
        )));
    }

    let user = User::create(&form.username, &form.email, &form.password, conn)?;
    log::info!("registered user {}", user.username);
    Ok(PageResult::Redirect(Redirect::to("/auth/login")))
}

#[derive(Debug, rocket::FromForm)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[get("/login?<next>")]
pub fn login_page(next: Option<String>, user: Option<User>) -> Template {
    Template::render(
        "users/login",
        context! {
            user: user,
            errors: Vec::<String>::new(),
            next: next,
        },
    )
}

#[post("/login", data = "<form>")]
pub fn login(
    mut db: Db,
    cookies: &CookieJar<'_>,
    form: Form<LoginForm>,
) -> Result<PageResult, AppError> {
    let conn = &mut *db;
    match User::try_load_by_name(&form.username, conn)? {
        Some(user) if user.verify_password(&form.password) => {
            cookies.add_private(Cookie::new(USER_COOKIE, user.id.to_string()));
            // Only ever bounce within the site.
            let target = form
                .next
                .as_deref()
                .filter(|next| next.starts_with('/'))
                .unwrap_or("/");
            Ok(PageResult::Redirect(Redirect::to(target.to_string())))
        }
        _ => Ok(PageResult::Page(Template::render(
            "users/login",
            context! {
                user: None::<User>,
                errors: vec!["login: invalid username or password".to_string()],
                next: form.next.clone(),
            },
        ))),
    }
}

#[get("/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Template {
    cookies.remove_private(Cookie::from(USER_COOKIE));
    Template::render("users/logged_out", context! { user: None::<User> })
}

#[derive(Debug, rocket::FromForm)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[get("/password_change")]
pub fn password_change_page(user: User) -> Template {
    Template::render(
        "users/password_change",
        context! { user: user, errors: Vec::<String>::new() },
    )
}

#[get("/password_change", rank = 2)]
pub fn password_change_page_anonymous() -> Redirect {
    login_redirect("/auth/password_change")
}

#[post("/password_change", data = "<form>")]
pub fn password_change(
    user: User,
    mut db: Db,
    form: Form<PasswordChangeForm>,
) -> Result<PageResult, AppError> {
    let conn = &mut *db;
    let mut errors = ValidationError::default();
    if !user.verify_password(&form.old_password) {
        errors.add_error("old_password", "incorrect password");
    }
    if let Err(e) = utils::validate_password(&form.new_password) {
        errors.merge(e);
    }
    if form.new_password != form.new_password_confirm {
        errors.add_error("new_password_confirm", "passwords do not match");
    }
    if !errors.is_empty() {
        return Ok(PageResult::Page(Template::render(
            "users/password_change",
            context! { user: user, errors: errors.flatten() },
        )));
    }

    user.set_password(&form.new_password, conn)?;
    Ok(PageResult::Page(Template::render(
        "users/password_change_done",
        context! { user: user },
    )))
}

#[post("/password_change", rank = 2)]
pub fn password_change_anonymous() -> Redirect {
    login_redirect("/auth/password_change")
}
