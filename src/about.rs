use rocket::get;
use rocket_dyn_templates::{context, Template};

use crate::users::User;

#[get("/author")]
pub fn author(user: Option<User>) -> Template {
    Template::render("about/author", context! { user: user })
}

#[get("/tech")]
pub fn tech(user: Option<User>) -> Template {
    Template::render("about/tech", context! { user: user })
}
