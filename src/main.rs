use rocket::fs::FileServer;
use rocket::{catch, catchers, routes, Build, Request, Rocket};
use rocket_dyn_templates::{context, Template};

mod about;
mod cache;
mod comments;
mod config;
mod db;
mod follow;
mod pagination;
mod posts;
mod types;
mod users;

#[cfg(test)]
mod tests;

use crate::cache::PageCache;
use crate::config::AppConfig;

#[catch(404)]
fn not_found(req: &Request) -> Template {
    Template::render(
        "core/404",
        context! { user: None::<users::User>, path: req.uri().path().to_string() },
    )
}

#[catch(500)]
fn server_error() -> Template {
    Template::render("core/500", context! { user: None::<users::User> })
}

pub fn rocket(config: AppConfig) -> Rocket<Build> {
    let pool = db::init_pool(&config.database_url).expect("failed to create database pool");
    db::run_migrations(&pool).expect("failed to run database migrations");
    std::fs::create_dir_all(&config.media_root).expect("failed to create media root");

    rocket::build()
        .manage(pool)
        .manage(PageCache::new(config.cache_ttl))
        .mount(
            "/",
            routes![
                posts::index,
                posts::group_list,
                posts::profile,
                posts::post_detail,
                posts::post_create_page,
                posts::post_create_page_anonymous,
                posts::post_create,
                posts::post_create_anonymous,
                posts::post_edit_page,
                posts::post_edit_page_anonymous,
                posts::post_edit,
                posts::post_edit_anonymous,
                comments::add_comment,
                comments::add_comment_anonymous,
                follow::follow_index,
                follow::follow_index_anonymous,
                follow::profile_follow,
                follow::profile_follow_anonymous,
                follow::profile_unfollow,
                follow::profile_unfollow_anonymous,
            ],
        )
        .mount(
            "/auth",
            routes![
                users::signup_page,
                users::signup,
                users::login_page,
                users::login,
                users::logout,
                users::password_change_page,
                users::password_change_page_anonymous,
                users::password_change,
                users::password_change_anonymous,
            ],
        )
        .mount("/about", routes![about::author, about::tech])
        .mount("/media", FileServer::from(config.media_root.clone()))
        .register("/", catchers![not_found, server_error])
        .attach(Template::fairing())
        .manage(config)
}

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let config = AppConfig::from_env();
    let _ = rocket(config).launch().await?;
    Ok(())
}
