use diesel::dsl::{exists, select};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::get;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::{context, Template};

use crate::config::AppConfig;
use crate::db::schema::follows;
use crate::db::Db;
use crate::posts::{feed_page, FeedFilter};
use crate::types::{login_redirect, AppError};
use crate::users::User;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = follows)]
pub struct Follow {
    pub id: i32,
    pub follower_id: i32,
    pub followed_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = follows)]
pub struct NewFollow {
    pub follower_id: i32,
    pub followed_id: i32,
}

impl Follow {
    /// Idempotent: the pair is unique at the schema level and a repeat
    /// insert is a no-op.
    pub fn create(
        follower_id: i32,
        followed_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<(), AppError> {
        diesel::insert_into(follows::table)
            .values(&NewFollow {
                follower_id,
                followed_id,
            })
            .on_conflict((follows::follower_id, follows::followed_id))
            .do_nothing()
            .execute(conn)?;
        Ok(())
    }

    pub fn delete(
        follower_id: i32,
        followed_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<(), AppError> {
        diesel::delete(
            follows::table
                .filter(follows::follower_id.eq(follower_id))
                .filter(follows::followed_id.eq(followed_id)),
        )
        .execute(conn)?;
        Ok(())
    }

    pub fn exists(
        follower_id: i32,
        followed_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<bool, AppError> {
        select(exists(
            follows::table
                .filter(follows::follower_id.eq(follower_id))
                .filter(follows::followed_id.eq(followed_id)),
        ))
        .get_result::<bool>(conn)
        .map_err(Into::into)
    }
}

#[get("/follow?<page>")]
pub fn follow_index(
    page: Option<i64>,
    user: User,
    mut db: Db,
    config: &State<AppConfig>,
) -> Result<Template, AppError> {
    let conn = &mut *db;
    let page_obj = feed_page(
        FeedFilter::FollowedBy(user.id),
        page,
        config.posts_per_page,
        conn,
    )?;
    Ok(Template::render(
        "posts/follow",
        context! { user: user, page_obj: page_obj },
    ))
}

#[get("/follow", rank = 2)]
pub fn follow_index_anonymous() -> Redirect {
    login_redirect("/follow")
}

#[get("/profile/<username>/follow")]
pub fn profile_follow(username: &str, user: User, mut db: Db) -> Result<Redirect, AppError> {
    let conn = &mut *db;
    let target = User::load_by_name(username, conn)?;
    // Following yourself is a silent no-op.
    if target.id != user.id {
        Follow::create(user.id, target.id, conn)?;
    }
    Ok(Redirect::to(format!("/profile/{}", username)))
}

#[get("/profile/<username>/follow", rank = 2)]
pub fn profile_follow_anonymous(username: &str) -> Redirect {
    login_redirect(&format!("/profile/{}/follow", username))
}

#[get("/profile/<username>/unfollow")]
pub fn profile_unfollow(username: &str, user: User, mut db: Db) -> Result<Redirect, AppError> {
    let conn = &mut *db;
    let target = User::load_by_name(username, conn)?;
    Follow::delete(user.id, target.id, conn)?;
    Ok(Redirect::to(format!("/profile/{}", username)))
}

#[get("/profile/<username>/unfollow", rank = 2)]
pub fn profile_unfollow_anonymous(username: &str) -> Redirect {
    login_redirect(&format!("/profile/{}/unfollow", username))
}
