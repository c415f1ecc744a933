use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::form::Form;
use rocket::post;
use rocket::response::Redirect;
use serde::Serialize;

use crate::db::schema::{comments, users};
use crate::db::Db;
use crate::posts::Post;
use crate::types::{login_redirect, AppError};
use crate::users::User;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment<'a> {
    pub post_id: i32,
    pub author_id: i32,
    pub text: &'a str,
    pub created: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub text: String,
    pub created: String,
    pub author_username: String,
}

impl Comment {
    pub fn create(
        post_id: i32,
        author_id: i32,
        text: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Comment, AppError> {
        let new_comment = NewComment {
            post_id,
            author_id,
            text,
            created: Utc::now().naive_utc(),
        };
        diesel::insert_into(comments::table)
            .values(&new_comment)
            .get_result::<Comment>(conn)
            .map_err(Into::into)
    }

    /// A post's comments with their authors, oldest first.
    pub fn for_post(
        post_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<CommentView>, AppError> {
        let rows = comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq(post_id))
            .order(comments::created.asc())
            .then_order_by(comments::id.asc())
            .select((Comment::as_select(), User::as_select()))
            .load::<(Comment, User)>(conn)?;
        Ok(rows
            .into_iter()
            .map(|(comment, author)| CommentView {
                id: comment.id,
                text: comment.text,
                created: comment.created.format("%d %b %Y %H:%M").to_string(),
                author_username: author.username,
            })
            .collect())
    }
}

#[derive(Debug, rocket::FromForm)]
pub struct CommentForm {
    pub text: String,
}

#[post("/posts/<id>/comment", data = "<form>")]
pub fn add_comment(
    id: i32,
    user: User,
    mut db: Db,
    form: Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let conn = &mut *db;
    let post = Post::load_by_id(id, conn)?;
    let text = form.text.trim();
    // Blank comments are dropped, not redisplayed.
    if !text.is_empty() {
        Comment::create(post.id, user.id, text, conn)?;
    }
    Ok(Redirect::to(format!("/posts/{}", post.id)))
}

#[post("/posts/<id>/comment", rank = 2)]
pub fn add_comment_anonymous(id: i32) -> Redirect {
    login_redirect(&format!("/posts/{}/comment", id))
}
