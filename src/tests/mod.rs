use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::sqlite::SqliteConnection;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::{Client, LocalResponse};
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::db::schema;
use crate::db::Pool;
use crate::posts::{Group, Post};
use crate::users::User;

mod auth;
mod follow;

pub const PASSWORD: &str = "password123";

/// A fully built application over a throwaway SQLite file. The tempdir
/// also holds the media root and must outlive the client.
pub struct TestApp {
    pub client: Client,
    _dir: TempDir,
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig {
        database_url: dir
            .path()
            .join("test.sqlite3")
            .to_string_lossy()
            .into_owned(),
        media_root: dir.path().join("media"),
        posts_per_page: 10,
        cache_ttl: Duration::from_secs(60),
    };
    let client = Client::tracked(crate::rocket(config)).expect("valid rocket instance");
    TestApp { client, _dir: dir }
}

impl TestApp {
    pub fn conn(&self) -> PooledConnection<ConnectionManager<SqliteConnection>> {
        self.client
            .rocket()
            .state::<Pool>()
            .expect("managed pool")
            .get()
            .expect("pooled connection")
    }

    pub fn create_user(&self, username: &str) -> User {
        User::create(
            username,
            &format!("{}@example.com", username.to_lowercase()),
            PASSWORD,
            &mut self.conn(),
        )
        .expect("create user")
    }

    pub fn create_group(&self, title: &str, slug: &str) -> Group {
        Group::create(title, Some(slug), "a test community", &mut self.conn())
            .expect("create group")
    }

    pub fn create_post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        Post::create(text, author.id, group.map(|g| g.id), None, &mut self.conn())
            .expect("create post")
    }

    pub fn login(&self, username: &str) {
        let response = self
            .client
            .post("/auth/login")
            .header(ContentType::Form)
            .body(format!("username={}&password={}", username, PASSWORD))
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther, "login as {}", username);
    }

    pub fn logout(&self) {
        self.client.get("/auth/logout").dispatch();
    }

    pub fn user_count(&self) -> i64 {
        schema::users::table
            .count()
            .get_result(&mut self.conn())
            .unwrap()
    }

    pub fn post_count(&self) -> i64 {
        schema::posts::table
            .count()
            .get_result(&mut self.conn())
            .unwrap()
    }

    pub fn comment_count(&self) -> i64 {
        schema::comments::table
            .count()
            .get_result(&mut self.conn())
            .unwrap()
    }

    pub fn follow_count(&self) -> i64 {
        schema::follows::table
            .count()
            .get_result(&mut self.conn())
            .unwrap()
    }

    pub fn latest_post(&self) -> Post {
        schema::posts::table
            .order(schema::posts::id.desc())
            .first::<Post>(&mut self.conn())
            .expect("at least one post")
    }
}

pub fn location(response: &LocalResponse<'_>) -> String {
    response
        .headers()
        .get_one("Location")
        .expect("Location header")
        .to_string()
}
