use std::fs;
use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use diesel::dsl::{exists, select};
use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::{get, post, State};
use rocket_dyn_templates::{context, Metadata, Template};
use serde::Serialize;
use slug::slugify;

use crate::cache::PageCache;
use crate::config::AppConfig;
use crate::db::schema::{follows, groups, posts, users};
use crate::db::Db;
use crate::follow::Follow;
use crate::pagination::{self, Page};
use crate::types::{login_redirect, AppError, PageResult, Validate, ValidationError};
use crate::users::User;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub created: NaiveDateTime,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub text: &'a str,
    pub created: NaiveDateTime,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

impl Post {
    pub fn create(
        text: &str,
        author_id: i32,
        group_id: Option<i32>,
        image: Option<String>,
        conn: &mut SqliteConnection,
    ) -> Result<Post, AppError> {
        let new_post = NewPost {
            text,
            created: Utc::now().naive_utc(),
            author_id,
            group_id,
            image,
        };
        diesel::insert_into(posts::table)
            .values(&new_post)
            .get_result::<Post>(conn)
            .map_err(Into::into)
    }

    pub fn load_by_id(post_id: i32, conn: &mut SqliteConnection) -> Result<Post, AppError> {
        posts::table
            .find(post_id)
            .first::<Post>(conn)
            .map_err(Into::into)
    }

    /// The detail view's row: post plus author plus (optionally) group.
    pub fn load_detail(
        post_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<(Post, User, Option<Group>), AppError> {
        posts::table
            .inner_join(users::table)
            .left_join(groups::table)
            .filter(posts::id.eq(post_id))
            .select((
                Post::as_select(),
                User::as_select(),
                Option::<Group>::as_select(),
            ))
            .first::<(Post, User, Option<Group>)>(conn)
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = groups)]
pub struct Group {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Insertable)]
#[diesel(table_name = groups)]
pub struct NewGroup<'a> {
    pub title: &'a str,
    pub slug: String,
    pub description: &'a str,
}

impl Group {
    /// Groups are created administratively; the slug falls back to a
    /// slugified title when not given.
    pub fn create(
        title: &str,
        slug: Option<&str>,
        description: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Group, AppError> {
        let new_group = NewGroup {
            title,
            slug: match slug {
                Some(given) => given.to_string(),
                None => slugify(title),
            },
            description,
        };
        diesel::insert_into(groups::table)
            .values(&new_group)
            .get_result::<Group>(conn)
            .map_err(Into::into)
    }

    pub fn load_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Group, AppError> {
        groups::table
            .filter(groups::slug.eq(slug))
            .first::<Group>(conn)
            .map_err(Into::into)
    }

    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<Group>, AppError> {
        groups::table
            .order(groups::title.asc())
            .load::<Group>(conn)
            .map_err(Into::into)
    }
}

/// What the feed and detail templates consume.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i32,
    pub text: String,
    pub created: String,
    pub author_username: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupRef {
    pub title: String,
    pub slug: String,
}

impl From<(Post, User, Option<Group>)> for PostView {
    fn from((post, author, group): (Post, User, Option<Group>)) -> PostView {
        PostView {
            id: post.id,
            text: post.text,
            created: post.created.format("%d %b %Y %H:%M").to_string(),
            author_username: author.username,
            group: group.map(|g| GroupRef {
                title: g.title,
                slug: g.slug,
            }),
            image: post.image,
        }
    }
}

#[derive(Clone, Copy)]
pub enum FeedFilter {
    All,
    Group(i32),
    Author(i32),
    FollowedBy(i32),
}

/// One feed page, newest first with an id tiebreak so same-second posts
/// page deterministically. The page number is clamped the forgiving way.
pub fn feed_page(
    filter: FeedFilter,
    requested: Option<i64>,
    per_page: i64,
    conn: &mut SqliteConnection,
) -> Result<Page<PostView>, AppError> {
    let total: i64 = match filter {
        FeedFilter::All => posts::table.count().get_result(conn)?,
        FeedFilter::Group(group_id) => posts::table
            .filter(posts::group_id.eq(group_id))
            .count()
            .get_result(conn)?,
        FeedFilter::Author(author_id) => posts::table
            .filter(posts::author_id.eq(author_id))
            .count()
            .get_result(conn)?,
        FeedFilter::FollowedBy(viewer_id) => posts::table
            .filter(
                posts::author_id.eq_any(
                    follows::table
                        .select(follows::followed_id)
                        .filter(follows::follower_id.eq(viewer_id)),
                ),
            )
            .count()
            .get_result(conn)?,
    };

    let mut query = posts::table
        .inner_join(users::table)
        .left_join(groups::table)
        .select((
            Post::as_select(),
            User::as_select(),
            Option::<Group>::as_select(),
        ))
        .order(posts::created.desc())
        .then_order_by(posts::id.desc())
        .into_boxed::<Sqlite>();

    query = match filter {
        FeedFilter::All => query,
        FeedFilter::Group(group_id) => query.filter(posts::group_id.eq(group_id)),
        FeedFilter::Author(author_id) => query.filter(posts::author_id.eq(author_id)),
        FeedFilter::FollowedBy(viewer_id) => query.filter(
            posts::author_id.eq_any(
                follows::table
                    .select(follows::followed_id)
                    .filter(follows::follower_id.eq(viewer_id)),
            ),
        ),
    };

    let number = pagination::clamp(requested, total, per_page);
    let (limit, offset) = pagination::window(number, per_page);
    let rows = query
        .limit(limit)
        .offset(offset)
        .load::<(Post, User, Option<Group>)>(conn)?;

    let object_list = rows.into_iter().map(PostView::from).collect();
    Ok(Page::new(object_list, total, number, per_page))
}

#[get("/?<page>")]
pub fn index(
    page: Option<i64>,
    mut db: Db,
    user: Option<User>,
    cache: &State<PageCache>,
    config: &State<AppConfig>,
    metadata: Metadata<'_>,
) -> Result<RawHtml<String>, AppError> {
    let key = format!("page:{}", page.unwrap_or(1));
    if let Some(body) = cache.get(&key) {
        return Ok(RawHtml(body));
    }

    let conn = &mut *db;
    let page_obj = feed_page(FeedFilter::All, page, config.posts_per_page, conn)?;
    let (_, body) = metadata
        .render("posts/index", context! { user: user, page_obj: page_obj })
        .ok_or(AppError::Render)?;
    cache.put(&key, body.clone());
    Ok(RawHtml(body))
}

#[get("/group/<slug>?<page>")]
pub fn group_list(
    slug: &str,
    page: Option<i64>,
    mut db: Db,
    user: Option<User>,
    config: &State<AppConfig>,
) -> Result<Template, AppError> {
    let conn = &mut *db;
    let group = Group::load_by_slug(slug, conn)?;
    let page_obj = feed_page(FeedFilter::Group(group.id), page, config.posts_per_page, conn)?;
    Ok(Template::render(
        "posts/group_list",
        context! { user: user, group: group, page_obj: page_obj },
    ))
}

#[get("/profile/<username>?<page>")]
pub fn profile(
    username: &str,
    page: Option<i64>,
    mut db: Db,
    user: Option<User>,
    config: &State<AppConfig>,
) -> Result<Template, AppError> {
    let conn = &mut *db;
    let author = User::load_by_name(username, conn)?;
    let following = match &user {
        Some(viewer) => Follow::exists(viewer.id, author.id, conn)?,
        None => false,
    };
    let page_obj = feed_page(FeedFilter::Author(author.id), page, config.posts_per_page, conn)?;
    Ok(Template::render(
        "posts/profile",
        context! { user: user, author: author, following: following, page_obj: page_obj },
    ))
}

#[get("/posts/<id>")]
pub fn post_detail(id: i32, mut db: Db, user: Option<User>) -> Result<Template, AppError> {
    let conn = &mut *db;
    let detail = Post::load_detail(id, conn)?;
    let comments = crate::comments::Comment::for_post(id, conn)?;
    let post = PostView::from(detail);
    Ok(Template::render(
        "posts/post_detail",
        context! { user: user, post: post, comments: comments },
    ))
}

#[derive(rocket::FromForm)]
pub struct PostForm<'f> {
    pub text: String,
    pub group: Option<i32>,
    pub image: Option<TempFile<'f>>,
}

impl Validate for PostForm<'_> {
    fn validate(&self, conn: &mut SqliteConnection) -> QueryResult<ValidationError> {
        let mut errors = ValidationError::default();
        if self.text.trim().is_empty() {
            errors.add_error("text", "may not be blank");
        }
        if let Some(group_id) = self.group {
            let known =
                select(exists(groups::table.find(group_id))).get_result::<bool>(conn)?;
            if !known {
                errors.add_error("group", "no such group");
            }
        }
        Ok(errors)
    }
}

/// Store an uploaded image under `MEDIA_ROOT/posts/` with a
/// timestamp-slug filename; the returned path is what the post records.
async fn save_image(
    file: &mut TempFile<'_>,
    media_root: &Path,
) -> Result<Option<String>, AppError> {
    if file.len() == 0 {
        return Ok(None);
    }
    let stem = slugify(file.name().unwrap_or("upload"));
    let stored = match file.content_type().and_then(|ct| ct.extension()) {
        Some(ext) => format!("{}-{}.{}", Utc::now().timestamp(), stem, ext),
        None => format!("{}-{}", Utc::now().timestamp(), stem),
    };
    let dir = media_root.join("posts");
    fs::create_dir_all(&dir)?;
    file.copy_to(dir.join(&stored)).await?;
    log::info!("stored upload as posts/{}", stored);
    Ok(Some(format!("posts/{}", stored)))
}

#[get("/create")]
pub fn post_create_page(user: User, mut db: Db) -> Result<Template, AppError> {
    let conn = &mut *db;
    let groups = Group::all(conn)?;
    Ok(Template::render(
        "posts/post_create",
        context! {
            user: user,
            groups: groups,
            is_edit: false,
            errors: Vec::<String>::new(),
            form: context! { text: "", group: None::<i32> },
        },
    ))
}

#[get("/create", rank = 2)]
pub fn post_create_page_anonymous() -> Redirect {
    login_redirect("/create")
}

#[post("/create", data = "<form>")]
pub async fn post_create(
    user: User,
    mut db: Db,
    config: &State<AppConfig>,
    mut form: Form<PostForm<'_>>,
) -> Result<PageResult, AppError> {
    let errors = form.validate(&mut db)?;
    if !errors.is_empty() {
        let groups = Group::all(&mut db)?;
        return Ok(PageResult::Page(Template::render(
            "posts/post_create",
            context! {
                user: user,
                groups: groups,
                is_edit: false,
                errors: errors.flatten(),
                form: context! { text: &form.text, group: form.group },
            },
        )));
    }

    let image = match form.image.as_mut() {
        Some(file) => save_image(file, &config.media_root).await?,
        None => None,
    };
    let post = Post::create(&form.text, user.id, form.group, image, &mut db)?;
    log::info!("user {} published post {}", user.username, post.id);
    Ok(PageResult::Redirect(Redirect::to(format!(
        "/profile/{}",
        user.username
    ))))
}

#[post("/create", rank = 2)]
pub fn post_create_anonymous() -> Redirect {
    login_redirect("/create")
}

#[get("/posts/<id>/edit")]
pub fn post_edit_page(id: i32, user: User, mut db: Db) -> Result<PageResult, AppError> {
    let conn = &mut *db;
    let post = Post::load_by_id(id, conn)?;
    if post.author_id != user.id {
        return Ok(PageResult::Redirect(Redirect::to(format!("/posts/{}", id))));
    }
    let groups = Group::all(conn)?;
    Ok(PageResult::Page(Template::render(
        "posts/post_create",
        context! {
            user: user,
            groups: groups,
            is_edit: true,
            errors: Vec::<String>::new(),
            form: context! { text: post.text, group: post.group_id },
        },
    )))
}

#[get("/posts/<id>/edit", rank = 2)]
pub fn post_edit_page_anonymous(id: i32) -> Redirect {
    login_redirect(&format!("/posts/{}/edit", id))
}

#[post("/posts/<id>/edit", data = "<form>")]
pub async fn post_edit(
    id: i32,
    user: User,
    mut db: Db,
    config: &State<AppConfig>,
    mut form: Form<PostForm<'_>>,
) -> Result<PageResult, AppError> {
    let post = Post::load_by_id(id, &mut db)?;
    if post.author_id != user.id {
        return Ok(PageResult::Redirect(Redirect::to(format!("/posts/{}", id))));
    }

    let errors = form.validate(&mut db)?;
    if !errors.is_empty() {
        let groups = Group::all(&mut db)?;
        return Ok(PageResult::Page(Template::render(
            "posts/post_create",
            context! {
                user: user,
                groups: groups,
                is_edit: true,
                errors: errors.flatten(),
                form: context! { text: &form.text, group: form.group },
            },
        )));
    }

    diesel::update(posts::table.find(post.id))
        .set((posts::text.eq(&form.text), posts::group_id.eq(form.group)))
        .execute(&mut *db)?;

    if let Some(file) = form.image.as_mut() {
        if let Some(image) = save_image(file, &config.media_root).await? {
            diesel::update(posts::table.find(post.id))
                .set(posts::image.eq(image))
                .execute(&mut *db)?;
        }
    }

    Ok(PageResult::Redirect(Redirect::to(format!("/posts/{}", id))))
}

#[post("/posts/<id>/edit", rank = 2)]
pub fn post_edit_anonymous(id: i32) -> Redirect {
    login_redirect(&format!("/posts/{}/edit", id))
}
