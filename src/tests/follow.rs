use rocket::http::Status;

use super::{location, test_app};
use crate::follow::Follow;

#[test]
fn following_creates_exactly_one_row_even_when_repeated() {
    let app = test_app();
    app.create_user("follower");
    let followed = app.create_user("following");
    app.login("follower");

    let path = format!("/profile/{}/follow", followed.username);
    let response = app.client.get(path.as_str()).dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), format!("/profile/{}", followed.username));
    assert_eq!(app.follow_count(), 1);

    // The toggle is idempotent.
    app.client.get(path.as_str()).dispatch();
    assert_eq!(app.follow_count(), 1);
}

#[test]
fn unfollowing_removes_the_row() {
    let app = test_app();
    app.create_user("follower");
    let followed = app.create_user("following");
    app.login("follower");

    app.client
        .get(format!("/profile/{}/follow", followed.username).as_str())
        .dispatch();
    assert_eq!(app.follow_count(), 1);

    let path = format!("/profile/{}/unfollow", followed.username);
    let response = app
        .client
        .get(path.as_str())
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(app.follow_count(), 0);
}

#[test]
fn following_yourself_is_a_no_op() {
    let app = test_app();
    let user = app.create_user("narcissus");
    app.login(&user.username);

    app.client
        .get(format!("/profile/{}/follow", user.username).as_str())
        .dispatch();
    assert_eq!(app.follow_count(), 0);
}

#[test]
fn anonymous_follow_attempts_create_nothing() {
    let app = test_app();
    let followed = app.create_user("following");

    let path = format!("/profile/{}/follow", followed.username);
    let response = app.client.get(path.as_str()).dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), format!("/auth/login?next={}", path));
    assert_eq!(app.follow_count(), 0);
}

#[test]
fn the_followed_feed_contains_only_followed_authors() {
    let app = test_app();
    let follower = app.create_user("follower");
    let followed = app.create_user("following");
    app.create_post(&followed, "a post from the followed author", None);
    Follow::create(follower.id, followed.id, &mut app.conn()).unwrap();

    app.login(&follower.username);
    let body = app.client.get("/follow").dispatch().into_string().unwrap();
    assert!(body.contains("a post from the followed author"));

    // The author does not see their own post in their followed feed.
    app.logout();
    app.login(&followed.username);
    let body = app.client.get("/follow").dispatch().into_string().unwrap();
    assert!(!body.contains("a post from the followed author"));
}

#[test]
fn unfollowing_empties_the_feed_again() {
    let app = test_app();
    let follower = app.create_user("follower");
    let followed = app.create_user("following");
    app.create_post(&followed, "soon to disappear", None);
    Follow::create(follower.id, followed.id, &mut app.conn()).unwrap();

    app.login(&follower.username);
    let body = app.client.get("/follow").dispatch().into_string().unwrap();
    assert!(body.contains("soon to disappear"));

    app.client
        .get(format!("/profile/{}/unfollow", followed.username).as_str())
        .dispatch();
    let body = app.client.get("/follow").dispatch().into_string().unwrap();
    assert!(!body.contains("soon to disappear"));
}

#[test]
fn the_profile_page_reflects_the_follow_state() {
    let app = test_app();
    app.create_user("follower");
    let followed = app.create_user("following");
    app.login("follower");

    let path = format!("/profile/{}", followed.username);
    let body = app
        .client
        .get(path.as_str())
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains(&format!("/profile/{}/follow", followed.username)));

    app.client
        .get(format!("/profile/{}/follow", followed.username).as_str())
        .dispatch();
    let body = app
        .client
        .get(path.as_str())
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains(&format!("/profile/{}/unfollow", followed.username)));
}
