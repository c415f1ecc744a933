use rocket::http::{ContentType, Status};

use super::{location, test_app, PASSWORD};

#[test]
fn guest_auth_pages_are_reachable() {
    let app = test_app();
    for path in ["/auth/signup", "/auth/login"] {
        let response = app.client.get(path).dispatch();
        assert_eq!(response.status(), Status::Ok, "GET {}", path);
    }
}

#[test]
fn signup_creates_the_user_and_points_at_login() {
    let app = test_app();
    let before = app.user_count();

    let response = app
        .client
        .post("/auth/signup")
        .header(ContentType::Form)
        .body(format!(
            "username=HasNoName&email=hasnoname@example.com&password={p}&password_confirm={p}",
            p = PASSWORD
        ))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/auth/login");
    assert_eq!(app.user_count(), before + 1);

    // And the fresh account can actually log in.
    app.login("HasNoName");
    let body = app.client.get("/").dispatch().into_string().unwrap();
    assert!(body.contains("HasNoName"));
}

#[test]
fn signup_rejects_bad_input_without_creating_rows() {
    let app = test_app();
    app.create_user("Taken_name");
    let before = app.user_count();

    let cases = [
        (
            "username=Taken_name&email=new@example.com&password=password123&password_confirm=password123",
            "username already taken",
        ),
        (
            "username=Fresh_name&email=not-an-email&password=password123&password_confirm=password123",
            "invalid email",
        ),
        (
            "username=Fresh_name&email=fresh@example.com&password=short&password_confirm=short",
            "at least 8 characters",
        ),
        (
            "username=Fresh_name&email=fresh@example.com&password=password123&password_confirm=password456",
            "passwords do not match",
        ),
    ];
    for (body, message) in cases {
        let response = app
            .client
            .post("/auth/signup")
            .header(ContentType::Form)
            .body(body)
            .dispatch();
        assert_eq!(response.status(), Status::Ok, "case: {}", message);
        let page = response.into_string().unwrap();
        assert!(page.contains(message), "case: {}", message);
    }
    assert_eq!(app.user_count(), before);
}

#[test]
fn login_with_bad_credentials_redisplays_the_form() {
    let app = test_app();
    app.create_user("Test_name");

    let response = app
        .client
        .post("/auth/login")
        .header(ContentType::Form)
        .body("username=Test_name&password=wrong-password")
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("invalid username or password"));
}

#[test]
fn login_honors_the_next_parameter() {
    let app = test_app();
    app.create_user("Test_name");

    // The login page embeds the target...
    let body = app
        .client
        .get("/auth/login?next=/create")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains("name=\"next\""));
    assert!(body.contains("value=\"/create\""));

    // ...and the submission bounces back there.
    let response = app
        .client
        .post("/auth/login")
        .header(ContentType::Form)
        .body(format!(
            "username=Test_name&password={}&next=/create",
            PASSWORD
        ))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/create");
}

#[test]
fn login_never_redirects_off_site() {
    let app = test_app();
    app.create_user("Test_name");

    let response = app
        .client
        .post("/auth/login")
        .header(ContentType::Form)
        .body(format!(
            "username=Test_name&password={}&next=https://evil.example",
            PASSWORD
        ))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/");
}

#[test]
fn logout_ends_the_session() {
    let app = test_app();
    app.create_user("Test_name");
    app.login("Test_name");

    let response = app.client.get("/auth/logout").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("logged out"));

    // Protected pages redirect again.
    let response = app.client.get("/create").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/auth/login?next=/create");
}

#[test]
fn password_change_requires_login_and_works_end_to_end() {
    let app = test_app();

    let response = app.client.get("/auth/password_change").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(
        location(&response),
        "/auth/login?next=/auth/password_change"
    );

    app.create_user("Test_name");
    app.login("Test_name");
    let response = app
        .client
        .post("/auth/password_change")
        .header(ContentType::Form)
        .body(format!(
            "old_password={}&new_password=brand-new-pass&new_password_confirm=brand-new-pass",
            PASSWORD
        ))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("Password changed"));

    app.logout();
    // The old password no longer works...
    let response = app
        .client
        .post("/auth/login")
        .header(ContentType::Form)
        .body(format!("username=Test_name&password={}", PASSWORD))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // ...the new one does.
    let response = app
        .client
        .post("/auth/login")
        .header(ContentType::Form)
        .body("username=Test_name&password=brand-new-pass")
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
}

#[test]
fn password_change_rejects_a_wrong_current_password() {
    let app = test_app();
    app.create_user("Test_name");
    app.login("Test_name");

    let response = app
        .client
        .post("/auth/password_change")
        .header(ContentType::Form)
        .body("old_password=wrong&new_password=brand-new-pass&new_password_confirm=brand-new-pass")
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("incorrect password"));
}
