//! Registration, password login, refresh and federated login through the router.

mod common;

use axum::http::StatusCode;
use common::{TestApp, registration, tokens};
use serde_json::json;
use thera_core::identity::VerifiedIdentity;
use thera_core::store::UserStore;

#[tokio::test]
async fn health_check() {
    let app = TestApp::new();
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn register_issues_tokens_and_creates_thread() {
    let app = TestApp::new();
    let (access, refresh) = app.register("ada@example.com", "+15550100").await;

    assert_eq!(access.len(), 32);
    assert_eq!(refresh.len(), 32);
    assert_ne!(access, refresh);
    assert_eq!(app.assistant.threads_created(), 1);

    let user = app
        .users
        .find_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.user.has_thread());
    assert!(user.password_hash.is_some_and(|h| h != "correct horse"));

    let (status, profile) = app.get("/profile", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "ada@example.com");
    assert_eq!(profile["name"], "Ada");
    assert_eq!(profile["roles"], "user");
    assert!(profile.get("passwordHash").is_none());
}

#[tokio::test]
async fn register_survives_thread_creation_failure() {
    let app = TestApp::new();
    app.assistant.set_fail_create(true);

    let (access, _) = app.register("ada@example.com", "").await;

    let user = app
        .users
        .find_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap()
        .user;
    assert!(!user.has_thread());

    app.assistant.set_fail_create(false);
    let (status, reply) = app
        .post("/chat/message", Some(&access), json!({"text": "hi"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["text"], "echo: hi");
    let user = app.users.get_by_id(user.id).await.unwrap().unwrap();
    assert!(user.has_thread());
}

#[tokio::test]
async fn register_rejects_invalid_forms() {
    let app = TestApp::new();

    let bad_email = registration("not-an-email", "");
    let mut mismatch = registration("ada@example.com", "");
    mismatch["rePassword"] = json!("something else");
    let mut no_name = registration("ada@example.com", "");
    no_name["name"] = json!("");
    let mut no_surname = registration("ada@example.com", "");
    no_surname["surname"] = json!("");

    for form in [bad_email, mismatch, no_name, no_surname] {
        let (status, body) = app.post("/register", None, form).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["error"], "validation_error");
    }
    assert_eq!(app.assistant.threads_created(), 0);
}

#[tokio::test]
async fn register_rejects_existing_account() {
    let app = TestApp::new();
    app.register("ada@example.com", "+15550100").await;

    let (status, body) = app
        .post("/register", None, registration("ADA@example.com", ""))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already registered");

    let (status, _) = app
        .post("/register", None, registration("other@example.com", "+15550100"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_login() {
    let app = TestApp::new();
    app.register("ada@example.com", "").await;

    let (status, body) = app
        .post(
            "/auth/email",
            None,
            json!({"email": "ada@example.com", "password": "correct horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (access, _) = tokens(&body);
    let (status, _) = app.get("/profile", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn phone_login() {
    let app = TestApp::new();
    app.register("ada@example.com", "+15550100").await;

    let (status, body) = app
        .post(
            "/auth/phone",
            None,
            json!({"phone": "+15550100", "password": "correct horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());

    let (status, body) = app
        .post("/auth/phone", None, json!({"password": "correct horse"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Field 'phone' must be filled");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("ada@example.com", "").await;

    let (wrong_status, wrong_body) = app
        .post(
            "/auth/email",
            None,
            json!({"email": "ada@example.com", "password": "wrong"}),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .post(
            "/auth/email",
            None,
            json!({"email": "nobody@example.com", "password": "wrong"}),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["message"], "Invalid credentials");
}

#[tokio::test]
async fn refresh_issues_new_pair_and_keeps_old_token() {
    let app = TestApp::new();
    let (_, refresh) = app.register("ada@example.com", "").await;

    let (status, body) = app.get(&format!("/token/refresh/{refresh}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (new_access, new_refresh) = tokens(&body);
    assert_ne!(new_refresh, refresh);

    let (status, _) = app.get("/profile", Some(&new_access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/token/refresh/{refresh}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_rejects_unknown_and_access_tokens() {
    let app = TestApp::new();
    let (access, _) = app.register("ada@example.com", "").await;

    let (status, body) = app.get("/token/refresh/not-a-token", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");

    let (status, _) = app.get(&format!("/token/refresh/{access}"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_picks_up_profile_changes() {
    let app = TestApp::new();
    let (access, refresh) = app.register("ada@example.com", "").await;
    let (status, _) = app
        .call(
            axum::http::Method::PATCH,
            "/profile/update",
            Some(&access),
            Some(json!({"surname": "Byron"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/token/refresh/{refresh}"), None).await;
    let (new_access, _) = tokens(&body);
    let snapshot = thera_core::auth::session::lookup_access(app.cache.as_ref(), &new_access)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.surname, "Byron");
}

fn google_identity(email: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        provider_user_id: "fb-1".into(),
        email: email.into(),
        email_verified: true,
        name: "Grace".into(),
        provider: "google.com".into(),
    }
}

#[tokio::test]
async fn firebase_login_creates_account_with_provider_flag() {
    let app = TestApp::new();
    app.identity.accept("id-token-1", google_identity("grace@example.com"));

    let (status, body) = app
        .post("/auth/firebase", None, json!({"idToken": "id-token-1"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (access, _) = tokens(&body);

    let (_, profile) = app.get("/profile", Some(&access)).await;
    assert_eq!(profile["email"], "grace@example.com");
    assert_eq!(profile["name"], "Grace");
    assert_eq!(profile["isGoogle"], true);
    assert_eq!(profile["isApple"], false);
    assert_eq!(app.assistant.threads_created(), 1);

    let (status, _) = app
        .post("/auth/firebase", None, json!({"idToken": "id-token-1"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.assistant.threads_created(), 1);
}

#[tokio::test]
async fn firebase_login_links_existing_account() {
    let app = TestApp::new();
    app.register("ada@example.com", "").await;
    app.identity.accept(
        "apple-token",
        VerifiedIdentity {
            provider: "apple.com".into(),
            ..google_identity("ada@example.com")
        },
    );

    let (status, _) = app
        .post("/auth/firebase", None, json!({"idToken": "apple-token"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let user = app
        .users
        .find_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.user.is_apple);
    assert!(!user.user.is_google);
    assert!(user.password_hash.is_some());
}

#[tokio::test]
async fn firebase_login_requires_verified_email() {
    let app = TestApp::new();
    app.register("ada@example.com", "").await;
    for (credential, email) in [
        ("claims-existing", "ada@example.com"),
        ("claims-new", "newcomer@example.com"),
    ] {
        app.identity.accept(
            credential,
            VerifiedIdentity {
                email_verified: false,
                provider: "password".into(),
                ..google_identity(email)
            },
        );

        let (status, body) = app
            .post("/auth/firebase", None, json!({"idToken": credential}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
        assert_eq!(body["message"], "Invalid credentials");
        assert!(body.get("accessToken").is_none());
    }

    assert!(
        app.users
            .find_by_email("newcomer@example.com")
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(app.assistant.threads_created(), 1);
}

#[tokio::test]
async fn register_rejects_federated_only_account() {
    let app = TestApp::new();
    app.identity.accept("id-token-1", google_identity("grace@example.com"));
    let (status, _) = app
        .post("/auth/firebase", None, json!({"idToken": "id-token-1"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/register", None, registration("grace@example.com", ""))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already registered");

    let user = app
        .users
        .find_by_email("grace@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.password_hash.is_none());
}

#[tokio::test]
async fn firebase_login_rejects_unknown_credential() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/auth/firebase", None, json!({"idToken": "forged"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn firebase_login_unavailable_without_provider() {
    let app = TestApp::without_identity();
    let (status, body) = app
        .post("/auth/firebase", None, json!({"idToken": "anything"}))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");
}
