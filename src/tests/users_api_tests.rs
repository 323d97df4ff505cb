#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::tests::support::*;
    use crate::types::DEFAULT_BAN_DESCRIPTION;

    #[tokio::test]
    async fn test_register() {
        let t = setup().await;
        let (status, body) =
            t.post("/auth/register", None, json!({ "username": " alice ", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User has been registered successfully!");
        let data = &body["data"];
        assert_eq!(data["username"], "alice");
        assert_eq!(data["isAdmin"], false);
        assert_eq!(data["banstatus"]["isBanned"], false);
        assert_eq!(data["banstatus"]["description"], DEFAULT_BAN_DESCRIPTION);
        assert!(data.get("password").is_none());
        assert!(data.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let t = setup().await;
        t.register_user("alice").await;
        let (status, body) =
            t.post("/auth/register", None, json!({ "username": "ALICE", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_message(&body), "Username is already taken!");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let t = setup().await;
        let (status, body) =
            t.post("/auth/register", None, json!({ "username": "al", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["field"], "username");

        let (status, _) =
            t.post("/auth/register", None, json!({ "username": "al ice", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = t.post("/auth/register", None, json!({ "username": "alice", "password": "short" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["field"], "password");

        let (status, _) = t.post("/auth/register", None, json!({ "username": "alice" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login() {
        let t = setup().await;
        t.register_user("alice").await;

        let (status, body) =
            t.post("/auth/login", None, json!({ "username": "alice", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(body["user"]["username"], "alice");

        let (status, body) = t.post("/auth/login", None, json!({ "username": "alice", "password": "wrong-pass" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Invalid username or password!");

        let (status, body) =
            t.post("/auth/login", None, json!({ "username": "nobody", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Invalid username or password!");

        let snapshot = t.state.metrics.get_snapshot();
        assert_eq!(snapshot.logins_failed, 2);
    }

    #[tokio::test]
    async fn test_me() {
        let t = setup().await;
        let (token, id) = t.register_user("alice").await;

        let (status, body) = t.get("/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
        assert_eq!(body["username"], "alice");

        let (status, _) = t.get("/users/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_configured_admin_exists() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let (_, body) = t.get("/users/me", Some(&admin)).await;
        assert_eq!(body["username"], ADMIN_USERNAME);
        assert_eq!(body["isAdmin"], true);
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let t = setup().await;
        let (token, _) = t.register_user("alice").await;

        let (status, body) = t.get("/users", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Users can be listed only by the admin!");

        let admin = t.admin_token().await;
        let (status, body) = t.get("/users", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body.as_array().unwrap().iter().map(|u| u["username"].as_str().unwrap()).collect();
        assert!(names.contains(&ADMIN_USERNAME));
        assert!(names.contains(&"alice"));
    }

    #[tokio::test]
    async fn test_ban_and_unban() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let (token, id) = t.register_user("alice").await;
        let uri = format!("/users/{}/banstatus", id);

        let (status, body) =
            t.put(&uri, Some(&admin), json!({ "isBanned": true, "description": "Spamming reviews" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Ban status has been updated successfully!");
        assert_eq!(body["data"]["isBanned"], true);
        assert_eq!(body["data"]["description"], "Spamming reviews");

        // Existing tokens stop working immediately
        let (status, body) = t.get("/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "You are banned: Spamming reviews");
        let (status, _) = t
            .post("/books", Some(&token), json!({ "title": "T", "author": "A", "topic": "X", "language": "L" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Open endpoints stay reachable
        let (status, _) = t.get("/books", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = t.put(&uri, Some(&admin), json!({ "isBanned": false })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], DEFAULT_BAN_DESCRIPTION);

        let (status, _) = t.get("/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(t.state.metrics.get_snapshot().bans_applied, 1);
    }

    #[tokio::test]
    async fn test_ban_without_description() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let (_, id) = t.register_user("alice").await;

        let (_, body) = t.put(&format!("/users/{}/banstatus", id), Some(&admin), json!({ "isBanned": true })).await;
        assert_eq!(body["data"]["description"], "This user has been banned by an admin.");
    }

    #[tokio::test]
    async fn test_ban_requires_admin() {
        let t = setup().await;
        let (alice, _) = t.register_user("alice").await;
        let (_, bob_id) = t.register_user("bob").await;

        let (status, body) =
            t.put(&format!("/users/{}/banstatus", bob_id), Some(&alice), json!({ "isBanned": true })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Users can be banned only by the admin!");
    }

    #[tokio::test]
    async fn test_ban_missing_user() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let (status, body) = t.put("/users/nobody/banstatus", Some(&admin), json!({ "isBanned": true })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), "User does not exist!");
    }

    #[tokio::test]
    async fn test_admin_cannot_ban_themselves() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let (_, body) = t.get("/users/me", Some(&admin)).await;
        let admin_id = body["id"].as_str().unwrap().to_string();

        let (status, body) =
            t.put(&format!("/users/{}/banstatus", admin_id), Some(&admin), json!({ "isBanned": true })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Admins cannot ban themselves!");
    }

    #[tokio::test]
    async fn test_view_banstatus() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let (alice, alice_id) = t.register_user("alice").await;
        let (_, bob_id) = t.register_user("bob").await;

        let (status, body) = t.get(&format!("/users/{}/banstatus", alice_id), Some(&alice)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isBanned"], false);

        let (status, body) = t.get(&format!("/users/{}/banstatus", bob_id), Some(&alice)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Ban status can be viewed only by the user or the admin!");

        let (status, _) = t.get(&format!("/users/{}/banstatus", bob_id), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = t.get("/users/nobody/banstatus", Some(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_rate_limited() {
        let t = setup_with(|cfg| cfg.limits.login_per_minute = 3).await;
        for _ in 0..3 {
            let (status, _) =
                t.post("/auth/login", None, json!({ "username": "nobody", "password": USER_PASSWORD })).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, body) =
            t.post("/auth/login", None, json!({ "username": "nobody", "password": USER_PASSWORD })).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(error_code(&body), "RATE_LIMITED");
        assert!(body["error"]["details"]["retry_after_seconds"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_login_rate_limit_ignores_spoofed_forwarded_for() {
        let t = setup_with(|cfg| cfg.limits.login_per_minute = 3).await;
        let body = json!({ "username": "nobody", "password": USER_PASSWORD });
        let mut statuses = Vec::new();
        for i in 0..6 {
            let headers = [("x-forwarded-for", format!("10.0.0.{}", i)), ("x-real-ip", format!("10.0.1.{}", i))];
            let (status, _) =
                t.send_with_headers(Method::POST, "/auth/login", None, Some(body.clone()), &headers).await;
            statuses.push(status);
        }
        assert_eq!(statuses[..3], [StatusCode::UNAUTHORIZED; 3]);
        assert_eq!(statuses[3..], [StatusCode::TOO_MANY_REQUESTS; 3]);
    }

    #[tokio::test]
    async fn test_login_rate_limit_uses_forwarded_for_behind_trusted_proxy() {
        let t = setup_with(|cfg| {
            cfg.limits.login_per_minute = 1;
            cfg.server.trust_proxy_headers = true;
        })
        .await;
        let body = json!({ "username": "nobody", "password": USER_PASSWORD });
        for client in ["10.0.0.1", "10.0.0.2"] {
            let headers = [("x-forwarded-for", client.to_string())];
            let (status, _) =
                t.send_with_headers(Method::POST, "/auth/login", None, Some(body.clone()), &headers).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let headers = [("x-forwarded-for", "10.0.0.1".to_string())];
        let (status, _) = t.send_with_headers(Method::POST, "/auth/login", None, Some(body), &headers).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_token_of_deleted_user_rejected() {
        let t = setup().await;
        let (token, id) = t.register_user("alice").await;

        sqlx::query("DELETE FROM users WHERE id = ?1").bind(&id).execute(&t.state.db).await.unwrap();

        let (status, body) = t.get("/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "User no longer exists");
    }

    #[tokio::test]
    async fn test_demoted_admin_loses_rights_with_existing_token() {
        let t = setup().await;
        let admin = t.admin_token().await;
        let book_id = t.create_book(&admin, "Faust", "Goethe").await;

        sqlx::query("UPDATE users SET is_admin = 0 WHERE username = ?1")
            .bind(ADMIN_USERNAME)
            .execute(&t.state.db)
            .await
            .unwrap();

        let (status, body) = t.delete(&format!("/books/{}", book_id), Some(&admin)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "Books can be deleted only by the admin!");
        let (status, _) = t.get("/users", Some(&admin)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = t.get(&format!("/books/{}", book_id), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_promoted_user_gains_rights_with_existing_token() {
        let t = setup().await;
        let (token, id) = t.register_user("alice").await;

        sqlx::query("UPDATE users SET is_admin = 1 WHERE id = ?1").bind(&id).execute(&t.state.db).await.unwrap();

        let (status, _) = t.get("/users", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
