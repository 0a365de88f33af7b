mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;

#[tokio::test]
async fn invitation_connects_both_sides() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let res = app
        .post("/contacts", Some(&bob.cookie), json!({ "invitationCode": alice.user.invitation_code }))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["userId"], bob.user.id.to_string());
    assert_eq!(res.body["contactId"], alice.user.id.to_string());

    let bobs = app.get("/contacts", Some(&bob.cookie)).await;
    assert_eq!(bobs.body.as_array().unwrap().len(), 1);
    assert_eq!(bobs.body[0]["contact"]["username"], "alice");
    assert!(bobs.body[0]["contact"].get("email").is_none());
    assert!(bobs.body[0]["contact"].get("invitationCode").is_none());

    let alices = app.get("/contacts", Some(&alice.cookie)).await;
    assert_eq!(alices.body.as_array().unwrap().len(), 1);
    assert_eq!(alices.body[0]["contactId"], bob.user.id.to_string());

    // Either side re-redeeming is a conflict.
    let again = app
        .post("/contacts", Some(&alice.cookie), json!({ "invitationCode": bob.user.invitation_code }))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_invitations_are_rejected() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;

    let own = app
        .post("/contacts", Some(&alice.cookie), json!({ "invitationCode": alice.user.invitation_code }))
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);
    assert_eq!(own.body["error"], "Cannot add yourself as a contact");

    let bogus = app
        .post("/contacts", Some(&alice.cookie), json!({ "invitationCode": "nope" }))
        .await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);
    assert_eq!(bogus.body["error"], "Invalid invitation code");

    let blank = app
        .post("/contacts", Some(&alice.cookie), json!({ "invitationCode": "  " }))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let anonymous = app.post("/contacts", None, json!({ "invitationCode": "nope" })).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conversation_is_ordered_and_shared() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    app.connect(&bob, &alice).await;

    for (from, to, text) in [(&alice, &bob, "one"), (&bob, &alice, "two"), (&alice, &bob, "three")] {
        let res = app.send_message(from, to, text).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        assert_eq!(res.body["deletedForSender"], false);
    }

    let from_alice = app.get(&format!("/messages/{}", bob.user.id), Some(&alice.cookie)).await;
    let from_bob = app.get(&format!("/messages/{}", alice.user.id), Some(&bob.cookie)).await;
    assert_eq!(from_alice.status, StatusCode::OK);
    assert_eq!(from_alice.body, from_bob.body);

    let texts: Vec<&str> = from_alice
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["one", "two", "three"]);
}

#[tokio::test]
async fn delete_hides_only_for_the_caller() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let carol = app.signup("carol").await;
    app.connect(&bob, &alice).await;

    let sent = app.send_message(&alice, &bob, "hello bob").await;
    let id = sent.body["id"].as_str().unwrap().to_string();

    let res = app.delete(&format!("/messages/{}", id), Some(&bob.cookie)).await;
    assert_eq!(res.status, StatusCode::OK);

    let bob_view = app.get(&format!("/messages/{}", alice.user.id), Some(&bob.cookie)).await;
    assert_eq!(bob_view.body.as_array().unwrap().len(), 0);

    let alice_view = app.get(&format!("/messages/{}", bob.user.id), Some(&alice.cookie)).await;
    assert_eq!(alice_view.body.as_array().unwrap().len(), 1);
    assert_eq!(alice_view.body[0]["deletedForReceiver"], true);
    assert_eq!(alice_view.body[0]["deletedForSender"], false);

    // Outsiders and unknown ids are told apart.
    let res = app.delete(&format!("/messages/{}", id), Some(&carol.cookie)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&format!("/messages/{}", Uuid::new_v4()), Some(&carol.cookie)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // Once both sides deleted, compaction can drop the row.
    let res = app.delete(&format!("/messages/{}", id), Some(&alice.cookie)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.state.db.purge_fully_deleted().unwrap(), 1);
}

#[tokio::test]
async fn only_an_outgoing_edge_lets_you_send() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let carol = app.signup("carol").await;

    let res = app.send_message(&alice, &carol, "hi").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "Not a contact");

    // Repair-style one-sided edge: alice -> carol only.
    app.state
        .db
        .insert_contact_edge(&alice.user.id.to_string(), &carol.user.id.to_string(), Utc::now())
        .unwrap();

    assert_eq!(app.send_message(&alice, &carol, "hi").await.status, StatusCode::OK);
    assert_eq!(app.send_message(&carol, &alice, "hey").await.status, StatusCode::FORBIDDEN);

    let res = app.get(&format!("/messages/{}", alice.user.id), Some(&carol.cookie)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn contact_check_comes_before_content_check() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let carol = app.signup("carol").await;
    app.connect(&bob, &alice).await;

    let res = app.send_message(&alice, &carol, "   ").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.send_message(&alice, &bob, "   ").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Message content cannot be empty");
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = TestApp::new();
    let peer = Uuid::new_v4();

    for uri in ["/contacts".to_string(), format!("/messages/{}", peer), "/auth/me".to_string()] {
        assert_eq!(app.get(&uri, None).await.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
    let res = app
        .post("/messages", None, json!({ "receiverId": peer, "content": "hi" }))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_ids_and_bodies_are_bad_requests() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    app.connect(&bob, &alice).await;

    let res = app
        .post("/messages", Some(&alice.cookie), json!({ "receiverId": "not-a-uuid", "content": "hi" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].is_string());

    let res = app
        .post("/messages", Some(&alice.cookie), json!({ "receiverId": bob.user.id }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].is_string());

    let res = app.get("/messages/not-a-uuid", Some(&alice.cookie)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].is_string());

    let res = app.delete("/messages/not-a-uuid", Some(&alice.cookie)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Unknown keys ride along without harm.
    let res = app
        .post(
            "/messages",
            Some(&alice.cookie),
            json!({ "receiverId": bob.user.id, "content": "hi", "clientNonce": 7 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
}
