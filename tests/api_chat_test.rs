//! Integration tests for the chat API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::util::ServiceExt;

    use tutor::ai::chat::{ChatService, Role};

    use crate::test_utils::{
        ScriptedModel, body_to_json, get, post_chat, test_app, test_app_with,
    };

    /// Tests a reply is returned and history reaches the next turn
    #[tokio::test]
    async fn it_threads_history_through_to_the_model() {
        let (model, calls) = ScriptedModel::new(vec![Ok("Hi! How are you?"), Ok("You said Hello.")]);
        let app = test_app(model);

        let response = app
            .clone()
            .oneshot(post_chat(json!({"message": "Hello", "session_id": "u1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_to_json(response.into_body()).await,
            json!({"reply": "Hi! How are you?"})
        );

        let response = app
            .oneshot(post_chat(
                json!({"message": "What did I just say?", "session_id": "u1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_to_json(response.into_body()).await,
            json!({"reply": "You said Hello."})
        );

        let second_call = calls.lock().unwrap()[1].clone();
        assert_eq!(second_call.len(), 4);
        assert_eq!(second_call[0].role, Role::System);
        assert_eq!(second_call[1].content, "Hello");
        assert_eq!(second_call[2].content, "Hi! How are you?");
        assert_eq!(second_call[3].content, "What did I just say?");
    }

    /// Tests the session id falls back to "default"
    #[tokio::test]
    async fn it_uses_the_default_session() {
        let (model, _) = ScriptedModel::new(vec![Ok("Hello!")]);
        let app = test_app(model);

        let response = app
            .clone()
            .oneshot(post_chat(json!({"message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/chat/default/transcript")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["session_id"], "default");
        assert_eq!(
            body["transcript"],
            json!([
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello!"}
            ])
        );
    }

    /// Tests a provider failure is a 5xx and history is untouched
    #[tokio::test]
    async fn it_returns_bad_gateway_when_the_model_fails() {
        let (model, _) = ScriptedModel::new(vec![Ok("Hi!"), Err("quota exceeded")]);
        let app = test_app(model);

        let response = app
            .clone()
            .oneshot(post_chat(json!({"message": "Hello", "session_id": "u1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_chat(json!({"message": "Again", "session_id": "u1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_to_json(response.into_body()).await;
        // Provider details stay in the logs
        assert_eq!(body, json!({"error": "Something went wrong"}));

        let response = app.oneshot(get("/chat/u1/transcript")).await.unwrap();
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["transcript"].as_array().unwrap().len(), 2);
    }

    /// Tests a slow provider is cut off with a timeout status
    #[tokio::test]
    async fn it_returns_gateway_timeout_for_a_slow_model() {
        let (model, _) = ScriptedModel::new(vec![Ok("too late")]);
        let chat = ChatService::builder(Box::new(model.with_delay(Duration::from_millis(500))))
            .timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        let app = test_app_with(chat);

        let response = app
            .clone()
            .oneshot(post_chat(json!({"message": "Hello", "session_id": "slow"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let response = app.oneshot(get("/chat/slow/transcript")).await.unwrap();
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["transcript"], json!([]));
    }

    /// Tests chat POST returns 422 for missing message
    #[tokio::test]
    async fn it_returns_422_for_missing_message() {
        let (model, calls) = ScriptedModel::new(vec![]);
        let app = test_app(model);

        let response = app
            .oneshot(post_chat(json!({"session_id": "u1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(calls.lock().unwrap().is_empty());
    }

    /// Tests chat POST returns 400 for a body that isn't JSON
    #[tokio::test]
    async fn it_returns_400_for_malformed_json() {
        let (model, _) = ScriptedModel::new(vec![]);
        let app = test_app(model);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/chat")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"message\": "))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Tests a blank message is rejected before reaching the model
    #[tokio::test]
    async fn it_returns_422_for_blank_message() {
        let (model, calls) = ScriptedModel::new(vec![]);
        let app = test_app(model);

        let response = app
            .oneshot(post_chat(json!({"message": "   ", "session_id": "u1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body, json!({"error": "Message must not be empty"}));
        assert!(calls.lock().unwrap().is_empty());
    }

    /// Tests an oversized message is rejected
    #[tokio::test]
    async fn it_returns_422_for_oversized_message() {
        let (model, _) = ScriptedModel::new(vec![]);
        let chat = ChatService::builder(Box::new(model))
            .max_message_chars(10)
            .build()
            .unwrap();
        let app = test_app_with(chat);

        let response = app
            .oneshot(post_chat(
                json!({"message": "this is far too long", "session_id": "u1"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    /// Tests getting a session that was never used returns 404
    #[tokio::test]
    async fn it_returns_404_for_nonexistent_session() {
        let (model, _) = ScriptedModel::new(vec![]);
        let app = test_app(model);

        let response = app.oneshot(get("/chat/nobody/transcript")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_to_json(response.into_body()).await,
            json!({"error": "Chat session nobody not found"})
        );
    }

    /// Tests a session named like the listing route keeps its transcript
    #[tokio::test]
    async fn it_serves_the_transcript_of_a_session_named_sessions() {
        let (model, _) = ScriptedModel::new(vec![Ok("Hello!")]);
        let app = test_app(model);

        let response = app
            .clone()
            .oneshot(post_chat(json!({"message": "Hi", "session_id": "sessions"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get("/chat/sessions/transcript"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["session_id"], "sessions");
        assert_eq!(body["transcript"].as_array().unwrap().len(), 2);

        let response = app.oneshot(get("/chat/sessions")).await.unwrap();
        assert_eq!(
            body_to_json(response.into_body()).await,
            json!({"sessions": [{"id": "sessions", "message_count": 2}]})
        );
    }

    /// Tests sessions are listed with their message counts
    #[tokio::test]
    async fn it_lists_sessions() {
        let (model, _) = ScriptedModel::new(vec![]);
        let app = test_app(model);

        for (session, message) in [("b", "one"), ("a", "two"), ("b", "one")] {
            let response = app
                .clone()
                .oneshot(post_chat(json!({"message": message, "session_id": session})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(get("/chat/sessions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_to_json(response.into_body()).await,
            json!({"sessions": [
                {"id": "a", "message_count": 2},
                {"id": "b", "message_count": 4}
            ]})
        );
    }

    /// Tests two sessions never see each other's history
    #[tokio::test]
    async fn it_isolates_sessions() {
        let (model, calls) = ScriptedModel::new(vec![]);
        let app = test_app(model);

        app.clone()
            .oneshot(post_chat(json!({"message": "my secret", "session_id": "alice"})))
            .await
            .unwrap();
        app.clone()
            .oneshot(post_chat(json!({"message": "hello", "session_id": "bob"})))
            .await
            .unwrap();

        let bob_call = calls.lock().unwrap()[1].clone();
        assert_eq!(bob_call.len(), 2);
        assert!(bob_call.iter().all(|m| m.content != "my secret"));
    }
}
