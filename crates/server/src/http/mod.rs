use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, routes};

pub mod auth;

/// Multipart envelope headroom on top of the attachment cap; the precise
/// byte limit is enforced by the attachment service.
const UPLOAD_BODY_LIMIT_BYTES: usize = 12 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::people::router())
        .merge(routes::organisations::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::attachments::router())
        .layer(from_fn_with_state(state.clone(), auth::require_api_auth));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use db::{
        DBService,
        models::{
            organisation::{CreateOrganisation, Organisation},
            person::{CreatePerson, Person},
        },
        types::TaskStage,
    };
    use serde_json::{Value, json};
    use services::services::attachment::InMemoryObjectStore;
    use tower::ServiceExt;
    use utils_core::response::ApiResponse;
    use uuid::Uuid;

    use super::*;
    use crate::http::auth::ACTING_PERSON_HEADER;

    async fn setup_state(api_token: Option<&str>) -> AppState {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        AppState::with_parts(
            db,
            Arc::new(InMemoryObjectStore::new()),
            api_token.map(str::to_string),
        )
    }

    async fn seed_admin_and_org(state: &AppState) -> (Person, Organisation) {
        let admin = Person::create(
            &state.db().conn,
            &CreatePerson {
                display_name: "Admin".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let org = Organisation::create(
            &state.db().conn,
            &CreateOrganisation {
                name: "Harbour Tutoring".to_string(),
                owner_id: Some(admin.id),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        (admin, org)
    }

    fn json_request(method: &str, uri: &str, acting: Option<Uuid>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(person) = acting {
            builder = builder.header(ACTING_PERSON_HEADER, person.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn response_data(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let envelope: ApiResponse<Value> = serde_json::from_slice(&bytes).unwrap();
        assert!(envelope.success, "error envelope: {:?}", envelope.message);
        envelope.data.unwrap()
    }

    #[tokio::test]
    async fn health_is_reachable_without_a_token() {
        let state = setup_state(Some("secret")).await;
        let app = router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_requires_the_configured_token() {
        let state = setup_state(Some("secret")).await;
        let (_admin, org) = seed_admin_and_org(&state).await;
        let app = router(state);

        let uri = format!("/api/organisations/{}", org.id);
        let response = app
            .clone()
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get(&uri)
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mutations_require_a_resolvable_acting_person() {
        let state = setup_state(None).await;
        let (_admin, org) = seed_admin_and_org(&state).await;
        let app = router(state.clone());

        let uri = format!("/api/organisations/{}/tasks", org.id);
        let payload = json!({"title": "Chase invoice"});

        // No header at all.
        let response = app
            .clone()
            .oneshot(json_request("POST", &uri, None, payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // A header that does not resolve to a known person.
        let response = app
            .oneshot(json_request(
                "POST",
                &uri,
                Some(Uuid::new_v4()),
                payload,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Nothing was written.
        let tasks =
            db::models::task::Task::find_by_organisation_with_people(&state.db().conn, org.id)
                .await
                .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn task_lifecycle_over_http() {
        let state = setup_state(None).await;
        let (admin, org) = seed_admin_and_org(&state).await;
        let app = router(state);

        // Create in backlog.
        let create_uri = format!("/api/organisations/{}/tasks", org.id);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &create_uri,
                Some(admin.id),
                json!({
                    "title": "Fix invoice",
                    "priority": "high",
                    "category": "payment_issue"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let task = response_data(response).await;
        let task_id = task["id"].as_str().unwrap().to_string();
        assert_eq!(task["stage"], "backlog");

        // Walk it to done through the canonical procedure.
        for stage in ["todo", "done"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/api/tasks/{task_id}/transition"),
                    Some(admin.id),
                    json!({"stage": stage}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/tasks/{task_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let task = response_data(response).await;
        assert_eq!(task["stage"], "done");
        assert!(!task["completed_at"].is_null());

        // Two audit entries, in order.
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/tasks/{task_id}/transitions"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let trail = response_data(response).await;
        let trail = trail.as_array().unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0]["to_stage"], "todo");
        assert_eq!(trail[1]["to_stage"], "done");
    }

    #[tokio::test]
    async fn stale_version_is_rejected_with_conflict() {
        let state = setup_state(None).await;
        let (admin, org) = seed_admin_and_org(&state).await;

        let task = db::models::task::Task::create(
            &state.db().conn,
            org.id,
            &db::models::task::CreateTask {
                title: "Refund client".to_string(),
                description: None,
                priority: None,
                category: None,
                initial_stage: None,
                due_date: None,
                requires_approval: false,
                assignee_id: None,
                client_id: None,
            },
            admin.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let app = router(state);
        let uri = format!("/api/tasks/{}/transition", task.id);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &uri,
                Some(admin.id),
                json!({"stage": "todo", "expected_version": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request(
                "POST",
                &uri,
                Some(admin.id),
                json!({"stage": "in_progress", "expected_version": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn members_endpoint_reflects_the_relationship_graph() {
        let state = setup_state(None).await;
        let (admin, org) = seed_admin_and_org(&state).await;

        let tutor = Person::create(
            &state.db().conn,
            &CreatePerson {
                display_name: "Priya Nair".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        db::models::connection::Connection::create(
            &state.db().conn,
            org.member_group_id,
            &db::models::connection::CreateConnection {
                source_person_id: tutor.id,
                target_person_id: admin.id,
            },
        )
        .await
        .unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::get(format!("/api/organisations/{}/members", org.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let members = response_data(response).await;
        let names: Vec<&str> = members
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["display_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Admin", "Priya Nair"]);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let state = setup_state(None).await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::get(format!("/api/tasks/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_and_thread_stays_ordered() {
        let state = setup_state(None).await;
        let (admin, org) = seed_admin_and_org(&state).await;
        let task = db::models::task::Task::create(
            &state.db().conn,
            org.id,
            &db::models::task::CreateTask {
                title: "Welcome call".to_string(),
                description: None,
                priority: None,
                category: None,
                initial_stage: None,
                due_date: None,
                requires_approval: false,
                assignee_id: None,
                client_id: None,
            },
            admin.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let app = router(state);
        let uri = format!("/api/tasks/{}/comments", task.id);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &uri,
                Some(admin.id),
                json!({"body": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        for body in ["first", "second"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    &uri,
                    Some(admin.id),
                    json!({ "body": body }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let thread = response_data(response).await;
        let bodies: Vec<&str> = thread
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["body"].as_str().unwrap())
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn update_fields_does_not_complete_tasks() {
        let state = setup_state(None).await;
        let (admin, org) = seed_admin_and_org(&state).await;
        let task = db::models::task::Task::create(
            &state.db().conn,
            org.id,
            &db::models::task::CreateTask {
                title: "Upload DBS".to_string(),
                description: None,
                priority: None,
                category: None,
                initial_stage: None,
                due_date: None,
                requires_approval: false,
                assignee_id: None,
                client_id: None,
            },
            admin.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let app = router(state);
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/tasks/{}", task.id),
                Some(admin.id),
                json!({"stage": "done"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated = response_data(response).await;
        assert_eq!(updated["stage"], TaskStage::Done.to_string());
        // The field-edit path does not maintain the completion timestamp.
        assert!(updated["completed_at"].is_null());
    }
}
