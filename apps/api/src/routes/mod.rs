pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::agents::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analyses", post(handlers::handle_analyze))
        .route(
            "/api/v1/analyses/pipeline",
            post(handlers::handle_pipeline),
        )
        .route("/api/v1/analyses/upload", post(handlers::handle_upload))
        .route("/api/v1/analyses/:id", get(handlers::handle_get_run))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::agents::invoke::testing::ScriptedInvoker;
    use crate::agents::roles::{AgentRoles, ANALYZER, CV_REVIEWER, OFFER_REVIEWER};
    use crate::agents::workflow::RunOptions;

    fn app(invoker: ScriptedInvoker) -> Router {
        build_router(AppState {
            db: None,
            llm: Arc::new(invoker),
            roles: Arc::new(AgentRoles::default()),
            run_defaults: RunOptions::default(),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// A one-page PDF showing `text` in Helvetica, with a valid xref table.
    fn pdf_with_text(text: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 72 712 Td ({text}) Tj ET");
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (n, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", n + 1).as_bytes());
        }
        let xref_at = pdf.len();
        let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            tail.push_str(&format!("{offset:010} 00000 n \n"));
        }
        tail.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(tail.as_bytes());
        pdf
    }

    const BOUNDARY: &str = "cvreview-form-boundary";

    fn upload(cv_pdf: &[u8], offer: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cv\"; filename=\"cv.pdf\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(cv_pdf);
        body.extend_from_slice(b"\r\n");
        if let Some(offer) = offer {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"offer\"\r\n\r\n{offer}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/analyses/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ScriptedInvoker::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_blank_cv_is_rejected() {
        let response = app(ScriptedInvoker::new())
            .oneshot(post_json(
                "/api/v1/analyses",
                json!({"cv": "   ", "offer": "Rust engineer"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analyze_returns_accepted_analysis() {
        let invoker = ScriptedInvoker::new()
            .reply(
                ANALYZER,
                json!({"score": 80, "experiences": [{"role": "backend"}], "description": "fits"}),
            )
            .reply(CV_REVIEWER, json!({"score": 0}))
            .reply(OFFER_REVIEWER, json!({"hallucination": 0}));

        let response = app(invoker)
            .oneshot(post_json(
                "/api/v1/analyses",
                json!({"cv": "Rust backend dev", "offer": "Rust engineer"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["analysis"]["score"], 80);
        assert_eq!(body["cycles"], 1);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_run_is_unprocessable() {
        let invoker = ScriptedInvoker::new()
            .reply(ANALYZER, json!({"score": 80, "experiences": [], "description": "a"}))
            .reply(CV_REVIEWER, json!({"score": 1}))
            .reply(OFFER_REVIEWER, json!({"hallucination": 0}));

        let response = app(invoker)
            .oneshot(post_json(
                "/api/v1/analyses",
                json!({"cv": "cv", "offer": "offer", "max_cycles": 1}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "ITERATION_BUDGET_EXHAUSTED");
        let run_id = body["error"]["run_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(run_id).is_ok());
    }

    #[tokio::test]
    async fn test_pipeline_runs_analyzer_only() {
        let invoker = ScriptedInvoker::new().reply(
            ANALYZER,
            json!({"score": 70, "experiences": [], "description": "ok"}),
        );

        let response = app(invoker)
            .oneshot(post_json(
                "/api/v1/analyses/pipeline",
                json!({"cv": "cv", "offer": "offer"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["analysis"]["score"], 70);
    }

    #[tokio::test]
    async fn test_upload_runs_workflow_on_pdf_text() {
        let invoker = Arc::new(
            ScriptedInvoker::new()
                .reply(
                    ANALYZER,
                    json!({"score": 75, "experiences": [], "description": "from pdf"}),
                )
                .reply(CV_REVIEWER, json!({"score": 0}))
                .reply(OFFER_REVIEWER, json!({"hallucination": 0})),
        );
        let app = build_router(AppState {
            db: None,
            llm: invoker.clone(),
            roles: Arc::new(AgentRoles::default()),
            run_defaults: RunOptions::default(),
        });

        let response = app
            .oneshot(upload(&pdf_with_text("Rust engineer"), Some("Senior Rust role")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["analysis"]["description"], "from pdf");
        let calls = invoker.calls();
        assert_eq!(calls[0].1.get("offer"), Some("Senior Rust role"));
        assert!(calls[0].1.get("cv").unwrap().contains("Rust"));
    }

    #[tokio::test]
    async fn test_upload_without_offer_is_rejected() {
        let response = app(ScriptedInvoker::new())
            .oneshot(upload(&pdf_with_text("Rust engineer"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("offer"));
    }

    #[tokio::test]
    async fn test_get_run_without_persistence_is_not_found() {
        let uri = format!("/api/v1/analyses/{}", uuid::Uuid::new_v4());
        let response = app(ScriptedInvoker::new())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
