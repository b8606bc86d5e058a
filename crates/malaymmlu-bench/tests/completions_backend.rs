use malaymmlu_bench::{CompletionsBackend, InferenceBackend};
use malaymmlu_core::{BackendConfig, EvalError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, token: Option<&str>) -> BackendConfig {
    BackendConfig {
        endpoint: server.uri(),
        token: token.map(str::to_string),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_trace_from_echoed_logprobs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(header("authorization", "Bearer hf_test"))
        .and(body_partial_json(json!({
            "model": "pixtral-12b",
            "prompt": "Jawapan: Paris",
            "echo": true,
            "max_tokens": 1,
            "logprobs": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "object": "text_completion",
            "choices": [{
                "index": 0,
                "text": "Jawapan: Paris.",
                "logprobs": {
                    "tokens": ["Jaw", "apan", ":", " Paris", "."],
                    "token_logprobs": [null, -2.0, -0.5, -1.25, -0.1],
                    "text_offset": [0, 3, 7, 8, 14]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend =
        CompletionsBackend::new(&config(&server, Some("hf_test")), "pixtral-12b").unwrap();
    let trace = backend
        .continuation_trace("Jawapan:", " Paris")
        .await
        .expect("trace failed");

    assert_eq!(trace.len(), 1);
    assert_eq!(trace.tokens[0].token, " Paris");
    assert_eq!(trace.tokens[0].logprob, -1.25);
    assert_eq!(backend.name(), "pixtral-12b");
}

#[tokio::test]
async fn test_trace_under_chat_template() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(body_partial_json(json!({ "prompt": "<s>[INST]Q[/INST]A" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "text": "QA\n",
                "logprobs": {
                    "tokens": ["", "", "Q", "", "A", "\n"],
                    "token_logprobs": [null, -0.1, -4.0, -0.2, -0.7, -2.0],
                    "text_offset": [0, 0, 0, 1, 1, 2]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = CompletionsBackend::new(&config(&server, None), "pixtral-12b").unwrap();
    let trace = backend
        .continuation_trace("<s>[INST]Q[/INST]", "A")
        .await
        .expect("trace failed");

    assert_eq!(trace.len(), 1);
    assert_eq!(trace.tokens[0].token, "A");
    assert_eq!(trace.tokens[0].logprob, -0.7);
}

#[tokio::test]
async fn test_server_error_is_inference_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
        .mount(&server)
        .await;

    let backend = CompletionsBackend::new(&config(&server, None), "m").unwrap();
    let err = backend.continuation_trace("Q", "A").await.unwrap_err();

    match err {
        EvalError::Inference(msg) => assert!(msg.contains("CUDA out of memory")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_logprobs_is_inference_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "text": "x" }]
        })))
        .mount(&server)
        .await;

    let backend = CompletionsBackend::new(&config(&server, None), "m").unwrap();
    let err = backend.continuation_trace("Q", "A").await.unwrap_err();
    assert!(matches!(err, EvalError::Inference(_)));
}

#[tokio::test]
async fn test_unparsable_body_is_inference_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let backend = CompletionsBackend::new(&config(&server, None), "m").unwrap();
    let err = backend.continuation_trace("Q", "A").await.unwrap_err();
    assert!(err.is_inference());
}

#[test]
fn test_rejects_non_http_endpoint() {
    let cfg = BackendConfig {
        endpoint: "ftp://models".to_string(),
        ..Default::default()
    };
    let err = CompletionsBackend::new(&cfg, "m").unwrap_err();
    assert!(matches!(err, EvalError::Config(_)));
}
