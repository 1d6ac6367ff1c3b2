use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn agentkit(server: &MockServer, home: &Path) -> assert_cmd::Command {
    // Fast polling keeps the suite quick.
    std::fs::write(
        home.join("config.toml"),
        "[assistants]\npoll_interval_ms = 10\npoll_max_interval_ms = 20\npoll_timeout_secs = 5\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("agentkit");
    cmd.env("OPENAI_API_KEY", "test-api-key")
        .env("OPENAI_BASE_URL", server.uri())
        .env("AGENTKIT_HOME", home)
        .env_remove("RUST_LOG")
        .args(["--mode", "assistants"]);
    cmd
}

async fn mount_assistant_and_thread(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "name": "Generic AI Agent"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "asst_1",
            "object": "assistant",
            "model": "gpt-4o-mini",
            "name": "Generic AI Agent"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "thread_1", "object": "thread"})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_turn(server: &MockServer, final_run: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .and(body_partial_json(serde_json::json!({"role": "user", "content": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_user",
            "object": "thread.message",
            "role": "user",
            "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_partial_json(serde_json::json!({"assistant_id": "asst_1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "run_1", "status": "queued"})),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "run_1", "status": "in_progress"})),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_run))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_assistants_turn_prints_newest_reply() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    mount_assistant_and_thread(&mock_server).await;
    mount_turn(
        &mock_server,
        serde_json::json!({"id": "run_1", "status": "completed"}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "desc"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{"type": "text", "text": {"value": "sup", "annotations": []}}]
                },
                {
                    "id": "msg_user",
                    "role": "user",
                    "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]
                }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    agentkit(&mock_server, home.path())
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Assistants mode - type 'exit' to quit"))
        .stdout(predicate::str::contains("Assistant: sup\n"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[tokio::test]
async fn test_assistants_failed_run_reports_error() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    mount_assistant_and_thread(&mock_server).await;
    mount_turn(
        &mock_server,
        serde_json::json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "Something went wrong."}
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    agentkit(&mock_server, home.path())
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error: Run failed: server_error: Something went wrong.",
        ))
        .stdout(predicate::str::contains("Assistant:").not())
        .stdout(predicate::str::contains("Goodbye!"));
}

#[tokio::test]
async fn test_assistants_reuses_assistant_id() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/assistants/asst_saved"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "asst_saved", "object": "assistant"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "thread_9", "object": "thread"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    agentkit(&mock_server, home.path())
        .args(["--assistant-id", "asst_saved"])
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Goodbye!"));
}

#[tokio::test]
async fn test_assistants_setup_failure_exits_before_prompt() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    agentkit(&mock_server, home.path())
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("You:").not())
        .stderr(predicate::str::contains("Failed to create assistant"))
        .stderr(predicate::str::contains("HTTP 401: Incorrect API key provided"));
}
