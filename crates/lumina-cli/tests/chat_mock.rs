use std::fs;
use std::path::Path;
use std::process::Output;

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A `LUMINA_HOME` whose config points the relay backend at `server`.
fn relay_home(server: &MockServer) -> TempDir {
    let dir = tempdir().unwrap();
    let config = format!(
        "model = \"gpt-oss-20b\"\nbackend = \"relay\"\n\n[providers.relay]\nurl = \"{}/api/chat\"\n",
        server.uri()
    );
    fs::write(dir.path().join("config.toml"), config).unwrap();
    dir
}

/// Runs the binary off the async runtime so the mock server keeps serving.
async fn run_lumina(home: &Path, args: &[&str], stdin: &str) -> Output {
    let home = home.to_path_buf();
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    let stdin = stdin.to_string();
    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("lumina")
            .env("LUMINA_HOME", &home)
            .env_remove("LUMINA_MODEL")
            .args(&args)
            .write_stdin(stdin)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

async fn mount_reply(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "response": reply})),
        )
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_prints_reply_and_goodbye() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"message": "hello", "model": "gpt-oss-20b"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "response": "Hi there!"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["--no-typing"], "hello\n:q\n")
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Hi there!\n"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_sends_prior_turns_as_history() {
    let server = MockServer::start().await;
    mount_reply(&server, "Respuesta").await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["--no-typing"], "uno\ndos\n")
        .await
        .assert()
        .success();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: serde_json::Value = requests[1].body_json().unwrap();
    assert_eq!(second["message"], "dos");
    assert_eq!(
        second["messages"],
        json!([
            {"role": "user", "content": "uno"},
            {"role": "assistant", "content": "Respuesta"}
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_backend_failure_shows_apology() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["--no-typing"], "hola\n:q\n")
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Lo siento, ha ocurrido un error al procesar tu mensaje.",
        ))
        .stderr(predicate::str::contains("Error:"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_regenerate_replaces_reply() {
    let server = MockServer::start().await;
    mount_reply(&server, "Otra vez").await;
    let home = relay_home(&server);

    let output = run_lumina(home.path(), &["--no-typing"], "hola\n:regen\n:history\n").await;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Otra vez").count(), 3);
    assert!(stdout.contains("[1] you"));
    assert!(stdout.contains("[2] lumina"));
    assert!(!stdout.contains("[3]"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_export_writes_json() {
    let server = MockServer::start().await;
    mount_reply(&server, "Hola humano").await;
    let home = relay_home(&server);
    let export = home.path().join("chat.json");
    let input = format!("hola\n:export {}\n", export.display());

    run_lumina(home.path(), &["--no-typing"], &input)
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 messages"));

    let exported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported[0]["sender"], "user");
    assert_eq!(exported[1]["content"], "Hola humano");
    assert_eq!(exported[1]["sender"], "assistant");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_unknown_command_is_not_sent() {
    let server = MockServer::start().await;
    mount_reply(&server, "unused").await;
    let home = relay_home(&server);

    run_lumina(home.path(), &[], ":dance\n")
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown command ':dance'"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exec_prints_reply() {
    let server = MockServer::start().await;
    mount_reply(&server, "Hi there!").await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["exec", "-p", "hello"], "")
        .await
        .assert()
        .success()
        .stdout(predicate::str::diff("Hi there!\n"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_exec_speak_waits_for_speech() {
    let server = MockServer::start().await;
    mount_reply(&server, "Hola humano.").await;
    let home = relay_home(&server);
    let spoken = home.path().join("spoken.txt");

    // The TTS stand-in writes the text it was given ($0) after a delay.
    let speech = format!(
        "\n[speech]\ncommand = \"sh\"\nargs = [\"-c\", '''sleep 0.3; printf '%s' \"$0\" > \"{}\"''']\n",
        spoken.display()
    );
    let config_path = home.path().join("config.toml");
    let mut config = fs::read_to_string(&config_path).unwrap();
    config.push_str(&speech);
    fs::write(&config_path, config).unwrap();

    run_lumina(home.path(), &["--speak", "exec", "-p", "hola"], "")
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Hola humano."));

    assert_eq!(fs::read_to_string(&spoken).unwrap(), "Hola humano.");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exec_html_renders_markdown() {
    let server = MockServer::start().await;
    mount_reply(&server, "Usa **negrita**").await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["exec", "--html", "-p", "hola"], "")
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("<strong>negrita</strong>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exec_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "Modelo caído"})),
        )
        .mount(&server)
        .await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["exec", "-p", "hola"], "")
        .await
        .assert()
        .failure()
        .stderr(predicate::str::contains("Modelo caído"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_model_is_rejected() {
    let server = MockServer::start().await;
    let home = relay_home(&server);

    run_lumina(home.path(), &["--model", "gpt-5", "exec", "-p", "hola"], "")
        .await
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown model 'gpt-5'"));
}
