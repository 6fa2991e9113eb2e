// ABOUTME: Tests for AgentHandle and EventReceiver.
// ABOUTME: Covers Send/Sync bounds, event draining, and concurrent prompts.

use aibot_agent::backends::mock::MockBackend;
use aibot_agent::handle::{AgentHandle, EventReceiver};
use aibot_agent::{AgentEvent, ErrorCode, PromptRequest, Turn};
use serde_json::json;
use tokio::sync::mpsc;

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

fn request(input: &str) -> PromptRequest {
    PromptRequest::new("!room:test", "gpt-3.5-turbo", vec![Turn::user(input)])
}

#[test]
fn test_agent_handle_is_send_sync() {
    assert_send::<AgentHandle>();
    assert_sync::<AgentHandle>();
}

#[test]
fn test_event_receiver_is_send() {
    assert_send::<EventReceiver>();
}

#[tokio::test]
async fn test_event_receiver_receives_events() {
    let (tx, rx) = mpsc::channel(32);
    let mut receiver = EventReceiver::new(rx);

    tx.send(AgentEvent::Text("hello".to_string())).await.unwrap();
    tx.send(AgentEvent::Text("world".to_string())).await.unwrap();
    drop(tx);

    assert!(matches!(receiver.recv().await, Some(AgentEvent::Text(s)) if s == "hello"));
    assert!(matches!(receiver.recv().await, Some(AgentEvent::Text(s)) if s == "world"));
    assert!(receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_complete_prefers_result_over_streamed_text() {
    let (tx, rx) = mpsc::channel(8);
    tx.send(AgentEvent::Text("partial".to_string())).await.unwrap();
    tx.send(AgentEvent::Result {
        text: "final".to_string(),
        usage: None,
    })
    .await
    .unwrap();
    drop(tx);

    let completion = EventReceiver::new(rx).complete().await.unwrap();
    assert_eq!(completion.text, "final");
}

#[tokio::test]
async fn test_complete_falls_back_to_streamed_text() {
    let (tx, rx) = mpsc::channel(8);
    tx.send(AgentEvent::Text("Hel".to_string())).await.unwrap();
    tx.send(AgentEvent::Text("lo".to_string())).await.unwrap();
    drop(tx);

    let completion = EventReceiver::new(rx).complete().await.unwrap();
    assert_eq!(completion.text, "Hello");
}

#[tokio::test]
async fn test_complete_empty_stream_is_error() {
    let (tx, rx) = mpsc::channel::<AgentEvent>(1);
    drop(tx);

    let err = EventReceiver::new(rx).complete().await.unwrap_err();
    assert!(err.to_string().starts_with("malformed_response"));
}

#[tokio::test]
async fn test_complete_collects_tool_names() {
    let mock = MockBackend::new().on_prompt("2+2").respond_with(vec![
        AgentEvent::ToolStart {
            id: "call_1".to_string(),
            name: "calculator".to_string(),
            input: json!({"expression": "2+2"}),
        },
        AgentEvent::ToolEnd {
            id: "call_1".to_string(),
            name: "calculator".to_string(),
            output: json!("4"),
            success: true,
            duration_ms: 1,
        },
        AgentEvent::Result {
            text: "It is 4.".to_string(),
            usage: None,
        },
    ]);

    let completion = mock
        .into_handle()
        .prompt(request("what is 2+2"))
        .await
        .unwrap()
        .complete()
        .await
        .unwrap();
    assert_eq!(completion.text, "It is 4.");
    assert_eq!(completion.tools_used, vec!["calculator".to_string()]);
}

#[tokio::test]
async fn test_complete_error_event_is_error() {
    let mock = MockBackend::new()
        .on_prompt("boom")
        .respond_error(ErrorCode::RateLimited, "slow down");

    let err = mock
        .into_handle()
        .prompt(request("boom"))
        .await
        .unwrap()
        .complete()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("slow down"));
}

#[tokio::test]
async fn test_rejected_prompt_surfaces_from_prompt_call() {
    let mock = MockBackend::new().on_prompt("nope").reject("backend unavailable");
    let result = mock.into_handle().prompt(request("nope")).await;
    match result {
        Err(err) => assert!(err.to_string().contains("backend unavailable")),
        Ok(_) => panic!("Expected prompt to be rejected"),
    }
}

#[tokio::test]
async fn test_handle_serves_concurrent_prompts() {
    let mock = MockBackend::new()
        .on_prompt("one")
        .respond_text("first")
        .on_prompt("two")
        .respond_text("second");
    let handle = mock.into_handle();

    let (a, b) = tokio::join!(
        async { handle.prompt(request("one")).await.unwrap().complete().await },
        async { handle.prompt(request("two")).await.unwrap().complete().await },
    );
    assert_eq!(a.unwrap().text, "first");
    assert_eq!(b.unwrap().text, "second");
}
