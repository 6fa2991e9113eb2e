// ABOUTME: Tests for the AgentRegistry and BackendFactory pattern.
// ABOUTME: Validates runtime backend selection and creation.

use aibot_agent::registry::AgentRegistry;
use serde_json::json;

#[tokio::test]
async fn test_registry_creates_mock_backend() {
    let registry = AgentRegistry::default();
    let handle = registry.create("mock", &json!({})).unwrap();
    assert_eq!(handle.name(), "mock");
}

#[tokio::test]
async fn test_registry_creates_chat_backend() {
    let registry = AgentRegistry::default();
    let handle = registry
        .create("chat", &json!({"api_key": "sk-test"}))
        .unwrap();
    assert_eq!(handle.name(), "chat");
}

#[tokio::test]
async fn test_registry_creates_agent_backend() {
    let registry = AgentRegistry::default();
    let config = json!({
        "api_key": "sk-test",
        "serpapi_api_key": "serp-test",
        "memory_token_limit": 100
    });
    let handle = registry.create("agent", &config).unwrap();
    assert_eq!(handle.name(), "agent");
}

#[test]
fn test_registry_lists_available_backends() {
    let registry = AgentRegistry::default();
    assert_eq!(registry.available(), vec!["agent", "chat", "mock"]);
}

#[test]
fn test_registry_rejects_chat_config_without_key() {
    let registry = AgentRegistry::default();
    let err = registry.create("chat", &json!({})).err().unwrap();
    assert!(err.to_string().contains("Invalid chat backend config"));
}

#[test]
fn test_registry_unknown_backend_errors() {
    let registry = AgentRegistry::default();
    match registry.create("nonexistent", &json!({})) {
        Err(err) => {
            let msg = err.to_string();
            assert!(msg.contains("Unknown backend type 'nonexistent'"));
            assert!(msg.contains("available: agent, chat, mock"));
        }
        Ok(_) => panic!("Expected error for unknown backend"),
    }
}

#[test]
fn test_registry_contains_only_registered_names() {
    let registry = AgentRegistry::default();
    assert!(registry.contains("chat"));
    assert!(!registry.contains("Chat"));
    assert!(!AgentRegistry::new().contains("mock"));
}

#[tokio::test]
async fn test_registering_same_name_replaces_factory() {
    use aibot_agent::backends::mock::MockBackend;

    let registry = AgentRegistry::default().register("chat", |_config| {
        Ok(MockBackend::new().into_handle())
    });
    assert_eq!(registry.available(), vec!["agent", "chat", "mock"]);
    let handle = registry.create("chat", &json!({})).unwrap();
    assert_eq!(handle.name(), "mock");
}

#[tokio::test]
async fn test_custom_factory_registration() {
    use aibot_agent::backends::mock::MockBackend;

    let registry = AgentRegistry::new().register("custom", |_config| {
        Ok(MockBackend::new().on_prompt("ping").respond_text("pong").into_handle())
    });
    let handle = registry.create("custom", &json!({})).unwrap();
    assert_eq!(handle.name(), "mock");
}
