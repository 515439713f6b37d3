//! Completion loop integration tests
//!
//! These tests drive `Chat` against a scripted `CompletionApi` that replays
//! canned responses and records every request, so the loop can be checked
//! end to end without a server.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use toolchat::{
    Chat, ChatCompletionRequest, ChatCompletionResponse, ChatTweaks, CompletionApi,
    DEFAULT_CHAT_MODEL, Describe, EmbeddingRequest, EmbeddingResponse, Error, MessageRole,
    Result, Schema, Tool, tool,
};

/// Replays queued responses in order and keeps every request it receives.
struct ScriptedApi {
    replies: Mutex<VecDeque<Result<ChatCompletionResponse>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedApi {
    fn new(replies: Vec<Result<ChatCompletionResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionApi for ScriptedApi {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::api("script exhausted")))
    }

    async fn create_embeddings(&self, _request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        Err(Error::api("embeddings not scripted"))
    }
}

fn completion(message: Value, finish_reason: Value) -> Result<ChatCompletionResponse> {
    Ok(serde_json::from_value(json!({
        "id": "chatcmpl-test",
        "model": "test-model",
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
    .unwrap())
}

fn answer(text: &str) -> Result<ChatCompletionResponse> {
    completion(json!({"role": "assistant", "content": text}), json!("stop"))
}

/// A tool-call response; each call is `(id, type, name, arguments)`.
fn typed_calls(calls: &[(&str, &str, &str, &str)]) -> Result<ChatCompletionResponse> {
    let calls: Vec<Value> = calls
        .iter()
        .map(|(id, call_type, name, arguments)| {
            json!({
                "id": id,
                "type": call_type,
                "function": {"name": name, "arguments": arguments}
            })
        })
        .collect();
    completion(
        json!({"role": "assistant", "content": null, "tool_calls": calls}),
        json!("tool_calls"),
    )
}

/// A tool-call response of `function` calls; each call is `(id, name, arguments)`.
fn calls(calls: &[(&str, &str, &str)]) -> Result<ChatCompletionResponse> {
    let typed: Vec<(&str, &str, &str, &str)> = calls
        .iter()
        .map(|(id, name, arguments)| (*id, "function", *name, *arguments))
        .collect();
    typed_calls(&typed)
}

#[derive(Deserialize)]
struct Operands {
    a: i64,
    b: i64,
}

impl Describe for Operands {
    fn describe() -> Schema {
        Schema::object()
            .field("a", i64::describe())
            .field("b", i64::describe())
    }
}

fn add_tool() -> Tool {
    tool("add", "Add two integers")
        .build(|args: Operands| Ok::<_, Error>(args.a + args.b))
        .unwrap()
}

fn divide_tool() -> Tool {
    tool("divide", "Integer division")
        .build(|args: Operands| {
            if args.b == 0 {
                return Err("division by zero");
            }
            Ok(args.a / args.b)
        })
        .unwrap()
}

/// Test: plain question and answer
///
/// Expected: the answer is returned and both turns are kept
#[tokio::test]
async fn test_exchange_without_tools() {
    let api = ScriptedApi::new(vec![answer("Arr, crack the eggs, matey.")]);
    let mut chat = Chat::new(api.clone());
    chat.instruction("Talk like a pirate. A cool pirate.");

    let reply = chat
        .exchange("Tell me how to cook scrambled eggs.")
        .await
        .unwrap();
    assert_eq!(reply, "Arr, crack the eggs, matey.");

    let roles: Vec<MessageRole> = chat.dialogue().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
    );

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, DEFAULT_CHAT_MODEL);
    assert_eq!(requests[0].messages.len(), 2);
    assert!(requests[0].tools.is_empty());
}

/// Test: two sequential tool rounds before the final answer
///
/// Expected: every round trip is recorded in order, and each request carries
/// the dialogue as it stood at that point
#[tokio::test]
async fn test_multi_round_tool_exchange() {
    let api = ScriptedApi::new(vec![
        calls(&[("call_1", "add", r#"{"a": 2, "b": 3}"#)]),
        calls(&[("call_2", "add", r#"{"a": 5, "b": 10}"#)]),
        answer("The total is 15."),
    ]);
    let mut chat = Chat::new(api.clone()).with_tool(add_tool()).unwrap();

    let reply = chat.exchange("What is 2 + 3 + 10?").await.unwrap();
    assert_eq!(reply, "The total is 15.");

    let messages = chat.dialogue().messages();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].tool_calls()[0].id, "call_1");
    assert_eq!(messages[2].role, MessageRole::Tool);
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(messages[2].content, "5");
    assert_eq!(messages[3].tool_calls()[0].id, "call_2");
    assert_eq!(messages[4].content, "15");
    assert_eq!(messages[5].role, MessageRole::Assistant);
    assert_eq!(messages[5].content, "The total is 15.");

    let requests = api.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[2].messages.len(), 5);
    assert!(requests.iter().all(|r| r.tools.len() == 1));
}

/// Test: several calls in one message, some of which cannot be served
///
/// Expected: one reply per call in the requested order; failures are reported
/// to the model as error text and the loop continues
#[tokio::test]
async fn test_failed_calls_are_reported_to_the_model() {
    let api = ScriptedApi::new(vec![
        calls(&[
            ("call_ok", "add", r#"{"a": 1, "b": 1}"#),
            ("call_missing", "multiply", r#"{"a": 2, "b": 2}"#),
            ("call_fails", "divide", r#"{"a": 1, "b": 0}"#),
            ("call_garbled", "add", r#"{"a": "one"}"#),
        ]),
        answer("Some of that did not work."),
    ]);
    let mut chat = Chat::new(api.clone())
        .with_tool(add_tool())
        .unwrap()
        .with_tool(divide_tool())
        .unwrap();

    let reply = chat.exchange("Do some math").await.unwrap();
    assert_eq!(reply, "Some of that did not work.");

    let replies: Vec<(&str, &str)> = chat
        .dialogue()
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .map(|m| (m.tool_call_id.as_deref().unwrap(), m.content.as_str()))
        .collect();

    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0], ("call_ok", "2"));
    assert_eq!(
        replies[1],
        ("call_missing", "error: no tool found with name multiply")
    );
    assert_eq!(replies[2], ("call_fails", "error: division by zero"));
    assert_eq!(replies[3].0, "call_garbled");
    assert!(replies[3].1.starts_with("error: "));
}

/// Test: a call of a type other than `function`
///
/// Expected: the model is told the type is unknown
#[tokio::test]
async fn test_unknown_call_type() {
    let api = ScriptedApi::new(vec![
        typed_calls(&[("call_1", "retrieval", "add", "{}")]),
        answer("Never mind."),
    ]);
    let mut chat = Chat::new(api.clone()).with_tool(add_tool()).unwrap();

    chat.exchange("Look something up").await.unwrap();

    let tool_reply = &chat.dialogue().messages()[2];
    assert_eq!(tool_reply.role, MessageRole::Tool);
    assert_eq!(tool_reply.content, "error: unknown tool call type retrieval");
}

/// Test: content filter after a tool round
///
/// Expected: the exchange fails and the dialogue is exactly as before it,
/// without the user message or the tool traffic
#[tokio::test]
async fn test_exchange_rolls_back_after_tool_rounds() {
    let api = ScriptedApi::new(vec![
        calls(&[("call_1", "add", r#"{"a": 1, "b": 2}"#)]),
        completion(json!({"role": "assistant", "content": null}), json!("content_filter")),
    ]);
    let mut chat = Chat::new(api.clone()).with_tool(add_tool()).unwrap();
    chat.instruction("You are a calculator.");
    chat.example_exchange("1 + 1?", "2");
    let before = chat.dialogue().clone();

    let err = chat.exchange("1 + 2?").await.unwrap_err();
    assert!(matches!(err, Error::ContentFilter));
    assert_eq!(chat.dialogue(), &before);
    assert_eq!(api.requests().len(), 2);
}

/// Test: transport failure on the first request
///
/// Expected: the error surfaces unchanged and the user message is dropped
#[tokio::test]
async fn test_exchange_rolls_back_on_api_error() {
    let api = ScriptedApi::new(vec![Err(Error::api("API error 401 Unauthorized: bad key"))]);
    let mut chat = Chat::new(api.clone());

    let err = chat.exchange("Hello?").await.unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert!(chat.dialogue().is_empty());
}

/// Test: a later exchange after a failed one
///
/// Expected: the session remains usable and the next request does not carry
/// anything from the failed exchange
#[tokio::test]
async fn test_chat_usable_after_failure() {
    let api = ScriptedApi::new(vec![
        completion(json!({"role": "assistant", "content": "par"}), Value::Null),
        answer("Paris."),
    ]);
    let mut chat = Chat::new(api.clone());

    let err = chat.exchange("Capital of France?").await.unwrap_err();
    assert!(matches!(err, Error::NotFinished));

    let reply = chat.exchange("Capital of France, please?").await.unwrap();
    assert_eq!(reply, "Paris.");

    let last_request = &api.requests()[1];
    assert_eq!(last_request.messages.len(), 1);
    assert_eq!(last_request.messages[0].content, "Capital of France, please?");
}

/// Test: `talk` does not roll back
///
/// Expected: tool traffic from completed rounds stays in the dialogue
#[tokio::test]
async fn test_talk_keeps_completed_rounds_on_failure() {
    let api = ScriptedApi::new(vec![
        calls(&[("call_1", "add", r#"{"a": 1, "b": 2}"#)]),
        completion(json!({"role": "assistant", "content": ""}), json!("length")),
    ]);
    let mut chat = Chat::new(api.clone()).with_tool(add_tool()).unwrap();
    chat.user_said("1 + 2?");

    let err = chat.talk().await.unwrap_err();
    assert!(matches!(err, Error::NotFinished));
    assert_eq!(chat.dialogue().len(), 3);
    assert_eq!(chat.dialogue().last().unwrap().content, "3");
}

/// Test: the model keeps calling tools past the configured cap
///
/// Expected: the loop stops with `ToolRoundLimit` without sending more requests
#[tokio::test]
async fn test_tool_round_limit() {
    let api = ScriptedApi::new(vec![
        calls(&[("call_1", "add", r#"{"a": 1, "b": 1}"#)]),
        calls(&[("call_2", "add", r#"{"a": 2, "b": 2}"#)]),
        answer("unreachable"),
    ]);
    let mut chat = Chat::new(api.clone())
        .max_tool_rounds(Some(1))
        .with_tool(add_tool())
        .unwrap();

    let err = chat.exchange("Keep adding").await.unwrap_err();
    assert!(matches!(err, Error::ToolRoundLimit(1)));
    assert_eq!(api.requests().len(), 2);
    assert!(chat.dialogue().is_empty());
}

/// Test: request contents
///
/// Expected: model, tweaks and tool definitions go out on the wire
#[tokio::test]
async fn test_request_carries_model_tweaks_and_tools() {
    let api = ScriptedApi::new(vec![answer("ok")]);
    let mut chat = Chat::new(api.clone())
        .model("gpt-4o-mini")
        .tweaks(ChatTweaks::default().temperature(0.5).top_p(0.25))
        .with_tool(add_tool())
        .unwrap();

    chat.exchange("ping").await.unwrap();

    let body = serde_json::to_value(&api.requests()[0]).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["top_p"], 0.25);
    assert_eq!(body["messages"][0], json!({"role": "user", "content": "ping"}));
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["function"]["name"], "add");
    assert_eq!(
        body["tools"][0]["function"]["parameters"],
        json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
            "required": ["a", "b"]
        })
    );
}

/// Test: the assistant's tool-call message goes back out as received
///
/// Expected: the second request replays the call id, type and arguments
#[tokio::test]
async fn test_tool_call_message_is_replayed() {
    let api = ScriptedApi::new(vec![
        calls(&[("call_7", "add", r#"{"a": 3, "b": 4}"#)]),
        answer("7"),
    ]);
    let mut chat = Chat::new(api.clone()).with_tool(add_tool()).unwrap();

    chat.exchange("3 + 4?").await.unwrap();

    let body = serde_json::to_value(&api.requests()[1]).unwrap();
    assert_eq!(
        body["messages"][1],
        json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{
                "id": "call_7",
                "type": "function",
                "function": {"name": "add", "arguments": "{\"a\": 3, \"b\": 4}"}
            }]
        })
    );
    assert_eq!(
        body["messages"][2],
        json!({"role": "tool", "content": "7", "tool_call_id": "call_7"})
    );
}

/// Test: debug logging of the loop
///
/// Expected: running with debug logs enabled does not change the outcome
#[tokio::test]
async fn test_loop_with_debug_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let api = ScriptedApi::new(vec![
        calls(&[("call_1", "nope", "{}")]),
        answer("done"),
    ]);
    let mut chat = Chat::new(api.clone());

    assert_eq!(chat.exchange("go").await.unwrap(), "done");
    assert_eq!(chat.dialogue().len(), 4);
}
