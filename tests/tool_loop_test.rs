mod support;

use std::sync::Arc;

use llm_orchestra::prelude::*;
use serde_json::json;
use support::*;

fn client_with(provider: Arc<ScriptedProvider>, config: PipelineConfig) -> LlmClient {
    LlmClient::builder()
        .provider_arc(provider)
        .model("test-model")
        .tool(weather_tool())
        .config(config)
        .build()
        .expect("valid client")
}

#[tokio::test]
async fn chat_turn_runs_tool_and_resubmits() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_chat(Ok(ChatResponse::tool_calls(vec![tool_call(
                "call_1",
                "weather",
                json!({"city": "Oslo"}),
            )])))
            .push_chat(Ok(ChatResponse::text("It is 21C in Oslo."))),
    );
    let client = client_with(provider.clone(), fast_config());

    let response = client.call(ChatMessage::user("Weather in Oslo?")).await.unwrap();
    assert_eq!(response.text, "It is 21C in Oslo.");
    assert_eq!(provider.chat_calls(), 2);

    let requests = provider.requests();
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "weather");
    assert_eq!(requests[0].messages.len(), 1);

    let resubmitted = &requests[1].messages;
    let roles: Vec<MessageRole> = resubmitted.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![MessageRole::User, MessageRole::Assistant, MessageRole::Function]
    );
    assert_eq!(resubmitted[1].tool_calls[0].id, "call_1");
    assert_eq!(resubmitted[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(resubmitted[2].name.as_deref(), Some("weather"));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&resubmitted[2].content).unwrap(),
        json!({"city": "Oslo", "temp_c": 21})
    );

    let history = client.history().all();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].role, MessageRole::Assistant);
    assert_eq!(history[3].content, "It is 21C in Oslo.");
}

#[tokio::test]
async fn failing_tool_does_not_block_siblings() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_chat(Ok(ChatResponse::tool_calls(vec![
                tool_call("c1", "teleport", json!({})),
                tool_call("c2", "weather", json!({"city": "Bergen"})),
                tool_call("c3", "weather", json!({})),
            ])))
            .push_chat(Ok(ChatResponse::text("done"))),
    );
    let client = client_with(provider.clone(), fast_config());
    client.call(ChatMessage::user("go")).await.unwrap();

    let messages = &provider.requests()[1].messages;
    assert_eq!(messages.len(), 5);
    let replies: Vec<(MessageRole, Option<&str>)> = messages[2..]
        .iter()
        .map(|m| (m.role, m.tool_call_id.as_deref()))
        .collect();
    assert_eq!(
        replies,
        vec![
            (MessageRole::System, Some("c1")),
            (MessageRole::Function, Some("c2")),
            (MessageRole::System, Some("c3")),
        ]
    );
    assert!(messages[2].content.contains("teleport"));
    assert!(messages[4].content.contains("city"));
}

#[tokio::test]
async fn iteration_limit_is_fatal_and_not_retried() {
    let looping = || Ok(ChatResponse::tool_calls(vec![tool_call("c", "weather", json!({"city": "Oslo"}))]));
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_chat(looping())
            .push_chat(looping())
            .push_chat(looping())
            .push_chat(looping()),
    );
    let client = client_with(provider.clone(), fast_config().with_max_iterations(2));

    let err = client.call(ChatMessage::user("loop")).await.unwrap_err();
    assert!(matches!(
        err,
        LlmError::ToolIterationLimit {
            iterations: 2,
            max_iterations: 2
        }
    ));
    assert_eq!(provider.chat_calls(), 3);
}

#[tokio::test]
async fn each_user_turn_starts_with_a_fresh_iteration_count() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_chat(Ok(ChatResponse::tool_calls(vec![tool_call("t1", "weather", json!({"city": "Oslo"}))])))
            .push_chat(Ok(ChatResponse::text("first")))
            .push_chat(Ok(ChatResponse::tool_calls(vec![tool_call("t2", "weather", json!({"city": "Rome"}))])))
            .push_chat(Ok(ChatResponse::text("second"))),
    );
    let client = client_with(provider, fast_config().with_max_iterations(1));

    assert_eq!(client.call(ChatMessage::user("one")).await.unwrap().text, "first");
    assert_eq!(client.call(ChatMessage::user("two")).await.unwrap().text, "second");
    assert_eq!(client.history().len(), 8);
}

#[tokio::test]
async fn streamed_turn_runs_tools_between_rounds() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_stream(tool_round("fc_1", "weather", "{\"city\":\"Oslo\"}"))
            .push_stream(text_round("Sunny in Oslo")),
    );
    let client = client_with(provider.clone(), fast_config());

    let chunks = ok_chunks(collect(client.stream_with_tools(ChatMessage::user("weather?"))).await);

    let finals: Vec<&NormalizedChunk> = chunks.iter().filter(|c| c.is_final).collect();
    assert_eq!(finals.len(), 1);
    assert!(chunks.last().unwrap().is_final);
    assert_eq!(chunks.last().unwrap().finish_reason, FinishReason::Stop);

    let intermediate: Vec<&NormalizedChunk> = chunks
        .iter()
        .filter(|c| !c.is_final && c.finish_reason == FinishReason::ToolCalls)
        .collect();
    assert_eq!(intermediate.len(), 1);
    assert_eq!(intermediate[0].tool_calls[0].name, "weather");

    assert_eq!(provider.stream_calls(), 2);
    let history = client.history().all();
    let roles: Vec<MessageRole> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Function,
            MessageRole::Assistant
        ]
    );
    assert_eq!(history[3].content, "Sunny in Oslo");
}

#[tokio::test]
async fn streamed_turn_surfaces_iteration_limit() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_stream(tool_round("a", "weather", "{\"city\":\"Oslo\"}"))
            .push_stream(tool_round("b", "weather", "{\"city\":\"Oslo\"}")),
    );
    let client = client_with(provider, fast_config().with_max_iterations(1));

    let items = collect(client.stream_with_tools(ChatMessage::user("loop"))).await;
    assert!(matches!(
        items.last(),
        Some(Err(LlmError::ToolIterationLimit {
            iterations: 1,
            max_iterations: 1
        }))
    ));
    assert!(items.iter().filter_map(|i| i.as_ref().ok()).all(|c| !c.is_final));
}

#[tokio::test]
async fn added_and_removed_tools_change_what_is_advertised() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_chat(Ok(ChatResponse::text("a")))
            .push_chat(Ok(ChatResponse::text("b"))),
    );
    let client = client_with(provider.clone(), fast_config());
    client.add_tool(llm_orchestra::tools::ToolDefinition::from_fn(
        "clock",
        "Current time",
        ParameterSchema::object(),
        |_| async { Ok(json!("12:00")) },
    ));
    client.call(ChatMessage::user("one")).await.unwrap();
    assert!(client.remove_tool("weather").is_some());
    client.call(ChatMessage::user("two")).await.unwrap();

    let requests = provider.requests();
    let names = |i: usize| -> Vec<String> { requests[i].tools.iter().map(|t| t.name.clone()).collect() };
    assert_eq!(names(0), vec!["clock".to_string(), "weather".to_string()]);
    assert_eq!(names(1), vec!["clock".to_string()]);
}

#[tokio::test]
async fn interrupted_streamed_turn_discards_its_tool_exchange() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_stream(tool_round("fc_1", "weather", "{\"city\":\"Oslo\"}"))
            .push_stream(StreamScript::Events(vec![
                text("It is"),
                Err(LlmError::ConnectionError("reset".into())),
            ]))
            .push_stream(text_round("Hi again")),
    );
    let client = client_with(provider.clone(), fast_config());

    let chunks = ok_chunks(collect(client.stream_with_tools(ChatMessage::user("one"))).await);
    let last = chunks.last().unwrap();
    assert!(last.is_final);
    assert_eq!(last.finish_reason, FinishReason::Error);
    assert!(client.history().is_empty());

    collect(client.stream_with_tools(ChatMessage::user("two"))).await;
    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].messages, vec![ChatMessage::user("two")]);
    assert_eq!(
        client.history().all(),
        vec![ChatMessage::user("two"), ChatMessage::assistant("Hi again")]
    );
}

#[tokio::test]
async fn each_streamed_turn_starts_with_a_fresh_iteration_count() {
    let provider = Arc::new(
        ScriptedProvider::openai()
            .push_stream(tool_round("a", "weather", "{\"city\":\"Oslo\"}"))
            .push_stream(text_round("first"))
            .push_stream(tool_round("b", "weather", "{\"city\":\"Rome\"}"))
            .push_stream(text_round("second")),
    );
    let client = client_with(provider, fast_config().with_max_iterations(1));

    for expected in ["first", "second"] {
        let message = ChatMessage::user(expected);
        let chunks = ok_chunks(collect(client.stream_with_tools(message)).await);
        assert!(chunks.last().unwrap().is_final);
        assert_eq!(chunks.last().unwrap().finish_reason, FinishReason::Stop);
    }
    let history = client.history().all();
    assert_eq!(history.len(), 8);
    assert_eq!(history[3].content, "first");
    assert_eq!(history[7].content, "second");
}
