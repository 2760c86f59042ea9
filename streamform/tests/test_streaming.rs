//! Transport behavior: cancellation, failures and echoed transcripts.

mod common;

use std::time::Duration;

use async_trait::async_trait;
use common::{Broken, Hanging, Refusing, Target};
use futures::{stream, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use streamform::{
    provider::accumulate, CompletionProvider, CompletionStream, ConstrainedGenerator, GenerateError,
    ProviderError, Schema,
};

fn car_schema() -> Schema {
    Schema::from_value(json!({
        "type": "object",
        "properties": {
            "make": {"type": "string"},
            "year": {"type": "number"}
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_dropping_generation_closes_stream() {
    let provider = Hanging::new(r#""Fo"#);
    let mut generator = ConstrainedGenerator::new(&provider, car_schema(), "a car");

    let outcome = tokio::time::timeout(Duration::from_millis(50), generator.generate()).await;
    assert!(outcome.is_err());
    assert!(provider.stream_dropped());
}

#[tokio::test]
async fn test_stream_error_is_propagated() {
    let provider = Broken { prefix: r#""Ford","year":19"# };
    let mut generator = ConstrainedGenerator::new(&provider, car_schema(), "a car");

    let err = generator.generate().await.unwrap_err();
    assert!(matches!(err, GenerateError::Provider(_)));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(generator.request_count(), 1);
}

#[tokio::test]
async fn test_refused_request_is_propagated() {
    let mut generator = ConstrainedGenerator::new(Refusing, car_schema(), "a car");

    let err = generator.generate().await.unwrap_err();
    assert!(err.to_string().contains("401 unauthorized"));
    assert_eq!(generator.request_count(), 1);
}

#[tokio::test]
async fn test_request_count_is_per_call() {
    let provider = common::Script::new(&[r#""Ford","model":"T"}"#, r#"1948}"#, r#""Ford","year":1948}"#]);
    let mut generator = ConstrainedGenerator::new(&provider, car_schema(), "a car");

    generator.generate().await.unwrap();
    assert_eq!(generator.request_count(), 2);

    generator.generate().await.unwrap();
    assert_eq!(generator.request_count(), 1);
}

#[tokio::test]
async fn test_generator_over_shared_provider() {
    let provider = std::sync::Arc::new(Target::new(r#"{"make":"Ford","year":1948}"#));
    let mut first = ConstrainedGenerator::new(provider.clone(), car_schema(), "a car");
    let mut second = ConstrainedGenerator::new(provider.clone(), car_schema(), "a car");

    let (a, b) = futures::join!(first.generate(), second.generate());
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(provider.prompts().len(), 2);
}

/// Streams deltas and echoes the whole transcript, like some raw completion endpoints.
struct Echoing;

#[async_trait]
impl CompletionProvider for Echoing {
    async fn complete(&self, prompt: &str) -> Result<CompletionStream, ProviderError> {
        let seed = common::seed_of(prompt);
        let answer = r#"{"make": "Ford", "year": 1948}"#;
        let continuation = answer.strip_prefix(seed).unwrap_or(answer).to_string();
        let deltas = vec![
            Ok::<_, ProviderError>(prompt.to_string()),
            Ok(continuation),
            Ok("\n\nHuman: anything else?".to_string()),
        ];
        Ok(accumulate(stream::iter(deltas)))
    }
}

#[tokio::test]
async fn test_echoed_transcript_is_trimmed() {
    let mut generator = ConstrainedGenerator::new(Echoing, car_schema(), "a car");

    assert_eq!(
        generator.generate().await.unwrap(),
        json!({"make": "Ford", "year": 1948})
    );
    assert_eq!(generator.request_count(), 1);
}

#[tokio::test]
async fn test_chunk_boundaries_do_not_matter() {
    let target = r#"{"make":"Mercury \"Eight\"","year":1949}"#;
    for chunk in [1, 2, 5, 64] {
        let provider = Target::chunked(target, chunk);
        let value = streamform::generate(&provider, car_schema(), "a car")
            .await
            .unwrap();
        assert_eq!(value, json!({"make": "Mercury \"Eight\"", "year": 1949}), "chunk {}", chunk);
        assert_eq!(provider.prompts().len(), 1);
    }
}

#[test]
fn test_completion_stream_is_send() {
    fn assert_send<T: Send>(_: &T) {}
    let s: CompletionStream = stream::empty().boxed();
    assert_send(&s);
}
