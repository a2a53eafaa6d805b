use super::*;

#[tokio::test]
async fn deliver_rejects_empty_message() {
    let agent = InMemoryAgent::new(None);
    let err = agent
        .deliver(String::new(), true, DeliverAs::Steer)
        .await
        .unwrap_err();
    assert!(matches!(err, ErrorKind::Parse(_)));
}

#[tokio::test]
async fn deliver_then_get_message_round_trips() {
    let agent = InMemoryAgent::new(None);
    agent
        .deliver("hello".into(), true, DeliverAs::Steer)
        .await
        .unwrap();
    let message = agent.last_assistant_message().await;
    assert!(message.unwrap().contains("hello"));
    assert!(agent.is_idle().await);
}

#[tokio::test]
async fn get_message_is_read_only_and_idempotent() {
    let agent = InMemoryAgent::new(None);
    agent
        .deliver("hi".into(), true, DeliverAs::Steer)
        .await
        .unwrap();
    let first = agent.last_assistant_message().await;
    let second = agent.last_assistant_message().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn clear_is_idempotent_at_root() {
    let agent = InMemoryAgent::new(None);
    let first = agent.rewind_to_root().await;
    assert!(first.already_at_root);
    let second = agent.rewind_to_root().await;
    assert!(second.already_at_root);
}

#[tokio::test]
async fn clear_after_messages_is_not_already_at_root() {
    let agent = InMemoryAgent::new(None);
    agent
        .deliver("hi".into(), true, DeliverAs::Steer)
        .await
        .unwrap();
    let outcome = agent.rewind_to_root().await;
    assert!(!outcome.already_at_root);
    assert!(agent.last_assistant_message().await.is_none());
}

#[tokio::test]
async fn abort_is_idempotent_on_idle_session() {
    let agent = InMemoryAgent::new(None);
    assert!(agent.is_idle().await);
    agent.abort().await;
    assert!(agent.is_idle().await);
}

#[tokio::test]
async fn summarize_fails_without_backend() {
    let agent = InMemoryAgent::without_summarization(None);
    let err = agent.summarize_since_last_prompt().await.unwrap_err();
    assert!(matches!(err, ErrorKind::Backend(_)));
}

#[tokio::test]
async fn turn_end_subscriber_observes_the_reply() {
    let agent = InMemoryAgent::new(None);
    let mut rx = agent.subscribe_turn_end();
    agent
        .deliver("hi".into(), true, DeliverAs::Steer)
        .await
        .unwrap();
    let event = rx.recv().await.unwrap();
    assert!(event.message.unwrap().contains("hi"));
}
