// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn channel_adapter_round_trips() {
    let (adapter, mut requests) = ChannelUserInput::new();
    let responder = adapter.clone();

    let ask = tokio::spawn(async move {
        adapter
            .request(&RequestId::new("req-1"), "Proceed?")
            .await
    });

    let request = requests.recv().await.unwrap();
    assert_eq!(request.request_id, RequestId::new("req-1"));
    assert_eq!(request.prompt, "Proceed?");

    assert!(responder.respond(&RequestId::new("req-1"), "yes".into()));
    assert_eq!(ask.await.unwrap().unwrap(), "yes");
}

#[tokio::test]
async fn respond_to_unknown_request_is_false() {
    let (adapter, _requests) = ChannelUserInput::new();
    assert!(!adapter.respond(&RequestId::new("ghost"), "answer".into()));
}

#[tokio::test]
async fn noop_adapter_fails_fast() {
    let adapter = NoOpUserInput;
    let err = adapter
        .request(&RequestId::new("r"), "anyone there?")
        .await
        .unwrap_err();
    assert_eq!(err.kind, tether_core::ErrorKind::Unsupported);
}

#[tokio::test]
async fn fake_adapter_scripts_answers() {
    let fake = FakeUserInput::with_answers(vec!["first".into()]);
    let answer = fake.request(&RequestId::new("r"), "q?").await.unwrap();
    assert_eq!(answer, "first");
    assert_eq!(fake.prompts(), vec!["q?"]);

    // Script exhausted.
    assert!(fake.request(&RequestId::new("r2"), "q2?").await.is_err());
}
