//! WhatsApp messenger 集成测试（mock session + 临时 SQLite store）

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{MockSession, call, contact, test_identity};
use multichat_messenger::{
    DeviceStore, ErrorKind, Messenger, MessengerError, Namespace, PairingEvent, WhatsAppMessenger,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct Harness {
    messenger: Arc<WhatsAppMessenger>,
    session: Arc<MockSession>,
    namespace: Namespace,
    _tmp: tempfile::TempDir,
}

fn contacts() -> Vec<multichat_messenger::Contact> {
    vec![
        contact("447700900123@s.whatsapp.net", "Zoe Archer"),
        contact("15550100001@s.whatsapp.net", "Ann Lee"),
        contact("15550100002@s.whatsapp.net", "15550100002"),
        contact("15550100003@s.whatsapp.net", "Bob Stone"),
        contact("120363025246125486@g.us", "Release Team"),
    ]
}

async fn connected_harness() -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let store = DeviceStore::open(&tmp.path().join("whatsapp.db")).await.unwrap();
    let session = Arc::new(MockSession {
        contacts: contacts(),
        ..MockSession::pairing_with(vec![
            PairingEvent::Code("2@abc".into()),
            PairingEvent::Success(test_identity()),
        ])
    });
    let messenger = Arc::new(WhatsAppMessenger::new(store, session.clone()));
    messenger.connect(&CancellationToken::new()).await.unwrap();

    let mut namespace = Namespace::new();
    Arc::clone(&messenger)
        .register_operations(&mut namespace)
        .unwrap();

    Harness {
        messenger,
        session,
        namespace,
        _tmp: tmp,
    }
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

// ============ 生命周期 ============

#[tokio::test]
async fn test_pairing_persists_device_and_resume_skips_pairing() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("whatsapp.db");

    {
        let store = DeviceStore::open(&path).await.unwrap();
        let session = Arc::new(MockSession::pairing_with(vec![PairingEvent::Success(
            test_identity(),
        )]));
        let wa = WhatsAppMessenger::new(store, session.clone());
        wa.connect(&CancellationToken::new()).await.unwrap();
        assert!(wa.is_connected());
        assert_eq!(session.pair_calls.load(Ordering::SeqCst), 1);
        wa.disconnect().await;
        assert!(!wa.is_connected());
    }

    let store = DeviceStore::open(&path).await.unwrap();
    assert_eq!(store.device().await.unwrap(), Some(test_identity()));

    let session = Arc::new(MockSession::default());
    let wa = WhatsAppMessenger::new(store, session.clone());
    wa.connect(&CancellationToken::new()).await.unwrap();
    assert_eq!(session.pair_calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.resume_calls.load(Ordering::SeqCst), 1);
    assert!(wa.is_connected());
}

#[tokio::test]
async fn test_pairing_timeout_leaves_disconnected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = DeviceStore::open(&tmp.path().join("wa.db")).await.unwrap();
    let session = Arc::new(MockSession::pairing_with(vec![
        PairingEvent::Code("2@abc".into()),
        PairingEvent::Timeout,
    ]));
    let wa = WhatsAppMessenger::new(store, session);

    let err = wa.connect(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("timed out"));
    assert!(!wa.is_connected());
}

#[tokio::test]
async fn test_cancel_during_pairing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = DeviceStore::open(&tmp.path().join("wa.db")).await.unwrap();
    let session = Arc::new(MockSession {
        hold_pairing: true,
        ..MockSession::pairing_with(vec![PairingEvent::Code("2@abc".into())])
    });
    let wa = WhatsAppMessenger::new(store, session);

    let ct = CancellationToken::new();
    let canceller = ct.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = wa.connect(&ct).await.unwrap_err();
    assert!(matches!(err, MessengerError::Cancelled));
    assert!(!wa.is_connected());
}

#[tokio::test]
async fn test_registers_seven_operations() {
    let h = connected_harness().await;
    let names: Vec<&str> = h.namespace.operations().map(|op| op.name()).collect();
    assert_eq!(
        names,
        [
            "search_contacts",
            "list_messages",
            "list_chats",
            "get_chat",
            "get_direct_chat_by_contact",
            "get_contact_chats",
            "send_message",
        ]
    );
}

// ============ 联系人与会话 ============

#[tokio::test]
async fn test_search_contacts_by_name_and_phone() {
    let h = connected_harness().await;

    let out = call(&h.namespace, "search_contacts", json!({"query": "ann"})).await;
    assert!(!out.is_error, "{}", out.text);
    let found = parse(&out.text);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["name"], "Ann Lee");

    let out = call(&h.namespace, "search_contacts", json!({"query": "+44 7700"})).await;
    let found = parse(&out.text);
    assert_eq!(found[0]["jid"], "447700900123@s.whatsapp.net");
}

#[tokio::test]
async fn test_search_contacts_ignores_case() {
    let h = connected_harness().await;

    let upper = call(&h.namespace, "search_contacts", json!({"query": "BOB"})).await;
    let lower = call(&h.namespace, "search_contacts", json!({"query": "bob"})).await;
    assert!(!upper.is_error, "{}", upper.text);
    assert!(!lower.is_error, "{}", lower.text);

    let upper = parse(&upper.text);
    let lower = parse(&lower.text);
    assert!(!upper.as_array().unwrap().is_empty());
    assert_eq!(upper, lower);
    assert_eq!(upper[0]["name"], "Bob Stone");
}

#[tokio::test]
async fn test_list_chats_pages_do_not_overlap() {
    let h = connected_harness().await;

    let first = parse(&call(&h.namespace, "list_chats", json!({"limit": 2, "page": 0})).await.text);
    let second = parse(&call(&h.namespace, "list_chats", json!({"limit": 2, "page": 1})).await.text);
    let beyond = parse(&call(&h.namespace, "list_chats", json!({"limit": 2, "page": 5})).await.text);

    let first = first.as_array().unwrap();
    let second = second.as_array().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert!(first.iter().all(|c| !second.contains(c)));
    assert!(beyond.as_array().unwrap().is_empty());

    let all = parse(&call(&h.namespace, "list_chats", json!({})).await.text);
    let groups: Vec<&Value> = all
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["is_group"] == true)
        .collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["name"], "Release Team");
}

#[tokio::test]
async fn test_get_chat_name_fallback() {
    let h = connected_harness().await;

    let known = parse(&call(&h.namespace, "get_chat", json!({"chat_jid": "15550100001@s.whatsapp.net"})).await.text);
    assert_eq!(known["name"], "Ann Lee");

    let unknown = parse(&call(&h.namespace, "get_chat", json!({"chat_jid": "19995550000@s.whatsapp.net"})).await.text);
    assert_eq!(unknown["name"], "19995550000");
    assert_eq!(unknown["is_group"], false);

    let out = call(&h.namespace, "get_chat", json!({"chat_jid": "not-a-jid"})).await;
    assert!(out.is_error);
    assert_eq!(out.error_kind, Some(ErrorKind::Identifier));
    assert!(out.text.starts_with("get chat failed: "));
}

#[tokio::test]
async fn test_direct_chat_by_phone_matches_get_chat() {
    let h = connected_harness().await;

    let by_phone = call(
        &h.namespace,
        "get_direct_chat_by_contact",
        json!({"phone_number": "+1 (555) 010-0001"}),
    )
    .await;
    let by_jid = call(&h.namespace, "get_chat", json!({"chat_jid": "15550100001@s.whatsapp.net"})).await;
    assert_eq!(by_phone.text, by_jid.text);

    let chats = parse(&call(&h.namespace, "get_contact_chats", json!({"contact_jid": "15550100001@s.whatsapp.net"})).await.text);
    assert_eq!(chats.as_array().unwrap().len(), 1);
    assert_eq!(chats[0], parse(&by_jid.text));
}

// ============ 消息 ============

#[tokio::test]
async fn test_list_messages_is_empty_with_note() {
    let h = connected_harness().await;

    let out = call(&h.namespace, "list_messages", json!({"after": "2024-01-01T00:00:00Z"})).await;
    assert!(!out.is_error);
    assert_eq!(parse(&out.text), json!([]));
    assert_eq!(out.notes.len(), 1);
}

#[tokio::test]
async fn test_list_messages_bad_date() {
    let h = connected_harness().await;

    let out = call(&h.namespace, "list_messages", json!({"after": "last tuesday"})).await;
    assert!(out.is_error);
    assert_eq!(out.error_kind, Some(ErrorKind::Date));
    assert!(out.text.starts_with("invalid after date: "), "{}", out.text);
}

#[tokio::test]
async fn test_send_message_phone_and_jid_reach_same_recipient() {
    let h = connected_harness().await;

    let out = call(
        &h.namespace,
        "send_message",
        json!({"recipient": "+1 555 010 0001", "message": "hello"}),
    )
    .await;
    assert!(!out.is_error, "{}", out.text);
    assert_eq!(out.text, "Message sent successfully");

    call(
        &h.namespace,
        "send_message",
        json!({"recipient": "15550100001@s.whatsapp.net", "message": "again"}),
    )
    .await;

    let sent = h.session.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, sent[1].0);
    assert_eq!(sent[0].0, "15550100001@s.whatsapp.net");
}

#[tokio::test]
async fn test_send_message_missing_argument_skips_backend() {
    let h = connected_harness().await;

    let out = call(&h.namespace, "send_message", json!({"recipient": "15550100001"})).await;
    assert!(out.is_error);
    assert_eq!(out.error_kind, Some(ErrorKind::Argument));
    assert!(out.text.starts_with("invalid arguments: "));
    assert!(h.session.sent().is_empty());
}

// ============ 未连接 ============

#[tokio::test]
async fn test_every_operation_fails_when_disconnected() {
    let h = connected_harness().await;
    h.messenger.disconnect().await;

    let calls = [
        ("search_contacts", json!({"query": "a"})),
        ("list_messages", json!({})),
        ("list_chats", json!({})),
        ("get_chat", json!({"chat_jid": "15550100001@s.whatsapp.net"})),
        ("get_direct_chat_by_contact", json!({"phone_number": "15550100001"})),
        ("get_contact_chats", json!({"contact_jid": "15550100001@s.whatsapp.net"})),
        ("send_message", json!({"recipient": "15550100001", "message": "hi"})),
    ];
    for (name, value) in calls {
        let out = call(&h.namespace, name, value).await;
        assert!(out.is_error, "{name} should fail");
        assert_eq!(out.error_kind, Some(ErrorKind::State), "{name}: {}", out.text);
        assert!(out.text.contains("not connected to WhatsApp"), "{name}: {}", out.text);
    }
    assert!(h.session.sent().is_empty());
}

#[tokio::test]
async fn test_send_failure_is_reported_not_raised() {
    let tmp = tempfile::tempdir().unwrap();
    let store = DeviceStore::open(&tmp.path().join("wa.db")).await.unwrap();
    let session = Arc::new(MockSession {
        fail_send: true,
        ..MockSession::pairing_with(vec![PairingEvent::Success(test_identity())])
    });
    let wa = Arc::new(WhatsAppMessenger::new(store, session));
    wa.connect(&CancellationToken::new()).await.unwrap();
    let mut namespace = Namespace::new();
    Arc::clone(&wa).register_operations(&mut namespace).unwrap();

    let out = call(
        &namespace,
        "send_message",
        json!({"recipient": "15550100001", "message": "hi"}),
    )
    .await;
    assert!(out.is_error);
    assert_eq!(out.error_kind, Some(ErrorKind::Transport));
    assert_eq!(out.text, "send message failed: [WhatsApp] server rejected message");
    assert!(wa.is_connected());
}
