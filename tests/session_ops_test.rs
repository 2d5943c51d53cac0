use steam_friends_rust::protocol::ProtocolClient;
mod common;

use common::*;
use sha1::{Digest, Sha1};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use steam_friends_rust::protocol::loopback::{Command, CommandKind, LoopbackProtocol};
use steam_friends_rust::types::callbacks::{MachineAuthChallenge, PersonaUpdate};
use steam_friends_rust::types::credentials::LoginDetails;
use steam_friends_rust::types::events::Event;
use steam_friends_rust::sfcore::{AccountId, ChatEntryType, PersonaState};
use steam_friends_rust::{OperationKind, SessionConfig, SessionError};
use tokio::time::Instant;

fn friends() -> Vec<PersonaUpdate> {
    vec![
        PersonaUpdate::new(AccountId(2), "Bob", PersonaState::Away),
        PersonaUpdate::new(AccountId(3), "Carol", PersonaState::Online),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_login_populates_roster() {
    let loopback = Arc::new(LoopbackProtocol::new().with_friends(friends()));
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;

    connect_and_login(&session, "alice").await;

    assert!(session.is_connected());
    assert_eq!(session.roster().len(), 2);
    let bob = session.roster().get(AccountId(2)).unwrap();
    assert_eq!(bob.persona_name(), "Bob");
    assert_eq!(bob.persona_state(), PersonaState::Away);
    assert!(log.events().contains(&Event::Connected));
    assert!(log.events().contains(&Event::PersonaNameChanged {
        name: "loopback".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_waiter_of_a_kind_is_resolved() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;

    let first = session.add_friend(AccountId(10));
    let second = session.add_friend(AccountId(11));

    let added = second.await.unwrap();
    assert!(added.result.is_ok());
    let err = first.await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout(OperationKind::AddFriend)));
    assert_eq!(loopback.count(CommandKind::AddFriend), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_at_the_default_timeout() {
    let loopback = Arc::new(LoopbackProtocol::new());
    loopback.silence(CommandKind::Connect);
    let log = EventLog::default();
    let session = start_session(&loopback, SessionConfig::default(), &log).await;

    let started = Instant::now();
    let err = session.connect().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, SessionError::Timeout(OperationKind::Connect)));
    assert!(elapsed >= Duration::from_secs(10), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(10_100), "fired late: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_persona_name_rolls_back_on_timeout() {
    let loopback = Arc::new(LoopbackProtocol::new().with_self(AccountId(1), "Old Name"));
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;
    log.clear();

    loopback.silence(CommandKind::SetPersonaName);
    let err = session.set_persona_name("New Name").await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout(OperationKind::SetPersonaName)));
    settle().await;

    let sent: Vec<Command> = loopback
        .commands()
        .into_iter()
        .filter(|c| c.kind() == CommandKind::SetPersonaName)
        .collect();
    assert_eq!(
        sent,
        vec![
            Command::SetPersonaName("New Name".into()),
            Command::SetPersonaName("Old Name".into()),
        ]
    );
    assert_eq!(
        log.events(),
        vec![
            Event::PersonaNameChanged {
                name: "New Name".into()
            },
            Event::PersonaNameChanged {
                name: "Old Name".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_persona_state_change_is_confirmed() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;
    log.clear();

    let update = session.set_persona_state(PersonaState::Busy).await.unwrap();
    assert_eq!(update.state, PersonaState::Busy);
    assert_eq!(session.persona_state(), PersonaState::Busy);
    settle().await;
    assert_eq!(
        log.events(),
        vec![Event::PersonaStateChanged {
            state: PersonaState::Busy
        }]
    );
    assert_eq!(loopback.count(CommandKind::SetPersonaState), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persona_state_rolls_back_on_timeout() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;
    log.clear();

    loopback.silence(CommandKind::SetPersonaState);
    let err = session.set_persona_state(PersonaState::Busy).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout(OperationKind::SetPersonaState)));
    settle().await;

    let sent: Vec<Command> = loopback
        .commands()
        .into_iter()
        .filter(|c| c.kind() == CommandKind::SetPersonaState)
        .collect();
    assert_eq!(
        sent,
        vec![
            Command::SetPersonaState(PersonaState::Busy),
            Command::SetPersonaState(PersonaState::Online),
        ]
    );
    assert_eq!(
        log.events(),
        vec![
            Event::PersonaStateChanged {
                state: PersonaState::Busy
            },
            Event::PersonaStateChanged {
                state: PersonaState::Online
            },
        ]
    );
    assert_eq!(session.persona_state(), PersonaState::Online);
}

#[tokio::test(start_paused = true)]
async fn test_chat_and_remove_friend() {
    let loopback = Arc::new(LoopbackProtocol::new().with_friends(friends()));
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;

    session
        .send_chat_message(AccountId(2), ChatEntryType::ChatMsg, "hi")
        .await
        .unwrap();
    session.remove_friend(AccountId(3)).await.unwrap();
    settle().await;

    assert!(loopback.commands().contains(&Command::SendChatMessage {
        to: AccountId(2),
        entry_type: ChatEntryType::ChatMsg,
        message: "hi".into(),
    }));
    assert!(session.roster().get(AccountId(3)).is_none());
    assert!(log.events().contains(&Event::FriendRemoved(AccountId(3))));
}

#[tokio::test(start_paused = true)]
async fn test_add_friend_by_name_lands_in_roster() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;

    let added = session.add_friend("dave@example.com").await.unwrap();
    settle().await;

    let id = added.account_id.unwrap();
    assert_eq!(added.persona_name, "dave@example.com");
    assert!(session.roster().get(id).is_some());
    assert!(log.events().contains(&Event::FriendAdded(id)));
}

#[tokio::test(start_paused = true)]
async fn test_stop_drains_and_halts_dispatcher() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = steam_friends_rust::SessionBuilder::new()
        .with_protocol(loopback.clone())
        .with_config(short_timeouts())
        .with_event_handler(log.handler())
        .build()
        .await
        .unwrap();
    let dispatcher = session.start().unwrap();
    assert!(session.start().is_none(), "second start is refused");
    connect_and_login(&session, "alice").await;

    session.stop().await;

    assert!(!session.is_running());
    assert!(!loopback.is_connected());
    tokio::time::timeout(Duration::from_secs(1), dispatcher)
        .await
        .expect("dispatcher should exit")
        .unwrap();
    assert_eq!(loopback.count(CommandKind::Logout), 1);
    assert_eq!(loopback.count(CommandKind::Disconnect), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_retries_unanswered_teardown() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;
    session.enable_reconnect();

    loopback.silence_times(CommandKind::Disconnect, 2);
    session.stop().await;

    assert_eq!(loopback.count(CommandKind::Disconnect), 3);
    assert_eq!(loopback.count(CommandKind::Logout), 3);
    assert!(!session.is_running());
    assert!(!session.is_reconnect_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_explicit_disconnect_is_expected() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;
    session.enable_reconnect();

    session.disconnect().await.unwrap();
    settle().await;

    assert!(!session.is_connected());
    assert!(log.events().contains(&Event::Disconnected { expected: true }));
    assert_eq!(loopback.count(CommandKind::Connect), 1, "no reconnect");
}

#[tokio::test(start_paused = true)]
async fn test_connection_loss_without_reconnect_stays_offline() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;

    loopback.simulate_drop();
    settle().await;

    assert!(!session.is_connected());
    assert!(log.events().contains(&Event::Disconnected { expected: false }));
    assert_eq!(loopback.count(CommandKind::Connect), 1);
}

#[tokio::test(start_paused = true)]
async fn test_machine_auth_and_server_list_are_persisted() {
    let servers: Vec<SocketAddr> = (0..10)
        .map(|i| format!("10.0.0.{i}:27017").parse().unwrap())
        .collect();
    let challenge = MachineAuthChallenge {
        job_id: 42,
        file_name: "ssfn123".into(),
        data: bytes::Bytes::from_static(b"machine-auth-file"),
        offset: 0,
        bytes_to_write: 17,
        one_time_password: None,
    };
    let loopback = Arc::new(
        LoopbackProtocol::new()
            .with_machine_auth(challenge)
            .with_server_list(servers.clone()),
    );
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    connect_and_login(&session, "alice").await;

    let expected_hash = Sha1::digest(b"machine-auth-file").to_vec();
    assert_eq!(
        session.settings().sentry_hash("alice").await,
        Some(expected_hash.clone())
    );
    let response = loopback
        .commands()
        .into_iter()
        .find_map(|c| match c {
            Command::MachineAuthResponse(r) => Some(r),
            _ => None,
        })
        .expect("machine auth answered");
    assert_eq!(response.job_id, 42);
    assert_eq!(response.sentry_hash, expected_hash);

    let preferred = session.settings().preferred_servers().await;
    assert_eq!(preferred, servers[..8].to_vec());

    // The next connect targets a stored server and the next login carries the hash.
    session.disconnect().await.unwrap();
    session.connect().await.unwrap();
    session
        .login(LoginDetails::new("alice", "hunter2"))
        .await
        .unwrap();
    let commands = loopback.commands();
    let last_connect = commands
        .iter()
        .rev()
        .find_map(|c| match c {
            Command::Connect(server) => Some(*server),
            _ => None,
        })
        .unwrap();
    assert!(preferred.contains(&last_connect.unwrap()));
    let last_login = commands
        .iter()
        .rev()
        .find_map(|c| match c {
            Command::Login(details) => Some(details.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_login.sentry_hash, Some(expected_hash));
}
