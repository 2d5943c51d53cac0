mod common;

use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use steam_friends_rust::SessionBuilder;
use steam_friends_rust::protocol::loopback::LoopbackProtocol;
use steam_friends_rust::roster::QueueExecutor;
use steam_friends_rust::sfcore::{AccountId, AccountType, Friend, FriendField, PersonaState, Relationship};
use steam_friends_rust::types::callbacks::{FriendsList, PersonaUpdate, ProtocolEvent, RosterEntry};
use steam_friends_rust::types::events::Event;

fn entry(id: u64) -> RosterEntry {
    RosterEntry::friend(AccountId(id))
}

fn ids(list: &[Arc<Friend>]) -> Vec<u64> {
    list.iter().map(|f| f.id().raw()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_full_and_incremental_lists() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;

    loopback.push_event(ProtocolEvent::FriendsList(
        [entry(1), entry(2), entry(3)].into_iter().collect(),
    ));
    settle().await;
    assert_eq!(ids(&session.roster().friends()), vec![1, 2, 3]);
    let kept = session.roster().get(AccountId(1)).unwrap();

    loopback.push_event(ProtocolEvent::FriendsList(FriendsList {
        incremental: true,
        entries: vec![
            entry(2).with_relationship(Relationship::None),
            entry(4).with_relationship(Relationship::RequestRecipient),
            RosterEntry {
                account_id: AccountId(5),
                account_type: AccountType::Clan,
                relationship: Relationship::Friend,
            },
            entry(1),
        ],
    }));
    settle().await;
    assert_eq!(ids(&session.roster().friends()), vec![1, 3, 4]);
    assert!(Arc::ptr_eq(&kept, &session.roster().get(AccountId(1)).unwrap()));
    assert_eq!(
        session.roster().get(AccountId(4)).unwrap().relationship(),
        Relationship::RequestRecipient
    );

    log.clear();
    loopback.push_event(ProtocolEvent::FriendsList(
        [entry(7), entry(7), entry(8)].into_iter().collect(),
    ));
    settle().await;
    assert_eq!(ids(&session.roster().friends()), vec![7, 8]);
    assert_eq!(
        log.events(),
        vec![
            Event::RosterReset,
            Event::FriendAdded(AccountId(7)),
            Event::FriendAdded(AccountId(8)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_presence_updates_refresh_friends_in_place() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    loopback.push_event(ProtocolEvent::FriendsList([entry(1)].into_iter().collect()));
    settle().await;

    let friend = session.roster().get(AccountId(1)).unwrap();
    session.roster().set_filter("nobody matches");
    settle().await;
    assert!(!friend.is_visible());
    log.clear();

    loopback.push_event(ProtocolEvent::PersonaState(PersonaUpdate::new(
        AccountId(1),
        "Gabe",
        PersonaState::LookingToPlay,
    )));
    settle().await;

    assert_eq!(friend.persona_name(), "Gabe");
    assert_eq!(friend.persona_state(), PersonaState::LookingToPlay);
    assert!(!friend.is_visible(), "visibility is owned locally");
    assert_eq!(
        log.events(),
        vec![Event::FriendChanged {
            id: AccountId(1),
            fields: FriendField::ALL.to_vec(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_friends_are_identified_by_account() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let log = EventLog::default();
    let session = start_session(&loopback, short_timeouts(), &log).await;
    loopback.push_event(ProtocolEvent::FriendsList([entry(1)].into_iter().collect()));
    loopback.push_event(ProtocolEvent::PersonaState(PersonaUpdate::new(
        AccountId(1),
        "Gabe",
        PersonaState::Online,
    )));
    settle().await;

    let listed = session.roster().get(AccountId(1)).unwrap();
    let fresh = Friend::new(AccountId(1));
    assert_eq!(*listed, fresh);

    let mut set = HashSet::new();
    set.insert(listed.clone());
    assert!(!set.insert(Arc::new(fresh)));
}

#[tokio::test(start_paused = true)]
async fn test_queue_executor_defers_roster_writes() {
    let loopback = Arc::new(LoopbackProtocol::new());
    let (executor, mut queue) = QueueExecutor::new();
    let session = SessionBuilder::new()
        .with_protocol(loopback.clone())
        .with_config(short_timeouts())
        .with_executor(Arc::new(executor))
        .build()
        .await
        .unwrap();
    session.start().unwrap();

    loopback.push_event(ProtocolEvent::FriendsList(
        [entry(1), entry(2)].into_iter().collect(),
    ));
    settle().await;
    assert!(session.roster().is_empty(), "nothing applied before the owner drains");

    assert_eq!(queue.drain(), 1);
    assert_eq!(session.roster().len(), 2);
}
