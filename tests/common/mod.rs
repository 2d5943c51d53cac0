#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use steam_friends_rust::protocol::loopback::LoopbackProtocol;
use steam_friends_rust::settings::SettingsService;
use steam_friends_rust::types::credentials::LoginDetails;
use steam_friends_rust::types::events::{Event, EventHandler};
use steam_friends_rust::{Session, SessionBuilder, SessionConfig};

/// Records every event a session publishes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn handler(&self) -> Arc<dyn EventHandler> {
        let log = self.0.clone();
        Arc::new(move |event: &Event| log.lock().unwrap().push(event.clone()))
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

pub fn short_timeouts() -> SessionConfig {
    SessionConfig {
        default_timeout: Duration::from_millis(100),
        relogin_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

pub async fn start_session(
    loopback: &Arc<LoopbackProtocol>,
    config: SessionConfig,
    log: &EventLog,
) -> Arc<Session> {
    start_session_with_settings(loopback, config, log, Arc::new(SettingsService::in_memory())).await
}

pub async fn start_session_with_settings(
    loopback: &Arc<LoopbackProtocol>,
    config: SessionConfig,
    log: &EventLog,
    settings: Arc<SettingsService>,
) -> Arc<Session> {
    let session = SessionBuilder::new()
        .with_protocol(loopback.clone())
        .with_settings(settings)
        .with_config(config)
        .with_event_handler(log.handler())
        .build()
        .await
        .unwrap();
    session.start().unwrap();
    session
}

/// Lets the dispatcher work through everything queued so far.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

pub async fn connect_and_login(session: &Arc<Session>, username: &str) {
    session.connect().await.unwrap();
    let logged_on = session
        .login(LoginDetails::new(username, "hunter2"))
        .await
        .unwrap();
    assert!(logged_on.result.is_ok());
    settle().await;
}
