//! In-process backend that answers commands the way the real service does.
//!
//! Used by the demo binary and the tests. Every command is recorded, and
//! responses can be silenced or delayed per command kind to provoke
//! timeouts, rollbacks and reconnects.

use super::ProtocolClient;
use async_trait::async_trait;
use log::{debug, trace};
use sfcore::types::callbacks::{
    AccountInfo, Connected, Disconnected, FriendAdded, FriendsList, LoggedOff, LoggedOn,
    MachineAuthChallenge, MachineAuthResponse, PersonaUpdate, ProtocolEvent, RosterEntry,
    ServerList,
};
use sfcore::types::credentials::LoginDetails;
use sfcore::{AccountId, ChatEntryType, FriendTarget, PersonaState, Relationship, ResultCode};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// A command as received by the loopback backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(Option<SocketAddr>),
    Disconnect,
    Login(LoginDetails),
    Logout,
    SetPersonaName(String),
    SetPersonaState(PersonaState),
    SendChatMessage {
        to: AccountId,
        entry_type: ChatEntryType,
        message: String,
    },
    AddFriend(FriendTarget),
    RemoveFriend(AccountId),
    MachineAuthResponse(MachineAuthResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Connect,
    Disconnect,
    Login,
    Logout,
    SetPersonaName,
    SetPersonaState,
    SendChatMessage,
    AddFriend,
    RemoveFriend,
    MachineAuthResponse,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Connect(_) => CommandKind::Connect,
            Command::Disconnect => CommandKind::Disconnect,
            Command::Login(_) => CommandKind::Login,
            Command::Logout => CommandKind::Logout,
            Command::SetPersonaName(_) => CommandKind::SetPersonaName,
            Command::SetPersonaState(_) => CommandKind::SetPersonaState,
            Command::SendChatMessage { .. } => CommandKind::SendChatMessage,
            Command::AddFriend(_) => CommandKind::AddFriend,
            Command::RemoveFriend(_) => CommandKind::RemoveFriend,
            Command::MachineAuthResponse(_) => CommandKind::MachineAuthResponse,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Silence {
    Always,
    Times(u32),
}

struct LoopbackState {
    connected: bool,
    logged_on: bool,
    self_id: AccountId,
    persona_name: String,
    persona_state: PersonaState,
    friends: Vec<(RosterEntry, PersonaUpdate)>,
    next_account: u64,
    silenced: HashMap<CommandKind, Silence>,
    delays: HashMap<CommandKind, Duration>,
    login_results: VecDeque<ResultCode>,
    machine_auth: Option<MachineAuthChallenge>,
    server_list: Option<Vec<SocketAddr>>,
    commands: Vec<Command>,
}

impl LoopbackState {
    /// Records the command and reports whether the backend stays silent.
    fn record(&mut self, command: Command) -> bool {
        let kind = command.kind();
        self.commands.push(command);
        match self.silenced.get_mut(&kind) {
            Some(Silence::Always) => true,
            Some(Silence::Times(n)) => {
                *n -= 1;
                if *n == 0 {
                    self.silenced.remove(&kind);
                }
                true
            }
            None => false,
        }
    }

    fn self_update(&self) -> PersonaUpdate {
        PersonaUpdate::new(self.self_id, self.persona_name.clone(), self.persona_state)
    }
}

pub struct LoopbackProtocol {
    tx: mpsc::UnboundedSender<ProtocolEvent>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ProtocolEvent>>,
    state: Mutex<LoopbackState>,
}

impl Default for LoopbackProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackProtocol {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            state: Mutex::new(LoopbackState {
                connected: false,
                logged_on: false,
                self_id: AccountId(76_561_197_960_265_728),
                persona_name: "loopback".to_string(),
                persona_state: PersonaState::Online,
                friends: Vec::new(),
                next_account: 76_561_197_960_300_000,
                silenced: HashMap::new(),
                delays: HashMap::new(),
                login_results: VecDeque::new(),
                machine_auth: None,
                server_list: None,
                commands: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        self.state.lock().expect("Mutex should not be poisoned")
    }

    pub fn with_self(self, id: AccountId, persona_name: impl Into<String>) -> Self {
        {
            let mut state = self.lock();
            state.self_id = id;
            state.persona_name = persona_name.into();
        }
        self
    }

    /// Friends reported on every successful login.
    pub fn with_friends(self, friends: impl IntoIterator<Item = PersonaUpdate>) -> Self {
        self.lock().friends.extend(
            friends
                .into_iter()
                .map(|update| (RosterEntry::friend(update.account_id), update)),
        );
        self
    }

    /// Machine-auth challenge issued once, after the next successful login.
    pub fn with_machine_auth(self, challenge: MachineAuthChallenge) -> Self {
        self.lock().machine_auth = Some(challenge);
        self
    }

    /// Server list pushed once, after the next successful login.
    pub fn with_server_list(self, servers: Vec<SocketAddr>) -> Self {
        self.lock().server_list = Some(servers);
        self
    }

    /// Results returned by the next logins, in order. Logins beyond the
    /// script succeed.
    pub fn script_login_results(&self, results: impl IntoIterator<Item = ResultCode>) {
        self.lock().login_results.extend(results);
    }

    /// Stops answering `kind` until [`restore`](Self::restore) is called.
    pub fn silence(&self, kind: CommandKind) {
        self.lock().silenced.insert(kind, Silence::Always);
    }

    /// Leaves the next `times` commands of `kind` unanswered.
    pub fn silence_times(&self, kind: CommandKind, times: u32) {
        if times > 0 {
            self.lock().silenced.insert(kind, Silence::Times(times));
        }
    }

    pub fn restore(&self, kind: CommandKind) {
        let mut state = self.lock();
        state.silenced.remove(&kind);
        state.delays.remove(&kind);
    }

    /// Holds back the responses to `kind` for `delay`.
    pub fn delay(&self, kind: CommandKind, delay: Duration) {
        self.lock().delays.insert(kind, delay);
    }

    /// Surfaces an arbitrary callback, as if the backend pushed it.
    pub fn push_event(&self, event: ProtocolEvent) {
        let _ = self.tx.send(event);
    }

    /// Drops the connection from the backend side.
    pub fn simulate_drop(&self) {
        {
            let mut state = self.lock();
            state.connected = false;
            state.logged_on = false;
        }
        debug!(target: "Loopback", "Dropping connection");
        self.push_event(ProtocolEvent::Disconnected(Disconnected {
            user_initiated: false,
        }));
    }

    pub fn commands(&self) -> Vec<Command> {
        self.lock().commands.clone()
    }

    pub fn count(&self, kind: CommandKind) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    pub fn is_logged_on(&self) -> bool {
        self.lock().logged_on
    }

    fn respond(&self, kind: CommandKind, events: Vec<ProtocolEvent>) {
        if events.is_empty() {
            return;
        }
        let delay = self.lock().delays.get(&kind).copied();
        match delay {
            Some(delay) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for event in events {
                        let _ = tx.send(event);
                    }
                });
            }
            None => {
                for event in events {
                    let _ = self.tx.send(event);
                }
            }
        }
    }

    /// Runs `command` against the state unless it is silenced, then sends
    /// whatever `answer` produced.
    fn handle(
        &self,
        command: Command,
        answer: impl FnOnce(&mut LoopbackState) -> Vec<ProtocolEvent>,
    ) {
        let kind = command.kind();
        trace!(target: "Loopback", "<-- {command:?}");
        let events = {
            let mut state = self.lock();
            if state.record(command) {
                debug!(target: "Loopback", "Silenced {kind:?}");
                return;
            }
            answer(&mut state)
        };
        self.respond(kind, events);
    }
}

#[async_trait]
impl ProtocolClient for LoopbackProtocol {
    async fn connect(&self, server: Option<SocketAddr>) {
        self.handle(Command::Connect(server), |state| {
            state.connected = true;
            vec![ProtocolEvent::Connected(Connected)]
        });
    }

    async fn disconnect(&self) {
        self.handle(Command::Disconnect, |state| {
            state.connected = false;
            state.logged_on = false;
            vec![ProtocolEvent::Disconnected(Disconnected {
                user_initiated: true,
            })]
        });
    }

    async fn login(&self, details: LoginDetails) {
        self.handle(Command::Login(details), |state| {
            if !state.connected {
                return Vec::new();
            }
            let result = state.login_results.pop_front().unwrap_or(ResultCode::Ok);
            if !result.is_ok() {
                return vec![ProtocolEvent::LoggedOn(LoggedOn {
                    result,
                    account_id: None,
                })];
            }

            state.logged_on = true;
            let mut events = vec![
                ProtocolEvent::LoggedOn(LoggedOn {
                    result,
                    account_id: Some(state.self_id),
                }),
                ProtocolEvent::AccountInfo(AccountInfo {
                    persona_name: state.persona_name.clone(),
                    country: None,
                }),
                ProtocolEvent::FriendsList(
                    state.friends.iter().map(|(entry, _)| entry.clone()).collect(),
                ),
                ProtocolEvent::PersonaState(state.self_update()),
            ];
            events.extend(
                state
                    .friends
                    .iter()
                    .map(|(_, update)| ProtocolEvent::PersonaState(update.clone())),
            );
            if let Some(challenge) = state.machine_auth.take() {
                events.push(ProtocolEvent::MachineAuth(challenge));
            }
            if let Some(servers) = state.server_list.take() {
                events.push(ProtocolEvent::ServerList(ServerList { servers }));
            }
            events
        });
    }

    async fn logout(&self) {
        self.handle(Command::Logout, |state| {
            if !state.logged_on {
                return Vec::new();
            }
            state.logged_on = false;
            vec![ProtocolEvent::LoggedOff(LoggedOff {
                result: ResultCode::Ok,
            })]
        });
    }

    async fn set_persona_name(&self, name: String) {
        self.handle(Command::SetPersonaName(name.clone()), |state| {
            if !state.logged_on {
                return Vec::new();
            }
            state.persona_name = name;
            vec![ProtocolEvent::AccountInfo(AccountInfo {
                persona_name: state.persona_name.clone(),
                country: None,
            })]
        });
    }

    async fn set_persona_state(&self, persona_state: PersonaState) {
        self.handle(Command::SetPersonaState(persona_state), |state| {
            if !state.logged_on {
                return Vec::new();
            }
            state.persona_state = persona_state;
            vec![ProtocolEvent::PersonaState(state.self_update())]
        });
    }

    async fn send_chat_message(&self, to: AccountId, entry_type: ChatEntryType, message: String) {
        self.handle(
            Command::SendChatMessage {
                to,
                entry_type,
                message,
            },
            |_| Vec::new(),
        );
    }

    async fn add_friend(&self, target: FriendTarget) {
        self.handle(Command::AddFriend(target.clone()), |state| {
            if !state.logged_on {
                return Vec::new();
            }
            let (id, name) = match target {
                FriendTarget::Account(id) => (id, format!("user-{id}")),
                FriendTarget::AccountName(name) => {
                    state.next_account += 1;
                    (AccountId(state.next_account), name)
                }
            };
            if state.friends.iter().any(|(entry, _)| entry.account_id == id) {
                return vec![ProtocolEvent::FriendAdded(FriendAdded {
                    result: ResultCode::Fail,
                    account_id: Some(id),
                    persona_name: name,
                })];
            }

            let entry =
                RosterEntry::friend(id).with_relationship(Relationship::RequestInitiator);
            state.friends.push((
                entry.clone(),
                PersonaUpdate::new(id, name.clone(), PersonaState::Offline),
            ));
            vec![
                ProtocolEvent::FriendAdded(FriendAdded {
                    result: ResultCode::Ok,
                    account_id: Some(id),
                    persona_name: name,
                }),
                ProtocolEvent::FriendsList(FriendsList {
                    incremental: true,
                    entries: vec![entry],
                }),
            ]
        });
    }

    async fn remove_friend(&self, id: AccountId) {
        self.handle(Command::RemoveFriend(id), |state| {
            let before = state.friends.len();
            state.friends.retain(|(entry, _)| entry.account_id != id);
            if state.friends.len() == before || !state.logged_on {
                return Vec::new();
            }
            vec![ProtocolEvent::FriendsList(FriendsList {
                incremental: true,
                entries: vec![RosterEntry::friend(id).with_relationship(Relationship::None)],
            })]
        });
    }

    async fn send_machine_auth_response(&self, response: MachineAuthResponse) {
        self.handle(Command::MachineAuthResponse(response), |_| Vec::new());
    }

    async fn wait_for_event(&self, timeout: Duration) -> Option<ProtocolEvent> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn self_id(&self) -> Option<AccountId> {
        let state = self.lock();
        state.logged_on.then_some(state.self_id)
    }

    fn persona_name(&self) -> Option<String> {
        let state = self.lock();
        state.logged_on.then(|| state.persona_name.clone())
    }

    fn persona_state(&self) -> PersonaState {
        self.lock().persona_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfcore::types::callbacks::CallbackKind;

    const WAIT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn login_pushes_account_roster_and_presence() {
        let loopback = LoopbackProtocol::new()
            .with_friends([PersonaUpdate::new(AccountId(2), "Bob", PersonaState::Away)]);
        loopback.connect(None).await;
        loopback.login(LoginDetails::new("alice", "pw")).await;

        let mut kinds = Vec::new();
        while let Some(event) = loopback.wait_for_event(WAIT).await {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                CallbackKind::Connected,
                CallbackKind::LoggedOn,
                CallbackKind::AccountInfo,
                CallbackKind::FriendsList,
                CallbackKind::PersonaState,
                CallbackKind::PersonaState,
            ]
        );
        assert!(loopback.is_logged_on());
    }

    #[tokio::test]
    async fn silenced_commands_are_recorded_but_unanswered() {
        let loopback = LoopbackProtocol::new();
        loopback.silence_times(CommandKind::Connect, 1);

        loopback.connect(None).await;
        assert!(loopback.wait_for_event(WAIT).await.is_none());
        assert!(!loopback.is_connected());

        loopback.connect(None).await;
        assert!(matches!(
            loopback.wait_for_event(WAIT).await,
            Some(ProtocolEvent::Connected(_))
        ));
        assert_eq!(loopback.count(CommandKind::Connect), 2);
    }

    #[tokio::test]
    async fn scripted_login_failure() {
        let loopback = LoopbackProtocol::new();
        loopback.script_login_results([ResultCode::AccountLogonDenied]);
        loopback.connect(None).await;
        loopback.login(LoginDetails::new("alice", "pw")).await;

        let _connected = loopback.wait_for_event(WAIT).await;
        match loopback.wait_for_event(WAIT).await {
            Some(ProtocolEvent::LoggedOn(logged_on)) => {
                assert_eq!(logged_on.result, ResultCode::AccountLogonDenied)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!loopback.is_logged_on());
    }
}
