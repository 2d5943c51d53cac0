use chrono::Local;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use steam_friends_rust::{LoginFlow, LoginState, SessionBuilder};
use steam_friends_rust::protocol::loopback::LoopbackProtocol;
use steam_friends_rust::settings::JsonFileSettingsStore;
use steam_friends_rust::types::callbacks::PersonaUpdate;
use steam_friends_rust::types::events::Event;
use steam_friends_rust::sfcore::{AccountId, PersonaState, ResultCode};
use tokio::io::{AsyncBufReadExt, BufReader};

// Demo of a session against the in-process loopback backend.
//
// Usage:
//   cargo run -- --username alice --password secret
//   cargo run -- -u alice -p secret --ask-auth-code     # backend asks for a mailed code
//   cargo run -- -u alice -p secret --persona-name Al   # rename after login
//   cargo run                                           # remembered account, if any

#[derive(Parser, Debug)]
#[command(about = "Log in to the loopback backend and print the friends list")]
struct Args {
    #[arg(short, long)]
    username: Option<String>,

    #[arg(short, long)]
    password: Option<String>,

    /// Settings file (remembered account, machine-auth hashes, servers).
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// New persona name to set after logging in.
    #[arg(long)]
    persona_name: Option<String>,

    /// Make the backend ask for a mailed auth code on the first attempt.
    #[arg(long)]
    ask_auth_code: bool,

    #[arg(long)]
    remember: bool,
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    if let Err(e) = rt.block_on(run(args)) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let loopback = Arc::new(LoopbackProtocol::new().with_friends([
        PersonaUpdate::new(AccountId(76_561_197_960_287_930), "Gabe", PersonaState::Online),
        PersonaUpdate::new(AccountId(76_561_197_960_265_731), "Robin", PersonaState::Away),
        PersonaUpdate::new(AccountId(76_561_197_960_265_740), "Erik", PersonaState::Offline),
    ]));
    if args.ask_auth_code {
        loopback.script_login_results([ResultCode::AccountLogonDenied]);
    }

    let session = SessionBuilder::new()
        .with_protocol(loopback)
        .with_settings_store(Arc::new(JsonFileSettingsStore::new(&args.settings)))
        .with_default_timeout(Duration::from_millis(args.timeout_ms))
        .with_event_handler(Arc::new(|event: &Event| match event {
            Event::ReconnectFailed => error!("Reconnecting failed, please log in again."),
            Event::PersonaNameChanged { name } => info!("Persona name is now '{name}'"),
            Event::PersonaStateChanged { state } => info!("Persona state is now {state}"),
            _ => {}
        }))
        .build()
        .await?;
    let dispatcher = session.start();

    let mut flow = match (args.username, args.password) {
        (Some(username), Some(password)) => {
            LoginFlow::new(session.clone(), username, password).remember_account(args.remember)
        }
        _ => LoginFlow::remembered(session.clone())
            .await
            .ok_or_else(|| anyhow::anyhow!("No remembered account, pass --username and --password"))?,
    };

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut state = flow.start().await?.clone();
    while state.is_awaiting_code() {
        let prompt = match state {
            LoginState::AwaitingAuthCode { retry: true } => "Wrong code, enter the mailed auth code again",
            LoginState::AwaitingAuthCode { retry: false } => "Enter the auth code mailed to you",
            LoginState::AwaitingTwoFactorCode { retry: true } => "Wrong code, enter the authenticator code again",
            _ => "Enter the authenticator code",
        };
        eprint!("{prompt} (empty to cancel): ");
        let code = stdin
            .next_line()
            .await?
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty());
        state = flow.resume(code).await?.clone();
    }

    match state {
        LoginState::LoggedOn => {
            if let Some(name) = args.persona_name {
                session.set_persona_name(name).await?;
            }
            println!(
                "{} ({})",
                session.persona_name().unwrap_or_default(),
                session.persona_state()
            );
            for friend in session.roster().friends() {
                println!(
                    "  {:<20} {:<16} {}",
                    friend.persona_name(),
                    friend.persona_state().display_name(),
                    friend.id()
                );
            }
        }
        LoginState::Failed(failure) => error!("Login failed: {failure}"),
        other => error!("Login ended in {other:?}"),
    }

    session.stop().await;
    if let Some(dispatcher) = dispatcher {
        let _ = dispatcher.await;
    }
    Ok(())
}
