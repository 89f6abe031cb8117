use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use lobby_client::api::ws_url;
use lobby_client::protocol::LobbySnapshot;
use lobby_client::{
    CreateLobbyRequest, GlobalSearch, HttpLobbyApi, HttpSearchApi, LobbyApi, LobbySync,
    LobbySyncConfig, PushChannel, PushChannelConfig, SearchApi,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing player id; pass --player-id or set LOBBY_PLAYER_ID")]
    MissingPlayerId,
    #[error(transparent)]
    Client(#[from] lobby_client::ClientError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("lobby action failed: {0}")]
    Action(String),
}

#[derive(Parser, Debug)]
#[command(name = "lobby-cli", about = "Lobby API and realtime sync CLI")]
struct Cli {
    #[arg(long, env = "LOBBY_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    #[arg(long, env = "LOBBY_PLAYER_ID")]
    player_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    player_id: Option<String>,
}

impl CliContext {
    fn player_id(&self) -> Result<&str, CliError> {
        self.player_id.as_deref().ok_or(CliError::MissingPlayerId)
    }

    fn api(&self) -> Arc<dyn LobbyApi> {
        Arc::new(HttpLobbyApi::new(&self.base_url))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a lobby and print the assigned snapshot.
    Create(CreateArgs),
    /// Join a lobby.
    Join {
        lobby_id: String,
        #[arg(long)]
        mmr: Option<u32>,
    },
    /// Leave a lobby.
    Leave { lobby_id: String },
    /// Set the local player's ready flag.
    Ready {
        lobby_id: String,
        #[arg(long, default_value_t = true)]
        ready: bool,
    },
    /// Start the match (host only).
    Start { lobby_id: String },
    /// Cancel a lobby.
    Cancel { lobby_id: String },
    /// Fetch one lobby snapshot.
    Get { lobby_id: String },
    /// List open lobbies.
    List,
    /// Show aggregate lobby counters.
    Stats,
    /// Search players, teams, and tournaments.
    Search { query: String },
    /// Follow a lobby over WebSocket with polling fallback until it ends.
    Watch { lobby_id: String },
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long, default_value_t = 2)]
    min_players: u32,

    #[arg(long, default_value_t = false)]
    ready_check: bool,

    #[arg(long)]
    game_mode: Option<String>,

    #[arg(long)]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, player_id: cli.player_id };

    match cli.command {
        Command::Create(args) => run_create(&ctx, args).await,
        Command::Join { lobby_id, mmr } => run_join(&ctx, &lobby_id, mmr).await,
        Command::Leave { lobby_id } => run_leave(&ctx, &lobby_id).await,
        Command::Ready { lobby_id, ready } => run_ready(&ctx, &lobby_id, ready).await,
        Command::Start { lobby_id } => run_start(&ctx, &lobby_id).await,
        Command::Cancel { lobby_id } => run_cancel(&ctx, &lobby_id).await,
        Command::Get { lobby_id } => run_get(&ctx, &lobby_id).await,
        Command::List => run_list(&ctx).await,
        Command::Stats => run_stats(&ctx).await,
        Command::Search { query } => run_search(&ctx, &query).await,
        Command::Watch { lobby_id } => run_watch(&ctx, &lobby_id).await,
    }
}

async fn run_create(ctx: &CliContext, args: CreateArgs) -> Result<(), CliError> {
    let request = CreateLobbyRequest {
        creator_id: ctx.player_id()?.to_owned(),
        min_players: args.min_players,
        requires_ready_check: args.ready_check,
        game_mode: args.game_mode,
        region: args.region,
    };
    let snapshot = ctx.api().create(&request).await?;
    print_json(&snapshot)
}

async fn run_join(ctx: &CliContext, lobby_id: &str, mmr: Option<u32>) -> Result<(), CliError> {
    let player_id = ctx.player_id()?.to_owned();
    let snapshot = ctx.api().join(lobby_id, &player_id, mmr).await?;
    print_json(&snapshot)
}

async fn run_leave(ctx: &CliContext, lobby_id: &str) -> Result<(), CliError> {
    let player_id = ctx.player_id()?.to_owned();
    ctx.api().leave(lobby_id, &player_id).await?;
    println!("left {lobby_id}");
    Ok(())
}

async fn run_ready(ctx: &CliContext, lobby_id: &str, ready: bool) -> Result<(), CliError> {
    let player_id = ctx.player_id()?.to_owned();
    let snapshot = ctx.api().set_ready(lobby_id, &player_id, ready).await?;
    print_json(&snapshot)
}

async fn run_start(ctx: &CliContext, lobby_id: &str) -> Result<(), CliError> {
    let snapshot = ctx.api().start(lobby_id).await?;
    print_json(&snapshot)
}

async fn run_cancel(ctx: &CliContext, lobby_id: &str) -> Result<(), CliError> {
    ctx.api().cancel(lobby_id).await?;
    println!("cancelled {lobby_id}");
    Ok(())
}

async fn run_get(ctx: &CliContext, lobby_id: &str) -> Result<(), CliError> {
    match ctx.api().get(lobby_id).await? {
        Some(snapshot) => print_json(&snapshot),
        None => {
            println!("lobby {lobby_id} not found");
            Ok(())
        }
    }
}

async fn run_list(ctx: &CliContext) -> Result<(), CliError> {
    let lobbies = ctx.api().list().await?;
    print_json(&lobbies)
}

async fn run_stats(ctx: &CliContext) -> Result<(), CliError> {
    let stats = ctx.api().stats().await?;
    print_json(&stats)
}

async fn run_search(ctx: &CliContext, query: &str) -> Result<(), CliError> {
    let api: Arc<dyn SearchApi> = Arc::new(HttpSearchApi::new(&ctx.base_url));
    let search = GlobalSearch::new(api);
    search.search(query).await;
    print_json(&search.results())
}

/// Mirror one lobby until it reaches a terminal status, printing each adopted
/// snapshot. Push updates arrive over the WebSocket; the poller catches
/// anything the push channel drops.
async fn run_watch(ctx: &CliContext, lobby_id: &str) -> Result<(), CliError> {
    let player_id = ctx.player_id()?.to_owned();
    let sync = LobbySync::new(ctx.api(), LobbySyncConfig::new(player_id));
    let (channel, mut events) = PushChannel::start(PushChannelConfig::new(ws_url(&ctx.base_url)?));

    channel.subscribe(lobby_id);
    sync.subscribe(lobby_id);

    let mut last_printed: Option<LobbySnapshot> = None;
    let outcome = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(message) => sync.apply_push(&message),
                None => break Ok(()),
            },
            () = tokio::time::sleep(Duration::from_millis(500)) => {}
        }

        if let Some(error) = sync.error() {
            break Err(CliError::Action(error));
        }

        let snapshot = sync.snapshot();
        if snapshot != last_printed {
            if let Some(current) = &snapshot {
                print_json(current)?;
                let view = sync.view();
                eprintln!(
                    "players={} ready={} host={} can_start={} connection={:?}",
                    view.player_count,
                    view.ready_count,
                    view.is_host,
                    view.can_start,
                    channel.state(),
                );
                if current.status.is_terminal() {
                    break Ok(());
                }
            }
            last_printed = snapshot;
        }
    };

    sync.unsubscribe();
    channel.disconnect();
    outcome
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
