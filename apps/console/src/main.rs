use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::VoteClient;
use shared::domain::ParticipantId;
use store::{HostedStore, RealtimeStore};
use tracing::info;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Cli {
    /// Hosted store base url; falls back to crowdvote.toml / APP__STORE_URL.
    #[arg(long)]
    store_url: Option<String>,
    /// Auth token appended to every store request.
    #[arg(long)]
    store_auth: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tail the scoreboard, reprinting on every snapshot.
    Scores,
    /// Cast a single vote for a participant.
    Vote { participant_id: String },
    /// Restrict the voting view to the listed participants.
    Revote { participant_ids: Vec<String> },
    /// Restore the voting view to the full collection.
    ClearRevote,
    /// Overwrite the mobile display selection, in the given order.
    Mobile { participant_ids: Vec<String> },
    /// Reset every known participant's votes to zero.
    Reset,
    /// Create a participant with a store-assigned id.
    Seed {
        name: String,
        #[arg(long)]
        picture: Option<String>,
    },
}

fn to_ids(raw: Vec<String>) -> Vec<ParticipantId> {
    raw.into_iter().map(ParticipantId::new).collect()
}

/// Ops that act on the last known collection need the first snapshot first.
async fn wait_for_participants(client: &mut VoteClient) -> Result<()> {
    while client.participants().is_none() {
        client.changed().await?;
    }
    Ok(())
}

fn print_scoreboard(client: &VoteClient) {
    let status = if client.voting_allowed() {
        "voting open"
    } else {
        "voting closed"
    };
    println!("--- scoreboard ({status}) ---");
    for (rank, participant) in client.scoreboard().iter().enumerate() {
        println!(
            "{:>2}. {:<24} {:>5}",
            rank + 1,
            participant.name,
            participant.votes
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let settings = load_settings();

    let store_url = cli
        .store_url
        .or(settings.store_url)
        .context("no store url configured; pass --store-url or set APP__STORE_URL")?;
    let auth = cli.store_auth.or(settings.store_auth);
    let store: Arc<dyn RealtimeStore> = Arc::new(HostedStore::new(&store_url, auth)?);
    let mut client = VoteClient::connect(store).await?;

    match cli.command {
        Command::Scores => {
            print_scoreboard(&client);
            loop {
                client.changed().await?;
                print_scoreboard(&client);
            }
        }
        Command::Vote { participant_id } => {
            wait_for_participants(&mut client).await?;
            client.cast_vote(&ParticipantId::new(participant_id)).await?;
            println!("vote recorded");
        }
        Command::Revote { participant_ids } => {
            client.set_revote_selection(&to_ids(participant_ids)).await?;
            println!("revote selection set");
        }
        Command::ClearRevote => {
            client.clear_revote_selection().await?;
            println!("all participants restored");
        }
        Command::Mobile { participant_ids } => {
            client.set_mobile_display(&to_ids(participant_ids)).await?;
            println!("mobile display selection set");
        }
        Command::Reset => {
            wait_for_participants(&mut client).await?;
            client.reset_all_votes().await?;
            println!("scores reset");
        }
        Command::Seed { name, picture } => {
            let id = client.add_participant(&name, picture.as_deref()).await?;
            info!(%id, "participant created");
            println!("created participant {id}");
        }
    }

    Ok(())
}
