//! Spellbook Engine - renders one actor's spellbook from a world snapshot.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spellbook_domain::ActorId;
use spellbook_engine::infrastructure::memory::InMemoryHost;
use spellbook_engine::use_cases::SpellbookState;
use spellbook_engine::{App, SpellbookWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spellbook_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let snapshot = std::env::var("SPELLBOOK_SNAPSHOT").context("SPELLBOOK_SNAPSHOT is not set")?;
    let actor_id = std::env::var("SPELLBOOK_ACTOR").context("SPELLBOOK_ACTOR is not set")?;

    tracing::info!(snapshot = %snapshot, actor_id = %actor_id, "Loading world snapshot");
    let host = Arc::new(
        InMemoryHost::load(&snapshot)
            .await
            .with_context(|| format!("loading snapshot {snapshot}"))?,
    );
    let app = Arc::new(App::in_memory(host).await?);

    let state = SpellbookState::open(app, ActorId::new(actor_id)).await?;
    let (handle, task) = SpellbookWorker::spawn(state);

    let view = handle.current();
    println!("{}", serde_json::to_string_pretty(&view)?);

    drop(handle);
    task.await?;
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Local overrides win
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
