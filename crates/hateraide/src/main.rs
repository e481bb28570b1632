use clap::Parser;
use hateraide::channel::{ListenerResult, ModerationChannel};
use hateraide::common::websocket::tungstenite_client::TungsteniteClient;
use hateraide::config::{Config, Endpoints};
use hateraide::moderation::{ModerationAction, ModerationStore, check_health, fetch_feed};
use hateraide::view::{FeedView, Presentation};
use miette::IntoDiagnostic;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "HaterAide - live moderation client demo")]
struct Args {
    /// KDL config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend origin; derives every endpoint (e.g. http://localhost:8000)
    #[arg(long)]
    base: Option<Url>,

    /// WebSocket push endpoint
    #[arg(long)]
    push: Option<Url>,

    /// Batch analysis payload URL
    #[arg(long)]
    analysis: Option<Url>,

    /// Applied-actions snapshot URL
    #[arg(long)]
    snapshot: Option<Url>,

    /// Delay between reconnect attempts, in milliseconds
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,

    /// Print decisions and exit instead of following live updates
    #[arg(long)]
    once: bool,
}

impl Args {
    fn into_config(self) -> miette::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(base) = &self.base {
            config.endpoints = Endpoints::from_base(base)?;
        }
        if let Some(push) = self.push {
            config.endpoints.push = push;
        }
        if let Some(analysis) = self.analysis {
            config.endpoints.analysis = analysis;
        }
        if let Some(snapshot) = self.snapshot {
            config.endpoints.snapshot = snapshot;
        }
        if let Some(ms) = self.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let once = args.once;
    let config = args.into_config()?;

    let http = reqwest::Client::new();
    match check_health(&http, &config.endpoints.health).await {
        Ok(true) => tracing::info!("backend healthy"),
        Ok(false) => tracing::warn!("backend reports unhealthy"),
        Err(e) => tracing::warn!(error = %e, "backend health check failed"),
    }

    let channel = ModerationChannel::new(
        TungsteniteClient::new(),
        config.endpoints.push.clone(),
        config.channel_options(),
    );
    let store = ModerationStore::new(
        http.clone(),
        config.endpoints.analysis.clone(),
        config.endpoints.snapshot.clone(),
    );

    let feed = fetch_feed(&http, &config.endpoints.feed).await?;
    store.register_content(feed.replies());

    let report = store.activate(&channel).await;
    if !report.is_complete() {
        tracing::warn!("starting with partial moderation data");
    }

    let view = FeedView::new();
    for post in &feed.posts {
        println!("post {} by {}", post.id, post.author.name);
        for reply in &post.replies {
            let star = if store.is_author_important(&reply.id) { "*" } else { " " };
            match view.presentation(&store, reply) {
                Presentation::Show => println!(" {star} {}: {}", reply.id, reply.content),
                Presentation::Blurred { reason, warning } => {
                    println!(" {star} {}: [blurred] {warning} ({reason})", reply.id)
                }
                Presentation::Hidden { reason } => {
                    println!(" {star} {}: [hidden] {reason}", reply.id)
                }
                Presentation::Revealed { .. } => {
                    println!(" {star} {}: {}", reply.id, reply.content)
                }
            }
        }
    }

    if !once {
        channel.subscribe("printer", |action: &ModerationAction| -> ListenerResult {
            println!("live: {} -> {} ({})", action.item_id, action.action_type, action.reason);
            Ok(())
        });
        println!("\nfollowing live moderation, ctrl-c to stop");
        tokio::signal::ctrl_c().await.into_diagnostic()?;
    }

    store.deactivate(&channel);
    channel.disconnect();
    Ok(())
}
