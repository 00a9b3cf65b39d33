use framecast_client::config::Config;
use framecast_client::sync::SyncEvent;
use framecast_client::viewer::Viewer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framecast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: api={}, channel={}",
        config.api_base_url, config.channel_url
    );

    let user_name = std::env::var("FRAMECAST_USER")
        .map_err(|_| anyhow::anyhow!("FRAMECAST_USER must be set to the viewer identity"))?;

    let mut viewer = Viewer::bootstrap(&config, &user_name).await?;
    info!(
        user = %user_name,
        overlays = viewer.snapshot().len(),
        "bootstrap complete"
    );

    let mut frames = viewer.frames();
    if frames.is_none() {
        warn!("frame channel is down; showing no feed until reconnected");
    }

    // Headless run loop: report frames and save outcomes until ctrl-c
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            changed = async {
                match frames.as_mut() {
                    Some(rx) => rx.changed().await,
                    // No channel: wait forever on this arm
                    None => std::future::pending().await,
                }
            } => {
                match changed {
                    Ok(()) => {
                        if let Some(rx) = frames.as_ref()
                            && let Some(frame) = rx.borrow().clone()
                        {
                            info!(sid = %frame.sid, bytes = frame.data.len(), "frame");
                        }
                    }
                    Err(_) => {
                        warn!("frame channel dropped; reconnect with connect_channel");
                        frames = None;
                    }
                }
            }
            event = viewer.next_sync_event() => {
                match event {
                    Some(SyncEvent::Saved { rev }) => info!(rev, "overlay collection saved"),
                    Some(SyncEvent::SaveFailed { rev, error }) => {
                        warn!(rev, %error, "overlay save failed; edits stay local")
                    }
                    None => {}
                }
            }
        }
    }

    viewer.shutdown().await;
    Ok(())
}
