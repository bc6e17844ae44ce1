use admin_realtime::{ConnectionState, EventKind, RealtimeChannel, RealtimeChannelOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // RUST_LOG=admin_realtime=debug for lifecycle details
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let channel = RealtimeChannel::new(RealtimeChannelOptions::from_env())?;
    println!("📡 Admin feed endpoint: {}\n", channel.endpoint()?);

    // Callback subscriptions for catalog changes
    for kind in [
        EventKind::ProductCreated,
        EventKind::ProductUpdated,
        EventKind::ProductDeleted,
        EventKind::ProductVisibilityChanged,
        EventKind::CategoryChanged,
    ] {
        let label = kind.to_string();
        channel.on(kind, move |payload| {
            println!("🛒 {}: {}", label, serde_json::Value::Object(payload.clone()));
        });
    }

    // Stream subscription for orders
    let mut orders = channel.subscribe(EventKind::NewOrder);
    let order_feed = tokio::spawn(async move {
        while let Some(order) = orders.recv().await {
            let id = order
                .get("id")
                .map_or_else(|| "?".to_string(), |id| id.to_string());
            println!("📦 New order #{}", id);
        }
    });

    // Lifecycle transitions
    let mut states = channel.watch_state();
    let lifecycle = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            println!("🔌 {:?}", state);
            if state == ConnectionState::Closed {
                println!("   (automatic reconnection handles drops)");
            }
        }
    });

    let greeter = channel.clone();
    channel.connect_then(move || {
        println!("✅ Connected! Announcing dashboard session");
        greeter.send_json(&serde_json::json!({"type": "dashboard_hello"}));
    });

    println!("Press Ctrl+C to stop\n");
    tokio::signal::ctrl_c().await?;

    println!("\nDisconnecting...");
    channel.disconnect();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    order_feed.abort();
    lifecycle.abort();
    println!("Disconnected!");

    Ok(())
}
