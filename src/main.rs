mod config;
mod frame;
mod room;
mod routes;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("invalid configuration");
    let addr = config.bind_addr();
    tracing::info!(
        client_channel_capacity = config.client_channel_capacity,
        room_queue_capacity = config.room_queue_capacity,
        max_stroke_points = config.max_stroke_points,
        "configuration loaded"
    );

    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "sketchroom listening");
    axum::serve(listener, app).await.expect("server failed");
}
