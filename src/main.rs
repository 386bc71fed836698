// Start of file: src/main.rs

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use blaze_thumb_bot::bot::{BotContext, BotRunner};
use blaze_thumb_bot::config::state::AppState;
use blaze_thumb_bot::core::{logging, server};
use blaze_thumb_bot::telegram::TelegramClient;
use blaze_thumb_bot::thumbnail::FfmpegTranscoder;

async fn run() -> anyhow::Result<()> {
    let state: AppState = AppState::from_env()?;
    let env = state.environment.clone();

    let api: TelegramClient = TelegramClient::from_env(&env)?;
    let transcoder: FfmpegTranscoder = FfmpegTranscoder::new(env.ffmpeg_bin.to_string());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // * Health server
    let listener: tokio::net::TcpListener = server::setup_listener(&env).await?;
    info!("Health server listening on: {}", listener.local_addr()?);

    let mut server_shutdown: watch::Receiver<bool> = shutdown_rx.clone();
    let app: axum::Router = server::create_app(state.clone());
    let health: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    // * Bot
    let ctx: BotContext = BotContext::new(Arc::new(api), Arc::new(transcoder), state);
    let mut bot: JoinHandle<anyhow::Result<()>> = tokio::spawn(BotRunner::new(ctx, shutdown_rx).start_bot());

    let bot_result: anyhow::Result<()> = tokio::select! {
        _ = server::shutdown_signal() => {
            let _ = shutdown_tx.send(true);
            (&mut bot).await?
        }
        result = &mut bot => {
            // ! The bot stopped on its own; take the health server down with it
            let _ = shutdown_tx.send(true);
            result?
        }
    };

    health.await??;
    bot_result
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

// End of file: src/main.rs
