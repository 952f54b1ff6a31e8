/// Histor Player - drives the audio task against the simulated decoder
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crate::config::PlayerConfig;
use histor_audio::{AudioTask, SimulatedDecoder};
use histor_core::FileStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "histor-player")]
#[command(about = "Histor Radio audio task driver", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./histor.toml when present)
    #[arg(short, long, global = true, env = "HISTOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the beep and switch stations, printing every response
    Demo {
        /// Station to switch to
        #[arg(short, long)]
        station: Option<String>,
        /// Volume for the new station (0-21)
        #[arg(short, long)]
        volume: Option<u8>,
    },
    /// Query run-state, volume and elapsed time
    Status,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "histor=info,histor_audio=info,histor_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = PlayerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo { station, volume } => {
            if let Some(station) = station {
                config.station.url = station;
            }
            if let Some(volume) = volume {
                config.station.volume = volume;
            }
            config.validate()?;
            demo(&config)?;
        }
        Commands::Status => {
            config.validate()?;
            status(&config)?;
        }
    }

    Ok(())
}

fn spawn_task(config: &PlayerConfig) -> anyhow::Result<AudioTask> {
    let decoder = SimulatedDecoder::new().with_file(
        FileStore::Internal,
        config.station.beep_path.clone(),
        config.station.beep_bytes,
    );

    AudioTask::builder()
        .config(config.audio.clone())
        .client_config(config.client.clone())
        .on_run_state(|running: bool| {
            let state = if running { "started" } else { "stopped" };
            tracing::info!(target: "histor::player", "Audio {}", state);
        })
        .spawn(decoder)
        .context("Failed to start audio task")
}

fn demo(config: &PlayerConfig) -> anyhow::Result<()> {
    let station = &config.station;
    tracing::info!("Switching {} -> {}", station.from_url, station.url);

    let task = spawn_task(config)?;
    let client = task.client();

    println!(
        "connect {:<32} -> {}",
        station.from_url,
        client.connect_to_host(&station.from_url)?
    );
    println!("set volume {:<29} -> {}", 10, client.set_volume(10)?);
    println!(
        "prepare beep {:<27} -> {}",
        station.beep_path,
        client.stop_station_prepare_beep(&station.beep_path)?
    );
    println!(
        "change station {:<25} -> {}",
        station.url,
        client.change_station(&station.url, station.volume)?
    );

    let switched = client.wait_station_switch(Duration::from_secs(station.switch_timeout_secs))?;
    println!("station switch {:<25} -> {}", "", switched);
    println!("running {:<32} -> {}", "", client.is_running()?);
    println!("volume {:<33} -> {}", "", client.volume()?);
    println!("elapsed {:<32} -> {}s", "", client.elapsed_time()?);
    println!("stop {:<35} -> {}s", "", client.stop_song()?);

    task.shutdown()?;

    if !switched {
        anyhow::bail!("Station {} did not connect", station.url);
    }
    Ok(())
}

fn status(config: &PlayerConfig) -> anyhow::Result<()> {
    let task = spawn_task(config)?;
    let client = task.client();

    println!("running: {}", client.is_running()?);
    println!("volume:  {}", client.volume()?);
    println!("elapsed: {}s", client.elapsed_time()?);

    task.shutdown()?;
    Ok(())
}
