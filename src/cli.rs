use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use log::info;
use moodtape::clients::{entities::Song, errors::Result};
use moodtape::config::ConfigBuilder;
use moodtape::server;

#[derive(Parser)]
#[command(name = "moodtape")]
#[command(version, about = "Turn a mood into a Deezer tracklist", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a mood once and print the songs
    Generate {
        mood: String,
        /// Print the songs as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { mood, json } => generate(&mood, json).await,
        Commands::Serve { bind } => {
            let mut builder = ConfigBuilder::new();
            if let Some(addr) = bind {
                builder = builder.bind_addr(addr);
            }
            server::serve(&builder.build()?).await
        }
    }
}

async fn generate(mood: &str, json: bool) -> Result<()> {
    info!("Building config ...");
    let config = ConfigBuilder::new().build()?;
    let resolver = config.resolver()?;
    let songs = server::generate_songs(&resolver, Some(mood)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&songs)?);
    } else {
        print_table(&songs);
    }
    Ok(())
}

fn print_table(songs: &[Song]) {
    if songs.is_empty() {
        println!("No tracks found for this mood");
        return;
    }
    for (i, song) in songs.iter().enumerate() {
        println!(
            "{:02}. {} - {} [{}] ({}:{:02})",
            i + 1,
            song.artist,
            song.title,
            song.album,
            song.duration / 60,
            song.duration % 60
        );
    }
}
