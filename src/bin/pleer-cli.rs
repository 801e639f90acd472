//! Command-line client for a PLEER server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pleer::client::{play_route, ApiClient, ClientError};

#[derive(Parser)]
#[command(name = "pleer-cli")]
#[command(about = "Upload and browse audio on a PLEER server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server base URL
    #[arg(long, short = 's', env = "PLEER_SERVER", default_value = "http://localhost:3000", global = true)]
    server: String,

    /// Access token for mutating commands
    #[arg(long, env = "PLEER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print an access token to export as PLEER_TOKEN
    Login {
        /// Username
        #[arg(long, short = 'u')]
        username: String,

        /// Password
        #[arg(long, short = 'p', env = "PLEER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List directories
    Dirs,
    /// List files, all of them or those of one directory
    Ls {
        /// Directory name
        directory: Option<String>,
    },
    /// Create a directory
    Mkdir {
        /// Directory name
        name: String,
    },
    /// Delete a directory and its files
    Rmdir {
        /// Directory name
        name: String,
    },
    /// Upload audio files
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target directory (uploads root when omitted)
        #[arg(long, short = 'd')]
        dir: Option<String>,
    },
    /// Delete a file
    Rm {
        /// File identifier (`name` or `directory/name`)
        identifier: String,
    },
    /// Move a file to another directory
    Mv {
        /// File identifier (`name` or `directory/name`)
        identifier: String,

        /// Target directory (uploads root when omitted)
        target: Option<String>,
    },
    /// Pick a random track from a directory
    Random {
        /// Directory name
        directory: String,
    },
    /// Print the player route and file URL of a file
    PlayUrl {
        /// File identifier (`name` or `directory/name`)
        identifier: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let mut client = ApiClient::new(&cli.server)?;
    client.set_token(cli.token);

    match cli.command {
        Commands::Login { username, password } => {
            let response = client.login(&username, &password).await?;
            eprintln!(
                "Signed in as {} ({}), token valid for {}s",
                response.user.username, response.user.role, response.expires_in
            );
            println!("{}", response.access_token);
        }
        Commands::Dirs => {
            for directory in client.list_directories().await? {
                println!("{}", directory);
            }
        }
        Commands::Ls { directory } => {
            for file in client.list_files(directory.as_deref()).await? {
                println!("{}", file);
            }
        }
        Commands::Mkdir { name } => {
            println!("{}", client.create_directory(&name).await?.message);
        }
        Commands::Rmdir { name } => {
            println!("{}", client.delete_directory(&name).await?.message);
        }
        Commands::Upload { files, dir } => {
            let response = client.upload(&files, dir.as_deref()).await?;
            for file in &response.uploaded_files {
                println!("{}\t{}\t{}", file.path, file.original_name, file.url);
            }
        }
        Commands::Rm { identifier } => {
            println!("{}", client.delete_file(&identifier).await?.message);
        }
        Commands::Mv { identifier, target } => {
            let response = client
                .move_file(&identifier, None, target.as_deref())
                .await?;
            println!("{}: {}", response.message, response.path);
        }
        Commands::Random { directory } => {
            let track = client.random_audio(&directory).await?;
            println!("{}\t{}", track.file_name, track.audio_url);
        }
        Commands::PlayUrl { identifier } => {
            let route = play_route(&identifier);
            let page = client.base_url().join(route.trim_start_matches('/'))?;
            println!("{}", page);
            println!("{}", client.file_url(&identifier)?);
        }
    }

    Ok(())
}
