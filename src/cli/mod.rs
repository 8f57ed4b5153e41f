pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "procure")]
#[command(about = "Procure - purchase request approval API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve {
        #[arg(long, help = "Port to listen on (defaults to API_PORT or the environment preset)")]
        port: Option<u16>,
        #[arg(long, help = "Use the in-memory store instead of Postgres")]
        memory: bool,
    },

    #[command(about = "Mint a signed bearer token for local testing")]
    Token {
        #[arg(long, help = "User id (random when omitted)")]
        user: Option<uuid::Uuid>,
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long = "role", help = "Role to grant; repeat for several")]
        roles: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { port, memory } => commands::serve::handle(port, memory).await,
        Commands::Token { user, name, roles } => {
            commands::token::handle(user, name, roles, output_format)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_accepts_repeated_roles() {
        let cli = Cli::parse_from([
            "procure", "--json", "token", "--name", "rita", "--role", "Requester", "--role", "Approver",
        ]);
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        match cli.command {
            Commands::Token { user, name, roles } => {
                assert!(user.is_none());
                assert_eq!(name, "rita");
                assert_eq!(roles, vec!["Requester", "Approver"]);
            }
            _ => panic!("expected token command"),
        }
    }

    #[test]
    fn serve_defaults_to_postgres() {
        let cli = Cli::parse_from(["procure", "serve", "--port", "8081"]);
        assert!(matches!(cli.command, Commands::Serve { port: Some(8081), memory: false }));
    }
}
