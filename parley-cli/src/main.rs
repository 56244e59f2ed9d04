use clap::{Parser, Subcommand};
use parley_a2a::{A2aError, AgentClient, AgentServer, ClientConfig, Dispatcher, TaskStore};
use parley_agents::{AgentKind, CalculatorAgent, OrchestratorAgent, TranslatorAgent};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod shutdown;

use config::{AgentConfig, AgentConfigBuilder, ConfigError, LogFormat};
use shutdown::shutdown_signal;

#[derive(Parser, Debug)]
#[command(name = "parley", version)]
#[command(about = "Parley - agent-to-agent protocol runtime and demo agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an agent until interrupted
    Serve {
        /// Agent to run (calculator, translator, orchestrator)
        kind: AgentKind,
        /// Interface to bind (overrides PARLEY_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides PARLEY_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Peer base URL for the orchestrator; repeatable (overrides PARLEY_PEERS)
        #[arg(long = "peer")]
        peers: Vec<String>,
        /// Timeout for calls to peers in seconds (overrides PARLEY_REQUEST_TIMEOUT_SECS)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Print an agent's card
    Card {
        /// Agent base URL
        url: String,
    },
    /// Send one message and print the agent's reply
    Chat {
        /// Agent base URL
        url: String,
        /// Message text
        text: String,
        /// Continue an existing task instead of creating one
        #[arg(long)]
        task_id: Option<String>,
    },
    /// List an agent's tasks
    Tasks {
        /// Agent base URL
        url: String,
    },
    /// Print one task with its full history
    Task {
        /// Agent base URL
        url: String,
        /// Task identifier
        task_id: String,
    },
    /// Probe an agent's health endpoint
    Health {
        /// Agent base URL
        url: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] A2aError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let builder = match AgentConfigBuilder::from_env() {
        Ok(builder) => builder,
        Err(e) => {
            init_tracing(LogFormat::default());
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };
    init_tracing(builder.current_log_format());

    if let Err(e) = run(cli.command, builder).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

async fn run(command: Commands, builder: AgentConfigBuilder) -> Result<(), CliError> {
    let client = || -> Result<AgentClient, CliError> {
        let timeout = builder.client_timeout()?;
        Ok(AgentClient::new(
            ClientConfig::default().with_timeout(timeout),
        )?)
    };

    match command {
        Commands::Serve {
            kind,
            host,
            port,
            peers,
            timeout_secs,
        } => {
            let mut builder = builder.clone();
            if let Some(host) = host {
                builder = builder.host(host);
            }
            if let Some(port) = port {
                builder = builder.port(port);
            }
            if !peers.is_empty() {
                builder = builder.peers(peers);
            }
            if let Some(timeout) = timeout_secs {
                builder = builder.request_timeout_secs(timeout);
            }
            serve(builder.build(kind)?).await
        }
        Commands::Card { url } => print_json(&client()?.fetch_agent_card(&url).await?),
        Commands::Chat { url, text, task_id } => {
            let client = client()?;
            let reply = match task_id {
                Some(task_id) => client.chat_in_task(&url, &task_id, &text).await?,
                None => client.chat(&url, &text).await?,
            };
            println!("{reply}");
            Ok(())
        }
        Commands::Tasks { url } => print_json(&client()?.list_tasks(&url).await?),
        Commands::Task { url, task_id } => print_json(&client()?.get_task(&url, &task_id).await?),
        Commands::Health { url } => print_json(&client()?.health(&url).await?),
    }
}

async fn serve(config: AgentConfig) -> Result<(), CliError> {
    let address = config.bind_address();
    let url = config.public_url();
    tracing::info!(
        kind = %config.kind,
        address = %address,
        url = %url,
        timeout_secs = config.request_timeout.as_secs(),
        "Starting agent"
    );

    match config.kind {
        AgentKind::Calculator => {
            AgentServer::new(CalculatorAgent::new(url))
                .serve_with_shutdown(&address, shutdown_signal())
                .await?
        }
        AgentKind::Translator => {
            AgentServer::new(TranslatorAgent::new(url))
                .serve_with_shutdown(&address, shutdown_signal())
                .await?
        }
        AgentKind::Orchestrator => {
            let client =
                AgentClient::new(ClientConfig::default().with_timeout(config.request_timeout))?;
            let agent = OrchestratorAgent::new(url, Arc::new(client));
            agent.register_peers(&config.peers).await;

            let registry = agent.registry();
            let dispatcher = Dispatcher::with_registry(agent, Arc::new(TaskStore::new()), registry);
            AgentServer::from_dispatcher(dispatcher)
                .serve_with_shutdown(&address, shutdown_signal())
                .await?
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "parley",
            "serve",
            "orchestrator",
            "--port",
            "6003",
            "--peer",
            "http://localhost:5001",
            "--peer",
            "http://localhost:5002",
        ])
        .unwrap();
        let Commands::Serve {
            kind, port, peers, ..
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(kind, AgentKind::Orchestrator);
        assert_eq!(port, Some(6003));
        assert_eq!(peers.len(), 2);
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["parley", "serve", "weather"]).is_err());
    }

    #[test]
    fn test_parse_chat_with_task() {
        let cli = Cli::try_parse_from([
            "parley",
            "chat",
            "http://localhost:5001",
            "25 * 4",
            "--task-id",
            "abc",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Chat { task_id: Some(ref id), .. } if id == "abc"
        ));
    }
}
