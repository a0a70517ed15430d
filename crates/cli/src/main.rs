use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "proactive")]
#[command(about = "Proactive messaging gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: PROACTIVE_CONFIG_PATH or ~/.proactive/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (inbound activities on /api/messages, proactive trigger on /api/notify).
    Gateway {
        /// Config file path (default: PROACTIVE_CONFIG_PATH or ~/.proactive/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 3978)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send a proactive message to a user through a running gateway.
    Notify {
        /// Config file path, used to find the gateway address (default: PROACTIVE_CONFIG_PATH or ~/.proactive/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Gateway base url (default: http://<gateway.bind>:<gateway.port>)
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// User id the conversation was registered under.
        #[arg(long, short)]
        user: String,

        /// Message text to deliver.
        #[arg(long, short)]
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("proactive {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Notify {
            config,
            url,
            user,
            message,
        }) => {
            if let Err(e) = run_notify(config, url, &user, &message).await {
                log::error!("notify failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(proactive::config::default_config_path);
    let dir = proactive::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _path) = proactive::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    proactive::gateway::run_gateway(config).await
}

/// Call GET /api/notify on the gateway and print the page it returns.
async fn run_notify(
    config_path: Option<std::path::PathBuf>,
    url: Option<String>,
    user: &str,
    message: &str,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let base = match url {
        Some(u) => u.trim_end_matches('/').to_string(),
        None => {
            let (config, _path) = proactive::config::load_config(config_path)?;
            format!("http://{}:{}", config.gateway.bind.trim(), config.gateway.port)
        }
    };
    let endpoint = format!("{}/api/notify", base);
    log::debug!("notify: calling {}", endpoint);
    let resp = reqwest::Client::new()
        .get(&endpoint)
        .query(&[("user", user), ("message", message)])
        .send()
        .await
        .with_context(|| format!("calling {}", endpoint))?;
    let status = resp.status();
    let body = resp.text().await.context("reading notify response")?;
    if !status.is_success() {
        anyhow::bail!("gateway returned {}: {}", status, body);
    }
    println!("{}", body);
    Ok(())
}
