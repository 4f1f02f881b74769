use clap::{Parser, Subcommand};
use flowbridge::{Message, Middleware, Target};

#[derive(Parser)]
#[command(name = "flowbridge")]
#[command(about = "Flowbridge CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: FLOWBRIDGE_CONFIG_PATH or ~/.flowbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Send one message through the NLU backend and print the enriched message.
    Query {
        /// Config file path (default: FLOWBRIDGE_CONFIG_PATH or ~/.flowbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Backend session id. Derived from --user/--channel when omitted.
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Sender id placed on the message.
        #[arg(long, default_value = "cli")]
        user: String,

        /// Channel id placed on the message.
        #[arg(long, default_value = "cli")]
        channel: String,

        /// Action target to test after resolution (repeatable). Wrap in slashes for a regex: /^pick/
        #[arg(long = "action", value_name = "TARGET")]
        actions: Vec<String>,

        /// Intent target to test after resolution (repeatable). Same syntax as --action.
        #[arg(long = "intent", value_name = "TARGET")]
        intents: Vec<String>,

        /// Message text.
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("flowbridge {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Query {
            config,
            session,
            user,
            channel,
            actions,
            intents,
            text,
        }) => {
            let message = Message::new("direct_message", text)
                .with_user(user)
                .with_channel(channel);
            if let Err(e) = run_query(config, session, message, &actions, &intents).await {
                log::error!("query failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(flowbridge::config::default_config_path);
    let dir = flowbridge::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_query(
    config_path: Option<std::path::PathBuf>,
    session: Option<String>,
    mut message: Message,
    actions: &[String],
    intents: &[String],
) -> anyhow::Result<()> {
    let (config, path) = flowbridge::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let middleware = Middleware::from_config(&config.nlu)?;

    let enriched = match session {
        Some(id) => middleware.receive_with_session(&mut message, id).await?,
        None => middleware.receive(&mut message).await?,
    };
    println!("{}", serde_json::to_string_pretty(enriched)?);

    for raw in actions {
        let target = parse_target(raw)?;
        println!("action {}: {}", raw, middleware.action(target, &message));
    }
    for raw in intents {
        let target = parse_target(raw)?;
        println!("intent {}: {}", raw, middleware.hears(target, &message));
    }
    Ok(())
}

/// `/expr/` is a regex searched anywhere in the value; anything else is a whole-string name pattern.
fn parse_target(raw: &str) -> anyhow::Result<Target> {
    match raw
        .strip_prefix('/')
        .and_then(|s| s.strip_suffix('/'))
        .filter(|s| !s.is_empty())
    {
        Some(expr) => Ok(Target::Regex(regex::Regex::new(expr)?)),
        None => Ok(Target::from(raw)),
    }
}
