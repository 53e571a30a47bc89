use std::process::ExitCode;

use common::utils::logging::{init_logging, LogFormat};
use configs::ConfigSource;
use service::{runtime, User};
use tracing::{debug, error, info};
use uuid::Uuid;

const USAGE: &str = "usage: userdb <list | get <id> | create <email> <password-hash> | upgrade <id> | revoke <id>>";

#[derive(Debug, PartialEq)]
enum Command {
    List,
    Get(i64),
    Create { email: String, password_hash: String },
    Upgrade(i64),
    Revoke(i64),
}

fn parse_id(raw: Option<&String>) -> anyhow::Result<i64> {
    let raw = raw.ok_or_else(|| anyhow::anyhow!("missing id\n{USAGE}"))?;
    raw.parse::<i64>().map_err(|e| anyhow::anyhow!("invalid id `{raw}`: {e}"))
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args.first().map(String::as_str) {
        Some("list") => Ok(Command::List),
        Some("get") => Ok(Command::Get(parse_id(args.get(1))?)),
        Some("upgrade") => Ok(Command::Upgrade(parse_id(args.get(1))?)),
        Some("revoke") => Ok(Command::Revoke(parse_id(args.get(1))?)),
        Some("create") => match (args.get(1), args.get(2)) {
            (Some(email), Some(hash)) => Ok(Command::Create { email: email.clone(), password_hash: hash.clone() }),
            _ => Err(anyhow::anyhow!("create needs <email> <password-hash>\n{USAGE}")),
        },
        _ => Err(anyhow::anyhow!(USAGE)),
    }
}

/// One line per user; the password hash is never printed.
fn render(user: &User) -> String {
    format!(
        "{}\t{}\tred={}\ttoken={}",
        user.id,
        user.email,
        user.is_chirpy_red,
        if user.refresh_token.is_empty() { "-" } else { "set" }
    )
}

async fn run(cfg: configs::AppConfig, cmd: Command) -> anyhow::Result<()> {
    let store = runtime::open_store(&cfg.storage).await?;
    match cmd {
        Command::List => {
            for user in store.list_all().await? {
                println!("{}", render(&user));
            }
        }
        Command::Get(id) => println!("{}", render(&store.get_by_id(id).await?)),
        Command::Create { email, password_hash } => {
            let user = store.create(&email, password_hash.as_bytes()).await?;
            info!(id = user.id, "user created");
            println!("{}", render(&user));
        }
        Command::Upgrade(id) => {
            store.upgrade(id).await?;
            info!(id, "user upgraded");
        }
        Command::Revoke(id) => {
            store.revoke_refresh_token(id).await?;
            info!(id, "refresh token revoked");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let (cfg, source) = match configs::AppConfig::load_and_validate() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(LogFormat::parse(&cfg.logging.format));
    match &source {
        ConfigSource::File => debug!(event = "config_loaded", "configuration read from file"),
        ConfigSource::Environment { reason } => {
            debug!(event = "config_fallback", %reason, "no config file; using environment")
        }
    }

    let run_id = Uuid::new_v4();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cmd = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(event = "start", %run_id, path = %cfg.storage.path.display(), ?cmd, "userdb starting");
    match rt.block_on(run(cfg, cmd)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "run_failed", %run_id, error = %e, "command failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
