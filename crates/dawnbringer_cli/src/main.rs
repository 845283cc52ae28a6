//! Operator CLI over the account service.
//!
//! # Responsibility
//! - Map subcommands onto `AccountService` use-cases.
//! - Read request JSON from a file or stdin and print results as JSON.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use dawnbringer_core::db::open_db;
use dawnbringer_core::{
    default_log_level, init_logging, AccountCreateRequest, AccountService,
    AccountUpdateRequest,
};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "dawnbringer", version, about = "Account management CLI")]
struct CliArgs {
    /// Path of the SQLite account database.
    #[clap(long, env = "DAWNBRINGER_DB", value_parser = parse_path)]
    db: PathBuf,

    /// Directory for rolling log files. Logging is off when unset.
    #[clap(long, env = "DAWNBRINGER_LOG_DIR", value_parser = parse_path)]
    log_dir: Option<PathBuf>,

    #[clap(long, env = "DAWNBRINGER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates an account and its children from a JSON request.
    /// Pass `-` to read the request from stdin.
    Create { request: String },

    /// Updates an account from a JSON request. Child relations that are
    /// present in the request are synchronized to exactly the given entries.
    Update { id: i64, request: String },

    /// Shows the full profile of an account, including soft-deleted ones.
    Show { id: i64 },

    /// Lists accounts, newest first.
    List {
        #[clap(long)]
        limit: Option<u32>,
        #[clap(long, default_value_t = 0)]
        offset: u32,
        #[clap(long)]
        include_deleted: bool,
    },

    /// Shows the avatar attachments of an account.
    Avatar { id: i64 },

    /// Marks an account deleted. With `--hard` the row and all of its
    /// children are removed.
    Delete {
        id: i64,
        #[clap(long)]
        hard: bool,
    },
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    if let Some(log_dir) = &args.log_dir {
        let level = resolve_log_level(args.log_level.as_deref());
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| anyhow!("log directory is not valid UTF-8"))?;
        init_logging(level, log_dir).map_err(|err| anyhow!(err))?;
    }

    let mut conn = open_db(&args.db)
        .with_context(|| format!("failed to open database {}", args.db.display()))?;
    let mut service = AccountService::try_new(&mut conn)?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&args.command)
    );

    match args.command {
        Command::Create { request } => {
            let request: AccountCreateRequest = read_request(&request)?;
            print_json(&service.create_account(&request)?)
        }
        Command::Update { id, request } => {
            let request: AccountUpdateRequest = read_request(&request)?;
            print_json(&service.update_account(id, &request)?)
        }
        Command::Show { id } => match service.get_account_profile(id)? {
            Some(profile) => print_json(&profile),
            None => bail!("account {id} not found"),
        },
        Command::List {
            limit,
            offset,
            include_deleted,
        } => print_json(&service.list_accounts(include_deleted, limit, offset)?),
        Command::Avatar { id } => match service.get_account_avatar(id)? {
            Some(avatar) => print_json(&avatar),
            None => bail!("account {id} not found"),
        },
        Command::Delete { id, hard } => {
            if hard {
                service.delete_account(id)?;
            } else {
                service.soft_delete_account(id)?;
            }
            print_json(&serde_json::json!({ "id": id, "hard": hard, "deleted": true }))
        }
    }
}

fn resolve_log_level(requested: Option<&str>) -> &str {
    requested.unwrap_or(default_log_level())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Create { .. } => "create",
        Command::Update { .. } => "update",
        Command::Show { .. } => "show",
        Command::List { .. } => "list",
        Command::Avatar { .. } => "avatar",
        Command::Delete { .. } => "delete",
    }
}

fn read_request<T: DeserializeOwned>(source: &str) -> Result<T> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read request from stdin")?;
        buffer
    } else {
        let path = Path::new(source);
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display()))?
    };
    serde_json::from_str(&raw).context("request is not valid JSON for this command")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
