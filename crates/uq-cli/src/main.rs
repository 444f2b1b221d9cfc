mod host;
mod shell;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use uq_core::{CharClasses, Form, Ports, SECRET_KEY, Session};
use uq_store::Store;

use crate::host::{DEFAULT_URL, LocalSpawner, Osc52Clipboard, UrlQuery};

#[derive(Parser)]
#[command(name = "uq", about = "Derive per-site passwords from a master secret")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Address whose query parameters seed and record the inputs
    /// (defaults to UQ_URL, then uniqpass:///)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Directory holding the durable store (defaults to UQ_DATA_DIR, then ~/.uniqpass)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the password for a subject
    Derive(DeriveArgs),

    /// Interactive session reading commands from stdin
    Shell,

    /// Delete the remembered secret
    Forget,
}

#[derive(Args)]
struct DeriveArgs {
    /// Master secret (falls back to the remembered one)
    #[arg(long)]
    secret: Option<String>,

    /// Subject, usually a site name
    #[arg(long)]
    subject: Option<String>,

    /// Length limit; empty or unparseable means no truncation
    #[arg(long)]
    limit: Option<String>,

    /// Character classes to exclude: l, n, s, u (e.g. "ns")
    #[arg(long)]
    exclude: Option<String>,

    /// Remember the secret in the durable store
    #[arg(long, conflicts_with = "forget")]
    remember: bool,

    /// Stop remembering the secret
    #[arg(long)]
    forget: bool,

    /// Copy the result to the terminal clipboard (OSC 52)
    #[arg(long)]
    copy: bool,

    /// Print a JSON object instead of the bare password
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DeriveOutput<'a> {
    password: &'a str,
    url: &'a str,
    focus: &'a str,
}

/// A session wired to the terminal ports.
struct Host {
    form: Form,
    session: Session,
    query: Rc<UrlQuery>,
    spawner: Rc<LocalSpawner>,
}

fn open_store(cli: &Cli) -> Result<Store> {
    let path = uq_store::resolve_db_path(cli.data_dir.as_deref());
    Store::open(&path).with_context(|| format!("failed to open store at {}", path.display()))
}

fn resolve_url(cli: &Cli) -> String {
    cli.url
        .clone()
        .or_else(|| std::env::var("UQ_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string())
}

fn start_host(cli: &Cli) -> Result<Host> {
    let store = open_store(cli)?;
    let url = resolve_url(cli);
    let query = Rc::new(UrlQuery::parse(&url).with_context(|| format!("invalid url {url:?}"))?);
    let spawner = Rc::new(LocalSpawner::new());

    let form = Form::new();
    let ports = Ports {
        store: Rc::new(store),
        query: query.clone(),
        clipboard: Rc::new(Osc52Clipboard::stderr()),
        spawner: spawner.clone(),
    };
    let session = Session::start(&form, ports);

    Ok(Host {
        form,
        session,
        query,
        spawner,
    })
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Derivations are spawned with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            match &cli.command {
                Commands::Derive(args) => cmd_derive(&cli, args).await,
                Commands::Shell => cmd_shell(&cli).await,
                Commands::Forget => cmd_forget(&cli),
            }
        })
        .await
}

async fn cmd_derive(cli: &Cli, args: &DeriveArgs) -> Result<()> {
    let host = start_host(cli)?;
    let form = &host.form;

    if let Some(secret) = &args.secret {
        form.secret.edit(secret.clone());
    }
    if args.remember {
        form.remember.edit(true);
    } else if args.forget {
        form.remember.edit(false);
    }
    if let Some(subject) = &args.subject {
        form.subject.edit(subject.clone());
    }
    if let Some(limit) = &args.limit {
        form.limit.edit(limit.clone());
    }
    if let Some(code) = &args.exclude {
        form.exclude.edit(CharClasses::from_code(code));
    }

    host.spawner.drain().await;
    if args.copy {
        form.copy.fire();
    }

    let password = form.password.value();
    if args.json {
        let url = host.query.url();
        let output = DeriveOutput {
            password: &password,
            url: url.as_str(),
            focus: host.session.focus().as_str(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if password.is_empty() {
        eprintln!("nothing derived: both a secret and a subject are required");
    } else {
        println!("{password}");
    }
    Ok(())
}

async fn cmd_shell(cli: &Cli) -> Result<()> {
    let host = start_host(cli)?;
    shell::run(&host.session, &host.form, &host.query, &host.spawner).await
}

fn cmd_forget(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let removed = store
        .remove(SECRET_KEY)
        .context("failed to remove stored secret")?;
    let remaining = store.keys().context("failed to list stored keys")?;
    tracing::debug!(?remaining, "store keys after forget");

    if removed {
        println!("forgot stored secret");
    } else {
        println!("no stored secret");
    }
    Ok(())
}
