mod config;
mod fetch;
mod logging;
mod photo;
mod store;
mod ui;
mod user;

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use config::{ApiConfig, Config};
use fetch::UserSource;
use logging::LogTarget;
use photo::PhotoWorker;
use store::UserStore;
use ui::modal::{ModalController, CONTACT_ROWS};
use ui::session::{Action, Session};
use user::User;

#[derive(Parser, Debug)]
#[command(name = "userdeck", version, about = "Browse a gallery of random users in the terminal")]
struct Cli {
    /// Configuration file (defaults to the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read a saved API response instead of calling the API
    #[arg(long, global = true, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Number of users to request
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    results: Option<u32>,

    /// Nationality filter passed to the API (e.g. us, gb)
    #[arg(long, global = true, value_name = "CODE")]
    nat: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the gallery cards, one per line
    List(ListArgs),
    /// Print the details of one user; the index wraps around
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only list users whose first or last name contains this text
    #[arg(long, short)]
    query: Option<String>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[arg(allow_negative_numbers = true)]
    index: isize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = if cli.command.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    let log_path = logging::init(target)?;

    let config = config::load(cli.config.as_deref())?;
    let source = user_source(&cli, &config);

    match cli.command {
        Some(Command::List(args)) => handle_list(&source, args),
        Some(Command::Show(args)) => handle_show(&source, args),
        None => {
            if let Some(path) = log_path {
                tracing::info!(
                    log = %path.display(),
                    config = %config.origin(),
                    source = %source.describe(),
                    "starting gallery"
                );
            }
            run_gallery(&config, source)
        }
    }
}

/// Command line options win over the config file.
fn user_source(cli: &Cli, config: &Config) -> UserSource {
    if let Some(path) = &cli.source {
        return UserSource::File(path.clone());
    }
    let api = &config.api;
    UserSource::Api(ApiConfig {
        url: api.url.clone(),
        results: cli.results.unwrap_or(api.results),
        nationality: cli.nat.clone().or_else(|| api.nationality.clone()),
    })
}

fn load_users(source: &UserSource) -> Result<Vec<User>> {
    fetch::fetch_users(source)
        .with_context(|| format!("failed to load users from {}", source.describe()))
}

fn run_gallery(config: &Config, source: UserSource) -> Result<()> {
    let (events, receiver) = mpsc::channel();

    fetch::spawn_fetch(source.clone(), events.clone()).context("failed to start user fetch")?;

    let photos = if config.photos.enabled {
        let worker = photo::cache_dir(config.photos.cache_dir.as_deref())
            .and_then(|dir| PhotoWorker::spawn(dir, events.clone()));
        match worker {
            Ok(worker) => Some(worker),
            Err(err) => {
                tracing::warn!(error = %err, "portraits disabled");
                None
            }
        }
    } else {
        None
    };
    drop(events);

    let mut app = ui::app::App::new(config, &source, receiver, photos);
    app.run()
}

fn handle_list(source: &UserSource, args: ListArgs) -> Result<()> {
    let mut session = Session::new();
    session.load(load_users(source)?);
    session.dispatch(Action::Search(args.query.unwrap_or_default()))?;

    // index<TAB>name<TAB>email<TAB>location
    for card in session.gallery().visible() {
        println!(
            "{}\t{}\t{}\t{}",
            card.handle.index(),
            card.name,
            card.email,
            card.location
        );
    }
    Ok(())
}

fn handle_show(source: &UserSource, args: ShowArgs) -> Result<()> {
    let mut store = UserStore::new();
    store.load(load_users(source)?);

    let mut modal = ModalController::default();
    let index = modal
        .open(&store, args.index)
        .context("no user to show")?;
    let Some(detail) = modal.detail() else {
        return Ok(());
    };

    println!("{}  ({} of {})", detail.heading, index + 1, store.len());
    let rows = detail.rows();
    let label_width = rows.iter().map(|(label, _)| label.len() + 1).max().unwrap_or(0);
    for (row, (label, value)) in rows.iter().enumerate() {
        if row == CONTACT_ROWS {
            println!("{}", "-".repeat(label_width + 1 + 24));
        }
        println!("{:<width$} {}", format!("{label}:"), value, width = label_width);
    }
    if !detail.image_url.is_empty() {
        println!("{:<width$} {}", "Photo:", detail.image_url, width = label_width);
    }
    Ok(())
}
