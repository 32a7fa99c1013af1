use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use jiff::civil::Date;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use ndertimi::{
    config::{Config, ConfigError},
    models::{
        account::Identity,
        project::{MediaKind, Status},
    },
    secrets::{HashError, hash_secret},
    services::{
        access::{AccessError, ProjectFilter, authorize_detail, require_admin, visible_projects},
        accounts::{AuthenticateError, CredentialStore, RegisterError},
        media::{
            MediaError, MediaSource, file_to_embeddable_reference, guess_mime, new_media_item,
        },
        projects::{
            ProjectError, ProjectRepository, SaveProjectError, SaveProjectParameters, save_project,
        },
        summary::{CommandSummarizer, Unconfigured, analyze_project},
        updates::{
            AddUpdateParameters, UpdateError, add_weekly_update, attach_media,
            remove_weekly_update,
        },
    },
    storage::{Database, StorageError, json::JsonFileStorage},
};

mod ui;

#[derive(Parser)]
#[command(
    name = "ndertimi",
    about = "Track construction projects and their weekly progress"
)]
struct Cli {
    /// Email or phone of the account to act as
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Account password, or the master password for admin access
    #[arg(short, long, global = true, env = "NDERTIMI_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log in through admin mode (master password only)
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a client account
    Register { identifier: String, secret: String },

    /// Check credentials and show who you are
    Login,

    /// Print an Argon2id hash to use as NDERTIMI_ADMIN_HASH
    AdminHash { password: String },

    /// List projects
    List {
        /// Show archived projects instead of active ones (admin only)
        #[arg(long)]
        archived: bool,

        /// Filter by name or location
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a project with its weekly updates
    Show {
        id: String,

        /// Client access code of the project
        #[arg(short, long)]
        code: Option<String>,
    },

    /// Create a project
    New {
        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<String>,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        location: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Image URL or local image file
        #[arg(short, long)]
        thumbnail: Option<String>,

        /// Code clients use to open the project
        #[arg(short, long)]
        code: String,

        #[arg(short, long, default_value = "Planning")]
        status: Status,
    },

    /// Edit a project
    Edit {
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Image URL or local image file
        #[arg(short, long)]
        thumbnail: Option<String>,

        #[arg(short, long)]
        code: Option<String>,

        #[arg(short, long)]
        status: Option<Status>,
    },

    /// Hide a project from clients
    Archive { id: String },

    /// Bring an archived project back
    Restore { id: String },

    /// Permanently delete a project
    Delete { id: String },

    /// Manage weekly updates
    #[command(subcommand)]
    Update(UpdateCommands),

    /// Attach media to a weekly update
    Media {
        project_id: String,
        update_id: String,

        /// image, video, 3d-model-embed or panorama-embed
        #[arg(short, long)]
        kind: MediaKind,

        #[arg(short, long)]
        title: String,

        /// Link or pasted iframe embed code
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Local file to embed
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Ask for an AI analysis of a project's progress
    Analyze {
        id: String,

        #[arg(short, long)]
        question: Option<String>,

        #[arg(short, long)]
        code: Option<String>,
    },

    /// List client accounts (admin only)
    Accounts,
}

#[derive(Debug, Subcommand)]
enum UpdateCommands {
    /// Add a weekly update
    Add {
        project_id: String,

        #[arg(short, long)]
        description: String,

        /// Defaults to the next week number
        #[arg(short, long)]
        week: Option<u32>,

        /// Defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<Date>,
    },
    /// Remove a weekly update
    Remove { project_id: String, update_id: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    SaveProject(#[from] SaveProjectError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Authenticate(#[from] AuthenticateError),
    #[error("Failed to hash password: {0}")]
    Hash(HashError),
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env().unwrap_or_else(|e: ConfigError| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    init_logging(&config.log_filter);

    let storage =
        JsonFileStorage::new(config.store_path.clone()).with_backup_limit(config.backup_limit);
    let db = Database::open(storage).unwrap_or_else(|e| {
        eprintln!("Error: Failed to open store: {}", e);
        std::process::exit(1);
    });

    let result = run(cli, &config, &db);
    db.close();

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn identify(
    cli: &Cli,
    credentials: &CredentialStore<'_, JsonFileStorage>,
) -> Result<Identity, AuthenticateError> {
    let password = cli.password.as_deref().ok_or(AuthenticateError::Unauthorized)?;
    if cli.admin {
        credentials.authenticate_admin(password)
    } else {
        credentials.authenticate(cli.user.as_deref().unwrap_or_default(), password)
    }
}

/// Local files become data URLs; anything else is kept as a link.
fn resolve_thumbnail(thumbnail: Option<String>) -> Result<Option<String>, CliError> {
    let Some(thumbnail) = thumbnail else {
        return Ok(None);
    };
    let path = PathBuf::from(&thumbnail);
    if !path.is_file() {
        return Ok(Some(thumbnail));
    }
    let bytes = std::fs::read(&path).map_err(|e| CliError::ReadFile {
        path: path.clone(),
        source: e,
    })?;
    Ok(Some(file_to_embeddable_reference(&bytes, guess_mime(&path))))
}

fn run(cli: Cli, config: &Config, db: &Database<JsonFileStorage>) -> Result<(), CliError> {
    let credentials = CredentialStore::new(db, &config.auth);
    let projects = ProjectRepository::new(db);

    match &cli.command {
        Commands::Register { identifier, secret } => {
            let account = credentials.register(identifier, secret)?;
            println!("{} {}", "Created account".green(), account.identifier.bold());
            return Ok(());
        }
        Commands::AdminHash { password } => {
            println!("{}", hash_secret(password).map_err(CliError::Hash)?);
            return Ok(());
        }
        _ => {}
    }

    let identity = identify(&cli, &credentials)?;

    match cli.command {
        Commands::Register { .. } | Commands::AdminHash { .. } => {}
        Commands::Login => ui::render_identity(&identity),
        Commands::List { archived, search } => {
            let all = projects.list_all()?;
            let filter = ProjectFilter {
                show_archived: archived,
                search: search.as_deref(),
            };
            let mut visible = visible_projects(&all, &identity, &filter);
            visible.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

            let showing_archived = archived && identity.is_admin();
            if visible.is_empty() {
                if showing_archived {
                    println!("No archived projects found.");
                } else if identity.is_admin() {
                    println!("No active projects. Create one or check the archive.");
                } else {
                    println!("No active projects found.");
                }
            } else {
                let title = if showing_archived {
                    "Archived Projects"
                } else {
                    "Active Projects"
                };
                ui::render_view_header(title, visible.len());
                for project in visible {
                    ui::render_project_line(project);
                }
            }
        }
        Commands::Show { id, code } => {
            let project = projects.get_by_id(&id)?;
            ui::render_project_details(authorize_detail(&identity, &project, code.as_deref())?);
        }
        Commands::New {
            id,
            name,
            location,
            description,
            thumbnail,
            code,
            status,
        } => {
            require_admin(&identity)?;
            if let Some(id) = id.as_deref() {
                projects.ensure_vacant(id)?;
            }
            let project = save_project(
                &projects,
                SaveProjectParameters {
                    id,
                    name,
                    location,
                    description,
                    thumbnail: resolve_thumbnail(thumbnail)?,
                    client_access_code: code,
                    status,
                },
            )?;
            println!("{} {} ({})", "Created".green(), project.name.bold(), project.id);
        }
        Commands::Edit {
            id,
            name,
            location,
            description,
            thumbnail,
            code,
            status,
        } => {
            require_admin(&identity)?;
            let current = projects.get_by_id(&id)?;
            let project = save_project(
                &projects,
                SaveProjectParameters {
                    id: Some(id),
                    name: name.unwrap_or(current.name),
                    location: location.unwrap_or(current.location),
                    description: description.unwrap_or(current.description),
                    thumbnail: resolve_thumbnail(thumbnail)?,
                    client_access_code: code.unwrap_or(current.client_access_code),
                    status: status.unwrap_or(current.status),
                },
            )?;
            println!("{} {}", "Saved".green(), project.name.bold());
        }
        Commands::Archive { id } => {
            require_admin(&identity)?;
            if projects.archive(&id)? {
                println!("{} {} (hidden from clients)", "Archived".yellow(), id);
            } else {
                println!("No project with id {}", id);
            }
        }
        Commands::Restore { id } => {
            require_admin(&identity)?;
            if projects.restore(&id)? {
                println!("{} {}", "Restored".green(), id);
            } else {
                println!("No project with id {}", id);
            }
        }
        Commands::Delete { id } => {
            require_admin(&identity)?;
            if projects.delete(&id)? {
                println!("{} {}", "Deleted".red(), id);
            } else {
                println!("No project with id {}", id);
            }
        }
        Commands::Update(UpdateCommands::Add {
            project_id,
            description,
            week,
            date,
        }) => {
            require_admin(&identity)?;
            let update = add_weekly_update(
                &projects,
                AddUpdateParameters {
                    project_id,
                    week_number: week,
                    date,
                    description,
                    media: vec![],
                },
            )?;
            println!(
                "{} week {} ({})",
                "Added".green(),
                update.week_number,
                update.id
            );
        }
        Commands::Update(UpdateCommands::Remove {
            project_id,
            update_id,
        }) => {
            require_admin(&identity)?;
            let removed = remove_weekly_update(&projects, &project_id, &update_id)?;
            println!("{} week {}", "Removed".red(), removed.week_number);
        }
        Commands::Media {
            project_id,
            update_id,
            kind,
            title,
            url,
            file,
        } => {
            require_admin(&identity)?;
            let source = match (url, file) {
                (_, Some(path)) => {
                    let bytes = std::fs::read(&path).map_err(|e| CliError::ReadFile {
                        path: path.clone(),
                        source: e,
                    })?;
                    MediaSource::File {
                        bytes,
                        mime: guess_mime(&path).to_string(),
                    }
                }
                (url, None) => MediaSource::Url(url.unwrap_or_default()),
            };
            let item = new_media_item(kind, &title, source)?;
            let update = attach_media(&projects, &project_id, &update_id, item)?;
            println!(
                "{} {} to week {}",
                "Attached".green(),
                title.bold(),
                update.week_number
            );
        }
        Commands::Analyze { id, question, code } => {
            let project = projects.get_by_id(&id)?;
            let project = authorize_detail(&identity, &project, code.as_deref())?;
            let analysis = match config
                .summarizer_command
                .as_deref()
                .and_then(CommandSummarizer::new)
                .map(|summarizer| summarizer.with_timeout(config.summarizer_timeout))
            {
                Some(summarizer) => analyze_project(&summarizer, project, question.as_deref()),
                None => analyze_project(&Unconfigured, project, question.as_deref()),
            };
            println!("{}", analysis);
        }
        Commands::Accounts => {
            require_admin(&identity)?;
            let accounts = credentials.list_accounts()?;
            if accounts.is_empty() {
                println!("No client accounts");
            }
            for account in accounts {
                println!("  {} {}", "•".green(), account.identifier.bold());
            }
        }
    }

    Ok(())
}
