use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use folio_admin::api::auth::ResetInstructions;
use folio_admin::api::resource::{Resource, ResourceKind};
use folio_admin::api::{ApiError, contact, media};
use folio_admin::config::{ConfigError, Mode, SyncConfig};
use folio_admin::dashboard::{Dashboard, DashboardView};
use folio_admin::realtime::{ConnectionManager, TransportError};
use folio_admin::session::guard::{AuthError, AuthGuard, Credentials, PasswordChange, ProfileUpdate};
use folio_admin::session::route::RouteDecision;
use folio_admin::session::store::FileTokenStore;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `folio-admin login`")]
    NotLoggedIn,
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Auth(#[from] AuthError),
    #[error("live channel setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "folio-admin", about = "Portfolio admin client with live dashboard sync")]
struct Cli {
    #[arg(long, env = "VITE_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "MODE")]
    mode: Option<String>,

    #[arg(long, env = "ADMIN_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long, env = "ADMIN_EMAIL")]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// Stream the live dashboard until interrupted.
    Watch {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Notifications(NotificationsCommand),
    Resource(ResourceCommand),
    Upload {
        path: PathBuf,
    },
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        token: String,
        #[arg(long)]
        password: String,
    },
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Args, Debug)]
struct NotificationsCommand {
    #[command(subcommand)]
    command: NotificationsSubcommand,
}

#[derive(Subcommand, Debug)]
enum NotificationsSubcommand {
    List {
        #[arg(long, default_value_t = false)]
        unread: bool,
    },
    Read {
        id: String,
    },
}

#[derive(Args, Debug)]
struct ResourceCommand {
    /// projects, blogs, skills, experience, testimonials, services, about,
    /// home or users
    kind: ResourceKind,

    #[command(subcommand)]
    command: ResourceSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourceSubcommand {
    List,
    Count,
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
    /// Read a single-document resource (about, home).
    Show,
    /// Overwrite a single-document resource (about, home).
    Replace {
        #[arg(long)]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let guard = AuthGuard::new(&config, Box::new(FileTokenStore::new(config.token_path())))?;

    match cli.command {
        Command::Login { email, password } => run_login(&guard, &email, &password).await,
        Command::Logout => {
            guard.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => run_whoami(&guard).await,
        Command::Watch { json } => run_watch(&guard, &config, json).await,
        Command::Notifications(notifications) => run_notifications(&guard, notifications).await,
        Command::Resource(resource) => run_resource(&guard, resource).await,
        Command::Upload { path } => {
            require_session(&guard).await?;
            let uploaded = media::upload_image(guard.api(), &path).await?;
            println!("{}", uploaded.url);
            Ok(())
        }
        Command::ForgotPassword { email } => {
            let ResetInstructions { message, reset_token } = guard.forgot_password(&email).await?;
            println!("{}", message.unwrap_or_else(|| "Password reset instructions sent".to_owned()));
            if let Some(token) = reset_token {
                println!("reset token: {token}");
            }
            Ok(())
        }
        Command::ResetPassword { token, password } => {
            println!("{}", guard.reset_password(&token, &password).await?);
            Ok(())
        }
        Command::Profile { name, email } => {
            require_session(&guard).await?;
            let user = guard.update_profile(&ProfileUpdate { name, email }).await?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Password { current, new, confirm } => {
            require_session(&guard).await?;
            println!("{}", guard.change_password(&PasswordChange { current, new, confirm }).await?);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> Result<SyncConfig, CliError> {
    let mut config = SyncConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(mode) = &cli.mode {
        config.mode = Mode::parse(mode);
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir.clone_from(dir);
    }
    Ok(config)
}

/// Validate the stored token and gate on the protected dashboard route.
async fn require_session(guard: &AuthGuard) -> Result<(), CliError> {
    guard.restore().await;
    match guard.route("/dashboard") {
        RouteDecision::Render => Ok(()),
        RouteDecision::Loading | RouteDecision::Redirect(_) => Err(CliError::NotLoggedIn),
    }
}

async fn run_login(guard: &AuthGuard, email: &str, password: &str) -> Result<(), CliError> {
    let user = guard.try_login(&Credentials::new(email, password)).await?;
    println!("logged in as {} ({})", user.email, user.role);
    Ok(())
}

async fn run_whoami(guard: &AuthGuard) -> Result<(), CliError> {
    require_session(guard).await?;
    let user = guard.state().user.ok_or(CliError::NotLoggedIn)?;
    print_json(&serde_json::to_value(user)?)
}

async fn run_watch(guard: &AuthGuard, config: &SyncConfig, json: bool) -> Result<(), CliError> {
    require_session(guard).await?;
    let session = guard.view();
    let token = session.token().ok_or(CliError::NotLoggedIn)?;

    let manager = ConnectionManager::new(config)?.with_session(session);
    let channel = manager.open(&token, &config.api_base_url);
    if channel.is_none() {
        eprintln!("live updates disabled for this backend; showing snapshots only");
    }

    let dashboard = Dashboard::spawn(guard.api().clone(), config, channel);
    let mut views = dashboard.view();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                render(&view, json)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.shutdown().await;
    if guard.state().needs_login {
        return Err(CliError::NotLoggedIn);
    }
    Ok(())
}

async fn run_notifications(guard: &AuthGuard, notifications: NotificationsCommand) -> Result<(), CliError> {
    require_session(guard).await?;
    match notifications.command {
        NotificationsSubcommand::List { unread } => {
            let items = contact::list(guard.api()).await?;
            let items: Vec<_> = items.into_iter().filter(|n| !unread || !n.is_read).collect();
            print_json(&serde_json::to_value(items)?)
        }
        NotificationsSubcommand::Read { id } => {
            contact::mark_read(guard.api(), &id).await?;
            println!("marked {id} read");
            Ok(())
        }
    }
}

async fn run_resource(guard: &AuthGuard, resource: ResourceCommand) -> Result<(), CliError> {
    require_session(guard).await?;
    let client = Resource::new(guard.api().clone(), resource.kind);
    let json = match resource.command {
        ResourceSubcommand::List => Value::Array(client.list().await?.items().to_vec()),
        ResourceSubcommand::Count => Value::from(client.count().await?),
        ResourceSubcommand::Get { id } => client.get(&id).await?,
        ResourceSubcommand::Create { data } => client.create(&parse_object(&data)?).await?,
        ResourceSubcommand::Update { id, data } => client.update(&id, &parse_object(&data)?).await?,
        ResourceSubcommand::Delete { id } => client.delete(&id).await?,
        ResourceSubcommand::Show => client.fetch().await?,
        ResourceSubcommand::Replace { data } => client.replace(&parse_object(&data)?).await?,
    };
    print_json(&json)
}

fn render(view: &DashboardView, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string(view)?);
        return Ok(());
    }

    let tiles = view
        .tiles
        .iter()
        .map(|t| if t.loading { format!("{}: …", t.label) } else { format!("{}: {}", t.label, t.value) })
        .collect::<Vec<_>>()
        .join(" | ");
    println!("[{:?}] {tiles} | unread: {}", view.connection, view.notifications.unread);
    for row in &view.activity {
        println!("  {:<9} {} ({})", row.kind.as_str(), row.action, row.when);
    }
    for note in &view.notifications.preview {
        println!("  ✉ {} <{}> {}", note.name, note.email, note.subject);
    }
    for (domain, error) in &view.errors {
        eprintln!("  {domain} unavailable: {error}");
    }
    Ok(())
}

fn parse_object(data: &str) -> Result<Value, CliError> {
    Ok(serde_json::from_str::<Value>(data)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
