use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration,
};

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    clap::{Parser, Subcommand},
    tokio::sync::broadcast::error::RecvError,
};

use {
    rexwall_client::{ApiClient, SessionEvent},
    rexwall_codec as codec,
    rexwall_control::{
        ActionDispatcher, ConfirmationGate, DEFAULT_POLL_INTERVAL, FilterDraft, NotificationSink,
        Outcome, ServiceMonitor, ServiceSnapshot, SyncEvent,
    },
    rexwall_protocol::{
        InstanceMode, Polarity, RegexFilter, Service, ServiceAddRequest, TrafficDirection,
    },
};

/// Command-line control surface for a rexwall firewall instance.
///
/// The session lives only for the duration of one invocation, so a password
/// given with `--password` or `REXWALL_PASSWORD` authenticates before the
/// command runs. Destructive commands ask for confirmation unless `--yes`
/// is given.
#[derive(Parser, Debug)]
#[command(name = "rexwall", version)]
struct Cli {
    /// Base URL of the firewall instance.
    #[arg(
        long,
        env = "REXWALL_URL",
        default_value = "http://127.0.0.1:4444",
        global = true
    )]
    url: String,

    /// Password to authenticate with before running the command.
    #[arg(long, env = "REXWALL_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the instance mode and session state
    Status,
    /// Show firewall-wide counters
    Stats,
    /// Check that the password is accepted
    Login,
    /// Drop the current session
    Logout,
    /// Set the password on a freshly installed instance
    SetPassword,
    /// Change the password
    ChangePassword {
        /// New password; prompted for when omitted
        #[arg(long)]
        new_password: Option<String>,

        /// Also log out every other session
        #[arg(long)]
        expire: bool,
    },
    /// List all services
    #[command(alias = "ls")]
    Services,
    /// Operate on one service
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
    /// Operate on regex filters
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },
    /// Stop the whole firewall and start over
    Reset {
        /// Delete the services as well instead of only stopping them
        #[arg(long)]
        delete_services: bool,
    },
    /// Follow one service, printing every change
    Watch {
        service_id: String,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
enum ServiceAction {
    /// Show one service in detail
    Show { service_id: String },
    /// Register a new service
    Add {
        name: String,

        /// Public port the proxy listens on
        #[arg(long)]
        port: u16,
    },
    /// Start proxying traffic
    Start { service_id: String },
    /// Stop proxying; the public port closes
    Stop { service_id: String },
    /// Forward traffic without applying filters
    Pause { service_id: String },
    /// Delete the service and its filters
    Delete { service_id: String },
    /// Rebind the internal port to a fresh random one
    RegenPort { service_id: String },
}

#[derive(Subcommand, Debug)]
enum FilterAction {
    /// List the filters of a service
    #[command(alias = "ls")]
    List { service_id: String },
    /// Add a regex filter to a service
    Add {
        service_id: String,

        /// Pattern text; by default it matches anywhere in the stream
        pattern: String,

        /// Traffic direction the filter applies to (C, S or B)
        #[arg(long, default_value = "B")]
        direction: TrafficDirection,

        /// What a match means (blacklist drops it, whitelist keeps only it)
        #[arg(long, default_value = "blacklist")]
        polarity: Polarity,

        /// Match the whole stream exactly instead of searching within it
        #[arg(long)]
        exact: bool,

        /// Interpret %xx escapes in the pattern as raw bytes
        #[arg(long)]
        escaped: bool,

        /// Create the filter disabled
        #[arg(long)]
        inactive: bool,

        /// Match case-insensitively
        #[arg(long)]
        case_insensitive: bool,

        /// Skip the local syntax check before submitting
        #[arg(long)]
        no_validate: bool,
    },
    /// Delete one filter of a service
    Delete { service_id: String, filter_id: u32 },
}

// ── Terminal adapters ────────────────────────────────────────────────────

struct TerminalSink;

#[async_trait]
impl NotificationSink for TerminalSink {
    async fn success(&self, title: &str, description: &str) {
        println!("{title}\n  {description}");
    }

    async fn error(&self, title: &str, description: &str) {
        eprintln!("{title}\n  {description}");
    }
}

/// y/N prompt on the controlling terminal.
struct TerminalGate;

#[async_trait]
impl ConfirmationGate for TerminalGate {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = format!("{prompt} [y/N] ");
        tokio::task::spawn_blocking(move || {
            print!("{prompt}");
            let _ = io::stdout().flush();
            let mut answer = String::new();
            if io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

/// Gate used with `--yes`.
struct AssumeYes;

#[async_trait]
impl ConfirmationGate for AssumeYes {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

async fn ask_password(prompt: &'static str) -> Result<String> {
    tokio::task::spawn_blocking(move || -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut password = String::new();
        io::stdin().read_line(&mut password)?;
        Ok(password.trim_end_matches(['\r', '\n']).to_string())
    })
    .await?
}

// ── Output helpers ───────────────────────────────────────────────────────

fn display_pattern(pattern: &str) -> String {
    codec::transport_to_display(pattern).unwrap_or_else(|_| pattern.to_string())
}

fn print_service(service: &Service) {
    println!("service:       {}", service.id);
    println!("name:          {}", service.name);
    println!("status:        {}", service.status);
    println!("public port:   {}", service.public_port);
    println!("internal port: {}", service.internal_port);
    println!("packets:       {}", service.n_packets);
    println!("filters:       {}", service.n_filters);
}

fn print_filters(filters: &[RegexFilter]) {
    if filters.is_empty() {
        println!("No filters.");
        return;
    }
    println!(
        "{:>4}  {:<8} {:<10} {:<9} {:<5} {:>8}  PATTERN",
        "ID", "MODE", "POLARITY", "STATE", "MATCH", "PACKETS"
    );
    for filter in filters {
        println!("{}", filter_line(filter));
    }
}

/// One listing row. The pattern is shown as the operator typed it: find
/// patterns lose their `.*` wrapper and get the `find` match kind instead.
fn filter_line(filter: &RegexFilter) -> String {
    let display = display_pattern(&filter.pattern);
    let (kind, pattern) = codec::classify(&display);
    let case = if filter.is_case_sensitive {
        ""
    } else {
        " (case insensitive)"
    };
    format!(
        "{:>4}  {:<8} {:<10} {:<9} {:<5} {:>8}  {}{}",
        filter.id,
        filter.direction.label(),
        filter.polarity(),
        if filter.active { "active" } else { "disabled" },
        kind,
        filter.n_packets,
        pattern,
        case,
    )
}

fn print_snapshot(snapshot: &ServiceSnapshot) {
    let Some(service) = &snapshot.service else {
        return;
    };
    println!(
        "[{}] {} public {} internal {} packets {}",
        service.status, service.id, service.public_port, service.internal_port, service.n_packets,
    );
    print_filters(&snapshot.filters);
}

/// Map a dispatcher outcome to process behavior. Failures were already
/// reported through the sink, so they only set the exit code.
fn finish(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Done => Ok(()),
        Outcome::Declined => {
            println!("Aborted.");
            Ok(())
        },
        Outcome::InvalidPattern => bail!("the daemon rejected the pattern: invalid regex"),
        Outcome::SessionExpired => bail!("authentication required, re-run with --password"),
        Outcome::Failed(_) => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(url = %cli.url, "talking to firewall");

    let client = ApiClient::new(&cli.url).context("invalid firewall url")?;

    // Sessions do not outlive the process, so authenticate up front when a
    // password was given. A fresh instance has no password to log in with.
    if let Some(password) = &cli.password {
        if !matches!(cli.command, Command::SetPassword) {
            client.login(password).await.context("login failed")?;
        }
    }

    let sink: Arc<dyn NotificationSink> = Arc::new(TerminalSink);
    let gate: Arc<dyn ConfirmationGate> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalGate)
    };
    let dispatcher = ActionDispatcher::new(client.clone(), sink, gate);

    match cli.command {
        Command::Status => {
            let status = client.server_status().await?;
            println!("mode:      {}", status.status);
            println!("logged in: {}", if status.logged_in { "yes" } else { "no" });
            if let Some(version) = &status.version {
                println!("version:   {version}");
            }
            if status.status == InstanceMode::Init {
                println!("The instance is waiting for first-time setup: run `rexwall set-password`.");
            }
            Ok(())
        },
        Command::Stats => {
            let stats = client.firewall_stats().await?;
            println!("services:        {}", stats.services);
            println!("filters:         {}", stats.filters);
            println!("matched packets: {}", stats.matched_packets);
            Ok(())
        },
        Command::Login => {
            // With --password the login already happened above.
            if cli.password.is_none() {
                let password = ask_password("Password: ").await?;
                client.login(&password).await.context("login failed")?;
            }
            println!("Login successful.");
            Ok(())
        },
        Command::Logout => {
            client.logout().await.context("logout failed")?;
            println!("Logged out.");
            Ok(())
        },
        Command::SetPassword => {
            let password = match &cli.password {
                Some(password) => password.clone(),
                None => ask_password("New password: ").await?,
            };
            client
                .set_password(&password)
                .await
                .context("setting the password failed")?;
            println!("Password set.");
            Ok(())
        },
        Command::ChangePassword {
            new_password,
            expire,
        } => {
            let new_password = match new_password {
                Some(password) => password,
                None => ask_password("New password: ").await?,
            };
            client
                .change_password(&new_password, expire)
                .await
                .context("changing the password failed")?;
            println!("Password changed.");
            Ok(())
        },
        Command::Services => {
            let services = client.list_services().await?;
            if services.is_empty() {
                println!("No services yet.");
                return Ok(());
            }
            println!(
                "{:<20} {:<8} {:>6} {:>8} {:>10} {:>7}",
                "SERVICE", "STATUS", "PORT", "INTERNAL", "PACKETS", "FILTERS"
            );
            for service in services {
                println!(
                    "{:<20} {:<8} {:>6} {:>8} {:>10} {:>7}",
                    service.id,
                    service.status,
                    service.public_port,
                    service.internal_port,
                    service.n_packets,
                    service.n_filters,
                );
            }
            Ok(())
        },
        Command::Service { action } => match action {
            ServiceAction::Show { service_id } => {
                let service = client.service(&service_id).await?;
                print_service(&service);
                Ok(())
            },
            ServiceAction::Add { name, port } => {
                let request = ServiceAddRequest {
                    name,
                    public_port: port,
                };
                finish(dispatcher.add_service(&request).await)
            },
            ServiceAction::Start { service_id } => {
                finish(dispatcher.start_service(&service_id).await)
            },
            ServiceAction::Stop { service_id } => {
                finish(dispatcher.stop_service(&service_id).await)
            },
            ServiceAction::Pause { service_id } => {
                finish(dispatcher.pause_service(&service_id).await)
            },
            ServiceAction::Delete { service_id } => {
                finish(dispatcher.delete_service(&service_id).await)
            },
            ServiceAction::RegenPort { service_id } => {
                finish(dispatcher.regen_port(&service_id).await)
            },
        },
        Command::Filter { action } => match action {
            FilterAction::List { service_id } => {
                let filters = client.service_filters(&service_id).await?;
                print_filters(&filters);
                Ok(())
            },
            FilterAction::Add {
                service_id,
                pattern,
                direction,
                polarity,
                exact,
                escaped,
                inactive,
                case_insensitive,
                no_validate,
            } => {
                let draft = FilterDraft {
                    pattern,
                    direction,
                    polarity,
                    exact,
                    percent_escapes: escaped,
                    active: !inactive,
                    case_sensitive: !case_insensitive,
                    validate: !no_validate,
                };
                let request = draft.build(&service_id)?;
                finish(dispatcher.add_filter(&request).await)
            },
            FilterAction::Delete {
                service_id,
                filter_id,
            } => {
                let filters = client.service_filters(&service_id).await?;
                let Some(filter) = filters.into_iter().find(|f| f.id == filter_id) else {
                    bail!("no filter {filter_id} on service {service_id}");
                };
                finish(dispatcher.delete_filter(&filter).await)
            },
        },
        Command::Reset { delete_services } => {
            finish(dispatcher.reset_firewall(delete_services).await)
        },
        Command::Watch {
            service_id,
            interval_ms,
        } => {
            let mut session_events = client.session().subscribe();
            let monitor = ServiceMonitor::start(
                client.clone(),
                &service_id,
                Duration::from_millis(interval_ms),
            );
            let mut events = monitor.subscribe();
            let mut last = ServiceSnapshot::default();

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    result = session_events.recv() => match result {
                        Ok(SessionEvent::Invalidated) => {
                            monitor.stop();
                            bail!("authentication required, re-run with --password");
                        },
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {},
                    },
                    result = events.recv() => match result {
                        Ok(SyncEvent::Updated) => {
                            let snapshot = monitor.snapshot().await;
                            if snapshot != last {
                                print_snapshot(&snapshot);
                                last = snapshot;
                            }
                        },
                        Ok(SyncEvent::FiltersUnavailable { reason }) => {
                            eprintln!("Updater for {service_id} service failed [filter list]: {reason}");
                        },
                        Ok(SyncEvent::ServiceLost { reason }) => {
                            eprintln!("Lost service {service_id}: {reason}");
                            break;
                        },
                        Err(RecvError::Lagged(_)) => {},
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            monitor.shutdown().await;
            Ok(())
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_add_parses_flags() {
        let cli = Cli::try_parse_from([
            "rexwall",
            "filter",
            "add",
            "sshd",
            "flag{",
            "--direction",
            "c",
            "--polarity",
            "whitelist",
            "--exact",
        ])
        .unwrap();

        let Command::Filter {
            action:
                FilterAction::Add {
                    service_id,
                    pattern,
                    direction,
                    polarity,
                    exact,
                    escaped,
                    inactive,
                    case_insensitive,
                    no_validate,
                },
        } = cli.command
        else {
            panic!("parsed into the wrong command");
        };

        assert_eq!(service_id, "sshd");
        assert_eq!(pattern, "flag{");
        assert_eq!(direction, TrafficDirection::ClientToServer);
        assert_eq!(polarity, Polarity::Whitelist);
        assert!(exact);
        assert!(!escaped && !inactive && !case_insensitive && !no_validate);
    }

    #[test]
    fn filter_rows_show_the_pattern_without_the_find_wrapper() {
        let filter = RegexFilter {
            id: 7,
            service_id: "sshd".to_string(),
            // ".*A=.*" in transport form
            pattern: "LipBPS4q".to_string(),
            direction: TrafficDirection::Both,
            is_blacklist: false,
            active: true,
            is_case_sensitive: true,
            n_packets: 3,
        };

        let line = filter_line(&filter);
        assert!(line.contains("find"));
        assert!(line.ends_with(" A="));
        assert!(!line.contains(".*"));
    }

    #[test]
    fn watch_defaults_to_half_a_second() {
        let cli = Cli::try_parse_from(["rexwall", "watch", "sshd"]).unwrap();
        let Command::Watch {
            service_id,
            interval_ms,
        } = cli.command
        else {
            panic!("parsed into the wrong command");
        };
        assert_eq!(service_id, "sshd");
        assert_eq!(interval_ms, 500);
    }

    #[test]
    fn yes_flag_is_global() {
        let cli = Cli::try_parse_from(["rexwall", "service", "delete", "sshd", "-y"]).unwrap();
        assert!(cli.yes);
    }

    #[test]
    fn password_flag_is_global() {
        let cli =
            Cli::try_parse_from(["rexwall", "services", "--password", "hunter2"]).unwrap();
        assert_eq!(cli.password.as_deref(), Some("hunter2"));
    }
}
