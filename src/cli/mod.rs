pub mod calendar;
pub mod process;
pub mod status;

use std::{
    env,
    fmt::Display,
    io::{IsTerminal, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use process::{kill_previous_servers, restart_server};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};

use crate::{
    daemon::{shutdown::detect_shutdown, start_daemon},
    lens::{
        tracker::{LensSettings, LensTracker},
        LensProfile, LensType,
    },
    reminder::{
        delivery::print_reminder, queue::ReminderQueue, request_notification_authorization,
    },
    storage::profile_storage::{ProfileStorage, ProfileStorageImpl},
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "LensTrack", version, long_about = None)]
#[command(about = "Contact lens usage and replacement tracker", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(long, global = true, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, global = true, help = "Disable colored output")]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(flatten)]
    Lens(LensCommand),
    #[command(about = "Starts a reminder daemon in the background")]
    Init {},
    #[command(
        about = "Run the reminder daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {},
    #[command(about = "Stop currently running daemon.")]
    Stop {},
}

/// Commands working on the lens profile.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum LensCommand {
    #[command(about = "Show days left before replacement")]
    Status {},
    #[command(about = "Log that the lenses were used today")]
    Log {},
    #[command(about = "Start a new replacement cycle today")]
    Reset {},
    #[command(about = "Configure lens type, replacement date and reminders")]
    Settings {
        #[arg(long, value_enum, help = "Lens type. Keeps the current one by default")]
        lens_type: Option<LensType>,
        #[arg(
            long,
            help = "Date the lenses were last replaced, the reminder is counted from it. Examples are \"today\", \"3 days ago\", \"15/03/2025\""
        )]
        since: Option<String>,
        #[arg(long, help = "Left eye power")]
        left: Option<String>,
        #[arg(long, help = "Right eye power")]
        right: Option<String>,
        #[arg(long, help = "Don't schedule a replacement reminder")]
        no_notifications: bool,
    },
    #[command(about = "Turn automatic daily refresh of the current date on or off")]
    Counter {
        #[arg(value_enum)]
        state: Switch,
    },
    #[command(about = "Show usage calendar for a month")]
    Calendar {
        #[arg(long, help = "Any date inside of the month. Defaults to today")]
        month: Option<String>,
    },
    #[command(about = "Keep showing status, refreshing it when the date changes")]
    Watch {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(ref dir) => ensure_dir(dir.clone())?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Serve {} => DAEMON_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir.join("logs"), logging_level, args.log)?;

    let colored = !args.no_color && std::io::stdout().is_terminal();
    let dialect: chrono_english::Dialect = args.date_style.into();

    match args.commands {
        Commands::Init {} => restart_server(&app_dir),
        Commands::Stop {} => {
            let process_name = env::current_exe()?;
            let stopped = kill_previous_servers(&process_name)?;
            println!("Stopped {stopped} reminder daemon(s)");
            Ok(())
        }
        Commands::Serve {} => start_daemon(app_dir).await,
        Commands::Lens(command) => {
            let mut app = LensApp::open(app_dir, Arc::new(DefaultClock)).await?;
            app.show_delivered(&mut std::io::stdout()).await;
            app.run(command, dialect, colored).await
        }
    }
}

/// A tracker together with the storage it was loaded from.
struct LensApp {
    tracker: LensTracker,
    storage: ProfileStorageImpl,
    inbox: ReminderQueue,
    clock: Arc<dyn Clock>,
}

impl LensApp {
    async fn open(app_dir: PathBuf, clock: Arc<dyn Clock>) -> Result<Self> {
        let reminder_dir = app_dir.join("reminders");
        let notifier = Arc::new(ReminderQueue::new(reminder_dir.clone())?);
        request_notification_authorization(notifier.as_ref()).await;
        let inbox = ReminderQueue::inbox(reminder_dir)?;

        let storage = ProfileStorageImpl::new(app_dir)?;
        let profile = storage.load_or_default(clock.today()).await?;
        let tracker = LensTracker::with_profile(profile, clock.clone(), notifier);
        Ok(Self {
            tracker,
            storage,
            inbox,
            clock,
        })
    }

    async fn save(&self) -> Result<()> {
        self.storage.save(&self.tracker.snapshot()).await
    }

    /// Prints reminders the daemon fired since the last run. Returns how many were shown.
    async fn show_delivered(&self, out: &mut (impl Write + Send)) -> usize {
        let delivered = match self.inbox.take_all().await {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to read delivered reminders {e:?}");
                return 0;
            }
        };
        for reminder in &delivered {
            if let Err(e) = print_reminder(out, reminder) {
                error!("Failed to show reminder {}: {e:?}", reminder.id);
            }
        }
        if !delivered.is_empty() {
            let _ = writeln!(out);
        }
        delivered.len()
    }

    async fn run(
        &mut self,
        command: LensCommand,
        dialect: chrono_english::Dialect,
        colored: bool,
    ) -> Result<()> {
        match command {
            LensCommand::Status {} => {
                // Date counter mode may have moved the current date on load.
                self.save().await?;
                print!("{}", status::render_status(&self.tracker.snapshot(), colored));
            }
            LensCommand::Log {} => {
                if self.tracker.log_usage_today() {
                    println!("Logged usage for today");
                } else if self.tracker.days_left() == 0 {
                    println!("The cycle is over. It's time to replace your lenses.");
                } else {
                    println!("Usage for today is already logged");
                }
                self.save().await?;
            }
            LensCommand::Reset {} => {
                self.tracker.reset_cycle();
                self.save().await?;
                print!("{}", status::render_status(&self.tracker.snapshot(), colored));
            }
            LensCommand::Settings {
                lens_type,
                since,
                left,
                right,
                no_notifications,
            } => {
                let since = since.map(|v| parse_date(&v, dialect)).transpose()?;
                let settings = settings_from(
                    &self.tracker.snapshot(),
                    lens_type,
                    since,
                    left,
                    right,
                    !no_notifications,
                );
                self.tracker.apply_settings(settings).await;
                self.save().await?;
                print!("{}", status::render_status(&self.tracker.snapshot(), colored));
            }
            LensCommand::Counter { state } => {
                self.tracker.set_date_counter_enabled(state == Switch::On);
                self.save().await?;
                print!("{}", status::render_status(&self.tracker.snapshot(), colored));
            }
            LensCommand::Calendar { month } => {
                let today = self.clock.today();
                let month = match month {
                    Some(month) => parse_date(&month, dialect)?,
                    None => today,
                };
                print!(
                    "{}",
                    calendar::render_month(&self.tracker.snapshot(), month, today, colored)
                );
            }
            LensCommand::Watch {} => self.watch(colored).await?,
        }
        Ok(())
    }

    /// Shows status until interrupted, re-rendering it on every profile change.
    async fn watch(&mut self, colored: bool) -> Result<()> {
        let shutdown = CancellationToken::new();
        let mut changes = self.tracker.subscribe();
        print!("{}", status::render_status(&changes.borrow_and_update(), colored));

        tokio::select! {
            _ = detect_shutdown(shutdown.clone()) => (),
            _ = async {
                while changes.changed().await.is_ok() {
                    let profile = changes.borrow_and_update().clone();
                    info!("Profile changed, current date {}", profile.current_date());
                    if let Err(e) = self.storage.save(&profile).await {
                        error!("Failed to save profile {e:?}");
                    }
                    println!();
                    print!("{}", status::render_status(&profile, colored));
                }
            } => (),
        }
        Ok(())
    }
}

/// Fills the settings form from the command line, keeping current values for anything left out.
fn settings_from(
    current: &LensProfile,
    lens_type: Option<LensType>,
    since: Option<NaiveDate>,
    left: Option<String>,
    right: Option<String>,
    notifications_enabled: bool,
) -> LensSettings {
    LensSettings {
        lens_type: lens_type.unwrap_or(current.lens_type()),
        last_replacement_date: since.unwrap_or(current.last_replacement_date()),
        left_eye_power: left.or_else(|| current.left_eye_power().map(Into::into)),
        right_eye_power: right.or_else(|| current.right_eye_power().map(Into::into)),
        notifications_enabled,
    }
}

fn parse_date(value: &str, dialect: chrono_english::Dialect) -> Result<NaiveDate> {
    match parse_date_string(value, Local::now(), dialect) {
        Ok(v) => Ok(v.with_timezone(&Local).date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value}: {e}"),
            )
            .into()),
    }
}
