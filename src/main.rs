//! CLI entry point for `mailshell`.

use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailshell::config::{self, Config};
use mailshell::mailbox::himalaya::HimalayaSession;
use mailshell::mailbox::{MailboxSession, MessageFilter, SeenFilter};
use mailshell::prompt::{ask_choice, StdioPrompter};
use mailshell::reader::Reader;
use mailshell::render::fetch::HttpTransport;
use mailshell::render::locations::ScratchSpace;
use mailshell::render::RenderSettings;
use mailshell::terminal::CommandTerminal;

#[derive(Parser)]
#[command(name = "mailshell", version, about = "Read and write email in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Read messages, unread ones by default
    Read(ReadArgs),
    /// Write and send a new email
    Write,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args, Default)]
struct ReadArgs {
    /// Only messages already read
    #[arg(long, conflicts_with = "all")]
    seen: bool,

    /// Read and unread messages
    #[arg(long)]
    all: bool,

    /// Sender contains
    #[arg(long, value_name = "TEXT")]
    from: Option<String>,

    /// Recipient contains
    #[arg(long, value_name = "TEXT")]
    to: Option<String>,

    /// Subject contains
    #[arg(long, value_name = "TEXT")]
    subject: Option<String>,

    /// Only messages before this day
    #[arg(long, value_name = "YYYY-MM-DD")]
    before: Option<NaiveDate>,

    /// Only messages after this day
    #[arg(long, value_name = "YYYY-MM-DD")]
    after: Option<NaiveDate>,

    /// Folder to read instead of the inbox
    #[arg(long, value_name = "FOLDER")]
    label: Option<String>,

    /// Also read spam and trash
    #[arg(long)]
    include_spam_trash: bool,

    /// Maximum number of messages per folder
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

impl ReadArgs {
    fn filter(self, config: &Config) -> MessageFilter {
        let seen = if self.all {
            SeenFilter::Any
        } else if self.seen {
            SeenFilter::Seen
        } else {
            SeenFilter::Unseen
        };
        MessageFilter {
            seen,
            from: self.from,
            to: self.to,
            subject: self.subject,
            before: self.before,
            after: self.after,
            label: self.label,
            include_spam_trash: self.include_spam_trash,
            limit: self.limit.unwrap_or(config.mailbox.default_limit),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        Some(Commands::Read(args)) => cmd_read(&config, args),
        Some(Commands::Write) => cmd_write(&config),
        None => {
            let mut prompter = StdioPrompter::new();
            let choice = ask_choice(
                &mut prompter,
                "Do you want to (R)ead your new emails or (W)rite an email?",
                &['R', 'W'],
            )?;
            if choice == 'R' {
                cmd_read(&config, ReadArgs::default())
            } else {
                cmd_write(&config)
            }
        }
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailshell.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailshell", &mut std::io::stdout());
    Ok(())
}

fn cmd_manpage() -> anyhow::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn open_session(config: &Config) -> anyhow::Result<HimalayaSession> {
    HimalayaSession::new(config.mailbox.clone()).context("cannot open mailbox")
}

fn cmd_read(config: &Config, args: ReadArgs) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let filter = args.filter(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(format!("Listing messages for {}...", session.own_address()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let envelopes = session.list_messages(&filter);
    spinner.finish_and_clear();
    let envelopes = envelopes?;

    CommandTerminal::apply_size(&config.display);
    let mut terminal = CommandTerminal::new(&config.renderers)?;
    let mut prompter = StdioPrompter::new();
    let transport = HttpTransport::new(&config.network)?;
    let scratch = ScratchSpace::new(config::scratch_dir(config))?;
    let settings = RenderSettings::from_config(config);

    let result = Reader {
        session: &mut session,
        scratch: &scratch,
        transport: &transport,
        terminal: &mut terminal,
        prompter: &mut prompter,
        settings: &settings,
    }
    .run_envelopes(&envelopes);

    scratch.remove_if_empty();
    let summary = result?;
    println!(
        "Listed {}, read {}, replied to {}, deleted {}",
        summary.listed, summary.read, summary.replied, summary.deleted
    );
    Ok(())
}

fn cmd_write(config: &Config) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let mut prompter = StdioPrompter::new();
    mailshell::composer::write_email(&mut session, &mut prompter)?;
    Ok(())
}
