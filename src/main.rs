use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use relaymail::{
    Config,
    email::{Dispatcher, EmailMessage, MailerConfig},
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "relaymail.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compose a message and hand it to a delivery backend
    Send {
        /// Delivery system: "ses" or "sparkpost"
        #[arg(short, long)]
        system: String,

        #[arg(long)]
        from: String,

        /// Recipient address, may be repeated
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long, default_value = "")]
        subject: String,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        html: Option<String>,

        #[arg(long)]
        reply_to: Option<String>,

        /// Campaign / message tag
        #[arg(long)]
        tag: Option<String>,

        /// SES configuration set name
        #[arg(long)]
        configuration_set: Option<String>,

        /// SparkPost metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,

        /// SparkPost transmission options as a JSON object
        #[arg(long)]
        options: Option<String>,

        /// Name used as the SES tag name
        #[arg(long, default_value = "relaymail")]
        handler: String,
    },

    /// Report which delivery backends have usable credentials
    Check,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        Ok(Config::load_from_file(config_path)?)
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    // Set up logging first
    let level = parse_level(cli.log_level.as_deref().unwrap_or(&config.app.log_level));
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.config.exists() {
        info!("Configuration loaded from: {:?}", cli.config);
    } else {
        info!("Config file not found at {:?}, using defaults", cli.config);
    }

    let dispatcher = config.dispatcher(MailerConfig::from_env());

    match cli.command {
        Commands::Check => run_checks(&dispatcher),
        Commands::Send {
            system,
            from,
            to,
            subject,
            text,
            html,
            reply_to,
            tag,
            configuration_set,
            metadata,
            options,
            handler,
        } => {
            let mut recipients = to.into_iter();
            let first = recipients.next().unwrap_or_default();
            let mut message = recipients
                .fold(EmailMessage::new(first, from, subject), |message, to| {
                    message.with_to(to)
                })
                .with_date(Utc::now())
                .with_delivery_handler(handler)
                .with_header("delivery_system", system);

            message = match (text, html) {
                (Some(text), Some(html)) => message.with_both(text, html),
                (None, Some(html)) => message.with_html(html),
                (text, None) => message.with_text(text.unwrap_or_default()),
            };
            if let Some(reply_to) = reply_to {
                message = message.with_reply_to(reply_to);
            }
            if let Some(tag) = tag {
                message = message.with_header("tag", tag);
            }
            if let Some(name) = configuration_set {
                message = message.with_header("configuration_set_name", name);
            }
            if let Some(metadata) = metadata {
                message = message.with_header(
                    "metadata",
                    serde_json::from_str::<serde_json::Value>(&metadata)?,
                );
            }
            if let Some(options) = options {
                message = message.with_header(
                    "options",
                    serde_json::from_str::<serde_json::Value>(&options)?,
                );
            }

            let delivered = dispatcher.deliver(message).await?;
            match delivered.message_id() {
                Some(message_id) => println!("Sent. Message ID: {}", message_id),
                None => println!("Sent. No message ID was returned"),
            }
            Ok(())
        }
    }
}

fn run_checks(dispatcher: &Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
    match startup_checks::perform_startup_checks(dispatcher) {
        Ok(ready) => {
            for system in ready {
                println!("{}: ready", system);
            }
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
                eprintln!("{}", error);
            }
            if errors.iter().any(startup_checks::StartupCheckError::is_critical) {
                return Err("Critical startup check failed".into());
            }
            tracing::warn!("Non-critical startup checks failed, continuing");
            Ok(())
        }
    }
}
