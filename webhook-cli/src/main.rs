// webhook-cli/src/main.rs
mod setup;

use clap::{Parser, Subcommand};
use common::{setup_tracing, Config, TelegramGateway};

use setup::{WebhookAction, WebhookSetup};

#[derive(Parser)]
#[command(name = "webhook-cli")]
#[command(about = "Set up or delete the Telegram webhook for the chat server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register the webhook URL, or remove / inspect the current one
    SetupWebhook {
        /// Webhook URL to set; defaults to the configured bot.webhook_url
        url: Option<String>,

        /// Delete the existing webhook instead of setting a new one
        #[arg(long, conflicts_with_all = ["url", "info"])]
        delete: bool,

        /// Print the current webhook status and exit
        #[arg(long, conflicts_with = "url")]
        info: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();

    let Command::SetupWebhook { url, delete, info } = cli.command;
    let action = if delete {
        WebhookAction::Delete
    } else if info {
        WebhookAction::Info
    } else {
        WebhookAction::Set(url)
    };

    let gateway = TelegramGateway::new(&config.bot)?;
    let setup = WebhookSetup::new(&gateway, &config.bot);
    setup.run(action, &mut std::io::stdout()).await
}
