use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, AppShell, AttemptOutcome, ProfileField, Settings};
use oauth_integration::{SimulatedConsent, SimulatedConsentLauncher};
use shared::{
    domain::{EngineKind, SessionIdentity},
    protocol::ShellEvent,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// TOML settings file; defaults to ./vibe.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Zero every simulated delay.
    #[arg(long)]
    instant: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Email/password sign-in.
    Login {
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Sign-in through the simulated consent window.
    Federated {
        #[arg(long)]
        popup_blocked: bool,
        /// Close the consent window without choosing an account.
        #[arg(long, conflicts_with = "deny")]
        dismiss: bool,
        /// Have the provider refuse consent.
        #[arg(long)]
        deny: bool,
        #[arg(long, default_value_t = 1200)]
        consent_after_ms: u64,
    },
    /// Sign in, edit the profile, verify a store and save.
    Demo {
        #[arg(long, default_value = "alex@vibe.app")]
        email: String,
        #[arg(long, default_value = "https://nas.example.net")]
        store_address: String,
        /// Image file to stage as the avatar.
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = if cli.instant {
        Settings::instant()
    } else {
        load_settings(cli.config.as_deref())?
    };

    match cli.command {
        Command::Login { email, password } => {
            let shell = AppShell::new(settings, launcher(SimulatedConsent::Manual));
            let printer = print_events(shell.subscribe_events());
            shell.open_login().await;
            let outcome = shell.submit_credentials(&email, password).await?;
            report_login(outcome)?;
            finish(shell, printer).await
        }
        Command::Federated {
            popup_blocked,
            dismiss,
            deny,
            consent_after_ms,
        } => {
            let after = if cli.instant {
                Duration::ZERO
            } else {
                Duration::from_millis(consent_after_ms)
            };
            let behaviour = if popup_blocked {
                SimulatedConsent::Blocked
            } else if deny {
                SimulatedConsent::Deny { after }
            } else if dismiss {
                SimulatedConsent::Dismiss { after }
            } else {
                SimulatedConsent::Choose { after }
            };
            let shell = AppShell::new(settings, launcher(behaviour));
            let printer = print_events(shell.subscribe_events());
            shell.open_login().await;
            let result = shell.submit_federated_login().await;
            finish(shell, printer).await?;
            report_login(result?)
        }
        Command::Demo {
            email,
            store_address,
            avatar,
        } => {
            let avatar = match avatar {
                Some(path) => Some(
                    std::fs::read(&path)
                        .with_context(|| format!("failed to read avatar '{}'", path.display()))?,
                ),
                None => None,
            };
            let shell = AppShell::new(settings, launcher(SimulatedConsent::Manual));
            let printer = print_events(shell.subscribe_events());
            run_demo(&shell, &email, &store_address, avatar.as_deref()).await?;
            finish(shell, printer).await
        }
    }
}

fn launcher(behaviour: SimulatedConsent) -> Arc<SimulatedConsentLauncher> {
    Arc::new(SimulatedConsentLauncher::new(behaviour))
}

async fn run_demo(
    shell: &AppShell,
    email: &str,
    store_address: &str,
    avatar: Option<&[u8]>,
) -> Result<()> {
    shell.open_login().await;
    report_login(shell.submit_credentials(email, "demo-password").await?)?;

    shell.open_editor().await;
    for field in [
        ProfileField::ToggleInterest("Music".into()),
        ProfileField::ToggleInterest("Gaming".into()),
        ProfileField::Radius(40),
        ProfileField::StoreEngine(EngineKind::Postgres),
        ProfileField::StoreAddress(store_address.to_string()),
    ] {
        shell.update_field(field).await?;
    }
    if let Some(bytes) = avatar {
        let staged = shell.upload_avatar(bytes).await?;
        info!(width = staged.width, height = staged.height, "avatar staged");
    }

    let tested = shell.test_external_connection().await?;
    info!(?tested, "connection test finished");

    match shell.save().await? {
        AttemptOutcome::Completed(profile) => {
            info!(
                display_name = %profile.display_name,
                interests = ?profile.interests,
                "profile committed"
            );
            Ok(())
        }
        AttemptOutcome::Superseded => bail!("profile save was abandoned"),
    }
}

fn report_login(outcome: AttemptOutcome<SessionIdentity>) -> Result<()> {
    match outcome {
        AttemptOutcome::Completed(identity) => {
            info!(
                identifier = %identity.identifier,
                session_id = %identity.session_id,
                "signed in"
            );
            Ok(())
        }
        AttemptOutcome::Superseded => bail!("sign-in was abandoned"),
    }
}

fn print_events(mut events: broadcast::Receiver<ShellEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!("failed to encode event: {err}"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Drops the shell so the event channel closes, then waits for the printer.
async fn finish(shell: AppShell, printer: JoinHandle<()>) -> Result<()> {
    drop(shell);
    printer.await.context("event printer panicked")
}
