use tarot_core::auth::SignUpOutcome;
use tarot_core::Identity;

use crate::app::App;
use crate::cli::AuthCommands;
use crate::error::CliError;

pub async fn run_auth(app: &App, command: AuthCommands) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let services = app.require_remote()?;
            let session = services.accounts.sign_in(&email, &password).await?;
            let state = app
                .engine
                .ready_for(&Identity::signed_in(session.user.id.clone()))
                .await;
            let email_label = session.user.email.as_deref().unwrap_or(&email);
            println!(
                "Signed in as {email_label} ({} favorites, {} notes, {} spreads)",
                state.favorites.len(),
                state.notes.len(),
                state.spreads.len()
            );
            Ok(())
        }
        AuthCommands::Signup {
            email,
            password,
            invite,
        } => {
            let services = app.require_remote()?;
            match services.accounts.sign_up(&email, &password, &invite).await? {
                SignUpOutcome::SignedIn(session) => {
                    app.engine
                        .ready_for(&Identity::signed_in(session.user.id.clone()))
                        .await;
                    println!("Account created; signed in as {email}");
                }
                SignUpOutcome::ConfirmationRequired { .. } => {
                    println!(
                        "Account created. Confirm the email sent to {email}, then run `tarot auth login`."
                    );
                }
            }
            Ok(())
        }
        AuthCommands::Status => {
            let Some(services) = app.remote.as_ref() else {
                println!("Local-only mode: no remote is configured.");
                return Ok(());
            };
            match services.accounts.current_session() {
                Some(session) => {
                    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Signed in to {} as {} (expires_at={})",
                        services.project.url, email_label, session.expires_at
                    );
                }
                None => println!("Not signed in to {}", services.project.url),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let services = app.require_remote()?;
            let result = services.accounts.sign_out().await;
            app.engine.ready_for(&Identity::SignedOut).await;
            result?;
            println!("Signed out of {}", services.project.url);
            Ok(())
        }
    }
}
