use std::path::Path;

use tarot_core::invite::generate_invite_codes;

use crate::app::App;
use crate::cli::InviteCommands;
use crate::error::CliError;

pub async fn run_invites(app: &App, command: InviteCommands) -> Result<(), CliError> {
    match command {
        InviteCommands::Generate {
            count,
            upload,
            output,
        } => run_generate(app, count, upload, output.as_deref()).await,
    }
}

async fn run_generate(
    app: &App,
    count: usize,
    upload: bool,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    if count == 0 {
        return Err(CliError::Config("Invite count must be at least 1".into()));
    }
    let codes = generate_invite_codes(count, &mut rand::thread_rng());

    if upload {
        let services = app.require_remote()?;
        if services.accounts.current_session().is_none() {
            return Err(CliError::NotSignedIn);
        }
        services.invites.issue(&codes).await?;
        tracing::info!("Uploaded {} invite codes", codes.len());
    }

    if let Some(path) = output_path {
        std::fs::write(path, serde_json::to_string_pretty(&codes)?)?;
        eprintln!("Wrote {} codes to {}", codes.len(), path.display());
    }
    for invite in &codes {
        println!("{}", invite.code);
    }
    Ok(())
}
