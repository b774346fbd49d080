use crate::cli::{BackupArgs, CredentialArgs, DeleteArgs, SelectionArgs};
use crate::config::Config;
use crate::credentials::{Credentials, Prompter};
use crate::error::UsageError;
use crate::media::{
    run_batch, BatchAction, BatchEvent, BatchSummary, ProgressReporter, Selection,
};
use crate::platform::{collect_media, PlatformClient};
use anyhow::{bail, Context, Result};
use tracing::info;

/// Everything a command needs from the outside world.
pub struct Runtime<'a, C: ?Sized, R: ?Sized> {
    pub client: &'a C,
    pub reporter: &'a mut R,
    pub prompter: &'a dyn Prompter,
    pub env: &'a dyn Fn(&str) -> Option<String>,
    pub config: &'a Config,
}

pub async fn run_delete<C, R>(
    args: &DeleteArgs,
    runtime: Runtime<'_, C, R>,
) -> Result<BatchSummary>
where
    C: PlatformClient + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let selection = parse_selection(&args.selection)?;
    run_media_command(
        selection,
        args.selection.all_pages,
        BatchAction::Delete,
        &args.credentials,
        runtime,
    )
    .await
}

pub async fn run_backup<C, R>(
    args: &BackupArgs,
    runtime: Runtime<'_, C, R>,
) -> Result<BatchSummary>
where
    C: PlatformClient + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let selection = parse_selection(&args.selection)?;
    let destination = args
        .output
        .clone()
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(UsageError::MissingOutput)?;

    run_media_command(
        selection,
        args.selection.all_pages,
        BatchAction::Backup { destination },
        &args.credentials,
        runtime,
    )
    .await
}

fn parse_selection(args: &SelectionArgs) -> Result<Selection> {
    Ok(Selection::from_flags(args.size.as_deref(), args.date.as_deref())?)
}

/// Shared flow once the command line has been validated.
async fn run_media_command<C, R>(
    selection: Selection,
    all_pages: bool,
    action: BatchAction,
    credentials: &CredentialArgs,
    runtime: Runtime<'_, C, R>,
) -> Result<BatchSummary>
where
    C: PlatformClient + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let Runtime {
        client,
        reporter,
        prompter,
        env,
        config,
    } = runtime;

    let credentials = Credentials::resolve(
        credentials.username.clone(),
        credentials.password.clone(),
        env,
        prompter,
    )?;

    let session = client
        .login(&credentials.username, &credentials.password)
        .await
        .with_context(|| format!("Could not log in as {}", credentials.username))?;
    info!("Logged in as {}", session.username);
    reporter.report(BatchEvent::LoggedIn {
        user_id: session.user_id,
    });

    let media = collect_media(client, &session, config.pagination_mode(all_pages)).await?;
    if media.is_empty() {
        reporter.report(BatchEvent::NoMedia);
        return Ok(BatchSummary::default());
    }

    let selected = selection.apply(&media);
    info!(
        "Selected {} of {} media item(s) to {}",
        selected.len(),
        media.len(),
        action.verb()
    );

    let summary = run_batch(
        client,
        &session,
        &selected,
        &action,
        config.batch.on_failure,
        reporter,
    )
    .await?;

    if !summary.failed.is_empty() {
        let failed: Vec<String> = summary
            .failed
            .iter()
            .map(|(index, pk)| format!("[{}] {}", index, pk))
            .collect();
        bail!(
            "Failed to {} {} of {} item(s): {}",
            action.verb(),
            summary.failed.len(),
            summary.attempted(),
            failed.join(", ")
        );
    }

    Ok(summary)
}
