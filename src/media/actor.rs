use super::types::MediaItem;
use crate::platform::{PlatformClient, Session};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchAction {
    Delete,
    Backup { destination: PathBuf },
}

impl BatchAction {
    pub fn verb(&self) -> &'static str {
        match self {
            BatchAction::Delete => "delete",
            BatchAction::Backup { .. } => "back up",
        }
    }
}

/// What to do when the action fails for one item.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure; remaining items are left untouched.
    #[default]
    Abort,
    /// Keep going and report every failure at the end.
    Continue,
}

#[derive(Debug)]
pub enum BatchEvent<'a> {
    LoggedIn {
        user_id: u64,
    },
    /// The feed was empty, nothing will be selected.
    NoMedia,
    Started {
        index: usize,
        item: &'a MediaItem,
        action: &'a BatchAction,
    },
    Completed {
        index: usize,
        item: &'a MediaItem,
    },
    Failed {
        index: usize,
        item: &'a MediaItem,
        error: &'a anyhow::Error,
    },
}

pub trait ProgressReporter {
    fn report(&mut self, event: BatchEvent<'_>);
}

/// The line shown to the user before acting on an item.
pub fn progress_line(action: &BatchAction, index: usize, item: &MediaItem) -> String {
    format!("Trying to {} [{}]: {}", action.verb(), index, item)
}

/// Prints one line per item on stdout and mirrors events to the log.
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&mut self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::LoggedIn { user_id } => println!("Retrieved user id: {}", user_id),
            BatchEvent::NoMedia => println!("No media found."),
            BatchEvent::Started {
                index,
                item,
                action,
            } => {
                println!("{}", progress_line(action, index, item));
                debug!(index, pk = %item.pk, "Started {}", action.verb());
            }
            BatchEvent::Completed { index, item } => {
                debug!(index, pk = %item.pk, "Completed");
            }
            BatchEvent::Failed { index, item, error } => {
                error!(index, pk = %item.pk, "Failed: {:#}", error);
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    /// 1-based index and pk of every item whose action failed.
    pub failed: Vec<(usize, String)>,
}

impl BatchSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Applies `action` to every selected item, strictly one at a time and in order.
pub async fn run_batch<C, R>(
    client: &C,
    session: &Session,
    selected: &[&MediaItem],
    action: &BatchAction,
    policy: FailurePolicy,
    reporter: &mut R,
) -> Result<BatchSummary>
where
    C: PlatformClient + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let mut summary = BatchSummary::default();

    for (offset, item) in selected.iter().enumerate() {
        let index = offset + 1;
        reporter.report(BatchEvent::Started {
            index,
            item,
            action,
        });

        let result = match action {
            BatchAction::Delete => client.delete_media(session, item).await,
            BatchAction::Backup { destination } => client
                .download_media(session, item, destination)
                .await
                .map(|paths| debug!("Wrote {} file(s) for {}", paths.len(), item.pk)),
        };

        match result {
            Ok(()) => {
                reporter.report(BatchEvent::Completed { index, item });
                summary.succeeded += 1;
            }
            Err(e) => {
                reporter.report(BatchEvent::Failed {
                    index,
                    item,
                    error: &e,
                });
                summary.failed.push((index, item.pk.clone()));

                if policy == FailurePolicy::Abort {
                    let remaining = selected.len() - index;
                    return Err(e.context(format!(
                        "Failed to {} item [{}] (pk={}), {} remaining item(s) skipped",
                        action.verb(),
                        index,
                        item.pk,
                        remaining
                    )));
                }
            }
        }
    }

    info!(
        "Processed {} item(s): {} succeeded, {} failed",
        summary.attempted(),
        summary.succeeded,
        summary.failed.len()
    );
    Ok(summary)
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingReporter;
    use super::*;
    use crate::platform::fake::{Call, FakePlatform};
    use tempfile::TempDir;

    async fn setup(fake: &FakePlatform) -> Session {
        fake.login("alice", "secret").await.unwrap()
    }

    #[test]
    fn test_progress_line_format() {
        let item = FakePlatform::item("m2", 2);
        assert_eq!(
            progress_line(&BatchAction::Delete, 1, &item),
            "Trying to delete [1]: pk=m2 photo taken_at=1970-01-01 00:00:02"
        );

        let backup = BatchAction::Backup {
            destination: "/tmp/out".into(),
        };
        assert_eq!(
            progress_line(&backup, 12, &item),
            "Trying to back up [12]: pk=m2 photo taken_at=1970-01-01 00:00:02"
        );
    }

    #[tokio::test]
    async fn test_delete_in_selection_order() {
        let items = FakePlatform::items(&[("m2", 2), ("m1", 1)]);
        let fake = FakePlatform::new(items.clone());
        let session = setup(&fake).await;
        let selected: Vec<_> = items.iter().collect();
        let mut reporter = RecordingReporter::default();

        let summary = run_batch(
            &fake,
            &session,
            &selected,
            &BatchAction::Delete,
            FailurePolicy::Abort,
            &mut reporter,
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert!(summary.failed.is_empty());
        assert_eq!(
            fake.calls()[1..],
            [
                Call::Delete { pk: "m2".into() },
                Call::Delete { pk: "m1".into() }
            ]
        );
        assert_eq!(
            reporter.events,
            vec!["delete [1] m2", "ok [1] m2", "delete [2] m1", "ok [2] m1"]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_does_nothing() {
        let fake = FakePlatform::new(Vec::new());
        let session = setup(&fake).await;
        let mut reporter = RecordingReporter::default();

        let summary = run_batch(
            &fake,
            &session,
            &[],
            &BatchAction::Delete,
            FailurePolicy::Abort,
            &mut reporter,
        )
        .await
        .unwrap();

        assert_eq!(summary.attempted(), 0);
        assert!(reporter.events.is_empty());
        assert_eq!(fake.network_calls(), 1);
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_failure() {
        let items = FakePlatform::items(&[("m3", 3), ("m2", 2), ("m1", 1)]);
        let fake = FakePlatform::new(items.clone()).failing_on("m2");
        let session = setup(&fake).await;
        let selected: Vec<_> = items.iter().collect();
        let mut reporter = RecordingReporter::default();

        let err = run_batch(
            &fake,
            &session,
            &selected,
            &BatchAction::Delete,
            FailurePolicy::Abort,
            &mut reporter,
        )
        .await
        .unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("item [2] (pk=m2)"));
        assert!(message.contains("1 remaining item(s) skipped"));
        assert_eq!(fake.count(|c| matches!(c, Call::Delete { .. })), 2);
        assert_eq!(reporter.started(), vec!["delete [1] m3", "delete [2] m2"]);
    }

    #[tokio::test]
    async fn test_continue_records_failures() {
        let items = FakePlatform::items(&[("m3", 3), ("m2", 2), ("m1", 1)]);
        let fake = FakePlatform::new(items.clone()).failing_on("m2");
        let session = setup(&fake).await;
        let selected: Vec<_> = items.iter().collect();
        let mut reporter = RecordingReporter::default();

        let summary = run_batch(
            &fake,
            &session,
            &selected,
            &BatchAction::Delete,
            FailurePolicy::Continue,
            &mut reporter,
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, vec![(2, "m2".to_string())]);
        assert_eq!(fake.count(|c| matches!(c, Call::Delete { .. })), 3);
    }

    #[tokio::test]
    async fn test_backup_downloads_to_destination() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out");
        let items = FakePlatform::items(&[("m1", 1)]);
        let fake = FakePlatform::new(items.clone());
        let session = setup(&fake).await;
        let selected: Vec<_> = items.iter().collect();
        let mut reporter = RecordingReporter::default();
        let action = BatchAction::Backup {
            destination: destination.clone(),
        };

        run_batch(
            &fake,
            &session,
            &selected,
            &action,
            FailurePolicy::Abort,
            &mut reporter,
        )
        .await
        .unwrap();

        assert!(destination.join("m1.jpg").exists());
        assert_eq!(reporter.started(), vec!["back up [1] m1"]);
        assert_eq!(
            fake.calls()[1..],
            [Call::Download {
                pk: "m1".into(),
                destination
            }]
        );
    }
}
