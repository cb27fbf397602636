use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// Re-export types from the library crate
pub use page_export::{
    CancelHandle, ExportOptions, ExportSummary, Exporter, PdfSink, ProgressObserver,
    ProgressState, SoftwareRasterizer, SurfaceTree,
};

/// Commands sent from a front-end to the export worker
#[derive(Debug)]
pub enum ExportCommand {
    Run {
        tree: SurfaceTree,
        options: ExportOptions,
        output_path: PathBuf,
    },
    /// Cancel the export in flight, if any; takes effect between units
    Cancel,
}

/// Updates sent from the export worker to a front-end
#[derive(Debug, Clone)]
pub enum ExportUpdate {
    Progress {
        current: usize,
        total: usize,
        status: String,
    },
    Complete {
        path: PathBuf,
        summary: ExportSummary,
    },
    Error {
        message: String,
    },
}

/// Observer forwarding driver progress over an update channel
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ExportUpdate>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<ExportUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn progress(&mut self, state: &ProgressState) {
        // A closed channel just means nobody is watching anymore
        let _ = self.tx.send(ExportUpdate::Progress {
            current: state.current,
            total: state.total,
            status: state.status.clone(),
        });
    }
}

/// Spawn the export worker, returning its command and update channels.
///
/// Runs start as they arrive and may overlap; `Cancel` flips the cancel
/// handle of every run still in flight. The worker exits when the
/// command channel closes.
pub fn spawn_worker() -> (
    mpsc::UnboundedSender<ExportCommand>,
    mpsc::UnboundedReceiver<ExportUpdate>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_loop(cmd_rx, update_tx));
    (cmd_tx, update_rx)
}

async fn worker_loop(
    mut commands: mpsc::UnboundedReceiver<ExportCommand>,
    updates: mpsc::UnboundedSender<ExportUpdate>,
) {
    // One entry per run still in flight, so Cancel reaches all of them
    let mut active: Vec<(CancelHandle, JoinHandle<()>)> = Vec::new();

    while let Some(command) = commands.recv().await {
        match command {
            ExportCommand::Run {
                mut tree,
                options,
                output_path,
            } => {
                active.retain(|(_, task)| !task.is_finished());

                let title = options.title.clone();
                let mut exporter = Exporter::new(
                    SoftwareRasterizer::new(),
                    PdfSink::new(&title),
                    options,
                )
                .with_observer(Box::new(ChannelObserver::new(updates.clone())));
                let cancel = exporter.cancel_handle();

                let updates = updates.clone();
                let task = tokio::spawn(async move {
                    match exporter.export(&mut tree, &output_path).await {
                        Ok(summary) => {
                            let _ = updates.send(ExportUpdate::Complete {
                                path: output_path,
                                summary,
                            });
                        }
                        Err(e) => {
                            log::error!("export failed: {}", e);
                            let _ = updates.send(ExportUpdate::Error {
                                message: e.to_string(),
                            });
                        }
                    }
                });
                active.push((cancel, task));
            }
            ExportCommand::Cancel => {
                for (cancel, _) in active.drain(..) {
                    cancel.cancel();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_export::{InlineStyle, SurfaceContent};

    #[tokio::test]
    async fn test_worker_runs_export_and_reports_completion() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");

        let mut tree = SurfaceTree::new();
        let body = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);
        tree.set_body(body);
        tree.add_surface(
            body,
            InlineStyle {
                height_px: Some(100),
                ..InlineStyle::default()
            },
            SurfaceContent::Fill([20, 20, 20, 255]),
        );

        let (commands, mut updates) = spawn_worker();
        commands
            .send(ExportCommand::Run {
                tree,
                options: ExportOptions::default(),
                output_path: output.clone(),
            })
            .unwrap();

        let mut saw_progress = false;
        loop {
            match updates.recv().await.expect("worker dropped updates") {
                ExportUpdate::Progress { current, total, .. } => {
                    assert!(current <= total || total == 0);
                    saw_progress = true;
                }
                ExportUpdate::Complete { path, summary } => {
                    assert_eq!(path, output);
                    assert!(summary.content_pages >= 1);
                    break;
                }
                ExportUpdate::Error { message } => panic!("export failed: {}", message),
            }
        }
        assert!(saw_progress);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_cancel_reaches_every_run_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let (commands, mut updates) = spawn_worker();

        for name in ["a.pdf", "b.pdf"] {
            let mut tree = SurfaceTree::new();
            let body = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);
            tree.set_body(body);
            tree.add_surface(
                body,
                InlineStyle {
                    height_px: Some(100),
                    ..InlineStyle::default()
                },
                SurfaceContent::Fill([20, 20, 20, 255]),
            );
            commands
                .send(ExportCommand::Run {
                    tree,
                    options: ExportOptions::default(),
                    output_path: dir.path().join(name),
                })
                .unwrap();
        }
        // Both runs are still in flight when the cancel lands
        commands.send(ExportCommand::Cancel).unwrap();

        let mut cancelled = 0;
        while cancelled < 2 {
            match updates.recv().await.expect("worker dropped updates") {
                ExportUpdate::Progress { .. } => {}
                ExportUpdate::Complete { path, .. } => {
                    panic!("{} completed despite cancellation", path.display())
                }
                ExportUpdate::Error { message } => {
                    assert!(message.contains("cancelled"), "unexpected error: {}", message);
                    cancelled += 1;
                }
            }
        }
        assert!(!dir.path().join("a.pdf").exists());
        assert!(!dir.path().join("b.pdf").exists());
    }
}
