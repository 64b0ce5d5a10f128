use super::engine::{EventOutcome, PageEngine, RefreshRequester, Scheduler, Timer};
use super::overlay::OverlayView;
use super::tree::{Key, NodeId, PageHost, StructureNotifier};
use crate::components::history::{Entry, HistoryRecord, HistoryStore};
use crate::config::PageSettings;
use crate::error::{page_error, AppResult};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Closure run against the host page on the engine's timeline
pub type PageTask<P> = Box<dyn FnOnce(&mut P) + Send>;

/// Commands that can be sent to the page actor
pub enum PageCommand<P> {
    StructureChanged,
    Input {
        node: NodeId,
        trusted: bool,
    },
    KeyDown {
        node: NodeId,
        key: Key,
        respond: mpsc::Sender<EventOutcome>,
    },
    Focus {
        node: NodeId,
    },
    Blur {
        node: NodeId,
    },
    RowClicked {
        index: usize,
    },
    DeletePointerDown {
        index: usize,
        respond: mpsc::Sender<EventOutcome>,
    },
    DeleteClicked {
        index: usize,
    },
    /// Click on any element; only bound save controls react
    Clicked {
        node: NodeId,
    },
    Timer(Timer),
    LoadHistory(HistoryRecord),
    Snapshot(Vec<Entry>),
    GetEntries(mpsc::Sender<Vec<Entry>>),
    CurrentOverlay(mpsc::Sender<Option<OverlayView>>),
    WithPage(PageTask<P>),
    Shutdown,
}

/// Runs timers as spawned sleeps that post back into the actor's mailbox
struct TokioScheduler<P> {
    command_tx: mpsc::WeakSender<PageCommand<P>>,
}

impl<P: Send + 'static> Scheduler for TokioScheduler<P> {
    fn schedule(&mut self, delay: Duration, timer: Timer) {
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = command_tx.upgrade() {
                let _ = tx.send(PageCommand::Timer(timer)).await;
            }
        });
    }
}

/// The page actor that owns the engine
pub struct PageActor<P: PageHost> {
    engine: PageEngine<P>,
    command_rx: mpsc::Receiver<PageCommand<P>>,
    snapshots: Option<broadcast::Receiver<Vec<Entry>>>,
}

/// Handle for forwarding host events to the page actor
pub struct PageActorHandle<P> {
    command_tx: mpsc::Sender<PageCommand<P>>,
}

impl<P> Clone for PageActorHandle<P> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<P: Send + 'static> PageActorHandle<P> {
    async fn send(&self, command: PageCommand<P>) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| page_error(&format!("Actor mailbox error: {}", e)))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(mpsc::Sender<T>) -> PageCommand<P>,
    ) -> AppResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.send(command(response_tx)).await?;
        response_rx
            .recv()
            .await
            .ok_or_else(|| page_error("Response channel closed"))
    }

    pub async fn structure_changed(&self) -> AppResult<()> {
        self.send(PageCommand::StructureChanged).await
    }

    pub async fn input(&self, node: NodeId, trusted: bool) -> AppResult<()> {
        self.send(PageCommand::Input { node, trusted }).await
    }

    pub async fn key_down(&self, node: NodeId, key: Key) -> AppResult<EventOutcome> {
        self.request(|respond| PageCommand::KeyDown { node, key, respond })
            .await
    }

    pub async fn focus(&self, node: NodeId) -> AppResult<()> {
        self.send(PageCommand::Focus { node }).await
    }

    pub async fn blur(&self, node: NodeId) -> AppResult<()> {
        self.send(PageCommand::Blur { node }).await
    }

    pub async fn row_clicked(&self, index: usize) -> AppResult<()> {
        self.send(PageCommand::RowClicked { index }).await
    }

    pub async fn delete_pointer_down(&self, index: usize) -> AppResult<EventOutcome> {
        self.request(|respond| PageCommand::DeletePointerDown { index, respond })
            .await
    }

    pub async fn delete_clicked(&self, index: usize) -> AppResult<()> {
        self.send(PageCommand::DeleteClicked { index }).await
    }

    pub async fn clicked(&self, node: NodeId) -> AppResult<()> {
        self.send(PageCommand::Clicked { node }).await
    }

    pub async fn load_history(&self, record: HistoryRecord) -> AppResult<()> {
        self.send(PageCommand::LoadHistory(record)).await
    }

    pub async fn snapshot(&self, entries: Vec<Entry>) -> AppResult<()> {
        self.send(PageCommand::Snapshot(entries)).await
    }

    /// Current history contents, most recent first
    pub async fn entries(&self) -> AppResult<Vec<Entry>> {
        self.request(PageCommand::GetEntries).await
    }

    pub async fn current_overlay(&self) -> AppResult<Option<OverlayView>> {
        self.request(PageCommand::CurrentOverlay).await
    }

    /// Run `f` against the host page between engine events
    pub async fn with_page<R, F>(&self, f: F) -> AppResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut P) -> R + Send + 'static,
    {
        self.request(|respond: mpsc::Sender<R>| {
            PageCommand::WithPage(Box::new(move |page: &mut P| {
                let _ = respond.try_send(f(page));
            }))
        })
        .await
    }

    /// Callback for [`StructureNotifier`] that enqueues a rescan
    pub fn structure_callback(&self) -> Box<dyn FnMut() + Send> {
        let command_tx = self.command_tx.downgrade();
        Box::new(move || {
            if let Some(tx) = command_tx.upgrade() {
                if let Err(e) = tx.try_send(PageCommand::StructureChanged) {
                    debug!("Dropped structure change notification: {}", e);
                }
            }
        })
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(PageCommand::Shutdown).await;
        Ok(())
    }
}

impl<P: PageHost + StructureNotifier + Send + 'static> PageActor<P> {
    /// Create a new actor and return its handle
    pub fn new(mut page: P, store: HistoryStore, settings: PageSettings) -> (Self, PageActorHandle<P>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let handle = PageActorHandle { command_tx };

        page.on_structure_changed(handle.structure_callback());
        let scheduler = TokioScheduler {
            command_tx: handle.command_tx.downgrade(),
        };

        let actor = Self {
            engine: PageEngine::new(page, store, settings, Box::new(scheduler)),
            command_rx,
            snapshots: None,
        };
        (actor, handle)
    }

    pub fn with_refresher(mut self, refresher: Box<dyn RefreshRequester>) -> Self {
        self.engine = self.engine.with_refresher(refresher);
        self
    }

    /// Adopt every snapshot published on `snapshots`
    pub fn with_snapshots(mut self, snapshots: broadcast::Receiver<Vec<Entry>>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Page actor started");
        self.engine.structure_changed();

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(PageCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                snapshot = next_snapshot(&mut self.snapshots) => match snapshot {
                    Ok(entries) => self.engine.adopt_snapshot(entries),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} stale snapshots", skipped);
                    }
                    Err(RecvError::Closed) => {
                        debug!("Snapshot channel closed");
                        self.snapshots = None;
                    }
                },
            }
        }

        info!("Page actor shut down");
    }

    fn handle(&mut self, command: PageCommand<P>) {
        match command {
            PageCommand::StructureChanged => {
                self.engine.structure_changed();
            }
            PageCommand::Input { node, trusted } => self.engine.input(node, trusted),
            PageCommand::KeyDown { node, key, respond } => {
                let _ = respond.try_send(self.engine.key_down(node, key));
            }
            PageCommand::Focus { node } => self.engine.focus(node),
            PageCommand::Blur { node } => self.engine.blur(node),
            PageCommand::RowClicked { index } => {
                self.engine.row_clicked(index);
            }
            PageCommand::DeletePointerDown { index, respond } => {
                let _ = respond.try_send(self.engine.delete_pointer_down(index));
            }
            PageCommand::DeleteClicked { index } => {
                self.engine.delete_clicked(index);
            }
            PageCommand::Clicked { node } => self.engine.save_clicked(node),
            PageCommand::Timer(timer) => self.engine.timer_fired(timer),
            PageCommand::LoadHistory(record) => self.engine.load_history(record),
            PageCommand::Snapshot(entries) => self.engine.adopt_snapshot(entries),
            PageCommand::GetEntries(respond) => {
                let _ = respond.try_send(self.engine.store().entries().to_vec());
            }
            PageCommand::CurrentOverlay(respond) => {
                let _ = respond.try_send(self.engine.overlay().view());
            }
            PageCommand::WithPage(task) => task(self.engine.page_mut()),
            PageCommand::Shutdown => {}
        }
    }
}

async fn next_snapshot(
    snapshots: &mut Option<broadcast::Receiver<Vec<Entry>>>,
) -> Result<Vec<Entry>, RecvError> {
    match snapshots {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
