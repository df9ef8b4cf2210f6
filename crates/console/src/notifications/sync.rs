//! Background driver reconciling the notification menu with the server.
//!
//! One task owns the [`NotificationState`] and multiplexes its inputs: view
//! commands, the unread-count poll, the push stream and completions of the
//! one-shot requests it fired. Views observe through a `watch` channel.

use super::state::NotificationState;
use chrono::Utc;
use crm_client::{NotificationApi, PushSource, PushStream};
use crm_core::config::NotificationConfig;
use crm_core::types::Notification;
use crm_core::CrmResult;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shortest unread-count poll period the driver accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub menu_page_size: u32,
    pub poll_interval: Duration,
    pub push_enabled: bool,
    pub command_buffer: usize,
}

impl From<&NotificationConfig> for SyncOptions {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            menu_page_size: config.menu_page_size,
            poll_interval: config.poll_interval(),
            push_enabled: config.push_enabled,
            command_buffer: config.command_buffer,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

#[derive(Debug)]
enum Command {
    OpenMenu,
    CloseMenu,
    MarkRead(String),
    MarkAllRead,
    RefreshUnread,
}

enum Outcome {
    Subscribed(CrmResult<PushStream>),
    Fetched {
        seq: u64,
        result: CrmResult<Vec<Notification>>,
    },
    UnreadCount(CrmResult<u64>),
    MarkedRead {
        id: String,
        result: CrmResult<()>,
    },
    MarkedAllRead(CrmResult<()>),
}

/// Handle to a running notification driver. Starting it mounts the menu;
/// [`shutdown`](Self::shutdown) or dropping the handle unmounts it.
pub struct NotificationSync {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<NotificationState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NotificationSync {
    /// Spawn the driver. The unread count is polled immediately and then on
    /// every interval (at least [`MIN_POLL_INTERVAL`]); the push subscription
    /// opens in the background when a source is given and push is enabled.
    pub fn start(
        api: Arc<dyn NotificationApi>,
        push: Option<Arc<dyn PushSource>>,
        mut options: SyncOptions,
    ) -> Self {
        options.poll_interval = options.poll_interval.max(MIN_POLL_INTERVAL);
        let (commands, command_rx) = mpsc::channel(options.command_buffer.max(1));
        let (publisher, snapshots) = watch::channel(NotificationState::new());
        let (shutdown, shutdown_rx) = oneshot::channel();
        let push = push.filter(|_| options.push_enabled);

        info!(
            poll_interval_secs = options.poll_interval.as_secs(),
            menu_page_size = options.menu_page_size,
            push = push.is_some(),
            "Notification sync started"
        );

        let driver = Driver {
            api,
            options,
            state: NotificationState::new(),
            publisher,
            inflight: JoinSet::new(),
            fetch_seq: 0,
        };
        let task = tokio::spawn(driver.run(command_rx, shutdown_rx, push));

        Self {
            commands,
            snapshots,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    pub fn snapshot(&self) -> NotificationState {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.snapshots.clone()
    }

    /// Open the menu and fetch the most recent page.
    pub async fn open_menu(&self) {
        self.send(Command::OpenMenu).await;
    }

    pub async fn close_menu(&self) {
        self.send(Command::CloseMenu).await;
    }

    pub async fn mark_read(&self, id: impl Into<String>) {
        self.send(Command::MarkRead(id.into())).await;
    }

    pub async fn mark_all_read(&self) {
        self.send(Command::MarkAllRead).await;
    }

    /// Poll the unread count now, outside the regular interval.
    pub async fn refresh_unread(&self) {
        self.send(Command::RefreshUnread).await;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the driver and wait for it. In-flight requests are aborted, the
    /// push subscription is released and no snapshot is published after this
    /// returns.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Notification sync task panicked");
                }
            }
        }
    }

    async fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command).await {
            debug!(command = ?e.0, "Notification sync stopped, command dropped");
        }
    }
}

impl Drop for NotificationSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Driver {
    api: Arc<dyn NotificationApi>,
    options: SyncOptions,
    state: NotificationState,
    publisher: watch::Sender<NotificationState>,
    inflight: JoinSet<Outcome>,
    /// Sequence of the latest open-menu fetch. Older responses are dropped.
    fetch_seq: u64,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: oneshot::Receiver<()>,
        push_source: Option<Arc<dyn PushSource>>,
    ) {
        if let Some(source) = push_source {
            self.inflight
                .spawn(async move { Outcome::Subscribed(source.subscribe().await) });
        }

        let mut poll = tokio::time::interval(self.options.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut push: Option<PushStream> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = poll.tick() => self.spawn_unread_poll(),
                item = next_push(&mut push) => match item {
                    Some(Ok(notification)) => self.on_push(notification),
                    Some(Err(e)) => warn!(error = %e, "Push channel error"),
                    None => {
                        info!("Push channel closed, continuing with poll only");
                        push = None;
                    }
                },
                Some(done) = self.inflight.join_next(), if !self.inflight.is_empty() => match done {
                    Ok(Outcome::Subscribed(Ok(stream))) => {
                        debug!("Push subscription open");
                        push = Some(stream);
                    }
                    Ok(Outcome::Subscribed(Err(e))) => {
                        warn!(error = %e, "Push subscription failed, continuing with poll only");
                    }
                    Ok(outcome) => self.apply(outcome),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!(error = %e, "Notification request task failed"),
                },
            }
        }

        self.inflight.abort_all();
        debug!("Notification sync stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::OpenMenu => {
                self.state.open_menu();
                self.state.begin_fetch();
                self.fetch_seq += 1;
                let seq = self.fetch_seq;
                let limit = self.options.menu_page_size;
                let api = self.api.clone();
                self.inflight.spawn(async move {
                    Outcome::Fetched {
                        seq,
                        result: api.recent(limit).await,
                    }
                });
                self.publish();
            }
            Command::CloseMenu => {
                self.state.close_menu();
                self.publish();
            }
            Command::MarkRead(id) => {
                if self.state.mark_read(&id, Utc::now()) {
                    self.publish();
                }
                let api = self.api.clone();
                self.inflight.spawn(async move {
                    let result = api.mark_read(&id).await;
                    Outcome::MarkedRead { id, result }
                });
            }
            Command::MarkAllRead => {
                self.state.mark_all_read(Utc::now());
                self.publish();
                let api = self.api.clone();
                self.inflight
                    .spawn(async move { Outcome::MarkedAllRead(api.mark_all_read().await) });
            }
            Command::RefreshUnread => self.spawn_unread_poll(),
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fetched { seq, result } => {
                if seq != self.fetch_seq {
                    debug!(seq, latest = self.fetch_seq, "Dropping superseded notification fetch");
                    return;
                }
                match result {
                    Ok(items) => {
                        debug!(count = items.len(), "Notifications fetched");
                        self.state.fetch_succeeded(items);
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to fetch notifications");
                        self.state.fetch_failed();
                    }
                }
                self.publish();
            }
            Outcome::UnreadCount(Ok(count)) => {
                self.state.set_unread_count(count);
                self.publish();
            }
            Outcome::UnreadCount(Err(e)) => {
                metrics::counter!("notifications.poll.failed").increment(1);
                warn!(error = %e, "Failed to poll unread notification count");
            }
            Outcome::MarkedRead { id, result } => {
                if let Err(e) = result {
                    warn!(notification_id = %id, error = %e, "Failed to mark notification read");
                }
                self.spawn_unread_poll();
            }
            Outcome::MarkedAllRead(Ok(())) => debug!("All notifications marked read"),
            Outcome::MarkedAllRead(Err(e)) => {
                warn!(error = %e, "Failed to mark all notifications read");
            }
            Outcome::Subscribed(_) => {}
        }
    }

    fn on_push(&mut self, notification: Notification) {
        metrics::counter!("notifications.push.received").increment(1);
        let id = notification.id.clone();
        if self.state.receive_push(notification) {
            debug!(notification_id = %id, "Pushed notification listed");
        } else {
            metrics::counter!("notifications.push.duplicate").increment(1);
            debug!(notification_id = %id, "Pushed notification already listed");
        }
        self.publish();
    }

    fn spawn_unread_poll(&mut self) {
        let api = self.api.clone();
        self.inflight
            .spawn(async move { Outcome::UnreadCount(api.unread_count().await) });
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

/// Next pushed item, or never when there is no subscription.
async fn next_push(push: &mut Option<PushStream>) -> Option<CrmResult<Notification>> {
    match push.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crm_client::ChannelPushSource;
    use crm_core::CrmError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    /// First `recent` call is held until released; later calls answer at once.
    struct StaggeredFetches {
        calls: AtomicUsize,
        first_done: AtomicBool,
        first_release: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl NotificationApi for StaggeredFetches {
        async fn recent(&self, _limit: u32) -> CrmResult<Vec<Notification>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Ok(vec![notification("fresh")]);
            }
            let gate = self.first_release.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.first_done.store(true, Ordering::SeqCst);
            Ok(vec![notification("stale")])
        }

        async fn unread_count(&self) -> CrmResult<u64> {
            Ok(0)
        }

        async fn mark_read(&self, _id: &str) -> CrmResult<()> {
            Ok(())
        }

        async fn mark_all_read(&self) -> CrmResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeApi {
        listed: Mutex<Vec<Notification>>,
        unread: AtomicU64,
        fail_recent: AtomicBool,
        polls: AtomicUsize,
        marked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationApi for FakeApi {
        async fn recent(&self, limit: u32) -> CrmResult<Vec<Notification>> {
            if self.fail_recent.load(Ordering::SeqCst) {
                return Err(CrmError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(self.listed.lock().iter().take(limit as usize).cloned().collect())
        }

        async fn unread_count(&self) -> CrmResult<u64> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.unread.load(Ordering::SeqCst))
        }

        async fn mark_read(&self, id: &str) -> CrmResult<()> {
            self.marked.lock().push(id.to_string());
            Ok(())
        }

        async fn mark_all_read(&self) -> CrmResult<()> {
            self.marked.lock().push("*".into());
            Ok(())
        }
    }

    fn notification(id: &str) -> Notification {
        Notification {
            id: id.into(),
            kind: "AppointmentBooked".into(),
            message: format!("Appointment {id} booked"),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    fn push(source: &ChannelPushSource) -> Option<Arc<dyn PushSource>> {
        Some(Arc::new(source.clone()))
    }

    fn options() -> SyncOptions {
        SyncOptions {
            menu_page_size: 5,
            poll_interval: Duration::from_secs(3600),
            push_enabled: true,
            command_buffer: 16,
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<NotificationState>,
        what: impl Fn(&NotificationState) -> bool,
    ) -> NotificationState {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if what(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.expect("driver stopped");
            }
        })
        .await
        .expect("timed out waiting for notification state")
    }

    #[tokio::test]
    async fn test_polls_on_start() {
        let api = Arc::new(FakeApi::default());
        api.unread.store(4, Ordering::SeqCst);
        let sync = NotificationSync::start(api.clone(), None, options());
        let mut rx = sync.subscribe();

        let state = wait_for(&mut rx, |s| s.unread_count == 4).await;
        assert!(state.items.is_empty());
        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_menu_fetches_page() {
        let api = Arc::new(FakeApi::default());
        *api.listed.lock() = (1..=7).map(|i| notification(&format!("n{i}"))).collect();
        let sync = NotificationSync::start(api.clone(), None, options());
        let mut rx = sync.subscribe();

        sync.open_menu().await;
        let state = wait_for(&mut rx, |s| s.menu_open && !s.loading && !s.items.is_empty()).await;
        assert_eq!(state.items.len(), 5);
        assert_eq!(state.items[0].id, "n1");

        api.fail_recent.store(true, Ordering::SeqCst);
        sync.close_menu().await;
        wait_for(&mut rx, |s| !s.menu_open).await;
        sync.open_menu().await;
        let state = wait_for(&mut rx, |s| s.menu_open && !s.loading).await;
        assert_eq!(state.items.len(), 5);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_mark_read_refetches_count() {
        let api = Arc::new(FakeApi::default());
        *api.listed.lock() = vec![notification("a"), notification("b")];
        api.unread.store(2, Ordering::SeqCst);
        let sync = NotificationSync::start(api.clone(), None, options());
        let mut rx = sync.subscribe();

        sync.open_menu().await;
        wait_for(&mut rx, |s| s.items.len() == 2 && s.unread_count == 2).await;

        api.unread.store(1, Ordering::SeqCst);
        sync.mark_read("a").await;
        let state = wait_for(&mut rx, |s| s.unread_count == 1).await;
        assert!(state.items[0].is_read());
        assert!(!state.items[1].is_read());
        assert_eq!(state.items.len(), 2);
        assert_eq!(*api.marked.lock(), vec!["a".to_string()]);
        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_push_dedup_and_stream_end() {
        let api = Arc::new(FakeApi::default());
        *api.listed.lock() = vec![notification("a")];
        api.unread.store(100, Ordering::SeqCst);
        let source = ChannelPushSource::new(16);
        let sync = NotificationSync::start(api.clone(), push(&source), options());
        let mut rx = sync.subscribe();

        sync.open_menu().await;
        wait_for(&mut rx, |s| s.items.len() == 1 && s.unread_count == 100).await;
        while source.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }

        source.publish(notification("b"));
        source.publish(notification("a"));
        source.publish(notification("b"));
        let state = wait_for(&mut rx, |s| s.unread_count == 103).await;
        let ids: Vec<&str> = state.items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        // Closing the channel ends the stream; polling carries on.
        drop(source);
        api.unread.store(9, Ordering::SeqCst);
        sync.refresh_unread().await;
        wait_for(&mut rx, |s| s.unread_count == 9).await;
        assert!(sync.is_running());
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_mark_all_read_skips_refetch() {
        let api = Arc::new(FakeApi::default());
        *api.listed.lock() = vec![notification("a"), notification("b")];
        api.unread.store(2, Ordering::SeqCst);
        let sync = NotificationSync::start(api.clone(), None, options());
        let mut rx = sync.subscribe();

        sync.open_menu().await;
        wait_for(&mut rx, |s| s.items.len() == 2 && s.unread_count == 2).await;

        sync.mark_all_read().await;
        let state = wait_for(&mut rx, |s| s.unread_count == 0).await;
        assert!(state.items.iter().all(Notification::is_read));

        while api.marked.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_updates_after_shutdown() {
        let api = Arc::new(FakeApi::default());
        let source = ChannelPushSource::new(4);
        let sync = NotificationSync::start(api.clone(), push(&source), options());
        let mut rx = sync.subscribe();
        wait_for(&mut rx, |s| s.unread_count == 0).await;
        while source.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }

        sync.shutdown().await;
        rx.borrow_and_update();
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(source.publish(notification("late")), 0);
        assert!(rx.changed().await.is_err());
        assert_eq!(rx.borrow().unread_count, 0);
    }

    #[tokio::test]
    async fn test_push_disabled_skips_subscription() {
        let api = Arc::new(FakeApi::default());
        let source = ChannelPushSource::new(4);
        let opts = SyncOptions {
            push_enabled: false,
            ..options()
        };
        let sync = NotificationSync::start(api.clone(), push(&source), opts);
        let mut rx = sync.subscribe();
        wait_for(&mut rx, |_| api.polls.load(Ordering::SeqCst) == 1).await;
        assert_eq!(source.subscriber_count(), 0);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_dropped() {
        let (release, gate) = oneshot::channel();
        let api = Arc::new(StaggeredFetches {
            calls: AtomicUsize::new(0),
            first_done: AtomicBool::new(false),
            first_release: Mutex::new(Some(gate)),
        });
        let sync = NotificationSync::start(api.clone(), None, options());
        let mut rx = sync.subscribe();

        sync.open_menu().await;
        while api.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        sync.open_menu().await;
        let state = wait_for(&mut rx, |s| !s.loading && !s.items.is_empty()).await;
        assert_eq!(state.items[0].id, "fresh");

        release.send(()).unwrap();
        while !api.first_done.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ids: Vec<String> = sync.snapshot().items.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["fresh".to_string()]);
        assert!(!sync.snapshot().loading);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_poll_interval_is_clamped() {
        let api = Arc::new(FakeApi::default());
        api.unread.store(2, Ordering::SeqCst);
        let opts = SyncOptions {
            poll_interval: Duration::ZERO,
            ..options()
        };
        let sync = NotificationSync::start(api.clone(), None, opts);
        let mut rx = sync.subscribe();

        wait_for(&mut rx, |s| s.unread_count == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sync.is_running());
        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
        sync.shutdown().await;
    }
}
