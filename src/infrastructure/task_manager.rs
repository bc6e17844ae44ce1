use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Identifies one scheduled reconnect timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

/// Owns the channel's background tasks: at most one session task and at most
/// one pending reconnect timer.
///
/// Replacing or cancelling a slot aborts the task that was in it.
pub struct TaskManager {
    runtime: Handle,
    session: Option<JoinHandle<()>>,
    reconnect: Option<(TimerId, JoinHandle<()>)>,
    next_timer: u64,
}

impl TaskManager {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            session: None,
            reconnect: None,
            next_timer: 0,
        }
    }

    /// Spawn a session task, aborting any previous one
    pub fn spawn_session<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.session.replace(self.runtime.spawn(future)) {
            previous.abort();
        }
    }

    /// Run `then` after `delay`, replacing any pending timer.
    ///
    /// `then` receives the timer's id; it must [`claim_reconnect`](Self::claim_reconnect)
    /// it before acting, since the timer may have been cancelled after it fired.
    pub fn schedule_reconnect<F>(&mut self, delay: Duration, then: F) -> TimerId
    where
        F: FnOnce(TimerId) + Send + 'static,
    {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            then(id);
        });
        if let Some((_, previous)) = self.reconnect.replace((id, timer)) {
            previous.abort();
        }
        id
    }

    /// Take ownership of a fired timer. Returns `false` if `id` was cancelled
    /// or replaced in the meantime.
    pub fn claim_reconnect(&mut self, id: TimerId) -> bool {
        // Not aborted: the caller is the timer task itself
        self.reconnect
            .take_if(|(pending, _)| *pending == id)
            .is_some()
    }

    /// Cancel a pending reconnect timer. Returns whether one was pending.
    pub fn cancel_reconnect(&mut self) -> bool {
        match self.reconnect.take() {
            Some((_, timer)) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    /// Abort the session task (used when a handshake must not complete)
    pub fn abort_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.abort();
        }
    }

    /// Forget the session task, letting it finish on its own
    pub fn detach_session(&mut self) {
        self.session = None;
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        self.cancel_reconnect();
        self.abort_session();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
