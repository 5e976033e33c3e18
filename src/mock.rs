//! Mock host and clock for testing.

use crate::clock::Clock;
use crate::command::CommandBatch;
use crate::controller::PanelHost;
use crate::modes::{PanelMode, Te2Edges};
use crate::revision::PanelRevision;
use crate::te2::TimingStatus;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct MockHostState {
    sent: Vec<CommandBatch>,
    backlight_notifications: usize,
    active: bool,
    self_refresh: bool,
    revision: PanelRevision,
    brightness: u16,
    te2: Option<Result<Te2Edges, TimingStatus>>,
    fail_sends: usize,
}

/// A mock panel host for testing.
///
/// Records every batch sent to it. Clones share the same state, so a test
/// can hand one clone to [`PanelController`](crate::PanelController) and
/// inspect the other.
///
/// # Example
///
/// ```
/// use nt37290_core::{CommandBatch, MockHost, PanelHost};
///
/// let mut host = MockHost::new();
/// let mut batch = CommandBatch::new();
/// batch.push(&[0x29]);
/// host.send_batch(&batch).unwrap();
/// assert_eq!(host.sent().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockHost {
    state: Arc<Mutex<MockHostState>>,
}

impl MockHost {
    /// Create an active panel at the latest revision, brightness 1023.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockHostState {
                sent: Vec::new(),
                backlight_notifications: 0,
                active: true,
                self_refresh: false,
                revision: PanelRevision::Latest,
                brightness: 1023,
                te2: None,
                fail_sends: 0,
            })),
        }
    }

    /// All batches sent so far.
    pub fn sent(&self) -> Vec<CommandBatch> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Most recent batch, if any.
    pub fn last_sent(&self) -> Option<CommandBatch> {
        self.state.lock().unwrap().sent.last().cloned()
    }

    /// Forget recorded batches.
    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }

    /// Number of backlight change notifications received.
    pub fn backlight_notifications(&self) -> usize {
        self.state.lock().unwrap().backlight_notifications
    }

    /// Mark the panel powered on or off.
    pub fn set_active(&self, active: bool) {
        self.state.lock().unwrap().active = active;
    }

    /// Enter or leave self-refresh.
    pub fn set_self_refresh(&self, active: bool) {
        self.state.lock().unwrap().self_refresh = active;
    }

    /// Set the reported hardware revision.
    pub fn set_revision(&self, revision: PanelRevision) {
        self.state.lock().unwrap().revision = revision;
    }

    /// Set the reported backlight level.
    pub fn set_brightness(&self, brightness: u16) {
        self.state.lock().unwrap().brightness = brightness;
    }

    /// Override the TE2 timing lookup. By default the mode's own edges are
    /// returned, or [`TimingStatus::NotReady`] if it has none.
    pub fn set_te2(&self, result: Result<Te2Edges, TimingStatus>) {
        self.state.lock().unwrap().te2 = Some(result);
    }

    /// Make the next `count` sends fail with a broken pipe.
    pub fn fail_next_sends(&self, count: usize) {
        self.state.lock().unwrap().fail_sends = count;
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelHost for MockHost {
    fn send_batch(&mut self, batch: &CommandBatch) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock send failure"));
        }
        state.sent.push(batch.clone());
        Ok(())
    }

    fn current_mode_te2(&self, mode: &PanelMode) -> Result<Te2Edges, TimingStatus> {
        match self.state.lock().unwrap().te2 {
            Some(result) => result,
            None => mode.te2.ok_or(TimingStatus::NotReady),
        }
    }

    fn notify_backlight_changed(&mut self) {
        self.state.lock().unwrap().backlight_notifications += 1;
    }

    fn is_panel_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    fn is_self_refresh_active(&self) -> bool {
        self.state.lock().unwrap().self_refresh
    }

    fn hardware_revision(&self) -> PanelRevision {
        self.state.lock().unwrap().revision
    }

    fn brightness(&self) -> u16 {
        self.state.lock().unwrap().brightness
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Start at the current system time.
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
