//! Default audio sink volume
//!
//! [`VolumeService::watch`] follows `pactl subscribe` and re-reads the sink
//! whenever the sound server reports a sink or server change. Only
//! properties whose value differs from the cached one are updated, so
//! listeners (the bar slider and the OSD) fire on real changes.

use std::cell::Cell;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{BackendError, BackendResult};
use crate::observable::{Property, Signal};
use crate::services::command::Invocation;
use crate::services::feed::{ChangeFeed, LineFeed};

static PERCENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("PERCENT_REGEX is a valid regex pattern"));

/// Volume and mute state of the default sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeState {
    /// Volume as a fraction; 1.0 is 100%, values above are overdrive
    pub volume: f64,
    /// Mute flag
    pub muted: bool,
}

/// Access to the sound server
#[async_trait(?Send)]
pub trait VolumeBackend {
    /// Reads the default sink
    ///
    /// # Errors
    ///
    /// Returns a backend error if the sound server cannot be queried.
    async fn read(&self) -> BackendResult<VolumeState>;

    /// Starts following sink changes
    ///
    /// # Errors
    ///
    /// Returns a backend error if the monitor cannot be started.
    fn watch(&self) -> BackendResult<Box<dyn ChangeFeed>>;

    /// Sets the default sink volume (fraction)
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn set_volume(&self, volume: f64) -> BackendResult<()>;

    /// Mutes or unmutes the default sink
    ///
    /// # Errors
    ///
    /// Returns a backend error if the command fails.
    async fn set_muted(&self, muted: bool) -> BackendResult<()>;
}

/// PulseAudio / PipeWire backend using `pactl`
#[derive(Debug, Clone, Copy, Default)]
pub struct PactlBackend;

const PACTL: &str = "pactl";
const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

#[async_trait(?Send)]
impl VolumeBackend for PactlBackend {
    async fn read(&self) -> BackendResult<VolumeState> {
        let volume = Invocation::new(PACTL, ["get-sink-volume", DEFAULT_SINK]).run().await?;
        let muted = Invocation::new(PACTL, ["get-sink-mute", DEFAULT_SINK]).run().await?;
        Ok(VolumeState {
            volume: parse_volume(&volume)?,
            muted: parse_mute(&muted)?,
        })
    }

    fn watch(&self) -> BackendResult<Box<dyn ChangeFeed>> {
        let feed = LineFeed::spawn(PACTL, &["subscribe"], is_sink_event)?;
        Ok(Box::new(feed))
    }

    async fn set_volume(&self, volume: f64) -> BackendResult<()> {
        let percent = format!("{}%", to_percent(volume));
        Invocation::new(PACTL, ["set-sink-volume", DEFAULT_SINK, percent.as_str()])
            .run()
            .await
            .map(|_| ())
    }

    async fn set_muted(&self, muted: bool) -> BackendResult<()> {
        let flag = if muted { "1" } else { "0" };
        Invocation::new(PACTL, ["set-sink-mute", DEFAULT_SINK, flag])
            .run()
            .await
            .map(|_| ())
    }
}

/// Whether a `pactl subscribe` line can affect the default sink
///
/// Sink events cover volume and mute; server events cover a new default sink.
#[must_use]
pub fn is_sink_event(line: &str) -> bool {
    line.starts_with("Event 'change'") && (line.contains(" on sink ") || line.ends_with(" on server"))
}

/// Averages the per-channel percentages of `pactl get-sink-volume`
///
/// # Errors
///
/// Returns [`BackendError::Parse`] if no percentage is present.
pub fn parse_volume(output: &str) -> BackendResult<f64> {
    let percents: Vec<f64> = PERCENT_REGEX
        .captures_iter(output)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .collect();
    if percents.is_empty() {
        return Err(BackendError::Parse {
            command: PACTL,
            output: output.to_string(),
        });
    }
    #[allow(clippy::cast_precision_loss)]
    let average = percents.iter().sum::<f64>() / percents.len() as f64;
    Ok(average / 100.0)
}

/// Parses `Mute: yes|no`
///
/// # Errors
///
/// Returns [`BackendError::Parse`] for anything else.
pub fn parse_mute(output: &str) -> BackendResult<bool> {
    match output.trim().strip_prefix("Mute:").map(str::trim) {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        _ => Err(BackendError::Parse {
            command: PACTL,
            output: output.to_string(),
        }),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(volume: f64) -> u32 {
    (volume.max(0.0) * 100.0).round() as u32
}

/// Cached sink state shared by the bar and the OSD
pub struct VolumeService {
    backend: Box<dyn VolumeBackend>,
    ready: Cell<bool>,
    writing: Cell<bool>,
    pending_volume: Cell<Option<f64>>,
    /// Volume fraction
    pub volume: Property<f64>,
    /// Mute flag
    pub is_muted: Property<bool>,
    /// Fired after either property changes
    pub changed: Signal<()>,
}

impl std::fmt::Debug for VolumeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeService")
            .field("volume", &self.volume.get())
            .field("is_muted", &self.is_muted.get())
            .field("ready", &self.ready.get())
            .finish_non_exhaustive()
    }
}

impl VolumeService {
    /// Creates the service with zero volume, unmuted, until the first read
    #[must_use]
    pub fn new(backend: Box<dyn VolumeBackend>) -> Self {
        Self {
            backend,
            ready: Cell::new(false),
            writing: Cell::new(false),
            pending_volume: Cell::new(None),
            volume: Property::new(0.0),
            is_muted: Property::new(false),
            changed: Signal::new(),
        }
    }

    /// Whether a read has completed before. `changed` listeners see `false`
    /// while the very first read is applied.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Re-reads the backend. Returns whether anything changed.
    pub async fn refresh(&self) -> bool {
        match self.backend.read().await {
            Ok(state) => {
                let changed = self.apply(state);
                self.ready.set(true);
                changed
            }
            Err(e) => {
                tracing::debug!(%e, "Volume read failed");
                false
            }
        }
    }

    /// Reads once, then re-reads after every sink change until the monitor
    /// exits
    pub async fn watch(&self) {
        let mut feed = match self.backend.watch() {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(%e, "Cannot follow sink changes");
                self.refresh().await;
                return;
            }
        };
        self.refresh().await;
        while feed.changed().await {
            self.refresh().await;
        }
        tracing::warn!("Sink monitor stopped");
    }

    /// Sets the sink volume
    ///
    /// While a write is in flight further requests only replace the target;
    /// the running call writes the latest one when it finishes.
    pub async fn set_volume(&self, volume: f64) {
        self.pending_volume.set(Some(volume.max(0.0)));
        if self.writing.replace(true) {
            return;
        }
        while let Some(volume) = self.pending_volume.take() {
            match self.backend.set_volume(volume).await {
                Ok(()) => {
                    self.apply(VolumeState {
                        volume,
                        muted: self.is_muted.get(),
                    });
                }
                Err(e) => tracing::warn!(%e, "Failed to set volume"),
            }
        }
        self.writing.set(false);
    }

    /// Mutes or unmutes the sink
    pub async fn set_muted(&self, muted: bool) {
        match self.backend.set_muted(muted).await {
            Ok(()) => {
                self.apply(VolumeState {
                    volume: self.volume.get(),
                    muted,
                });
            }
            Err(e) => tracing::warn!(%e, "Failed to set mute"),
        }
    }

    /// Flips the mute flag
    pub async fn toggle_mute(&self) {
        self.set_muted(!self.is_muted.get()).await;
    }

    fn apply(&self, state: VolumeState) -> bool {
        let volume_changed = self.volume.set(state.volume);
        let mute_changed = self.is_muted.set(state.muted);
        let changed = volume_changed || mute_changed;
        if changed {
            self.changed.emit(&());
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeSink {
        state: RefCell<Option<VolumeState>>,
        writes: RefCell<Vec<String>>,
        events: RefCell<Vec<bool>>,
    }

    struct ScriptedFeed(Vec<bool>);

    #[async_trait(?Send)]
    impl ChangeFeed for ScriptedFeed {
        async fn changed(&mut self) -> bool {
            if self.0.is_empty() { false } else { self.0.remove(0) }
        }
    }

    #[async_trait(?Send)]
    impl VolumeBackend for Rc<FakeSink> {
        async fn read(&self) -> BackendResult<VolumeState> {
            (*self.state.borrow()).ok_or(BackendError::NoDevice("sink"))
        }

        fn watch(&self) -> BackendResult<Box<dyn ChangeFeed>> {
            Ok(Box::new(ScriptedFeed(self.events.borrow().clone())))
        }

        async fn set_volume(&self, volume: f64) -> BackendResult<()> {
            tokio::task::yield_now().await;
            self.writes.borrow_mut().push(format!("volume {}", to_percent(volume)));
            Ok(())
        }

        async fn set_muted(&self, muted: bool) -> BackendResult<()> {
            self.writes.borrow_mut().push(format!("mute {muted}"));
            Ok(())
        }
    }

    #[test]
    fn test_parse_pactl_output() {
        let out = "Volume: front-left: 32768 /  50% / -18.06 dB,   front-right: 39321 /  60% / -13.31 dB\n        balance 0.00";
        assert!((parse_volume(out).unwrap() - 0.55).abs() < 1e-9);
        assert!(parse_volume("Volume: n/a").is_err());
        assert!(parse_mute("Mute: yes").unwrap());
        assert!(!parse_mute("Mute: no\n").unwrap());
        assert!(parse_mute("Muted").is_err());
    }

    #[test]
    fn test_sink_event_filter() {
        assert!(is_sink_event("Event 'change' on sink #53"));
        assert!(is_sink_event("Event 'change' on server"));
        assert!(!is_sink_event("Event 'change' on sink-input #120"));
        assert!(!is_sink_event("Event 'new' on client #7"));
        assert!(!is_sink_event("Event 'change' on source #2"));
    }

    #[tokio::test]
    async fn test_refresh_updates_only_changes() {
        let sink = Rc::new(FakeSink::default());
        let service = VolumeService::new(Box::new(sink.clone()));
        let volume_events = Rc::new(Cell::new(0));
        let v = volume_events.clone();
        service.volume.connect_notify(move |_| v.set(v.get() + 1));
        let changes = Rc::new(Cell::new(0));
        let c = changes.clone();
        service.changed.connect(move |()| c.set(c.get() + 1));

        assert!(!service.refresh().await);
        assert!(!service.is_ready());

        *sink.state.borrow_mut() = Some(VolumeState { volume: 0.4, muted: false });
        assert!(service.refresh().await);
        assert!(service.is_ready());
        assert!(!service.refresh().await);
        *sink.state.borrow_mut() = Some(VolumeState { volume: 0.4, muted: true });
        assert!(service.refresh().await);

        assert_eq!(volume_events.get(), 1);
        assert_eq!(changes.get(), 2);
        assert!(service.is_muted.get());
    }

    #[tokio::test]
    async fn test_first_read_is_not_ready_during_emit() {
        let sink = Rc::new(FakeSink::default());
        *sink.state.borrow_mut() = Some(VolumeState { volume: 0.5, muted: false });
        let service = Rc::new(VolumeService::new(Box::new(sink.clone())));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let weak = Rc::downgrade(&service);
        let s = seen.clone();
        service.changed.connect(move |()| {
            if let Some(service) = weak.upgrade() {
                s.borrow_mut().push(service.is_ready());
            }
        });

        service.refresh().await;
        *sink.state.borrow_mut() = Some(VolumeState { volume: 0.6, muted: false });
        service.refresh().await;
        assert_eq!(*seen.borrow(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_watch_rereads_on_each_change() {
        let sink = Rc::new(FakeSink::default());
        *sink.state.borrow_mut() = Some(VolumeState { volume: 0.3, muted: false });
        *sink.events.borrow_mut() = vec![true, true];
        let service = VolumeService::new(Box::new(sink.clone()));
        let reads = Rc::new(Cell::new(0));
        let r = reads.clone();
        service.volume.connect_notify(move |_| r.set(r.get() + 1));

        service.watch().await;
        assert!((service.volume.get() - 0.3).abs() < f64::EPSILON);
        assert_eq!(reads.get(), 1);
        assert!(service.is_ready());
    }

    #[tokio::test]
    async fn test_setters_write_through() {
        let sink = Rc::new(FakeSink::default());
        let service = VolumeService::new(Box::new(sink.clone()));
        service.set_volume(0.75).await;
        service.toggle_mute().await;
        assert!((service.volume.get() - 0.75).abs() < f64::EPSILON);
        assert!(service.is_muted.get());
        assert_eq!(*sink.writes.borrow(), vec!["volume 75", "mute true"]);
    }

    #[tokio::test]
    async fn test_rapid_volume_changes_collapse() {
        let sink = Rc::new(FakeSink::default());
        let service = VolumeService::new(Box::new(sink.clone()));
        tokio::join!(
            service.set_volume(0.2),
            service.set_volume(0.3),
            service.set_volume(0.4),
        );
        assert_eq!(*sink.writes.borrow(), vec!["volume 20", "volume 40"]);
        assert!((service.volume.get() - 0.4).abs() < f64::EPSILON);
    }
}
