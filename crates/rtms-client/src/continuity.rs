//! Frame continuity: gap detection and placeholder backfill.
//!
//! For each source the writer remembers the last timestamp it saw. When the
//! next frame arrives more than `gap_threshold_ms` later, it first emits
//! `delta / frame_period_ms` placeholder frames so downstream consumers see a
//! constant cadence. The first frame of a source never backfills.
//!
//! [`ContinuityStage`] runs the writer over a session event stream, applying
//! it to video frames and passing everything else through.

use crate::events::SessionEvent;
use crate::frame::{Frame, MediaKind};
use crate::protocol::codes::EventType;
use crate::observability::metrics;
use bytes::Bytes;
use common::types::MeetingUuid;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Minimal H.264 IDR access unit (start code + IDR slice header).
pub const DEFAULT_PLACEHOLDER: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x00];

/// Default gap threshold in milliseconds.
pub const DEFAULT_GAP_THRESHOLD_MS: i64 = 500;

/// Default frame period in milliseconds (25 fps).
pub const DEFAULT_FRAME_PERIOD_MS: i64 = 40;

/// Default cap on placeholders for a single gap (30 s at 25 fps).
pub const DEFAULT_MAX_BACKFILL_FRAMES: u64 = 750;

/// Gap-filling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuitySettings {
    pub gap_threshold_ms: i64,
    pub frame_period_ms: i64,
    pub max_backfill_frames: u64,
}

impl Default for ContinuitySettings {
    fn default() -> Self {
        Self {
            gap_threshold_ms: DEFAULT_GAP_THRESHOLD_MS,
            frame_period_ms: DEFAULT_FRAME_PERIOD_MS,
            max_backfill_frames: DEFAULT_MAX_BACKFILL_FRAMES,
        }
    }
}

/// Per-source gap-filling writer.
#[derive(Debug, Clone)]
pub struct FrameContinuityWriter {
    settings: ContinuitySettings,
    placeholder: Bytes,
    last_seen: HashMap<String, i64>,
}

impl FrameContinuityWriter {
    /// Writer with the default H.264 placeholder.
    #[must_use]
    pub fn new(settings: ContinuitySettings) -> Self {
        Self::with_placeholder(settings, Bytes::from_static(DEFAULT_PLACEHOLDER))
    }

    /// Writer emitting `placeholder` (e.g. a pre-encoded black keyframe).
    #[must_use]
    pub fn with_placeholder(settings: ContinuitySettings, placeholder: Bytes) -> Self {
        Self {
            settings,
            placeholder,
            last_seen: HashMap::new(),
        }
    }

    #[must_use]
    pub fn placeholder(&self) -> &Bytes {
        &self.placeholder
    }

    /// Last timestamp seen for `source`.
    #[must_use]
    pub fn last_seen(&self, source: &str) -> Option<i64> {
        self.last_seen.get(source).copied()
    }

    /// Record a frame at `timestamp` and return how many placeholders must
    /// precede it.
    pub fn advance(&mut self, source: &str, timestamp: i64) -> u64 {
        let previous = self.last_seen.insert(source.to_string(), timestamp);
        let Some(previous) = previous else {
            return 0;
        };

        let delta = timestamp.saturating_sub(previous);
        if delta < 0 {
            warn!(
                target: "rtms.continuity",
                source,
                previous,
                timestamp,
                "Frame timestamp went backwards, no backfill"
            );
            return 0;
        }

        if delta <= self.settings.gap_threshold_ms {
            return 0;
        }

        let period = self.settings.frame_period_ms.max(1);
        let missing = u64::try_from(delta / period).unwrap_or(0);

        if missing > self.settings.max_backfill_frames {
            warn!(
                target: "rtms.continuity",
                source,
                delta_ms = delta,
                missing,
                cap = self.settings.max_backfill_frames,
                "Gap exceeds backfill cap, truncating"
            );
            return self.settings.max_backfill_frames;
        }

        debug!(
            target: "rtms.continuity",
            source,
            delta_ms = delta,
            missing,
            "Backfilling gap"
        );
        missing
    }

    /// Consume one frame payload, returning the placeholders followed by the
    /// payload itself.
    pub fn consume_frame(&mut self, source: &str, payload: Bytes, timestamp: i64) -> Vec<Bytes> {
        let missing = self.advance(source, timestamp);
        let count = usize::try_from(missing).unwrap_or(0);

        let mut out = Vec::with_capacity(count.saturating_add(1));
        out.extend(std::iter::repeat(self.placeholder.clone()).take(count));
        out.push(payload);
        out
    }

    /// Forget a source.
    pub fn reset(&mut self, source: &str) {
        self.last_seen.remove(source);
    }
}

/// Spawned stage applying continuity to video frames of an event stream.
pub struct ContinuityStage {
    input: mpsc::Receiver<SessionEvent>,
    output: mpsc::Sender<SessionEvent>,
    settings: ContinuitySettings,
    placeholder: Bytes,
    writers: HashMap<MeetingUuid, FrameContinuityWriter>,
    cancel_token: CancellationToken,
}

impl ContinuityStage {
    /// Spawn the stage. Returns the output stream and the task handle.
    #[must_use]
    pub fn spawn(
        input: mpsc::Receiver<SessionEvent>,
        capacity: usize,
        settings: ContinuitySettings,
        placeholder: Bytes,
        cancel_token: CancellationToken,
    ) -> (mpsc::Receiver<SessionEvent>, JoinHandle<()>) {
        let (output, receiver) = mpsc::channel(capacity.max(1));
        let stage = Self {
            input,
            output,
            settings,
            placeholder,
            writers: HashMap::new(),
            cancel_token,
        };
        let handle = tokio::spawn(stage.run());
        (receiver, handle)
    }

    #[instrument(skip_all, name = "rtms.continuity")]
    async fn run(mut self) {
        info!(target: "rtms.continuity", "Continuity stage started");

        loop {
            let event = tokio::select! {
                () = self.cancel_token.cancelled() => break,
                event = self.input.recv() => event,
            };

            let Some(event) = event else {
                break;
            };

            if !self.forward(event).await {
                break;
            }
        }

        info!(
            target: "rtms.continuity",
            tracked_meetings = self.writers.len(),
            "Continuity stage stopped"
        );
    }

    /// Returns false once the consumer is gone.
    async fn forward(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Frame(frame) if frame.kind == MediaKind::Video && !frame.placeholder => {
                let writer = self
                    .writers
                    .entry(frame.meeting_uuid.clone())
                    .or_insert_with(|| {
                        FrameContinuityWriter::with_placeholder(
                            self.settings,
                            self.placeholder.clone(),
                        )
                    });
                let missing = writer.advance(&frame.source.continuity_key(), frame.timestamp_ms);
                let placeholder = writer.placeholder().clone();

                if missing > 0 {
                    metrics::record_placeholder_frames(missing);
                    for _ in 0..missing {
                        let filler: Frame = frame.placeholder_like(placeholder.clone());
                        if self.output.send(SessionEvent::Frame(filler)).await.is_err() {
                            return false;
                        }
                    }
                }
                self.output.send(SessionEvent::Frame(frame)).await.is_ok()
            }
            SessionEvent::Relay(event) => {
                // A participant who rejoins starts a fresh cadence
                if event.kind() == Some(EventType::ParticipantLeave) {
                    if let (Some(user_id), Some(writer)) =
                        (event.user_id, self.writers.get_mut(&event.meeting_uuid))
                    {
                        writer.reset(&user_id.to_string());
                    }
                }
                self.output.send(SessionEvent::Relay(event)).await.is_ok()
            }
            SessionEvent::Ended {
                meeting_uuid,
                reason,
            } => {
                self.writers.remove(&meeting_uuid);
                self.output
                    .send(SessionEvent::Ended {
                        meeting_uuid,
                        reason,
                    })
                    .await
                    .is_ok()
            }
            other => self.output.send(other).await.is_ok(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::events::{EndReason, RelayEvent};
    use crate::frame::SourceIdentity;

    fn writer() -> FrameContinuityWriter {
        FrameContinuityWriter::with_placeholder(
            ContinuitySettings::default(),
            Bytes::from_static(b"black"),
        )
    }

    #[test]
    fn test_first_frame_never_backfills() {
        let mut writer = writer();
        let out = writer.consume_frame("16778240", Bytes::from_static(b"f0"), 1_000_000);
        assert_eq!(out, vec![Bytes::from_static(b"f0")]);
        assert_eq!(writer.last_seen("16778240"), Some(1_000_000));
    }

    #[test]
    fn test_600ms_gap_inserts_15_placeholders() {
        let mut writer = writer();
        let _ = writer.consume_frame("u", Bytes::from_static(b"f0"), 0);

        let out = writer.consume_frame("u", Bytes::from_static(b"f1"), 600);

        assert_eq!(out.len(), 16);
        assert!(out.iter().take(15).all(|b| b == &Bytes::from_static(b"black")));
        assert_eq!(out.last(), Some(&Bytes::from_static(b"f1")));
    }

    #[test]
    fn test_small_deltas_do_not_backfill() {
        let mut writer = writer();
        let mut ts = 0;
        for _ in 0..10 {
            let out = writer.consume_frame("u", Bytes::from_static(b"f"), ts);
            assert_eq!(out.len(), 1);
            ts += 40;
        }
        // Exactly at the threshold is not a gap
        assert_eq!(writer.advance("u", ts - 40 + 500), 0);
    }

    #[test]
    fn test_negative_delta_clamps_to_zero() {
        let mut writer = writer();
        let _ = writer.advance("u", 10_000);
        assert_eq!(writer.advance("u", 9_000), 0);
        assert_eq!(writer.last_seen("u"), Some(9_000));
    }

    #[test]
    fn test_sources_are_tracked_independently() {
        let mut writer = writer();
        let _ = writer.advance("a", 0);
        let _ = writer.advance("b", 0);
        assert_eq!(writer.advance("a", 1_000), 25);
        assert_eq!(writer.advance("b", 40), 0);
    }

    #[test]
    fn test_backfill_is_capped() {
        let mut writer = FrameContinuityWriter::new(ContinuitySettings {
            max_backfill_frames: 10,
            ..ContinuitySettings::default()
        });
        let _ = writer.advance("u", 0);
        assert_eq!(writer.advance("u", 3_600_000), 10);
        assert_eq!(writer.placeholder(), &Bytes::from_static(DEFAULT_PLACEHOLDER));
    }

    #[test]
    fn test_reset_forgets_source() {
        let mut writer = writer();
        let _ = writer.advance("u", 0);
        writer.reset("u");
        assert_eq!(writer.advance("u", 10_000), 0);
    }

    fn video(meeting: &str, user_id: u64, ts: i64) -> SessionEvent {
        SessionEvent::Frame(Frame {
            meeting_uuid: MeetingUuid::from(meeting),
            source: SourceIdentity {
                user_id,
                user_name: "Ada".to_string(),
            },
            payload: Bytes::from_static(b"real"),
            timestamp_ms: ts,
            kind: MediaKind::Video,
            placeholder: false,
        })
    }

    #[tokio::test]
    async fn test_stage_backfills_video_and_passes_other_events() {
        let (tx, rx) = mpsc::channel(64);
        let (mut out, handle) = ContinuityStage::spawn(
            rx,
            64,
            ContinuitySettings::default(),
            Bytes::from_static(b"black"),
            CancellationToken::new(),
        );

        tx.send(video("m", 1, 0)).await.unwrap();
        tx.send(video("m", 1, 600)).await.unwrap();
        tx.send(SessionEvent::Ended {
            meeting_uuid: MeetingUuid::from("m"),
            reason: EndReason::Stopped,
        })
        .await
        .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = out.recv().await {
            events.push(event);
        }
        handle.await.unwrap();

        // first frame + 15 placeholders + second frame + ended
        assert_eq!(events.len(), 18);
        let placeholders = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Frame(f) if f.placeholder))
            .count();
        assert_eq!(placeholders, 15);
        assert!(matches!(events.last(), Some(SessionEvent::Ended { .. })));
    }

    #[tokio::test]
    async fn test_stage_does_not_backfill_non_video() {
        let (tx, rx) = mpsc::channel(8);
        let (mut out, _handle) = ContinuityStage::spawn(
            rx,
            8,
            ContinuitySettings::default(),
            Bytes::from_static(b"black"),
            CancellationToken::new(),
        );

        for ts in [0, 5_000] {
            let SessionEvent::Frame(mut frame) = video("m", 1, ts) else {
                unreachable!();
            };
            frame.kind = MediaKind::Audio;
            tx.send(SessionEvent::Frame(frame)).await.unwrap();
        }
        drop(tx);

        let mut count = 0;
        while out.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_stage_forgets_source_after_participant_leave() {
        let (tx, rx) = mpsc::channel(8);
        let (mut out, _handle) = ContinuityStage::spawn(
            rx,
            8,
            ContinuitySettings::default(),
            Bytes::from_static(b"black"),
            CancellationToken::new(),
        );

        tx.send(video("m", 1, 0)).await.unwrap();
        tx.send(SessionEvent::Relay(RelayEvent {
            meeting_uuid: MeetingUuid::from("m"),
            event_type: EventType::ParticipantLeave.code(),
            user_id: Some(1),
            user_name: None,
            timestamp: None,
        }))
        .await
        .unwrap();
        tx.send(video("m", 1, 60_000)).await.unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = out.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::Frame(f) if f.placeholder)));
    }
}
