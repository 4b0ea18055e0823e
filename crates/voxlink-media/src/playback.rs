use crate::codec::AudioBuffer;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Source of playback time, in seconds.
///
/// Injected so scheduling arithmetic is testable against a fake clock.
pub trait PlaybackClock: Send + Sync {
    /// Current playback time in seconds since some fixed origin.
    fn now(&self) -> f64;
}

/// Wall-clock playback time since scheduler creation.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose zero is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// The output device boundary.
///
/// The scheduler owns all timing decisions; the sink only starts and
/// stops sources at the times it is told. `stop` must tolerate sources
/// that already finished naturally.
pub trait PlaybackSink: Send + Sync {
    /// Begin playing `buffer` at playback time `at`.
    fn start(&self, id: u64, buffer: &AudioBuffer, at: f64, looping: bool);
    /// Force-stop a source. Must be a no-op for unknown/finished ids.
    fn stop(&self, id: u64);
    /// Apply a new gain to all in-flight and future sources.
    fn set_gain(&self, gain: f32);
}

/// Sink that discards everything. Used when no output device exists.
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn start(&self, _id: u64, _buffer: &AudioBuffer, _at: f64, _looping: bool) {}
    fn stop(&self, _id: u64) {}
    fn set_gain(&self, _gain: f32) {}
}

/// Where and for how long a chunk was scheduled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledAt {
    /// Source identifier, used for completion/interruption bookkeeping.
    pub id: u64,
    /// Playback-clock start time in seconds.
    pub start: f64,
    /// Buffer duration in seconds.
    pub duration: f64,
}

struct SchedulerState {
    next_start: f64,
    /// Live sources, id → scheduled end time.
    live: HashMap<u64, f64>,
    ambient: Option<u64>,
    next_id: u64,
    gain: f32,
}

impl SchedulerState {
    /// Drops sources whose scheduled end has passed. The scheduler
    /// knows every source's start and duration, so natural completion
    /// needs no signal from the sink.
    fn reap(&mut self, now: f64) {
        self.live.retain(|_, end| *end > now);
    }
}

/// Gapless playback scheduler for server-pushed audio chunks.
///
/// Each chunk starts at `max(clock.now(), next_start)` and advances
/// `next_start` by its duration, producing gapless output from chunks
/// arriving at irregular intervals. A server interruption force-stops
/// every live source and resets the clock to "now". Sources are
/// considered live until their scheduled end passes on the clock, so
/// natural-completion removal needs nothing from the sink.
pub struct PlaybackScheduler {
    clock: Arc<dyn PlaybackClock>,
    sink: Arc<dyn PlaybackSink>,
    state: Mutex<SchedulerState>,
}

impl PlaybackScheduler {
    /// Creates a scheduler over the given clock and output sink.
    pub fn new(clock: Arc<dyn PlaybackClock>, sink: Arc<dyn PlaybackSink>, gain: f32) -> Self {
        sink.set_gain(gain);
        Self {
            clock,
            sink,
            state: Mutex::new(SchedulerState {
                next_start: 0.0,
                live: HashMap::new(),
                ambient: None,
                next_id: 1,
                gain,
            }),
        }
    }

    /// Schedules a decoded chunk for gapless playback.
    pub fn schedule(&self, buffer: AudioBuffer) -> ScheduledAt {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.reap(now);
        let start = now.max(state.next_start);
        let duration = buffer.duration();
        let id = state.next_id;
        state.next_id += 1;
        state.next_start = start + duration;
        state.live.insert(id, start + duration);
        drop(state);
        self.sink.start(id, &buffer, start, false);
        ScheduledAt {
            id,
            start,
            duration,
        }
    }

    /// Removes a source early, before its scheduled end.
    ///
    /// Finished sources are reaped against the clock automatically;
    /// this is for sinks with an authoritative completion signal of
    /// their own (e.g. an underrun cut the source short). Safe to call
    /// for sources already flushed or reaped.
    pub fn mark_ended(&self, id: u64) {
        self.state.lock().live.remove(&id);
    }

    /// Barge-in: force-stops every live source, discards queued audio,
    /// and resets the scheduling clock to "now". Sources that already
    /// ran to completion are not stopped again.
    ///
    /// The ambient loop is deliberately untouched; only `stop_ambient`
    /// or a full shutdown ends it.
    pub fn interrupt(&self) {
        let now = self.clock.now();
        let flushed: Vec<u64> = {
            let mut state = self.state.lock();
            state.reap(now);
            state.next_start = 0.0;
            state.live.drain().map(|(id, _)| id).collect()
        };
        debug!(flushed = flushed.len(), "playback interrupted");
        for id in flushed {
            self.sink.stop(id);
        }
    }

    /// Applies a new gain to all in-flight and future audio immediately.
    pub fn set_gain(&self, gain: f32) {
        self.state.lock().gain = gain;
        self.sink.set_gain(gain);
    }

    /// Current gain.
    pub fn gain(&self) -> f32 {
        self.state.lock().gain
    }

    /// Number of sources currently scheduled or playing.
    pub fn active_count(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.reap(now);
        state.live.len()
    }

    /// The playback time the next chunk would target.
    pub fn next_start(&self) -> f64 {
        self.state.lock().next_start
    }

    /// Starts a looping ambient source outside the tracked speech set.
    /// A second call while one is active is a no-op.
    pub fn start_ambient(&self, buffer: AudioBuffer) {
        let mut state = self.state.lock();
        if state.ambient.is_some() {
            return;
        }
        let id = state.next_id;
        state.next_id += 1;
        state.ambient = Some(id);
        let now = self.clock.now();
        drop(state);
        self.sink.start(id, &buffer, now, true);
    }

    /// Stops the ambient loop if one is playing.
    pub fn stop_ambient(&self) {
        let id = self.state.lock().ambient.take();
        if let Some(id) = id {
            self.sink.stop(id);
        }
    }

    /// Whether an ambient loop is currently playing.
    pub fn ambient_active(&self) -> bool {
        self.state.lock().ambient.is_some()
    }

    /// Full teardown: flushes scheduled speech and ends the ambient loop.
    pub fn shutdown(&self) {
        self.interrupt();
        self.stop_ambient();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    /// Clock advanced manually by tests.
    struct FakeClock {
        now: PlMutex<f64>,
    }

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: PlMutex::new(0.0),
            })
        }

        fn advance_to(&self, t: f64) {
            *self.now.lock() = t;
        }
    }

    impl PlaybackClock for FakeClock {
        fn now(&self) -> f64 {
            *self.now.lock()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        started: PlMutex<Vec<(u64, f64, bool)>>,
        stopped: PlMutex<Vec<u64>>,
        gain: PlMutex<f32>,
    }

    impl PlaybackSink for RecordingSink {
        fn start(&self, id: u64, _buffer: &AudioBuffer, at: f64, looping: bool) {
            self.started.lock().push((id, at, looping));
        }
        fn stop(&self, id: u64) {
            self.stopped.lock().push(id);
        }
        fn set_gain(&self, gain: f32) {
            *self.gain.lock() = gain;
        }
    }

    fn one_second_buffer() -> AudioBuffer {
        AudioBuffer {
            samples: vec![0.0; 24_000],
            sample_rate: 24_000,
        }
    }

    #[test]
    fn playback_is_gapless_and_monotonic() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock.clone(), sink, 1.0);

        // Five 1s chunks arriving in a burst: each starts exactly at the
        // cumulative duration of the chunks before it.
        for k in 0..5 {
            let at = scheduler.schedule(one_second_buffer());
            assert!((at.start - k as f64).abs() < 1e-9);
            assert!((at.duration - 1.0).abs() < 1e-9);
        }
        assert_eq!(scheduler.active_count(), 5);
        assert!((scheduler.next_start() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn late_chunk_starts_at_now_not_in_the_past() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock.clone(), sink, 1.0);

        scheduler.schedule(one_second_buffer());
        // Playback drained; the next chunk arrives 2.5s in.
        clock.advance_to(2.5);
        let at = scheduler.schedule(one_second_buffer());
        assert!((at.start - 2.5).abs() < 1e-9);
        assert!((scheduler.next_start() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn interruption_flushes_everything_and_resets_clock() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock.clone(), sink.clone(), 1.0);

        for _ in 0..3 {
            scheduler.schedule(one_second_buffer());
        }
        scheduler.interrupt();

        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(sink.stopped.lock().len(), 3);
        assert!((scheduler.next_start() - 0.0).abs() < 1e-9);

        // The next chunk starts at "now", not at the stale offset.
        clock.advance_to(1.5);
        let at = scheduler.schedule(one_second_buffer());
        assert!((at.start - 1.5).abs() < 1e-9);
    }

    #[test]
    fn finished_sources_fall_out_of_the_live_set() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock.clone(), sink.clone(), 1.0);

        // Two 1s chunks: ends at 1.0 and 2.0 on the playback clock.
        scheduler.schedule(one_second_buffer());
        scheduler.schedule(one_second_buffer());
        assert_eq!(scheduler.active_count(), 2);

        clock.advance_to(1.2);
        assert_eq!(scheduler.active_count(), 1);

        clock.advance_to(2.5);
        assert_eq!(scheduler.active_count(), 0);

        // Everything already completed; a barge-in has nothing to stop.
        scheduler.interrupt();
        assert!(sink.stopped.lock().is_empty());
    }

    #[test]
    fn interrupt_tolerates_naturally_finished_sources() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock, sink.clone(), 1.0);

        let first = scheduler.schedule(one_second_buffer());
        scheduler.schedule(one_second_buffer());
        scheduler.mark_ended(first.id);
        assert_eq!(scheduler.active_count(), 1);

        scheduler.interrupt();
        // Only the still-live source needed a force stop.
        assert_eq!(sink.stopped.lock().len(), 1);
    }

    #[test]
    fn gain_applies_through_the_sink() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock, sink.clone(), 0.8);
        assert!((*sink.gain.lock() - 0.8).abs() < 1e-6);

        scheduler.set_gain(0.25);
        assert!((*sink.gain.lock() - 0.25).abs() < 1e-6);
        assert!((scheduler.gain() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn ambient_loop_survives_barge_in() {
        let clock = FakeClock::new();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = PlaybackScheduler::new(clock, sink.clone(), 1.0);

        scheduler.start_ambient(one_second_buffer());
        assert!(scheduler.ambient_active());
        // Double-start is a no-op.
        scheduler.start_ambient(one_second_buffer());
        assert_eq!(sink.started.lock().len(), 1);
        assert!(sink.started.lock()[0].2, "ambient source loops");

        scheduler.schedule(one_second_buffer());
        scheduler.interrupt();
        assert!(scheduler.ambient_active());

        scheduler.stop_ambient();
        assert!(!scheduler.ambient_active());

        scheduler.start_ambient(one_second_buffer());
        scheduler.shutdown();
        assert!(!scheduler.ambient_active());
        assert_eq!(scheduler.active_count(), 0);
    }
}
