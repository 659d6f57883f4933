//! Sequence recognition and single-press debouncing.
//!
//! All state lives behind one mutex so the OS callback, the debounce timer
//! and reloads see a consistent view. Actions are never executed under the
//! lock; they are pushed onto a channel and run by the executor thread.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::Sender;
use mousetap::{ButtonKey, Decision};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::{
    debounce::PendingTimer,
    mappings::MappingTable,
};

/// Recognition timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Presses older than this fall out of the sequence window.
    pub sequence_timeout: Duration,
    /// How long a single-bound press waits for a sequence to complete.
    pub single_key_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sequence_timeout: Duration::from_millis(500),
            single_key_delay: Duration::from_millis(300),
        }
    }
}

/// A single action waiting out the debounce delay.
struct PendingSingle {
    generation: u64,
    timer: PendingTimer,
}

struct MachineState {
    history: Vec<(ButtonKey, Instant)>,
    pending: Option<PendingSingle>,
    table: MappingTable,
    generation: u64,
}

/// The press state machine.
///
/// `on_press` is called from the OS callback thread; the debounce timer
/// fires on the engine's timer runtime. A generation counter ties each
/// armed timer to the pending entry it was armed for, so a stale timer that
/// races a cancel can never fire a superseded action.
pub(crate) struct SequenceMachine {
    state: Arc<Mutex<MachineState>>,
    timing: Timing,
    timer_rt: Handle,
    actions: Sender<String>,
}

impl SequenceMachine {
    pub(crate) fn new(
        table: MappingTable,
        timing: Timing,
        timer_rt: Handle,
        actions: Sender<String>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(MachineState {
                history: Vec::new(),
                pending: None,
                table,
                generation: 0,
            })),
            timing,
            timer_rt,
            actions,
        }
    }

    /// Handle one press and decide whether to suppress it.
    pub(crate) fn on_press(&self, key: ButtonKey) -> Decision {
        let now = Instant::now();
        let mut fire: Option<String> = None;
        let decision = {
            let mut st = self.state.lock();
            st.history
                .retain(|(_, at)| now.duration_since(*at) < self.timing.sequence_timeout);
            st.history.push((key, now));
            let keys: Vec<ButtonKey> = st.history.iter().map(|(k, _)| *k).collect();

            let (exact, prefix) = {
                let probe = st.table.probe(&keys);
                (probe.exact.map(|m| m.action.clone()), probe.prefix)
            };

            if let Some(action) = exact {
                trace!(button = %key, %action, "sequence_completed");
                self.cancel_pending(&mut st);
                st.history.clear();
                fire = Some(action);
                Decision::Suppress
            } else if prefix {
                trace!(button = %key, "sequence_prefix");
                self.cancel_pending(&mut st);
                if let Some(action) = st.table.single(key).map(str::to_owned) {
                    self.arm_pending(&mut st, action);
                }
                Decision::Suppress
            } else if let Some(action) = st.table.single(key).map(str::to_owned) {
                trace!(button = %key, %action, "single_press");
                self.cancel_pending(&mut st);
                st.history.clear();
                fire = Some(action);
                Decision::Suppress
            } else {
                trace!(button = %key, "unmapped_press");
                Decision::PassThrough
            }
        };
        if let Some(action) = fire {
            let _ = self.actions.send(action);
        }
        decision
    }

    /// Replace the mapping table and drop any in-flight recognition.
    pub(crate) fn set_table(&self, table: MappingTable) {
        let mut st = self.state.lock();
        st.table = table;
        st.history.clear();
        self.cancel_pending(&mut st);
        debug!("mapping_table_swapped");
    }

    /// Clear all state and wait for a cancelled timer to acknowledge.
    pub(crate) fn reset_sync(&self) {
        let pending = {
            let mut st = self.state.lock();
            st.history.clear();
            st.generation += 1;
            st.pending.take()
        };
        if let Some(p) = pending {
            p.timer.cancel_sync();
        }
    }

    fn cancel_pending(&self, st: &mut MachineState) {
        st.generation += 1;
        if let Some(p) = st.pending.take() {
            p.timer.cancel();
        }
    }

    fn arm_pending(&self, st: &mut MachineState, action: String) {
        st.generation += 1;
        let generation = st.generation;
        let state = self.state.clone();
        let actions = self.actions.clone();
        let timer = PendingTimer::arm(&self.timer_rt, self.timing.single_key_delay, move || {
            // History is deliberately left alone: the timer only resolves
            // the armed single, it does not end the sequence window.
            let fire = {
                let mut inner = state.lock();
                let current = matches!(&inner.pending, Some(p) if p.generation == generation);
                if current {
                    inner.pending = None;
                    Some(action)
                } else {
                    None
                }
            };
            if let Some(action) = fire {
                trace!(%action, "debounced_single_fired");
                let _ = actions.send(action);
            }
        });
        st.pending = Some(PendingSingle { generation, timer });
    }
}

#[cfg(test)]
mod tests {
    use button_store::ButtonRecord;
    use crossbeam_channel::Receiver;

    use super::*;

    use ButtonKey::{Middle, Side1, Side2};

    // Short timings keep the suite fast while preserving the ordering the
    // machine relies on (delay well below the sequence window).
    const TEST_TIMING: Timing = Timing {
        sequence_timeout: Duration::from_millis(200),
        single_key_delay: Duration::from_millis(80),
    };

    fn rec_single(key: ButtonKey, action: &str) -> ButtonRecord {
        ButtonRecord {
            id: format!("s_{key}"),
            name: String::new(),
            action: action.into(),
            key_type: Some(key),
            sequence: None,
            icon: String::new(),
            order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn rec_seq(seq: &[ButtonKey], action: &str) -> ButtonRecord {
        ButtonRecord {
            id: format!("q_{}_{}", seq.len(), action),
            name: String::new(),
            action: action.into(),
            key_type: None,
            sequence: Some(seq.to_vec()),
            icon: String::new(),
            order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    struct Harness {
        machine: SequenceMachine,
        actions: Receiver<String>,
        _rt: tokio::runtime::Runtime,
    }

    fn harness(records: &[ButtonRecord]) -> Harness {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .expect("runtime");
        let (tx, rx) = crossbeam_channel::unbounded();
        let machine = SequenceMachine::new(
            MappingTable::from_records(records),
            TEST_TIMING,
            rt.handle().clone(),
            tx,
        );
        Harness {
            machine,
            actions: rx,
            _rt: rt,
        }
    }

    fn recv(h: &Harness, within: Duration) -> Option<String> {
        h.actions.recv_timeout(within).ok()
    }

    fn assert_quiet(h: &Harness, for_ms: u64) {
        assert_eq!(recv(h, Duration::from_millis(for_ms)), None);
    }

    #[test]
    fn exact_sequence_fires_immediately_and_clears() {
        let h = harness(&[rec_seq(&[Side1, Side2], "cmd+c")]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        assert_eq!(h.machine.on_press(Side2), Decision::Suppress);
        assert_eq!(recv(&h, Duration::from_millis(50)), Some("cmd+c".into()));
        // History was consumed; the same presses are needed again.
        assert_eq!(h.machine.on_press(Side2), Decision::PassThrough);
    }

    #[test]
    fn single_with_sequence_prefix_waits_out_the_delay() {
        let h = harness(&[
            rec_single(Side1, "esc"),
            rec_seq(&[Side1, Side2], "cmd+c"),
        ]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        // Nothing yet: the press might begin the sequence.
        assert_quiet(&h, 30);
        assert_eq!(recv(&h, Duration::from_millis(200)), Some("esc".into()));
    }

    #[test]
    fn completing_the_sequence_cancels_the_pending_single() {
        let h = harness(&[
            rec_single(Side1, "esc"),
            rec_seq(&[Side1, Side2], "cmd+c"),
        ]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        assert_eq!(h.machine.on_press(Side2), Decision::Suppress);
        assert_eq!(recv(&h, Duration::from_millis(50)), Some("cmd+c".into()));
        // The debounced single must never arrive.
        assert_quiet(&h, 150);
    }

    #[test]
    fn single_not_part_of_any_sequence_fires_immediately() {
        let h = harness(&[
            rec_single(Middle, "space"),
            rec_seq(&[Side1, Side2], "cmd+c"),
        ]);
        assert_eq!(h.machine.on_press(Middle), Decision::Suppress);
        assert_eq!(recv(&h, Duration::from_millis(30)), Some("space".into()));
    }

    #[test]
    fn unmapped_press_passes_through() {
        let h = harness(&[rec_single(Side1, "esc")]);
        assert_eq!(h.machine.on_press(Middle), Decision::PassThrough);
        assert_quiet(&h, 50);
    }

    #[test]
    fn prefix_without_single_binding_suppresses_quietly() {
        let h = harness(&[rec_seq(&[Side1, Side2], "cmd+c")]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        // No single bound to side1, so nothing fires even after the delay.
        assert_quiet(&h, 150);
    }

    #[test]
    fn exact_match_beats_remaining_longer_prefix() {
        let h = harness(&[
            rec_seq(&[Side1, Side2], "short"),
            rec_seq(&[Side1, Side2, Side1], "long"),
        ]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        assert_eq!(h.machine.on_press(Side2), Decision::Suppress);
        assert_eq!(recv(&h, Duration::from_millis(50)), Some("short".into()));
    }

    #[test]
    fn stale_presses_fall_out_of_the_window() {
        let h = harness(&[rec_seq(&[Side1, Side2], "cmd+c")]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        std::thread::sleep(TEST_TIMING.sequence_timeout + Duration::from_millis(50));
        // The window expired, so this press is not a continuation and has
        // no binding of its own.
        assert_eq!(h.machine.on_press(Side2), Decision::PassThrough);
        assert_quiet(&h, 50);
    }

    #[test]
    fn unrelated_mapped_press_supersedes_pending_single() {
        let h = harness(&[
            rec_single(Side1, "esc"),
            rec_single(Middle, "space"),
            rec_seq(&[Side1, Side2], "cmd+c"),
        ]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        assert_eq!(h.machine.on_press(Middle), Decision::Suppress);
        // The middle press fires immediately and cancels the armed side1
        // single.
        assert_eq!(recv(&h, Duration::from_millis(30)), Some("space".into()));
        assert_quiet(&h, 150);
    }

    #[test]
    fn reset_sync_cancels_pending_work() {
        let h = harness(&[
            rec_single(Side1, "esc"),
            rec_seq(&[Side1, Side2], "cmd+c"),
        ]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        h.machine.reset_sync();
        assert_quiet(&h, 150);
    }

    #[test]
    fn set_table_drops_in_flight_recognition() {
        let h = harness(&[rec_seq(&[Side1, Side2], "cmd+c")]);
        assert_eq!(h.machine.on_press(Side1), Decision::Suppress);
        h.machine
            .set_table(MappingTable::from_records(&[rec_single(Side2, "tab")]));
        assert_eq!(h.machine.on_press(Side2), Decision::Suppress);
        assert_eq!(recv(&h, Duration::from_millis(30)), Some("tab".into()));
        assert_quiet(&h, 100);
    }
}
