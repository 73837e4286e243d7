//! Animated, interruptible screen transitions on a dedicated renderer thread.
//!
//! The main loop hands transition requests to the renderer through a
//! capacity-1 channel. A request arriving while an animation is in flight
//! first runs the cancellation handshake: the caller sets
//! `InterruptRequested` under the shared lock and blocks on the condvar only
//! until the renderer acknowledges with `Canceled` and a notify, never for
//! a frame delay or redraw. The renderer checks for a pending interrupt
//! before every animation frame and once more before committing the final
//! redraw, so a canceled transition never completes.
//!
//! `TransitionState` returns to `Idle` at the end of every transition,
//! completed or canceled.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Condvar, Mutex};

use crate::core::errors::{PanelError, Result};
use crate::display::interface::{CharDisplay, ScreenFrame, ScrollDirection};

/// Upper bound on the cancellation-acknowledgement wait. Only reachable if
/// the renderer thread died; the caller then degrades instead of hanging.
const ACK_TIMEOUT: Duration = Duration::from_secs(2);

// ──────────────────── shared state ────────────────────

/// Joint state of the dispatcher and the renderer thread. Mutation is only
/// legal under [`TransitionShared::state`]'s lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Idle,
    Drawing,
    InterruptRequested,
    Canceled,
}

struct TransitionShared {
    state: Mutex<TransitionState>,
    ack: Condvar,
}

// ──────────────────── requests ────────────────────

/// One screen-change request.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    /// Short label scrolled across the display while changing screens.
    pub label: String,
    /// The destination screen's full redraw, committed after the animation.
    pub final_frame: ScreenFrame,
}

/// Animation timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct TransitionTiming {
    pub frames: u8,
    pub frame_delay: Duration,
    pub settle_delay: Duration,
}

impl TransitionTiming {
    /// Timing from the display section of the process config.
    #[must_use]
    pub const fn new(frames: u8, frame_delay_ms: u64, settle_delay_ms: u64) -> Self {
        Self {
            frames,
            frame_delay: Duration::from_millis(frame_delay_ms),
            settle_delay: Duration::from_millis(settle_delay_ms),
        }
    }
}

// ──────────────────── coordinator ────────────────────

/// Owns the renderer thread and the request handoff.
pub struct TransitionCoordinator {
    shared: Arc<TransitionShared>,
    request_tx: Option<Sender<TransitionRequest>>,
    renderer: Option<thread::JoinHandle<()>>,
}

impl TransitionCoordinator {
    /// Spawn the renderer thread against a shared display.
    pub fn spawn(
        display: Arc<Mutex<dyn CharDisplay>>,
        timing: TransitionTiming,
    ) -> Result<Self> {
        let shared = Arc::new(TransitionShared {
            state: Mutex::new(TransitionState::Idle),
            ack: Condvar::new(),
        });
        let (request_tx, request_rx) = bounded::<TransitionRequest>(1);

        let thread_shared = Arc::clone(&shared);
        let renderer = thread::Builder::new()
            .name("rmp-transition".to_string())
            .spawn(move || renderer_main(&display, &thread_shared, timing, &request_rx))
            .map_err(|source| PanelError::Runtime {
                details: format!("failed to spawn transition renderer: {source}"),
            })?;

        Ok(Self {
            shared,
            request_tx: Some(request_tx),
            renderer: Some(renderer),
        })
    }

    /// Snapshot of the shared state, for tests and diagnostics.
    #[must_use]
    pub fn state(&self) -> TransitionState {
        *self.shared.state.lock()
    }

    /// Hand a new transition to the renderer, canceling any in-flight one.
    ///
    /// Blocks only for the cancellation acknowledgement, then returns as
    /// soon as the request is queued.
    pub fn request_transition(&self, request: TransitionRequest) -> Result<()> {
        let Some(tx) = self.request_tx.as_ref() else {
            return Err(PanelError::ChannelClosed {
                component: "transition",
            });
        };

        let mut request = request;
        loop {
            self.cancel_in_flight()?;
            match tx.try_send(request) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(r)) => {
                    // A previous request is still queued; the renderer will
                    // pick it up momentarily and the next lap cancels it.
                    request = r;
                    thread::yield_now();
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(PanelError::ChannelClosed {
                        component: "transition",
                    });
                }
            }
        }
    }

    /// If a transition is drawing, request cancellation and wait for the
    /// renderer's acknowledgement; then reset the state to `Idle`.
    fn cancel_in_flight(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !matches!(
            *state,
            TransitionState::Drawing | TransitionState::InterruptRequested
        ) {
            return Ok(());
        }
        *state = TransitionState::InterruptRequested;
        while !matches!(*state, TransitionState::Canceled) {
            let timed_out = self
                .shared
                .ack
                .wait_for(&mut state, ACK_TIMEOUT)
                .timed_out();
            if timed_out && !matches!(*state, TransitionState::Canceled) {
                *state = TransitionState::Idle;
                return Err(PanelError::Runtime {
                    details: "transition renderer did not acknowledge cancellation".to_string(),
                });
            }
        }
        *state = TransitionState::Idle;
        Ok(())
    }

    /// Stop the renderer: close the request channel and join the thread.
    pub fn shutdown(&mut self) {
        self.request_tx = None;
        if let Some(handle) = self.renderer.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TransitionCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ──────────────────── renderer thread ────────────────────

fn renderer_main(
    display: &Arc<Mutex<dyn CharDisplay>>,
    shared: &Arc<TransitionShared>,
    timing: TransitionTiming,
    request_rx: &Receiver<TransitionRequest>,
) {
    while let Ok(request) = request_rx.recv() {
        *shared.state.lock() = TransitionState::Drawing;

        run_transition(display, shared, timing, &request);

        let mut state = shared.state.lock();
        if matches!(*state, TransitionState::InterruptRequested) {
            *state = TransitionState::Canceled;
            shared.ack.notify_all();
        } else {
            *state = TransitionState::Idle;
        }
    }
}

/// Animate one transition. Returns early (without the final redraw) as soon
/// as an interrupt is pending.
fn run_transition(
    display: &Arc<Mutex<dyn CharDisplay>>,
    shared: &Arc<TransitionShared>,
    timing: TransitionTiming,
    request: &TransitionRequest,
) {
    let interrupted =
        || matches!(*shared.state.lock(), TransitionState::InterruptRequested);

    {
        let mut d = display.lock();
        if let Err(err) = d.clear() {
            eprintln!("[RMP-TRANSITION] clear failed: {err}");
        }
        let _ = d.set_cursor(false);
        let _ = d.set_double_height(false);
        if let Err(err) = d.write(&request.label, 0, 0) {
            eprintln!("[RMP-TRANSITION] label write failed: {err}");
        }
    }

    for _ in 0..timing.frames {
        if interrupted() {
            return;
        }
        if let Err(err) = display.lock().scroll(ScrollDirection::Right) {
            eprintln!("[RMP-TRANSITION] scroll failed: {err}");
        }
        thread::sleep(timing.frame_delay);
    }

    thread::sleep(timing.settle_delay);
    if interrupted() {
        return;
    }
    if let Err(err) = request.final_frame.apply(&mut *display.lock()) {
        eprintln!("[RMP-TRANSITION] final redraw failed: {err}");
    }
}
