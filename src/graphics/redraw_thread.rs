//! Frame pacing thread.
//!
//! The event loop has no vsync callback of its own, so frame requests are
//! delegated to a small thread. It holds at most one pending frame and fires it
//! no sooner than one interval after the previous one. The thread never touches
//! engine state, it only reports which handle became due.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::graphics::render_loop::{FrameHandle, FrameScheduler};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub(crate) enum RedrawThreadCommands {
    Schedule(FrameHandle),
    Cancel(FrameHandle),
    Stop,
}

fn redraw_thread<F>(receiver: Receiver<RedrawThreadCommands>, interval: Duration, mut fire: F)
where
    F: FnMut(FrameHandle) -> bool,
{
    let mut last_fire = Instant::now();
    let mut pending: Option<(FrameHandle, Instant)> = None;
    loop {
        let command = match pending {
            Some((_, deadline)) => {
                receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match command {
            Ok(RedrawThreadCommands::Schedule(handle)) => {
                if let Some((previous, _)) = pending {
                    log::debug!("redraw_thread: {handle:?} replaces {previous:?}");
                }
                let deadline = (last_fire + interval).max(Instant::now());
                pending = Some((handle, deadline));
            }
            Ok(RedrawThreadCommands::Cancel(handle)) => {
                if matches!(pending, Some((pending_handle, _)) if pending_handle == handle) {
                    pending = None;
                }
            }
            Ok(RedrawThreadCommands::Stop) => break,
            Err(RecvTimeoutError::Timeout) => {
                if let Some((handle, _)) = pending.take() {
                    last_fire = Instant::now();
                    if !fire(handle) {
                        log::error!("redraw_thread: frame receiver is gone, stopping");
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("redraw_thread: command channel closed");
                break;
            }
        }
    }
}

/// Owns the frame pacing thread. Implements [`FrameScheduler`] by handing out
/// monotonically increasing handles.
#[derive(Debug)]
pub struct RedrawThread {
    sender: Sender<RedrawThreadCommands>,
    handle: Option<JoinHandle<()>>,
    next_frame: u64,
}

impl RedrawThread {
    /// Starts the thread. `fire` is called from the thread with each due
    /// handle; returning `false` stops the thread.
    pub fn spawn<F>(interval: Duration, fire: F) -> Self
    where
        F: FnMut(FrameHandle) -> bool + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = std::thread::spawn(move || redraw_thread(receiver, interval, fire));
        Self {
            sender,
            handle: Some(handle),
            next_frame: 0,
        }
    }

    fn send(&self, command: RedrawThreadCommands) {
        if let Err(e) = self.sender.send(command) {
            log::error!("RedrawThread::send: thread is not running: {e:?}");
        }
    }
}

impl FrameScheduler for RedrawThread {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_frame += 1;
        let handle = FrameHandle(self.next_frame);
        self.send(RedrawThreadCommands::Schedule(handle));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.send(RedrawThreadCommands::Cancel(handle));
    }
}

impl Drop for RedrawThread {
    fn drop(&mut self) {
        let _ = self.sender.send(RedrawThreadCommands::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("RedrawThread::drop: redraw thread panicked");
            }
        }
    }
}
