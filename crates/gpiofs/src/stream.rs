//! Background value monitoring and feeding for one line.
//!
//! Both stream kinds are plain threads owned by nobody: each holds a
//! cancellation hook registered with its port, observes it at least
//! once per poll tick, closes its output channel by dropping the
//! sender, and deregisters the hook afterwards. A reset therefore
//! closes every stream deterministically, and a naturally terminating
//! stream leaves no stale hook behind.

use std::fmt;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::thread;
use std::time::SystemTime;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::GpioError;
use crate::port::Port;
use crate::sysfs;

/// Tracing target for stream operations.
const STREAM_TARGET: &str = "gpiofs::stream";

/// One observed value change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Level the line changed to.
    pub value: bool,
    /// Wall-clock time the change was observed.
    pub at: SystemTime,
}

impl fmt::Display for Event {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = OffsetDateTime::from(self.at)
            .format(&Rfc3339)
            .map_err(|_| fmt::Error)?;
        write!(formatter, "{} at {stamp}", self.value)
    }
}

/// Spawns the monitor thread behind [`Port::values`].
pub(crate) fn spawn_value_monitor(
    port: Port,
    buffer: usize,
    hook: CancelToken,
) -> Receiver<Event> {
    let (sender, receiver) = sync_channel(buffer);
    thread::spawn(move || {
        monitor_values(&port, sender, &hook);
        port.deregister_hook(hook.id());
        debug!(target: STREAM_TARGET, line = port.line(), "value monitor stopped");
    });
    receiver
}

/// Samples the value file once per poll tick, emitting a change event
/// for every transition after the first baseline sample. Returning
/// drops the sender and closes the consumer's channel.
fn monitor_values(port: &Port, sender: SyncSender<Event>, hook: &CancelToken) {
    let mut last: Option<bool> = None;
    loop {
        if hook.is_cancelled() {
            return;
        }
        match sysfs::read_control(port.value_path()) {
            Ok(raw) => {
                let level = raw == "1";
                if last != Some(level) {
                    let baseline = last.is_none();
                    last = Some(level);
                    if !baseline {
                        let event = Event {
                            value: level,
                            at: SystemTime::now(),
                        };
                        if !deliver(port, &sender, event, hook) {
                            return;
                        }
                    }
                }
            }
            Err(error) => {
                // The value file vanishing mid-loop means the line is
                // being released; anything else is equally terminal
                // for a monitor with no error channel.
                warn!(target: STREAM_TARGET, line = port.line(), %error, "value sample failed");
                return;
            }
        }
        thread::sleep(port.poll_interval());
    }
}

/// Blocking-on-full delivery that still observes cancellation once per
/// poll tick. Returns false when the stream should stop.
fn deliver(port: &Port, sender: &SyncSender<Event>, event: Event, hook: &CancelToken) -> bool {
    let mut pending = event;
    loop {
        if hook.is_cancelled() {
            return false;
        }
        match sender.try_send(pending) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                pending = back;
                thread::sleep(port.poll_interval());
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(target: STREAM_TARGET, line = port.line(), "event consumer hung up");
                return false;
            }
        }
    }
}

/// Spawns the feeder thread behind [`Port::set_values`].
pub(crate) fn spawn_value_feeder(
    port: Port,
    source: Receiver<bool>,
    hook: CancelToken,
) -> Receiver<GpioError> {
    let (errors, receiver) = sync_channel(1);
    thread::spawn(move || {
        feed_values(&port, &source, &errors, &hook);
        drop(errors);
        port.deregister_hook(hook.id());
        debug!(target: STREAM_TARGET, line = port.line(), "value feeder stopped");
    });
    receiver
}

/// Applies each desired value through the port's guarded write. The
/// receive timeout keeps cancellation observation bounded by one poll
/// tick even while the source is quiet.
fn feed_values(
    port: &Port,
    source: &Receiver<bool>,
    errors: &SyncSender<GpioError>,
    hook: &CancelToken,
) {
    loop {
        if hook.is_cancelled() {
            return;
        }
        match source.recv_timeout(port.poll_interval()) {
            Ok(value) => match port.apply_stream_value(value, hook) {
                Ok(true) => {}
                Ok(false) => return,
                Err(error) => {
                    warn!(target: STREAM_TARGET, line = port.line(), %error, "stream write failed");
                    let _ = errors.try_send(error);
                    return;
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
