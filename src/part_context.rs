//! Per-file coordination state for a multipart download: one [`PartContext`]
//! shared by the create/part/complete tasks of a single [`crate::file_ref::FileRef`].

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::errors::EngineError;

const CREATE_COMPLETE_WAIT: Duration = crate::config::CREATE_COMPLETE_WAIT;
const STREAM_TURN_WAIT: Duration = crate::config::STREAM_TURN_WAIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unstarted,
    Started,
    Completed,
    Cancelled,
}

struct Inner {
    state: State,
    finished_parts: HashSet<u64>,
    current_stream_part: u64,
}

/// Coordinates the three phases of one multipart download (create the local
/// file, download N parts, mark complete) across the threads executing them.
///
/// A single [`Mutex`] guards all state; three [`Condvar`]s wait on disjoint
/// projections of it so that, e.g., a part finishing doesn't wake every
/// thread waiting on file creation. `CANCELLED` is reachable from any state
/// and is absorbing: once set, every waiter unblocks with
/// [`EngineError::Cancelled`].
pub struct PartContext {
    num_parts: u64,
    inner: Mutex<Inner>,
    file_created: Condvar,
    completed: Condvar,
    stream_turn: Condvar,
}

impl PartContext {
    pub fn new(num_parts: u64) -> Self {
        PartContext {
            num_parts,
            inner: Mutex::new(Inner {
                state: State::Unstarted,
                finished_parts: HashSet::new(),
                current_stream_part: 0,
            }),
            file_created: Condvar::new(),
            completed: Condvar::new(),
            stream_turn: Condvar::new(),
        }
    }

    pub fn announce_file_created(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Cancelled {
            inner.state = State::Started;
        }
        drop(inner);
        self.file_created.notify_all();
    }

    pub fn announce_completed_part(&self, part_number: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.finished_parts.insert(part_number);
        if inner.finished_parts.len() as u64 == self.num_parts && inner.state != State::Cancelled {
            inner.state = State::Completed;
            drop(inner);
            self.completed.notify_all();
        }
    }

    pub fn wait_for_file_created(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        while inner.state != State::Started {
            if inner.state == State::Cancelled {
                return Err(EngineError::Cancelled);
            }
            inner = self
                .file_created
                .wait_timeout(inner, CREATE_COMPLETE_WAIT)
                .unwrap()
                .0;
        }
        Ok(())
    }

    pub fn wait_for_completion(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        while inner.state != State::Completed {
            if inner.state == State::Cancelled {
                return Err(EngineError::Cancelled);
            }
            inner = self
                .completed
                .wait_timeout(inner, CREATE_COMPLETE_WAIT)
                .unwrap()
                .0;
        }
        Ok(())
    }

    /// Blocks a stream writer until `part_number` is the next part allowed
    /// to write, since stdout can't seek and parts must land in order.
    pub fn wait_for_turn(&self, part_number: u64) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        while inner.current_stream_part != part_number {
            if inner.state == State::Cancelled {
                return Err(EngineError::Cancelled);
            }
            inner = self
                .stream_turn
                .wait_timeout(inner, STREAM_TURN_WAIT)
                .unwrap()
                .0;
        }
        Ok(())
    }

    pub fn done_with_turn(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.current_stream_part += 1;
        drop(inner);
        self.stream_turn.notify_all();
    }

    /// Moves to the absorbing CANCELLED state, waking every waiter on all
    /// three condition variables.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = State::Cancelled;
        drop(inner);
        self.file_created.notify_all();
        self.completed.notify_all();
        self.stream_turn.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().unwrap().state == State::Cancelled
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().unwrap().state == State::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn completes_after_all_parts_announced() {
        let ctx = PartContext::new(3);
        ctx.announce_completed_part(0);
        ctx.announce_completed_part(1);
        ctx.announce_completed_part(2);
        ctx.wait_for_completion().unwrap();
    }

    #[test]
    fn cancel_wakes_waiters_with_error() {
        let ctx = Arc::new(PartContext::new(2));
        let waiter = Arc::clone(&ctx);
        let handle = thread::spawn(move || waiter.wait_for_completion());
        thread::sleep(Duration::from_millis(50));
        ctx.cancel();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn stream_turns_are_strictly_ordered() {
        let ctx = Arc::new(PartContext::new(3));
        let c2 = Arc::clone(&ctx);
        let handle = thread::spawn(move || {
            c2.wait_for_turn(1).unwrap();
            "second ran"
        });
        thread::sleep(Duration::from_millis(50));
        ctx.wait_for_turn(0).unwrap();
        ctx.done_with_turn();
        assert_eq!(handle.join().unwrap(), "second ran");
    }

    #[test]
    fn file_created_unblocks_waiter() {
        let ctx = Arc::new(PartContext::new(1));
        let waiter = Arc::clone(&ctx);
        let handle = thread::spawn(move || waiter.wait_for_file_created());
        thread::sleep(Duration::from_millis(50));
        ctx.announce_file_created();
        handle.join().unwrap().unwrap();
        assert!(ctx.is_started());
    }
}
