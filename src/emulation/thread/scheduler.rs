//! Round-robin driver for multiple logical threads.

use std::collections::VecDeque;

use log::{debug, error};

use crate::{
    emulation::{
        engine::ExecutionContext,
        thread::{Thread, ThreadId},
    },
    Result,
};

/// How a [`ThreadScheduler::run`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerOutcome {
    /// Every thread finished
    Completed {
        /// Ticks that were run
        ticks: u64,
    },
    /// Threads are still live after the tick budget was spent
    TickLimit {
        /// Ticks that were run
        ticks: u64,
    },
}

/// Steps a set of threads in turn.
///
/// One tick steps every live thread once, in spawn order. A thread that runs out of frames
/// is retired. A failing step is fatal: the error is returned and, if
/// [`crate::emulation::ExecutionConfig::release_on_abort`] is set, the failed thread is
/// abandoned so its values go back to the pool.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dotframe::prelude::*;
///
/// # fn run(context: ExecutionContext, assembly: AssemblyRc) -> dotframe::Result<()> {
/// let mut scheduler = ThreadScheduler::new(context);
///
/// let mut worker = Thread::new(ThreadId(2));
/// worker.call(assembly, Token::new(0x0600_0001));
/// scheduler.spawn(worker);
///
/// match scheduler.run(1_000)? {
///     SchedulerOutcome::Completed { ticks } => println!("done after {ticks} ticks"),
///     SchedulerOutcome::TickLimit { .. } => println!("still waiting"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ThreadScheduler {
    context: ExecutionContext,
    threads: VecDeque<Thread>,
    finished: Vec<Thread>,
    ticks: u64,
}

impl ThreadScheduler {
    /// Creates a scheduler without threads
    #[must_use]
    pub fn new(context: ExecutionContext) -> Self {
        ThreadScheduler {
            context,
            threads: VecDeque::new(),
            finished: Vec::new(),
            ticks: 0,
        }
    }

    /// Adds a thread to the end of the rotation
    pub fn spawn(&mut self, thread: Thread) -> ThreadId {
        let id = thread.id();
        debug!("Spawning {}", id);
        self.threads.push_back(thread);
        id
    }

    /// The live threads
    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    /// A live thread by id
    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.id() == id)
    }

    /// Threads that ran to completion, in completion order
    #[must_use]
    pub fn finished(&self) -> &[Thread] {
        &self.finished
    }

    /// Number of live threads
    #[must_use]
    pub fn live(&self) -> usize {
        self.threads.len()
    }

    /// Ticks run so far
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The shared execution context
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Steps every live thread once. Returns true while live threads remain.
    ///
    /// # Errors
    /// Returns the error of the first thread whose step failed; that thread is dropped.
    pub fn tick(&mut self) -> Result<bool> {
        self.ticks += 1;

        for _ in 0..self.threads.len() {
            let Some(mut thread) = self.threads.pop_front() else {
                break;
            };

            match thread.step(&self.context) {
                Ok(true) => self.threads.push_back(thread),
                Ok(false) => {
                    debug!("{} completed", thread.id());
                    self.finished.push(thread);
                }
                Err(failure) => {
                    error!("{} aborted: {}", thread.id(), failure);
                    if self.context.config().release_on_abort {
                        if let Err(cleanup) = thread.abandon(self.context.pool()) {
                            error!("{} cleanup failed: {}", thread.id(), cleanup);
                        }
                    }
                    return Err(failure);
                }
            }
        }

        Ok(!self.threads.is_empty())
    }

    /// Ticks until every thread completed or `max_ticks` ticks ran.
    ///
    /// # Errors
    /// Returns the first step failure, see [`ThreadScheduler::tick`].
    pub fn run(&mut self, max_ticks: u64) -> Result<SchedulerOutcome> {
        let start = self.ticks;

        while !self.threads.is_empty() {
            if self.ticks - start >= max_ticks {
                return Ok(SchedulerOutcome::TickLimit {
                    ticks: self.ticks - start,
                });
            }
            self.tick()?;
        }

        Ok(SchedulerOutcome::Completed {
            ticks: self.ticks - start,
        })
    }
}
