//! ## Synchronization
//! - Workers share the task source behind a mutex. When a thread fetches
//!   a task, it registers `(task_number, thread_number)` in an mpsc channel
//!   while still holding the lock, so registrations arrive in task order.
//!   The consumer reads this channel to know which thread's output stream
//!   holds the next result. This keeps the output in task order.
//! - The consumer also tracks the expected task number (`current`) and
//!   compares it with each registration as a sanity check.
//!
//! ## Error handling
//! - A task that fails still delivers its `Err` to its output stream,
//!   then its worker stops all producers from fetching new tasks.
//! - Tasks registered before the failure are completed and delivered,
//!   so the first `Err` seen by the consumer is the first one in task order.
//! - After yielding an `Err`, the consumer stops output and flushes the
//!   remaining results until all workers have stopped.
//! - Dropping the iterator stops all producers, flushes, and joins them.
//!
use std::iter::Enumerate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;

const MAX_SIZE_FOR_THREAD: usize = 10;

/// execute tasks in parallel, output results in task order.
pub struct ParIter<R, E> {
    receivers: Vec<Receiver<Result<R, E>>>,
    // Receiver<(task_number, thread)>
    task_order: Receiver<(usize, usize)>,
    current: usize,
    worker_thread: Option<Vec<JoinHandle<()>>>,
    iterator_stopper: Arc<AtomicBool>,
    is_killed: bool,
    interrupted: bool,
}

impl<R, E> ParIter<R, E>
where
    R: Send + 'static,
    E: Send + 'static,
{
    /// the worker threads (one per cpu) are dispatched in this `new` constructor!
    pub fn new<T, TL, F>(tasks: TL, task_executor: F) -> Self
    where
        F: Send + Clone + 'static + Fn(T) -> Result<R, E>,
        T: Send,
        TL: IntoIterator<Item = T>,
        <TL as IntoIterator>::IntoIter: Send + 'static,
    {
        Self::with_threads(tasks, task_executor, num_cpus::get())
    }

    /// dispatch exactly `threads` workers (at least one)
    pub fn with_threads<T, TL, F>(tasks: TL, task_executor: F, threads: usize) -> Self
    where
        F: Send + Clone + 'static + Fn(T) -> Result<R, E>,
        T: Send,
        TL: IntoIterator<Item = T>,
        <TL as IntoIterator>::IntoIter: Send + 'static,
    {
        let threads = threads.max(1);
        let iterator_stopper = Arc::new(AtomicBool::new(false));
        // worker master
        let (task_register, task_order) = channel();
        let tasks = Arc::new(Mutex::new(tasks.into_iter().enumerate()));
        let mut handles = Vec::with_capacity(threads);
        let mut receivers = Vec::with_capacity(threads);
        for thread_number in 0..threads {
            let (sender, receiver) = sync_channel(MAX_SIZE_FOR_THREAD);
            let task = tasks.clone();
            let register = task_register.clone();
            let iterator_stopper = iterator_stopper.clone();
            let task_executor = task_executor.clone();

            // workers
            let handle = thread::spawn(move || loop {
                if iterator_stopper.load(Ordering::SeqCst) {
                    break;
                }
                match get_task(&task, &register, thread_number) {
                    // finish
                    None => break,
                    Some(task) => {
                        let result = task_executor(task);
                        let failed = result.is_err();
                        if failed {
                            iterator_stopper.fetch_or(true, Ordering::SeqCst);
                        }
                        if sender.send(result).is_err() || failed {
                            break;
                        }
                    }
                }
            });
            receivers.push(receiver);
            handles.push(handle);
        }

        ParIter {
            receivers,
            task_order,
            current: 0,
            worker_thread: Some(handles),
            iterator_stopper,
            is_killed: false,
            interrupted: false,
        }
    }
}

impl<R, E> ParIter<R, E> {
    /// stop workers, flush tasks
    pub fn kill(&mut self) {
        if !self.is_killed {
            // stop threads from getting new tasks
            self.iterator_stopper.fetch_or(true, Ordering::SeqCst);
            // flush the remaining tasks in the channel
            while let Ok((_, thread_number)) = self.task_order.recv() {
                let _ = self.receivers[thread_number].recv();
            }
            self.is_killed = true;
        }
    }

    ///
    /// `true` if output stopped because a worker vanished
    /// (e.g. a panicking task) rather than by exhaustion or an `Err`.
    ///
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    fn interrupt(&mut self) {
        self.interrupted = true;
        self.kill();
    }

    fn join(&mut self) {
        if let Some(handles) = self.worker_thread.take() {
            for handle in handles {
                // a panicked worker is already reported through `interrupted`
                let _ = handle.join();
            }
        }
    }
}

fn get_task<T, TL>(
    tasks: &Arc<Mutex<Enumerate<TL>>>,
    register: &Sender<(usize, usize)>,
    thread_number: usize,
) -> Option<T>
where
    T: Send,
    TL: Iterator<Item = T>,
{
    // lock task list
    let mut task = match tasks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    // register task stealing
    let (task_number, next_task) = task.next()?;
    register.send((task_number, thread_number)).ok()?;
    Some(next_task)
}

impl<R, E> Iterator for ParIter<R, E> {
    type Item = Result<R, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_killed {
            return None;
        }
        match self.task_order.recv() {
            Ok((task_number, thread_number)) => {
                if task_number != self.current {
                    self.interrupt();
                    return None;
                }

                match self.receivers[thread_number].recv() {
                    Ok(Ok(result)) => {
                        self.current += 1;
                        Some(Ok(result))
                    }
                    Ok(Err(err)) => {
                        self.kill();
                        Some(Err(err))
                    }
                    // the worker died before delivering
                    Err(_) => {
                        self.interrupt();
                        None
                    }
                }
            }
            // all workers have stopped
            Err(_) => None,
        }
    }
}

impl<R, E> Drop for ParIter<R, E> {
    // attempt to stop the worker threads
    fn drop(&mut self) {
        self.kill();
        self.join();
    }
}
