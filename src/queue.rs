use std::sync::mpsc;

/// A unit of work that must run on the thread owning `T`.
pub type PendingTask<T> = Box<dyn FnOnce(&mut T) + Send>;

/// FIFO hand-off from worker threads to the UI thread.
///
/// Workers hold a [`QueueSender`] and post closures; only the owner of the
/// `WorkQueue` (the UI) can run them, which keeps every mutation of `T` on
/// that one thread.
pub struct WorkQueue<T> {
    sender: mpsc::Sender<PendingTask<T>>,
    receiver: mpsc::Receiver<PendingTask<T>>,
}

pub struct QueueSender<T> {
    sender: mpsc::Sender<PendingTask<T>>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Never blocks. Returns `false` if the queue has been dropped.
    pub fn enqueue(&self, task: impl FnOnce(&mut T) + Send + 'static) -> bool {
        if self.sender.send(Box::new(task)).is_err() {
            log::debug!("Work queue closed; dropping task");
            return false;
        }
        true
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> QueueSender<T> {
        QueueSender {
            sender: self.sender.clone(),
        }
    }

    /// Pop everything queued right now, oldest first. Tasks posted while the
    /// returned batch runs wait for the next drain.
    pub fn drain(&self) -> Vec<PendingTask<T>> {
        self.receiver.try_iter().collect()
    }

    /// Drain and execute against `target`. Returns how many tasks ran.
    pub fn run_pending(&self, target: &mut T) -> usize {
        let tasks = self.drain();
        let count = tasks.len();
        for task in tasks {
            task(target);
        }
        count
    }
}
