use gg_util::parking_lot::{Condvar, Mutex};

/// Generation counter bumped whenever loading makes progress.
#[derive(Debug, Default)]
pub struct Signal {
    generation: Mutex<u64>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Signal {
        Signal::default()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    pub fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.condvar.notify_all();
    }

    /// Blocks until the generation differs from `seen`.
    pub fn wait(&self, seen: u64) {
        let mut generation = self.generation.lock();
        while *generation == seen {
            self.condvar.wait(&mut generation);
        }
    }
}
