use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use gg_util::ahash::AHashMap;
use gg_util::parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::loader::AssetLoaderObject;
use crate::shared::SharedData;
use crate::task::{new_result_channel, produce, Produced, Task, TaskResult};
use crate::{AssetError, AssetId, AssetKind, AssetState, UntypedHandle};

/// Production logic and in-flight bookkeeping for one kind.
#[derive(Debug)]
pub struct TypeLoader {
    loader: AssetLoaderObject,
    table: Mutex<TaskTable>,
}

#[derive(Debug, Default)]
struct TaskTable {
    /// Tasks in registration order.
    order: Vec<InFlight>,
    /// The live task for each id.
    live: AHashMap<AssetId, Live>,
    next_token: u64,
}

#[derive(Debug)]
struct Live {
    token: u64,
    handle: UntypedHandle,
}

impl TaskTable {
    /// Whether a task is already producing this exact handle. A task left
    /// over from an evicted or removed handle with the same id does not
    /// count.
    fn is_producing(&self, handle: &UntypedHandle) -> bool {
        self.live
            .get(handle.id())
            .map_or(false, |live| live.handle.ptr_eq(handle))
    }

    fn register(&mut self, handle: &UntypedHandle, pending: Pending, asynchronous: bool) {
        let token = self.next_token;
        self.next_token += 1;

        let live = Live {
            token,
            handle: handle.clone(),
        };
        if let Some(stale) = self.live.insert(handle.id().clone(), live) {
            debug!(id = %handle.id(), token = stale.token, "superseded stale task");
        }

        self.order.push(InFlight {
            token,
            handle: handle.clone(),
            pending,
            asynchronous,
        });
    }

    fn is_live(&self, task: &InFlight) -> bool {
        self.live
            .get(task.handle.id())
            .map_or(false, |live| live.token == task.token)
    }

    fn settle(&mut self, task: &InFlight) {
        if self.is_live(task) {
            self.live.remove(task.handle.id());
        }
    }
}

#[derive(Debug)]
struct InFlight {
    token: u64,
    handle: UntypedHandle,
    pending: Pending,
    asynchronous: bool,
}

#[derive(Debug)]
enum Pending {
    /// Waiting for a background worker.
    Background(Receiver<TaskResult>),
    /// Produced in the background, waiting for dependencies before the swap.
    Produced(Produced),
    /// Content already attached; waiting for dependencies, then finishing.
    Finish(Vec<AssetId>),
}

enum Poll {
    Pending,
    /// Result received, still gated on dependencies.
    Received,
    Done,
    Failed(AssetError),
}

impl TypeLoader {
    pub fn new(loader: AssetLoaderObject) -> TypeLoader {
        TypeLoader {
            loader,
            table: Mutex::new(TaskTable::default()),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.loader.kind()
    }

    /// Produces `handle` on the calling thread.
    ///
    /// Returns the dependencies the handle is still gated on; it becomes
    /// ready during a later update once they are.
    pub fn load(&self, shared: &Arc<SharedData>, handle: &UntypedHandle) -> Vec<AssetId> {
        if self.table.lock().is_producing(handle) {
            debug!(id = %handle.id(), "load already in flight");
            return Vec::new();
        }

        handle.set_state(AssetState::Loading);
        let result = pollster::block_on(produce(
            shared,
            &self.loader,
            handle.id(),
            handle.shared_path(),
        ));

        let produced = match result {
            Ok(v) => v,
            Err(error) => {
                error!(id = %handle.id(), %error, "failed to load asset");
                handle.fail(error);
                return Vec::new();
            }
        };

        let needs_finish = produced.content.needs_finish();
        *handle.content_mut() = produced.content;

        if produced.dependencies.is_empty() {
            handle.set_state(AssetState::Loaded);

            if !needs_finish {
                if let Err(error) = finalize(shared, handle) {
                    handle.fail(error);
                }
                return Vec::new();
            }
        }

        let dependencies = produced.dependencies;
        trace!(id = %handle.id(), gated = !dependencies.is_empty(), "queued for finishing");
        self.table
            .lock()
            .register(handle, Pending::Finish(dependencies.clone()), false);
        dependencies
    }

    /// Starts producing `placeholder` on a background worker.
    pub fn load_async(&self, shared: &Arc<SharedData>, placeholder: &UntypedHandle) {
        let mut table = self.table.lock();
        if table.is_producing(placeholder) {
            debug!(id = %placeholder.id(), "load already in flight");
            return;
        }

        placeholder.set_state(AssetState::Loading);

        let (sender, receiver) = new_result_channel();
        shared.task_sender.send(Task {
            shared: shared.clone(),
            id: placeholder.id().clone(),
            path: placeholder.shared_path().clone(),
            loader: self.loader.clone(),
            result: sender,
        });

        table.register(placeholder, Pending::Background(receiver), true);
    }

    /// Drains finished tasks in registration order. Returns how many tasks
    /// made progress: received a result or reached a terminal state.
    pub fn update(&self, shared: &SharedData) -> usize {
        let mut tasks = std::mem::take(&mut self.table.lock().order);
        let mut progressed = 0;

        tasks.retain_mut(|task| match poll(shared, task) {
            Poll::Pending => true,
            Poll::Received => {
                trace!(id = %task.handle.id(), "waiting for dependencies");
                progressed += 1;
                true
            }
            Poll::Done => {
                trace!(id = %task.handle.id(), "ready");
                self.table.lock().settle(task);
                progressed += 1;
                false
            }
            Poll::Failed(error) => {
                error!(id = %task.handle.id(), %error, "asset failed");
                task.handle.fail(error);

                // The id must be free for new loads before it leaves the
                // registry.
                self.table.lock().settle(task);
                if task.asynchronous {
                    shared.evict(&task.handle);
                }

                progressed += 1;
                false
            }
        });

        let mut table = self.table.lock();
        let registered_meanwhile = std::mem::take(&mut table.order);
        tasks.extend(registered_meanwhile);
        tasks.retain(|task| {
            let live = table.is_live(task);
            if !live {
                cancel(&task.handle);
            }
            live
        });
        table.order = tasks;

        progressed
    }

    /// Forgets the in-flight task producing `handle`. Its result is
    /// discarded when it arrives and the handle is marked failed.
    pub fn detach(&self, handle: &UntypedHandle) {
        let mut table = self.table.lock();
        if !table.is_producing(handle) {
            return;
        }

        debug!(id = %handle.id(), "detached in-flight load");
        table.live.remove(handle.id());
        table.order.retain(|task| !task.handle.ptr_eq(handle));
        cancel(handle);
    }

    /// Marks every pending placeholder failed and empties the task table.
    pub fn clear_in_flight(&self) {
        let mut table = self.table.lock();
        table.order.clear();
        for (_, live) in table.live.drain() {
            cancel(&live.handle);
        }
    }

    /// Dependencies `handle` is gated on, once its content has been produced.
    pub fn pending_dependencies(&self, handle: &UntypedHandle) -> Vec<AssetId> {
        let table = self.table.lock();
        let task = match table.order.iter().find(|task| task.handle.ptr_eq(handle)) {
            Some(v) => v,
            None => return Vec::new(),
        };

        match &task.pending {
            Pending::Produced(produced) => produced.dependencies.clone(),
            Pending::Finish(dependencies) => dependencies.clone(),
            Pending::Background(_) => Vec::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.table.lock().live.len()
    }
}

fn cancel(handle: &UntypedHandle) {
    if !handle.state().is_terminal() {
        handle.fail(AssetError::Cancelled(handle.id().clone()));
    }
}

fn poll(shared: &SharedData, task: &mut InFlight) -> Poll {
    let mut received = false;
    if let Pending::Background(receiver) = &task.pending {
        match receiver.try_recv() {
            Ok(Ok(produced)) => {
                task.pending = Pending::Produced(produced);
                received = true;
            }
            Ok(Err(error)) => return Poll::Failed(error),
            Err(TryRecvError::Empty) => return Poll::Pending,
            Err(TryRecvError::Disconnected) => {
                return Poll::Failed(AssetError::Cancelled(task.handle.id().clone()))
            }
        }
    }

    let dependencies = match &task.pending {
        Pending::Produced(produced) => &produced.dependencies,
        Pending::Finish(dependencies) => dependencies,
        Pending::Background(_) => return Poll::Pending,
    };

    if !shared.dependencies_ready(dependencies) {
        return if received { Poll::Received } else { Poll::Pending };
    }

    let pending = std::mem::replace(&mut task.pending, Pending::Finish(Vec::new()));
    if let Pending::Produced(produced) = pending {
        *task.handle.content_mut() = produced.content;
    }

    task.handle.set_state(AssetState::Loaded);
    match finalize(shared, &task.handle) {
        Ok(()) => Poll::Done,
        Err(error) => Poll::Failed(error),
    }
}

/// Runs the finishing step on attached content and marks the handle ready.
fn finalize(shared: &SharedData, handle: &UntypedHandle) -> Result<(), AssetError> {
    let mut content = handle.content_mut();

    if content.is_empty() {
        return Err(AssetError::Decode {
            path: handle.shared_path().clone(),
            message: format!("no {} content produced", handle.kind()),
        });
    }

    if content.needs_finish() {
        content
            .finish(&*shared.device)
            .map_err(|report| AssetError::Finish {
                id: handle.id().clone(),
                message: format!("{:#}", report),
            })?;
    }

    drop(content);
    handle.set_state(AssetState::Ready);
    Ok(())
}
