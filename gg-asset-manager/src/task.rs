use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use gg_util::eyre::{Result, WrapErr};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{error, instrument, trace};

use crate::loader::AssetLoaderObject;
use crate::shared::SharedData;
use crate::{AssetContent, AssetError, AssetId, AssetManagerConfig, LoaderCtx};

/// Content produced for one asset plus the ids it must wait for.
#[derive(Debug)]
pub struct Produced {
    pub content: AssetContent,
    pub dependencies: Vec<AssetId>,
}

pub type TaskResult = Result<Produced, AssetError>;

pub fn spawn_workers(config: &AssetManagerConfig, mut task_receiver: TaskReceiver) -> Result<()> {
    let prefix = config.thread_name.clone();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .thread_name_fn(move || {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            format!("{}-{}", prefix, id)
        })
        .build()
        .wrap_err("failed to create asset runtime")?;

    thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            let rt = &runtime;
            runtime.block_on(async move {
                while let Some(task) = task_receiver.recv().await {
                    rt.spawn(task.execute());
                }
            });
        })
        .wrap_err("failed to spawn asset dispatcher")?;

    Ok(())
}

pub fn new_task_channel() -> (TaskSender, TaskReceiver) {
    let (sender, receiver) = unbounded_channel();
    (TaskSender { sender }, TaskReceiver { receiver })
}

pub fn new_result_channel() -> (Sender<TaskResult>, Receiver<TaskResult>) {
    crossbeam_channel::bounded(1)
}

#[derive(Debug)]
pub struct TaskReceiver {
    receiver: UnboundedReceiver<Task>,
}

impl TaskReceiver {
    async fn recv(&mut self) -> Option<Task> {
        self.receiver.recv().await
    }
}

#[derive(Clone, Debug)]
pub struct TaskSender {
    sender: UnboundedSender<Task>,
}

impl TaskSender {
    pub fn send(&self, task: Task) {
        if let Err(error) = self.sender.send(task) {
            let task = error.0;
            let _ = task.result.send(Err(AssetError::ShuttingDown));
        }
    }
}

pub struct Task {
    pub shared: Arc<SharedData>,
    pub id: AssetId,
    pub path: Arc<Path>,
    pub loader: AssetLoaderObject,
    pub result: Sender<TaskResult>,
}

impl Task {
    #[instrument(skip_all, fields(id = %self.id, kind = %self.loader.kind()))]
    async fn execute(self) {
        trace!(path = %self.path.display(), "producing");
        let result = produce(&self.shared, &self.loader, &self.id, &self.path).await;

        if let Err(error) = &result {
            error!(%error, "failed to load asset");
        } else {
            trace!("produced");
        }

        // The receiver is gone if the id was removed or cleared meanwhile.
        let _ = self.result.send(result);
        self.shared.signal.notify();
    }
}

pub async fn produce(
    shared: &Arc<SharedData>,
    loader: &AssetLoaderObject,
    id: &AssetId,
    path: &Arc<Path>,
) -> TaskResult {
    let mut ctx = LoaderCtx::new(shared.clone(), id.clone());
    match loader.load(&mut ctx, path).await {
        Ok(content) => Ok(Produced {
            content,
            dependencies: ctx.into_dependencies(),
        }),
        Err(report) => Err(AssetError::from_report(path, &report)),
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
