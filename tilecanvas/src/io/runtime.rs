//! Dedicated thread driving tile downloads on a current-thread tokio runtime.

use futures::future::{Either, select};
use tokio::sync::oneshot;

const THREAD_NAME: &str = "tilecanvas-io";

/// Owns the IO thread. Dropping it stops the worker and joins the thread.
pub(crate) struct IoThread {
    join_handle: Option<std::thread::JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl IoThread {
    /// Spawn the thread and run `worker` on it until it finishes or the `IoThread` is dropped.
    pub fn spawn<F>(worker: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();

        let join_handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || run(worker, stop_rx))
            .inspect_err(|err| log::error!("Could not spawn {THREAD_NAME}, tiles will not load: {err}"))
            .ok();

        Self {
            join_handle,
            stop_tx: Some(stop_tx),
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn run<F>(worker: F, stop_rx: oneshot::Receiver<()>)
where
    F: std::future::Future<Output = ()>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Could not create the IO runtime, tiles will not load: {err}");
            return;
        }
    };

    runtime.block_on(async {
        match select(Box::pin(worker), stop_rx).await {
            Either::Left(_) => log::debug!("IO worker finished on its own."),
            Either::Right(_) => log::debug!("IO worker stopped."),
        }
    });
}

impl Drop for IoThread {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Err means the thread is gone already.
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take()
            && join_handle.join().is_err()
        {
            log::warn!("{THREAD_NAME} panicked.");
        }
    }
}
