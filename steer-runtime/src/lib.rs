use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone)]
pub struct SteerHandle {
    inner: Handle,
    cancel: CancellationToken,
}

/// Tokio runtime plus the cancellation token every automation run observes.
pub struct SteerRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl SteerRuntime {
    /// Build a multi-threaded runtime.
    ///
    /// ```
    /// use steer_runtime::SteerRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = SteerRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder.build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// ```
    /// use steer_runtime::SteerRuntime;
    ///
    /// let runtime = SteerRuntime::build("handle-example", Some(1)).unwrap();
    /// let handle = runtime.handle();
    /// assert!(!handle.cancellation().is_cancelled());
    /// ```
    pub fn handle(&self) -> SteerHandle {
        SteerHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    ///
    /// ```
    /// use steer_runtime::SteerRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = SteerRuntime::build("shutdown-example", Some(1)).unwrap();
    /// let cancel = runtime.handle().cancellation();
    /// runtime.shutdown(Duration::from_millis(5));
    /// assert!(cancel.is_cancelled());
    /// ```
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl SteerHandle {
    /// ```
    /// use steer_runtime::SteerRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = SteerRuntime::build("handle-doctest", Some(1)).unwrap();
    /// let task = runtime.handle().spawn(async { 21 * 2 });
    /// let result = runtime.block_on(async move { task.await.unwrap() });
    /// assert_eq!(result, 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// The shared token; cancelling it stops any active run at its next await.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the shared token on the first Ctrl-C.
    ///
    /// ```
    /// use steer_runtime::SteerRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = SteerRuntime::build("ctrl-c-example", Some(1)).unwrap();
    /// let watcher = runtime.handle().cancel_on_ctrl_c();
    /// runtime.handle().cancellation().cancel();
    /// runtime.block_on(async move { watcher.await.unwrap() });
    /// runtime.shutdown(Duration::from_millis(5));
    /// ```
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => info!(target: "runtime", "interrupt received; cancelling"),
                        Err(e) => warn!(target: "runtime", error = %e, "could not listen for interrupt; cancelling"),
                    }
                    cancel.cancel();
                }
            }
        })
    }
}
