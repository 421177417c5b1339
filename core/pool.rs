use crate::config::Config;
use crate::error::{AppError, Result};
use log;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// Cooperative cancellation flag shared between a caller and running work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// `concurrency` bounds the workers, not the reader threads. A read that
// times out frees its worker slot, but its reader thread is detached and
// lingers until the read returns, so a hung mount can accumulate one thread
// per timed-out file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub concurrency: usize,
    pub read_timeout: Duration,
}

impl PoolOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            concurrency: config.performance.concurrency,
            read_timeout: config.get_read_timeout()?,
        })
    }
}

pub struct WorkerPool {
    pool: ThreadPool,
    read_timeout: Duration,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(options: PoolOptions, cancel: CancellationToken) -> Result<Self> {
        if options.concurrency == 0 {
            return Err(AppError::InvalidArgument(
                "Worker pool concurrency must be at least 1".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.concurrency)
            .thread_name(|i| format!("ctxpack-worker-{}", i))
            .build()
            .map_err(|e| AppError::Pool(e.to_string()))?;
        log::debug!(
            "Worker pool ready ({} threads, read timeout {:?})",
            options.concurrency,
            options.read_timeout
        );
        Ok(Self {
            pool,
            read_timeout: options.read_timeout,
            cancel,
        })
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `job` once per path and returns one result per path, in input order.
    /// Failures (including timeouts and cancellation) stay with their own path.
    pub fn run<T, F>(&self, paths: &[PathBuf], job: F) -> Vec<(PathBuf, Result<T>)>
    where
        T: Send + 'static,
        F: Fn(&Path) -> Result<T> + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let timeout = self.read_timeout;
        let cancel = &self.cancel;
        self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let result = if cancel.is_cancelled() {
                        Err(AppError::Cancelled)
                    } else {
                        run_with_timeout(path, Arc::clone(&job), timeout)
                    };
                    if let Err(e) = &result {
                        log::debug!("Job failed for {}: {}", path.display(), e);
                    }
                    (path.clone(), result)
                })
                .collect()
        })
    }
}

fn run_with_timeout<T, F>(path: &Path, job: Arc<F>, timeout: Duration) -> Result<T>
where
    T: Send + 'static,
    F: Fn(&Path) -> Result<T> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    let owned_path = path.to_path_buf();
    thread::Builder::new()
        .name("ctxpack-reader".to_string())
        .spawn(move || {
            let result = job(&owned_path);
            // The receiver is gone if the read already timed out.
            let _ = tx.send(result);
        })
        .map_err(|e| AppError::Pool(format!("failed to spawn reader thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            log::warn!("Read timed out after {:?}: {}", timeout, path.display());
            Err(AppError::Timeout {
                path: path.to_path_buf(),
                timeout,
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(AppError::Pool(format!(
            "reader thread for {} exited without a result",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(concurrency: usize, timeout_ms: u64) -> PoolOptions {
        PoolOptions {
            concurrency,
            read_timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/f{}", i))).collect()
    }

    #[test]
    fn results_keep_input_order() {
        let pool = WorkerPool::new(options(4, 5_000), CancellationToken::new()).unwrap();
        let input = paths(20);
        let out = pool.run(&input, |p| Ok(p.display().to_string()));
        let got: Vec<_> = out.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(got, input);
        assert!(out.iter().all(|(p, r)| r.as_ref().unwrap() == &p.display().to_string()));
    }

    #[test]
    fn a_hung_job_times_out_without_blocking_siblings() {
        let pool = WorkerPool::new(options(2, 100), CancellationToken::new()).unwrap();
        let out = pool.run(&paths(3), |p| {
            if p == Path::new("/f1") {
                thread::sleep(Duration::from_secs(2));
            }
            Ok(1)
        });
        assert!(out[0].1.is_ok());
        assert!(matches!(out[1].1, Err(AppError::Timeout { .. })));
        assert!(out[2].1.is_ok());
    }

    #[test]
    fn timed_out_read_frees_its_worker_slot() {
        let pool = WorkerPool::new(options(1, 100), CancellationToken::new()).unwrap();
        let started = std::time::Instant::now();
        let out = pool.run(&paths(2), |p| {
            if p == Path::new("/f0") {
                thread::sleep(Duration::from_secs(3));
            }
            Ok(())
        });
        assert!(matches!(out[0].1, Err(AppError::Timeout { .. })));
        assert!(out[1].1.is_ok());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cancelled_pool_skips_remaining_files() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pool = WorkerPool::new(options(2, 1_000), cancel).unwrap();
        let out = pool.run(&paths(5), |_| Ok(()));
        assert!(out.iter().all(|(_, r)| matches!(r, Err(AppError::Cancelled))));
    }

    #[test]
    fn failures_are_isolated_per_path() {
        let pool = WorkerPool::new(options(3, 1_000), CancellationToken::new()).unwrap();
        let out = pool.run(&paths(4), |p| {
            if p == Path::new("/f2") {
                Err(AppError::PathNotFound(p.to_path_buf()))
            } else {
                Ok(())
            }
        });
        let failures: Vec<_> = out.iter().filter(|(_, r)| r.is_err()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, PathBuf::from("/f2"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(WorkerPool::new(options(0, 10), CancellationToken::new()).is_err());
    }
}
