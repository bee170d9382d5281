use itertools::Itertools;
use thiserror::Error;

use super::{
    kernel::{Kernel, ThreadInfo, run_checked},
    tensor::TensorPack,
    window::Window,
};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule error: {0} threads requested, but this scheduler runs {1}")]
    Threads(usize, usize),
    #[cfg(feature = "rayon")]
    #[error("schedule error: failed to build thread pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// How workloads are handed to workers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyHint {
    /// One workload per worker.
    #[default]
    Static,
    /// Many small workloads, taken by whichever worker is free.
    Dynamic,
}

/// Scheduling preferences of one kernel run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hints {
    pub split_dimension: usize,
    pub strategy: StrategyHint,
    /// Maximum number of dynamic workloads; `0` means one per thread.
    pub threshold: usize,
}

impl Default for Hints {
    fn default() -> Self {
        Self::new(Window::DIM_Y)
    }
}

impl Hints {
    pub fn new(split_dimension: usize) -> Self {
        Self {
            split_dimension,
            strategy: StrategyHint::Static,
            threshold: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyHint, threshold: usize) -> Self {
        self.strategy = strategy;
        self.threshold = threshold;
        self
    }
}

/// Partitions `window` into the workloads of one run.
///
/// Never yields more workloads than iterations along the split dimension, so a
/// workload is never empty unless the window is.
pub fn split_workloads(
    window: &Window,
    hints: &Hints,
    num_threads: usize,
    parallelisable: bool,
) -> Vec<Window> {
    let dim = hints.split_dimension;
    let iterations = window.num_iterations(dim);
    if iterations == 0 {
        return vec![];
    }

    let num_threads = num_threads.clamp(1, iterations);
    if !parallelisable || num_threads == 1 {
        return vec![*window];
    }

    let num_windows = match hints.strategy {
        StrategyHint::Static => num_threads,
        StrategyHint::Dynamic => {
            let granule = match hints.threshold {
                0 => num_threads,
                threshold => threshold,
            };
            iterations.min(granule)
        }
    };

    let workloads = (0..num_windows)
        .map(|id| window.split_window(dim, id, num_windows))
        .collect_vec();
    log::trace!(
        "split {window} along dimension {dim} into {} workloads",
        workloads.len()
    );
    workloads
}

pub trait Scheduler {
    fn num_threads(&self) -> usize;

    fn set_num_threads(&mut self, num_threads: usize) -> Result<(), ScheduleError>;

    /// Runs the whole window of `kernel`, returning once every workload is done.
    fn schedule(&self, kernel: &dyn Kernel, hints: &Hints, pack: &TensorPack);
}

/// Runs every kernel on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThreadScheduler;

impl Scheduler for SingleThreadScheduler {
    #[inline]
    fn num_threads(&self) -> usize {
        1
    }

    fn set_num_threads(&mut self, num_threads: usize) -> Result<(), ScheduleError> {
        match num_threads {
            1 => Ok(()),
            n => Err(ScheduleError::Threads(n, 1)),
        }
    }

    fn schedule(&self, kernel: &dyn Kernel, _hints: &Hints, pack: &TensorPack) {
        let window = kernel.window();
        if !window.is_empty() {
            run_checked(kernel, window, pack, &ThreadInfo::default());
        }
    }
}

#[cfg(feature = "rayon")]
pub use pool::{CpuScheduler, CpuSchedulerBuilder};

#[cfg(feature = "rayon")]
mod pool {
    use super::{Hints, ScheduleError, Scheduler, StrategyHint, split_workloads};
    use crate::loom::{
        kernel::{Kernel, ThreadInfo, run_checked},
        platform,
        tensor::TensorPack,
    };

    /// Runs workloads on a dedicated `rayon` thread pool.
    #[derive(Debug)]
    pub struct CpuScheduler {
        pool: rayon::ThreadPool,
        num_threads: usize,
    }

    #[derive(Debug, Default, Clone)]
    pub struct CpuSchedulerBuilder {
        num_threads: Option<usize>,
    }

    impl CpuSchedulerBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of workers; defaults to [`platform::available_threads`].
        pub fn num_threads(mut self, num_threads: usize) -> Self {
            self.num_threads = Some(num_threads);
            self
        }

        pub fn build(self) -> Result<CpuScheduler, ScheduleError> {
            let num_threads = self
                .num_threads
                .unwrap_or_else(platform::available_threads)
                .max(1);
            let pool = build_pool(num_threads)?;
            Ok(CpuScheduler { pool, num_threads })
        }
    }

    fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, ScheduleError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("weave-worker-{index}"))
            .build()?;
        Ok(pool)
    }

    impl Scheduler for CpuScheduler {
        #[inline]
        fn num_threads(&self) -> usize {
            self.num_threads
        }

        fn set_num_threads(&mut self, num_threads: usize) -> Result<(), ScheduleError> {
            let num_threads = num_threads.max(1);
            if num_threads != self.num_threads {
                self.pool = build_pool(num_threads)?;
                self.num_threads = num_threads;
            }
            Ok(())
        }

        #[cfg_attr(feature = "trace", tracing::instrument(skip_all, fields(kernel = kernel.name())))]
        fn schedule(&self, kernel: &dyn Kernel, hints: &Hints, pack: &TensorPack) {
            let workloads = split_workloads(
                kernel.window(),
                hints,
                self.num_threads,
                kernel.is_parallelisable(),
            );
            let num_threads = workloads.len();

            match (workloads.as_slice(), hints.strategy) {
                ([], _) => {}
                ([window], _) => run_checked(kernel, window, pack, &ThreadInfo::default()),
                (workloads, StrategyHint::Static) => self.pool.scope(|scope| {
                    for (thread_id, window) in workloads.iter().enumerate() {
                        let info = ThreadInfo {
                            thread_id,
                            num_threads,
                        };
                        scope.spawn(move |_| run_checked(kernel, window, pack, &info));
                    }
                }),
                (workloads, StrategyHint::Dynamic) => {
                    let (sender, receiver) = flume::unbounded();
                    for window in workloads {
                        _ = sender.send(*window);
                    }
                    drop(sender);

                    let num_workers = self.num_threads.min(workloads.len());
                    self.pool.scope(|scope| {
                        for thread_id in 0..num_workers {
                            let receiver = receiver.clone();
                            let info = ThreadInfo {
                                thread_id,
                                num_threads: num_workers,
                            };
                            scope.spawn(move |_| {
                                // one workload at a time, until the queue is empty
                                for window in receiver.iter() {
                                    run_checked(kernel, &window, pack, &info);
                                }
                            });
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::{Hints, Scheduler, SingleThreadScheduler, StrategyHint, split_workloads};
    use crate::loom::{
        dims::Steps,
        kernel::tests::CountKernel,
        tensor::TensorPack,
        window::{Dimension, Window},
    };

    #[test]
    fn test_split_workloads() {
        let kernel = CountKernel::new([8, 5, 2], Steps::from([4]));
        let window = kernel.window;

        let workloads = split_workloads(&window, &Hints::default(), 4, true);
        assert_eq!(workloads.len(), 4);
        assert_eq!(workloads[0].y(), Dimension::new(0, 2, 1));
        assert_eq!(workloads[3].y(), Dimension::new(4, 5, 1));

        // more threads than rows
        let workloads = split_workloads(&window, &Hints::default(), 16, true);
        assert_eq!(workloads.len(), 5);

        let workloads = split_workloads(&window, &Hints::default(), 4, false);
        assert_eq!(workloads, vec![window]);

        let hints = Hints::new(Window::DIM_Z).with_strategy(StrategyHint::Dynamic, 0);
        let workloads = split_workloads(&window, &hints, 4, true);
        assert_eq!(workloads.len(), 2);

        let hints = Hints::default().with_strategy(StrategyHint::Dynamic, 3);
        let workloads = split_workloads(&window, &hints, 2, true);
        assert_eq!(workloads.len(), 3);

        let mut empty = window;
        empty.set(1, Dimension::new(3, 3, 1));
        assert!(split_workloads(&empty, &Hints::default(), 4, true).is_empty());
    }

    #[test]
    fn test_single_thread() {
        let kernel = CountKernel::new([8, 5, 2], Steps::from([4]));
        let mut scheduler = SingleThreadScheduler;
        assert!(scheduler.set_num_threads(2).is_err());
        scheduler.schedule(&kernel, &Hints::default(), &TensorPack::new());
        assert_eq!(kernel.count.load(Ordering::Relaxed), 2 * 5 * 2);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_cpu_scheduler_covers_window() -> Result<(), Box<dyn std::error::Error>> {
        use super::CpuSchedulerBuilder;

        let mut scheduler = CpuSchedulerBuilder::new().num_threads(3).build()?;
        assert_eq!(scheduler.num_threads(), 3);

        let strategies = [
            Hints::default(),
            Hints::new(Window::DIM_Z),
            Hints::default().with_strategy(StrategyHint::Dynamic, 0),
            Hints::default().with_strategy(StrategyHint::Dynamic, 7),
        ];
        for hints in strategies {
            let kernel = CountKernel::new([9, 7, 3], Steps::from([4]));
            scheduler.schedule(&kernel, &hints, &TensorPack::new());
            assert_eq!(kernel.count.load(Ordering::Relaxed), 3 * 7 * 3);
        }

        scheduler.set_num_threads(1)?;
        let mut kernel = CountKernel::new([9, 7, 3], Steps::from([4]));
        kernel.parallelisable = false;
        scheduler.schedule(&kernel, &Hints::default(), &TensorPack::new());
        assert_eq!(kernel.count.load(Ordering::Relaxed), 3 * 7 * 3);
        Ok(())
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_cpu_scheduler_dynamic_spreads() -> Result<(), Box<dyn std::error::Error>> {
        use std::{
            sync::{Mutex, atomic::AtomicUsize},
            thread::{self, ThreadId},
            time::Duration,
        };

        use rustc_hash::FxHashSet;

        use super::CpuSchedulerBuilder;
        use crate::loom::{
            dims::TensorShape,
            kernel::{Kernel, ThreadInfo},
        };

        /// Sleeps on every workload and records the OS threads that ran one.
        struct SleepKernel {
            window: Window,
            threads: Mutex<FxHashSet<ThreadId>>,
            workloads: AtomicUsize,
        }

        impl Kernel for SleepKernel {
            fn name(&self) -> &'static str {
                "sleep"
            }

            fn window(&self) -> &Window {
                &self.window
            }

            fn run(&self, _window: &Window, _pack: &TensorPack, _info: &ThreadInfo) {
                thread::sleep(Duration::from_millis(20));
                self.workloads.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut threads) = self.threads.lock() {
                    threads.insert(thread::current().id());
                }
            }
        }

        let scheduler = CpuSchedulerBuilder::new().num_threads(4).build()?;
        let kernel = SleepKernel {
            window: Window::from_shape(TensorShape::from([1, 16]), Steps::default()),
            threads: Default::default(),
            workloads: Default::default(),
        };
        let hints = Hints::default().with_strategy(StrategyHint::Dynamic, 16);
        scheduler.schedule(&kernel, &hints, &TensorPack::new());

        assert_eq!(kernel.workloads.load(Ordering::Relaxed), 16);
        let threads = kernel.threads.lock().map(|threads| threads.len()).unwrap_or(0);
        assert!(threads > 1, "16 dynamic workloads ran on {threads} thread(s)");
        Ok(())
    }
}
