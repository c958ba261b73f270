//! Lazy-SMP worker pool.
//!
//! A fixed vector of persistent threads. Each worker keeps its own
//! board copy, heuristic tables and evaluation caches; the threads
//! coordinate only through the shared transposition table and the stop
//! flag. Workers sleep on a condition variable between searches; a
//! "search requested" generation counter guards against spurious
//! wakeups. Changing the thread count joins everything and respawns.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::board::{Board, Color};
use crate::eval::EvalParams;
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

use super::{InfoCallback, SearchLimits, SearchParams, SearchWorker, WorkerReport};

/// Stack size for search threads; the recursion is deep.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Everything a worker needs for one search.
#[derive(Clone)]
struct Job {
    board: Board,
    limits: SearchLimits,
    stop: StopFlag,
    params: SearchParams,
    eval_params: Arc<EvalParams>,
    tt: Arc<TranspositionTable>,
    contempt: i32,
    contempt_color: Color,
    clear_state: bool,
}

struct PoolState {
    job: Option<Job>,
    /// Bumped for every published job; workers track the last one they
    /// picked up so a spurious wakeup finds nothing to do.
    job_generation: u64,
    active_workers: usize,
    results: Vec<WorkerReport>,
    exit: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    work_signal: Condvar,
    done_signal: Condvar,
    info_callback: Mutex<Option<InfoCallback>>,
}

/// The worker pool. Owned by the engine; one instance per engine.
pub struct SearchPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
    num_threads: usize,
}

impl SearchPool {
    #[must_use]
    pub fn new(num_threads: usize, tt: Arc<TranspositionTable>, eval_params: Arc<EvalParams>) -> Self {
        let mut pool = SearchPool {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    job: None,
                    job_generation: 0,
                    active_workers: 0,
                    results: Vec::new(),
                    exit: false,
                }),
                work_signal: Condvar::new(),
                done_signal: Condvar::new(),
                info_callback: Mutex::new(None),
            }),
            handles: Vec::new(),
            num_threads: 0,
        };
        pool.resize(num_threads, tt, eval_params);
        pool
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Join all workers and spawn a fresh set.
    pub fn resize(
        &mut self,
        num_threads: usize,
        tt: Arc<TranspositionTable>,
        eval_params: Arc<EvalParams>,
    ) {
        self.shutdown();

        let num_threads = num_threads.clamp(1, 128);
        self.shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                job: None,
                job_generation: 0,
                active_workers: 0,
                results: Vec::new(),
                exit: false,
            }),
            work_signal: Condvar::new(),
            done_signal: Condvar::new(),
            info_callback: Mutex::new(None),
        });

        for id in 0..num_threads {
            let shared = Arc::clone(&self.shared);
            let tt = Arc::clone(&tt);
            let eval_params = Arc::clone(&eval_params);
            let handle = std::thread::Builder::new()
                .name(format!("search-{id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn(move || worker_loop(id, shared, tt, eval_params))
                .expect("failed to spawn search worker");
            self.handles.push(handle);
        }
        self.num_threads = num_threads;
    }

    /// Install the info callback reports go through (worker 0 only).
    pub fn set_info_callback(&self, callback: Option<InfoCallback>) {
        *self.shared.info_callback.lock() = callback;
    }

    /// Publish a search job and wake every worker.
    #[allow(clippy::too_many_arguments)]
    pub fn start_search(
        &self,
        board: &Board,
        limits: SearchLimits,
        stop: StopFlag,
        params: SearchParams,
        eval_params: Arc<EvalParams>,
        tt: Arc<TranspositionTable>,
        contempt: i32,
        clear_state: bool,
    ) {
        tt.new_generation();
        let contempt_color = board.side_to_move();
        let job = Job {
            board: board.clone(),
            limits,
            stop,
            params,
            eval_params,
            tt,
            contempt,
            contempt_color,
            clear_state,
        };
        let mut state = self.shared.state.lock();
        state.job = Some(job);
        state.job_generation += 1;
        state.active_workers = self.num_threads;
        state.results.clear();
        self.shared.work_signal.notify_all();
    }

    /// Block until every worker finished and collect their reports.
    pub fn wait_for_results(&self) -> Vec<WorkerReport> {
        let mut state = self.shared.state.lock();
        while state.active_workers > 0 {
            self.shared.done_signal.wait(&mut state);
        }
        std::mem::take(&mut state.results)
    }

    /// True while any worker is still searching.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().active_workers > 0
    }

    /// A detachable waiter for another thread: blocks until the current
    /// job finishes and yields the worker reports.
    #[must_use]
    pub fn waiter_handle(&self) -> impl FnOnce() -> Vec<WorkerReport> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        move || {
            let mut state = shared.state.lock();
            while state.active_workers > 0 {
                shared.done_signal.wait(&mut state);
            }
            std::mem::take(&mut state.results)
        }
    }

    /// Pick the final move: deepest completed search wins, score breaks
    /// ties. All workers have joined the job by now, so the reads are
    /// ordered.
    #[must_use]
    pub fn select_best(results: &[WorkerReport]) -> Option<WorkerReport> {
        results
            .iter()
            .filter(|r| r.best_move.is_some())
            .max_by(|a, b| a.depth.cmp(&b.depth).then(a.score.cmp(&b.score)))
            .cloned()
    }

    fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.exit = true;
            self.shared.work_signal.notify_all();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for SearchPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The worker thread body: wait for a job, search, publish the result,
/// go back to sleep.
fn worker_loop(
    id: usize,
    shared: Arc<PoolShared>,
    tt: Arc<TranspositionTable>,
    eval_params: Arc<EvalParams>,
) {
    let mut worker = SearchWorker::new(id, tt, eval_params);
    let mut seen_generation = 0u64;

    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.exit {
                    return;
                }
                if state.job_generation != seen_generation && state.job.is_some() {
                    seen_generation = state.job_generation;
                    break state.job.clone().expect("job present");
                }
                shared.work_signal.wait(&mut state);
            }
        };

        if job.clear_state {
            worker.new_game();
        }
        worker.set_tt(Arc::clone(&job.tt));
        worker.set_eval_params(Arc::clone(&job.eval_params));
        worker.set_search_params(job.params.clone());
        worker.set_contempt(job.contempt, job.contempt_color);

        let info = if id == 0 {
            shared.info_callback.lock().clone()
        } else {
            None
        };

        let report = worker.run_search(job.board, job.limits, job.stop, info);
        #[cfg(feature = "logging")]
        log::trace!(
            "worker {id} done: depth {} nodes {}",
            report.depth,
            report.nodes
        );

        let mut state = shared.state.lock();
        state.results.push(report);
        state.active_workers = state.active_workers.saturating_sub(1);
        if state.active_workers == 0 {
            shared.done_signal.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(threads: usize) -> (SearchPool, Arc<TranspositionTable>, Arc<EvalParams>) {
        let tt = Arc::new(TranspositionTable::new(16));
        let params = Arc::new(EvalParams::new());
        let pool = SearchPool::new(threads, Arc::clone(&tt), Arc::clone(&params));
        (pool, tt, params)
    }

    #[test]
    fn test_single_worker_search() {
        let (pool, tt, params) = pool(1);
        let board = Board::new();
        let limits = SearchLimits {
            max_depth: 4,
            ..Default::default()
        };
        pool.start_search(
            &board,
            limits,
            StopFlag::new(),
            SearchParams::default(),
            params,
            tt,
            0,
            false,
        );
        let results = pool.wait_for_results();
        assert_eq!(results.len(), 1);
        let best = SearchPool::select_best(&results).expect("result");
        assert!(best.best_move.is_some());
    }

    #[test]
    fn test_multiple_workers_agree_on_legality() {
        let (pool, tt, params) = pool(3);
        let board = Board::new();
        let limits = SearchLimits {
            max_depth: 4,
            ..Default::default()
        };
        pool.start_search(
            &board,
            limits,
            StopFlag::new(),
            SearchParams::default(),
            params,
            tt,
            0,
            false,
        );
        let results = pool.wait_for_results();
        assert_eq!(results.len(), 3);
        let mut check = Board::new();
        let legal = check.generate_moves();
        for report in &results {
            let mv = report.best_move.expect("every worker finds a move");
            assert!(legal.contains(mv));
        }
    }

    #[test]
    fn test_stop_flag_halts_pool() {
        let (pool, tt, params) = pool(2);
        let board = Board::new();
        let stop = StopFlag::new();
        let limits = SearchLimits {
            max_depth: 60,
            ..Default::default()
        };
        pool.start_search(
            &board,
            limits,
            stop.clone(),
            SearchParams::default(),
            params,
            tt,
            0,
            false,
        );
        std::thread::sleep(std::time::Duration::from_millis(50));
        stop.stop();
        let results = pool.wait_for_results();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_pool_survives_consecutive_searches() {
        let (pool, tt, params) = pool(2);
        for _ in 0..3 {
            pool.start_search(
                &Board::new(),
                SearchLimits {
                    max_depth: 3,
                    ..Default::default()
                },
                StopFlag::new(),
                SearchParams::default(),
                Arc::clone(&params),
                Arc::clone(&tt),
                0,
                false,
            );
            let results = pool.wait_for_results();
            assert_eq!(results.len(), 2);
        }
    }

    #[test]
    fn test_resize_joins_and_respawns() {
        let (mut pool, tt, params) = pool(1);
        pool.resize(4, Arc::clone(&tt), Arc::clone(&params));
        assert_eq!(pool.num_threads(), 4);
        pool.start_search(
            &Board::new(),
            SearchLimits {
                max_depth: 2,
                ..Default::default()
            },
            StopFlag::new(),
            SearchParams::default(),
            params,
            tt,
            0,
            false,
        );
        assert_eq!(pool.wait_for_results().len(), 4);
    }
}
