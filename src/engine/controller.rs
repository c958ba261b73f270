//! Engine controller: owns the board, transposition table, evaluation
//! parameters, options and the worker pool. The UCI layer drives it;
//! nothing in here is process-global, so several engines can coexist.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::board::{Board, Move};
use crate::eval::EvalParams;
use crate::search::{
    InfoCallback, SearchLimits, SearchParams, SearchPool, WorkerReport,
};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

use super::time::{TimeConfig, TimeControl};

/// How a `go` command searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    AlphaBeta,
    Random,
}

/// Parameters of one `go` command after parsing.
#[derive(Debug, Clone, Default)]
pub struct GoRequest {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub time_control: TimeControl,
    pub infinite: bool,
    pub ponder: bool,
}

/// A running search: its stop flag, ponder state and worker threads.
struct SearchJob {
    stop: StopFlag,
    pondering: Arc<AtomicBool>,
    planned_hard_ms: u64,
    coordinator: JoinHandle<()>,
    timer: Option<JoinHandle<()>>,
}

impl SearchJob {
    fn signal_stop(&self) {
        self.stop.stop();
        self.pondering.store(false, Ordering::Relaxed);
    }

    fn stop_and_join(self) {
        self.signal_stop();
        let _ = self.coordinator.join();
        if let Some(timer) = self.timer {
            let _ = timer.join();
        }
    }

    /// Convert a ponder search into a timed one.
    fn ponderhit(&mut self) {
        if !self.pondering.swap(false, Ordering::Relaxed) {
            return;
        }
        if self.planned_hard_ms > 0 {
            self.timer = Some(spawn_deadline_timer(
                Instant::now() + Duration::from_millis(self.planned_hard_ms),
                self.stop.clone(),
            ));
        }
    }
}

fn spawn_deadline_timer(deadline: Instant, stop: StopFlag) -> JoinHandle<()> {
    thread::spawn(move || loop {
        if stop.is_stopped() {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            stop.stop();
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(5)));
    })
}

/// The engine: one per process in the UCI binary, but fully
/// self-contained so tests can run several side by side.
pub struct EngineController {
    board: Board,
    tt: Arc<TranspositionTable>,
    eval_params: Arc<EvalParams>,
    search_params: SearchParams,
    pool: SearchPool,
    time_config: TimeConfig,
    current_job: Option<SearchJob>,
    hash_mb: usize,
    contempt: i32,
    multipv: u32,
    chess960: bool,
    search_type: SearchType,
    /// Set by `ucinewgame`; consumed by the next search.
    pending_clear: bool,
}

impl EngineController {
    #[must_use]
    pub fn new(hash_mb: usize, threads: usize) -> Self {
        let tt = Arc::new(TranspositionTable::new(hash_mb));
        let eval_params = Arc::new(EvalParams::new());
        let pool = SearchPool::new(threads, Arc::clone(&tt), Arc::clone(&eval_params));
        EngineController {
            board: Board::new(),
            tt,
            eval_params,
            search_params: SearchParams::default(),
            pool,
            time_config: TimeConfig::default(),
            current_job: None,
            hash_mb,
            contempt: 0,
            multipv: 1,
            chess960: false,
            search_type: SearchType::AlphaBeta,
            pending_clear: false,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn set_board(&mut self, mut board: Board) {
        self.stop_search();
        board.set_chess960(self.chess960);
        self.board = board;
    }

    /// `ucinewgame`: reset position, wipe the hash and mark the workers'
    /// private state for clearing.
    pub fn new_game(&mut self) {
        self.stop_search();
        self.board = Board::new();
        self.board.set_chess960(self.chess960);
        self.tt.clear();
        self.pending_clear = true;
    }

    /// Re-allocate the transposition table. Keeps the old table when
    /// the allocation fails.
    pub fn resize_hash(&mut self, mb: usize) -> bool {
        self.stop_search();
        let mb = mb.clamp(16, 1_048_576);
        match TranspositionTable::try_new(mb) {
            Some(tt) => {
                self.tt = Arc::new(tt);
                self.hash_mb = mb;
                true
            }
            None => false,
        }
    }

    pub fn clear_hash(&mut self) {
        self.stop_search();
        self.tt.clear();
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.stop_search();
        self.pool
            .resize(threads, Arc::clone(&self.tt), Arc::clone(&self.eval_params));
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }

    pub fn set_contempt(&mut self, contempt: i32) {
        self.contempt = contempt.clamp(-100, 100);
    }

    pub fn set_multipv(&mut self, multipv: u32) {
        self.multipv = multipv.clamp(1, 64);
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.chess960 = enabled;
        self.board.set_chess960(enabled);
    }

    #[must_use]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn set_search_type(&mut self, search_type: SearchType) {
        self.search_type = search_type;
    }

    pub fn set_move_overhead(&mut self, ms: u64) {
        self.time_config.move_overhead_ms = ms;
    }

    /// Tuner hook: the pruning margins for the next searches.
    pub fn search_params_mut(&mut self) -> &mut SearchParams {
        &mut self.search_params
    }

    /// Tuner hook: replace the evaluation weights. The next search
    /// hands the new table to every worker.
    pub fn set_eval_params(&mut self, params: EvalParams) {
        self.stop_search();
        self.eval_params = Arc::new(params);
    }

    pub fn set_info_callback(&self, callback: Option<InfoCallback>) {
        self.pool.set_info_callback(callback);
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.current_job.is_some() && self.pool.is_busy()
    }

    /// Signal the running search to stop without waiting for it.
    pub fn signal_stop(&mut self) {
        if let Some(job) = &self.current_job {
            job.signal_stop();
        }
    }

    /// Stop the running search and wait for its bestmove to be emitted.
    pub fn stop_search(&mut self) {
        if let Some(job) = self.current_job.take() {
            job.stop_and_join();
        }
    }

    /// `ponderhit`: the predicted move was played.
    pub fn ponderhit(&mut self) {
        if let Some(job) = &mut self.current_job {
            job.ponderhit();
        }
    }

    /// Launch a search; `on_complete` fires exactly once with the chosen
    /// move and optional ponder move.
    pub fn start_search<F>(&mut self, request: GoRequest, on_complete: F)
    where
        F: FnOnce(Option<Move>, Option<Move>) + Send + 'static,
    {
        self.stop_search();

        if self.search_type == SearchType::Random {
            let mv = random_move(&mut self.board.clone());
            on_complete(mv, None);
            return;
        }

        let (soft_ms, hard_ms) = request.time_control.compute_limits(&self.time_config);
        let timed = !request.infinite && !request.ponder;

        let limits = SearchLimits {
            max_depth: request
                .depth
                .unwrap_or(crate::board::MAX_PLY as u32 - 1)
                .max(1),
            node_limit: request.nodes.unwrap_or(0),
            soft_time_ms: if timed { soft_ms } else { 0 },
            hard_time_ms: if timed { hard_ms } else { 0 },
            multipv: self.multipv,
            infinite: request.infinite || request.ponder,
        };

        let stop = StopFlag::new();
        let pondering = Arc::new(AtomicBool::new(request.ponder));

        // The hard deadline is enforced out-of-band so a stuck worker
        // iteration cannot blow the clock.
        let timer = if timed && hard_ms > 0 {
            Some(spawn_deadline_timer(
                Instant::now() + Duration::from_millis(hard_ms),
                stop.clone(),
            ))
        } else {
            None
        };

        self.pool.start_search(
            &self.board,
            limits,
            stop.clone(),
            self.search_params.clone(),
            Arc::clone(&self.eval_params),
            Arc::clone(&self.tt),
            self.contempt,
            std::mem::take(&mut self.pending_clear),
        );

        // The coordinator collects worker results, honors pondering and
        // delivers the final move.
        let pool_waiter = self.pool.waiter_handle();
        let stop_for_wait = stop.clone();
        let pondering_clone = Arc::clone(&pondering);
        let coordinator = thread::Builder::new()
            .name("search-main".to_string())
            .spawn(move || {
                let results = pool_waiter();
                // A ponder search must not answer before ponderhit/stop.
                while pondering_clone.load(Ordering::Relaxed) && !stop_for_wait.is_stopped() {
                    thread::sleep(Duration::from_millis(10));
                }
                let best = SearchPool::select_best(&results);
                match best {
                    Some(WorkerReport {
                        best_move, ponder_move, ..
                    }) => on_complete(best_move, ponder_move),
                    None => on_complete(None, None),
                }
            })
            .expect("failed to spawn search coordinator");

        self.current_job = Some(SearchJob {
            stop,
            pondering,
            planned_hard_ms: hard_ms,
            coordinator,
            timer,
        });
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.stop_search();
    }
}

/// The `SearchType random` mover: any legal move, uniformly.
fn random_move(board: &mut Board) -> Option<Move> {
    let moves = board.generate_moves();
    let mut rng = rand::thread_rng();
    moves.as_slice().choose(&mut rng).copied()
}
