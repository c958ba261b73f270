//! Criterion benchmarks: perft, evaluation and fixed-depth search.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use cinder::board::Board;
use cinder::eval::{EvalParams, Evaluator, NO_EVAL};
use cinder::search::{SearchLimits, SearchWorker};
use cinder::sync::StopFlag;
use cinder::tt::TranspositionTable;

fn bench_perft(c: &mut Criterion) {
    c.bench_function("perft_startpos_4", |b| {
        let mut board = Board::new();
        b.iter(|| board.perft(4));
    });

    c.bench_function("perft_kiwipete_3", |b| {
        let mut board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        );
        b.iter(|| board.perft(3));
    });
}

fn bench_eval(c: &mut Criterion) {
    let board = Board::from_fen(
        "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
    );
    let mut evaluator = Evaluator::new(Arc::new(EvalParams::new()));
    c.bench_function("eval_middlegame", |b| {
        b.iter(|| evaluator.evaluate(&board, -30000, 30000, NO_EVAL).value);
    });
}

fn bench_search(c: &mut Criterion) {
    c.bench_function("search_startpos_depth_6", |b| {
        b.iter(|| {
            let mut worker = SearchWorker::new(
                0,
                Arc::new(TranspositionTable::new(16)),
                Arc::new(EvalParams::new()),
            );
            let limits = SearchLimits {
                max_depth: 6,
                ..Default::default()
            };
            worker.run_search(Board::new(), limits, StopFlag::new(), None)
        });
    });
}

criterion_group!(benches, bench_perft, bench_eval, bench_search);
criterion_main!(benches);
