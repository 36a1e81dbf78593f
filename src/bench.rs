use crate::movetypes::*;
use crate::position::*;
use crate::search::*;
use crate::sfen::*;
use crate::thread::*;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

const DEFAULT_BENCH_DEPTH: i32 = 6;

const BENCH_SFENS: [&str; 5] = [
    START_SFEN,
    "lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2",
    "l2g1g1nl/2s1k2b1/p1nppsppp/2p6/1p7/2PPP4/PPSG1PPPP/1B1K2SR1/LN5NL w Rp 1",
    "4k4/9/9/9/9/9/9/9/4K4 b 2RB2G2S 1",
    "8k/9/9/7N1/9/9/9/7R1/K8 b P 1",
];

struct BenchReporter {
    nodes: Mutex<u64>,
    done_mutex: Mutex<bool>,
    done: Condvar,
}

impl BenchReporter {
    fn new() -> BenchReporter {
        BenchReporter {
            nodes: Mutex::new(0),
            done_mutex: Mutex::new(false),
            done: Condvar::new(),
        }
    }
    fn wait_done(&self) -> u64 {
        let mut done = self.done_mutex.lock().unwrap();
        while !*done {
            done = self.done.wait(done).unwrap();
        }
        *done = false;
        *self.nodes.lock().unwrap()
    }
}

impl SearchReporter for BenchReporter {
    fn on_info(&self, info: &SearchInfo) {
        *self.nodes.lock().unwrap() = info.nodes;
    }
    fn on_bestmove(&self, _best: Option<Move>) {
        let mut done = self.done_mutex.lock().unwrap();
        *done = true;
        self.done.notify_all();
    }
}

pub fn run(depth: Option<i32>) {
    let depth = depth.unwrap_or(DEFAULT_BENCH_DEPTH).max(1);
    let reporter = Arc::new(BenchReporter::new());
    let mut searcher = Searcher::new(reporter.clone());
    searcher.set_tt_size(16);
    searcher.ensure_ready();

    let start = Instant::now();
    let mut total_nodes = 0;

    for (i, sfen) in BENCH_SFENS.iter().enumerate() {
        let pos = match Position::new_from_sfen(sfen) {
            Ok(pos) => pos,
            Err(err) => {
                eprintln!("bad bench sfen: {}", err);
                continue;
            }
        };
        println!("position {}/{}: {}", i + 1, BENCH_SFENS.len(), sfen);
        searcher.new_game();
        searcher.start_search(&pos, &[], Instant::now(), false, depth, None);
        let nodes = reporter.wait_done();
        searcher.wait_for_search_finished();
        total_nodes += nodes;
    }

    let elapsed = start.elapsed();
    let nps = total_nodes as u128 * 1_000_000_000 / elapsed.as_nanos().max(1);
    println!();
    println!("total nodes : {}", total_nodes);
    println!("total time  : {} ms", elapsed.as_millis());
    println!("nps         : {}", nps);
}
