use crate::limit::*;
use crate::movegen::*;
use crate::movetypes::*;
use crate::position::*;
use crate::pv::*;
use crate::search::*;
use crate::tt::*;
use crate::types::*;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Condvar, Mutex};

pub struct SearchStats {
    pub nodes: AtomicU64,
    pub seldepth: AtomicI32,
}

impl SearchStats {
    fn new() -> SearchStats {
        SearchStats {
            nodes: AtomicU64::new(0),
            seldepth: AtomicI32::new(0),
        }
    }
    pub fn load_nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }
    pub fn load_seldepth(&self) -> i32 {
        self.seldepth.load(Ordering::Relaxed)
    }
}

pub struct ThreadData {
    pub id: usize,
    pub root_pos: Position,
    pub root_moves: Vec<Move>,
    pub key_history: Vec<Key>,
    pub max_depth: i32,
    pub root_depth: i32,
    pub depth_completed: i32,
    pub last_score: Value,
    pub last_pv: PvList,
    pub infinite: bool,
    pub cutechess: bool,
    pub limiter: Option<Box<dyn SearchLimiter>>,
    pub stats: Arc<SearchStats>,
}

impl ThreadData {
    fn new(id: usize, stats: Arc<SearchStats>) -> ThreadData {
        ThreadData {
            id,
            root_pos: Position::new(),
            root_moves: vec![],
            key_history: Vec::with_capacity(1024),
            max_depth: MAX_PLY,
            root_depth: 0,
            depth_completed: 0,
            last_score: -Value::INFINITE,
            last_pv: PvList::new(),
            infinite: false,
            cutechess: false,
            limiter: None,
            stats,
        }
    }
    pub fn is_main(&self) -> bool {
        self.id == 0
    }
    pub fn load_nodes(&self) -> u64 {
        self.stats.load_nodes()
    }
    pub fn inc_nodes(&self) {
        self.stats.nodes.fetch_add(1, Ordering::Relaxed);
    }
    pub fn update_seldepth(&self, ply: i32) {
        if ply > self.stats.load_seldepth() {
            self.stats.seldepth.store(ply, Ordering::Relaxed);
        }
    }
}

// The table is owned by the Searcher behind a Box; workers hold this view
// for the lifetime of the pool. Entries are atomic words, so shared reads
// and writes are sound; resize and clear take &mut and are only reachable
// while no search runs.
#[derive(Copy, Clone)]
pub struct TtView(*const TranspositionTable);

unsafe impl Send for TtView {}
unsafe impl Sync for TtView {}

impl TtView {
    pub fn get(&self) -> &TranspositionTable {
        unsafe { &*self.0 }
    }
}

pub struct SearchShared {
    pub stop: AtomicBool,
    quit: AtomicBool,
    running_threads: AtomicUsize,
    stop_mutex: Mutex<()>,
    stop_signal: Condvar,
    searching: Mutex<bool>,
    reset_barrier: Barrier,
    idle_barrier: Barrier,
    end_barrier: Barrier,
    pub stats: Vec<Arc<SearchStats>>,
    pub tt: TtView,
    pub reporter: Arc<dyn SearchReporter>,
    pub start_time: Mutex<std::time::Instant>,
}

impl SearchShared {
    pub fn has_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
    // Workers publish completion with release semantics; the driver
    // observes it through the condvar with acquire.
    pub fn finish_thread(&self) {
        {
            let _guard = self.stop_mutex.lock().unwrap();
            self.running_threads.fetch_sub(1, Ordering::Release);
        }
        self.stop_signal.notify_all();
        self.end_barrier.wait();
    }
    // Main-worker epilogue: request the stop, converge with the other
    // workers, report under the search mutex, then mark the search over.
    pub fn finish_main(&self, report: impl FnOnce()) {
        let mut searching = self.searching.lock().unwrap();
        self.request_stop();
        self.finish_thread();
        report();
        *searching = false;
    }
}

struct Worker {
    data: Arc<Mutex<ThreadData>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

pub struct Searcher {
    tt: Box<TranspositionTable>,
    reporter: Arc<dyn SearchReporter>,
    shared: Arc<SearchShared>,
    workers: Vec<Worker>,
    cutechess_workaround: bool,
}

fn worker_loop(shared: Arc<SearchShared>, data: Arc<Mutex<ThreadData>>) {
    loop {
        shared.reset_barrier.wait();
        shared.idle_barrier.wait();
        if shared.quit.load(Ordering::Relaxed) {
            return;
        }
        let mut thread = data.lock().unwrap();
        run_search(&mut thread, &shared);
    }
}

impl Searcher {
    pub fn new(reporter: Arc<dyn SearchReporter>) -> Searcher {
        let mut searcher = Searcher {
            tt: Box::new(TranspositionTable::new()),
            reporter,
            shared: Arc::new(Searcher::build_shared(
                1,
                TtView(std::ptr::null()),
                vec![],
                Arc::new(NullReporter),
            )),
            workers: vec![],
            cutechess_workaround: false,
        };
        searcher.spawn_workers(1);
        searcher
    }

    fn build_shared(
        thread_count: usize,
        tt: TtView,
        stats: Vec<Arc<SearchStats>>,
        reporter: Arc<dyn SearchReporter>,
    ) -> SearchShared {
        SearchShared {
            stop: AtomicBool::new(false),
            quit: AtomicBool::new(false),
            running_threads: AtomicUsize::new(0),
            stop_mutex: Mutex::new(()),
            stop_signal: Condvar::new(),
            searching: Mutex::new(false),
            reset_barrier: Barrier::new(thread_count + 1),
            idle_barrier: Barrier::new(thread_count + 1),
            end_barrier: Barrier::new(thread_count),
            stats,
            tt,
            reporter,
            start_time: Mutex::new(std::time::Instant::now()),
        }
    }

    fn spawn_workers(&mut self, thread_count: usize) {
        debug_assert!(self.workers.is_empty());
        let stats: Vec<Arc<SearchStats>> = (0..thread_count).map(|_| Arc::new(SearchStats::new())).collect();
        self.shared = Arc::new(Searcher::build_shared(
            thread_count,
            TtView(&*self.tt),
            stats.clone(),
            self.reporter.clone(),
        ));
        for (id, stats) in stats.into_iter().enumerate() {
            let data = Arc::new(Mutex::new(ThreadData::new(id, stats)));
            let shared = self.shared.clone();
            let thread_data = data.clone();
            let handle = std::thread::Builder::new()
                .stack_size(crate::stack_size::STACK_SIZE)
                .spawn(move || worker_loop(shared, thread_data))
                .expect("failed to spawn search thread");
            self.workers.push(Worker { data, handle: Some(handle) });
        }
    }

    fn shutdown_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.quit.store(true, Ordering::Relaxed);
        self.shared.reset_barrier.wait();
        self.shared.idle_barrier.wait();
        for worker in self.workers.iter_mut() {
            if let Some(handle) = worker.handle.take() {
                handle.join().expect("search thread panicked");
            }
        }
        self.workers.clear();
    }

    pub fn set_threads(&mut self, thread_count: usize) {
        debug_assert!(!self.is_searching());
        let thread_count = thread_count.max(1);
        self.shutdown_workers();
        self.spawn_workers(thread_count);
    }

    pub fn set_tt_size(&mut self, mib: usize) {
        debug_assert!(!self.is_searching());
        self.tt.resize(mib);
    }

    pub fn set_cutechess_workaround(&mut self, value: bool) {
        self.cutechess_workaround = value;
    }

    pub fn new_game(&mut self) {
        debug_assert!(!self.is_searching());
        if !self.tt.finalize() {
            self.tt.clear();
        }
    }

    pub fn ensure_ready(&mut self) {
        debug_assert!(!self.is_searching());
        self.tt.finalize();
    }

    pub fn is_searching(&self) -> bool {
        *self.shared.searching.lock().unwrap()
    }

    pub fn start_search(
        &mut self,
        pos: &Position,
        key_history: &[Key],
        start_time: std::time::Instant,
        infinite: bool,
        max_depth: i32,
        limiter: Option<Box<dyn SearchLimiter>>,
    ) {
        let mut limiter = limiter;
        self.shared.reset_barrier.wait();
        {
            let mut searching = self.shared.searching.lock().unwrap();
            self.tt.finalize();

            let mut list = MoveList::new();
            generate_all(&mut list, pos);
            let root_moves: Vec<Move> = list.slice(0).iter().copied().filter(|&m| pos.is_legal(m)).collect();

            *self.shared.start_time.lock().unwrap() = start_time;
            for worker in self.workers.iter() {
                let mut thread = worker.data.lock().unwrap();
                thread.root_pos = pos.clone();
                thread.root_moves = root_moves.clone();
                thread.key_history.clear();
                thread.key_history.extend_from_slice(key_history);
                thread.max_depth = max_depth.clamp(1, MAX_PLY);
                thread.root_depth = 0;
                thread.depth_completed = 0;
                thread.last_score = -Value::INFINITE;
                thread.last_pv.clear();
                thread.infinite = infinite;
                thread.cutechess = self.cutechess_workaround;
                thread.limiter = if thread.is_main() { limiter.take() } else { None };
                thread.stats.nodes.store(0, Ordering::Relaxed);
                thread.stats.seldepth.store(0, Ordering::Relaxed);
            }

            self.shared.stop.store(false, Ordering::Relaxed);
            self.shared.running_threads.store(self.workers.len(), Ordering::Release);
            *searching = true;
        }
        self.shared.idle_barrier.wait();
    }

    pub fn stop(&self) {
        self.shared.request_stop();
        let mut guard = self.shared.stop_mutex.lock().unwrap();
        while self.shared.running_threads.load(Ordering::Acquire) > 0 {
            guard = self.shared.stop_signal.wait(guard).unwrap();
        }
    }

    pub fn wait_for_search_finished(&self) {
        let mut guard = self.shared.stop_mutex.lock().unwrap();
        while self.shared.running_threads.load(Ordering::Acquire) > 0 {
            guard = self.shared.stop_signal.wait(guard).unwrap();
        }
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        self.stop();
        self.shutdown_workers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Capture {
        infos: Mutex<Vec<SearchInfo>>,
        best: Mutex<Option<Option<Move>>>,
        done_mutex: Mutex<bool>,
        done: Condvar,
    }

    impl Capture {
        fn new() -> Capture {
            Capture {
                infos: Mutex::new(vec![]),
                best: Mutex::new(None),
                done_mutex: Mutex::new(false),
                done: Condvar::new(),
            }
        }
        fn wait_bestmove(&self) -> Option<Move> {
            let mut done = self.done_mutex.lock().unwrap();
            while !*done {
                done = self.done.wait(done).unwrap();
            }
            self.best.lock().unwrap().expect("bestmove not reported")
        }
    }

    impl SearchReporter for Capture {
        fn on_info(&self, info: &SearchInfo) {
            self.infos.lock().unwrap().push(info.clone());
        }
        fn on_bestmove(&self, best: Option<Move>) {
            *self.best.lock().unwrap() = Some(best);
            let mut done = self.done_mutex.lock().unwrap();
            *done = true;
            self.done.notify_all();
        }
    }

    #[test]
    fn test_fixed_depth_search_reports_bestmove() {
        let reporter = Arc::new(Capture::new());
        let mut searcher = Searcher::new(reporter.clone());
        searcher.set_tt_size(1);
        searcher.ensure_ready();
        let pos = Position::new();
        searcher.start_search(&pos, &[], std::time::Instant::now(), false, 3, None);
        let best = reporter.wait_bestmove();
        searcher.wait_for_search_finished();
        assert!(best.is_some());
        let best = best.unwrap();
        assert!(pos.is_pseudolegal(best) && pos.is_legal(best));
        let infos = reporter.infos.lock().unwrap();
        assert!(!infos.is_empty());
        let last = infos.last().unwrap();
        assert_eq!(last.depth, 3);
        assert!(last.nodes > 0);
        assert_eq!(last.pv.first(), Some(&best));
        assert!(!searcher.is_searching());
    }

    #[test]
    fn test_node_limited_search_stops() {
        let reporter = Arc::new(Capture::new());
        let mut searcher = Searcher::new(reporter.clone());
        searcher.set_tt_size(1);
        searcher.ensure_ready();
        let pos = Position::new();
        searcher.start_search(
            &pos,
            &[],
            std::time::Instant::now(),
            false,
            MAX_PLY,
            Some(Box::new(NodeLimiter::new(20_000))),
        );
        let best = reporter.wait_bestmove();
        searcher.wait_for_search_finished();
        assert!(best.is_some());
    }

    #[test]
    fn test_stop_interrupts_infinite_search() {
        let reporter = Arc::new(Capture::new());
        let mut searcher = Searcher::new(reporter.clone());
        searcher.set_tt_size(1);
        searcher.ensure_ready();
        let pos = Position::new();
        searcher.start_search(&pos, &[], std::time::Instant::now(), true, MAX_PLY, None);
        std::thread::sleep(Duration::from_millis(50));
        assert!(searcher.is_searching());
        searcher.stop();
        let best = reporter.wait_bestmove();
        assert!(best.is_some());
        assert!(!searcher.is_searching());
    }

    #[test]
    fn test_checkmated_root_reports_no_move() {
        let reporter = Arc::new(Capture::new());
        let mut searcher = Searcher::new(reporter.clone());
        searcher.set_tt_size(1);
        searcher.ensure_ready();
        // black is mated by the wall of golds
        let pos = Position::new_from_sfen("4k4/9/9/9/9/9/9/3ggg3/4K4 b - 1").unwrap();
        let mut list = MoveList::new();
        generate_all(&mut list, &pos);
        assert!(!list.slice(0).iter().any(|&m| pos.is_legal(m)));
        searcher.start_search(&pos, &[], std::time::Instant::now(), false, 3, None);
        let best = reporter.wait_bestmove();
        searcher.wait_for_search_finished();
        assert!(best.is_none());
    }

    #[test]
    fn test_multithreaded_search() {
        let reporter = Arc::new(Capture::new());
        let mut searcher = Searcher::new(reporter.clone());
        searcher.set_threads(4);
        searcher.set_tt_size(4);
        searcher.ensure_ready();
        let pos = Position::new();
        searcher.start_search(&pos, &[], std::time::Instant::now(), false, 4, None);
        let best = reporter.wait_bestmove();
        searcher.wait_for_search_finished();
        assert!(best.is_some());
    }
}
