use std::time::{Duration, Instant};

// The hard predicate gates the clock read on a node-count multiple so the
// per-node cost stays at a counter comparison.
const TIME_CHECK_INTERVAL: u64 = 2048;
const MOVE_OVERHEAD: Duration = Duration::from_millis(10);

pub trait SearchLimiter: Send {
    // polled between root iterations; may end iterative deepening
    fn stop_soft(&mut self, nodes: u64) -> bool;
    // polled inside the search; requests an immediate abort
    fn stop_hard(&mut self, nodes: u64) -> bool;
}

pub struct NodeLimiter {
    max_nodes: u64,
}

impl NodeLimiter {
    pub fn new(max_nodes: u64) -> NodeLimiter {
        NodeLimiter { max_nodes }
    }
}

impl SearchLimiter for NodeLimiter {
    fn stop_soft(&mut self, nodes: u64) -> bool {
        self.stop_hard(nodes)
    }
    fn stop_hard(&mut self, nodes: u64) -> bool {
        nodes >= self.max_nodes
    }
}

pub struct MoveTimeLimiter {
    start_time: Instant,
    max_time: Duration,
}

impl MoveTimeLimiter {
    pub fn new(start_time: Instant, max_time: Duration) -> MoveTimeLimiter {
        MoveTimeLimiter { start_time, max_time }
    }
}

impl SearchLimiter for MoveTimeLimiter {
    fn stop_soft(&mut self, _nodes: u64) -> bool {
        self.start_time.elapsed() >= self.max_time
    }
    fn stop_hard(&mut self, nodes: u64) -> bool {
        if nodes == 0 || nodes % TIME_CHECK_INTERVAL != 0 {
            return false;
        }
        self.start_time.elapsed() >= self.max_time
    }
}

pub struct TimeManager {
    start_time: Instant,
    max_time: Duration,
}

impl TimeManager {
    pub fn new(start_time: Instant, remaining: Duration, increment: Duration) -> TimeManager {
        let remaining = remaining.saturating_sub(MOVE_OVERHEAD);
        let budget = remaining.mul_f64(0.05) + increment.mul_f64(0.5);
        TimeManager {
            start_time,
            max_time: budget.min(remaining),
        }
    }
}

impl SearchLimiter for TimeManager {
    fn stop_soft(&mut self, _nodes: u64) -> bool {
        self.start_time.elapsed() >= self.max_time
    }
    fn stop_hard(&mut self, nodes: u64) -> bool {
        if nodes == 0 || nodes % TIME_CHECK_INTERVAL != 0 {
            return false;
        }
        self.start_time.elapsed() >= self.max_time
    }
}

pub struct CompoundLimiter {
    limiters: Vec<Box<dyn SearchLimiter>>,
}

impl CompoundLimiter {
    pub fn new() -> CompoundLimiter {
        CompoundLimiter { limiters: vec![] }
    }
    pub fn add(&mut self, limiter: Box<dyn SearchLimiter>) {
        self.limiters.push(limiter);
    }
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

impl SearchLimiter for CompoundLimiter {
    fn stop_soft(&mut self, nodes: u64) -> bool {
        self.limiters.iter_mut().any(|limiter| limiter.stop_soft(nodes))
    }
    fn stop_hard(&mut self, nodes: u64) -> bool {
        self.limiters.iter_mut().any(|limiter| limiter.stop_hard(nodes))
    }
}

#[test]
fn test_node_limiter() {
    let mut limiter = NodeLimiter::new(1000);
    assert!(!limiter.stop_soft(999));
    assert!(limiter.stop_soft(1000));
    assert!(!limiter.stop_hard(0));
    assert!(limiter.stop_hard(4096));
}

#[test]
fn test_move_time_limiter_gates_clock() {
    let start = Instant::now();
    let mut limiter = MoveTimeLimiter::new(start, Duration::from_secs(0));
    assert!(limiter.stop_soft(1));
    // the hard check only fires on the node interval
    assert!(!limiter.stop_hard(TIME_CHECK_INTERVAL + 1));
    assert!(limiter.stop_hard(TIME_CHECK_INTERVAL));
}

#[test]
fn test_time_manager_budget() {
    let start = Instant::now();
    // 10s + 2s increment: budget is 0.05 * remaining + 0.5 * increment
    let tm = TimeManager::new(start, Duration::from_secs(10), Duration::from_secs(2));
    let expected = Duration::from_secs(10).saturating_sub(MOVE_OVERHEAD).mul_f64(0.05) + Duration::from_secs(1);
    assert_eq!(tm.max_time, expected);
    // a tiny clock is capped at the remaining time
    let tm = TimeManager::new(start, Duration::from_millis(30), Duration::from_secs(60));
    assert!(tm.max_time <= Duration::from_millis(20));
}

#[test]
fn test_compound_limiter_or() {
    let mut compound = CompoundLimiter::new();
    compound.add(Box::new(NodeLimiter::new(100)));
    compound.add(Box::new(NodeLimiter::new(1_000_000)));
    assert!(compound.stop_soft(100));
    assert!(!compound.stop_soft(99));
    assert!(CompoundLimiter::new().is_empty());
    assert!(!CompoundLimiter::new().stop_hard(u64::MAX));
}
