use crate::evaluate::*;
use crate::movepick::*;
use crate::movetypes::*;
use crate::position::*;
use crate::pv::*;
use crate::thread::*;
use crate::tt::*;
use crate::types::*;

const FUTILITY_DEPTH: i32 = 4;
const FUTILITY_MARGIN_PER_PLY: i32 = 120;
const LMR_MIN_DEPTH: i32 = 2;

#[derive(Clone)]
pub struct SearchInfo {
    pub depth: i32,
    pub seldepth: i32,
    pub time: std::time::Duration,
    pub nodes: u64,
    pub score: Value,
    pub pv: Vec<Move>,
    pub hashfull: u32,
}

pub trait SearchReporter: Send + Sync {
    fn on_info(&self, info: &SearchInfo);
    fn on_bestmove(&self, best: Option<Move>);
}

pub struct NullReporter;

impl SearchReporter for NullReporter {
    fn on_info(&self, _info: &SearchInfo) {}
    fn on_bestmove(&self, _best: Option<Move>) {}
}

struct Reductions {
    ln: [f64; Reductions::SIZE],
}

impl Reductions {
    const SIZE: usize = 600;

    fn new() -> Reductions {
        let mut r = Reductions { ln: [0.0; Reductions::SIZE] };
        for (i, v) in r.ln.iter_mut().enumerate().skip(1) {
            *v = (i as f64).ln();
        }
        r
    }
    fn get(&self, depth: i32, move_count: i32) -> i32 {
        let d = (depth as usize).min(Reductions::SIZE - 1);
        let m = (move_count as usize).min(Reductions::SIZE - 1);
        (0.2 + self.ln[d] * self.ln[m] / 3.5).round() as i32
    }
}

static REDUCTIONS: once_cell::sync::Lazy<Reductions> = once_cell::sync::Lazy::new(Reductions::new);

// Small nonzero noise keeps the search from steering into deterministic
// repetition lines.
fn draw_score(nodes: u64) -> Value {
    Value(2 - (nodes & 3) as i32)
}

pub fn run_search(thread: &mut ThreadData, shared: &SearchShared) {
    let tt = shared.tt.get();

    if thread.root_moves.is_empty() {
        // mated (or stalemated, which shogi does not know) at the root
        thread.depth_completed = 1;
        thread.last_score = Value::mated_in(0);
        thread.last_pv.clear();
    } else {
        let root_pos = thread.root_pos.clone();
        for depth in 1..=thread.max_depth {
            thread.root_depth = depth;
            thread.stats.seldepth.store(0, std::sync::atomic::Ordering::Relaxed);

            let mut pv = PvList::new();
            let score = search::<True, True>(
                thread,
                shared,
                tt,
                &root_pos,
                &mut pv,
                depth,
                0,
                -Value::INFINITE,
                Value::INFINITE,
            );

            if shared.has_stopped() {
                // a partial iteration is worthless
                break;
            }

            thread.depth_completed = depth;
            thread.last_score = score;
            thread.last_pv = pv;

            if depth >= thread.max_depth {
                break;
            }

            if thread.is_main() {
                let nodes = thread.load_nodes();
                let soft_stop = match thread.limiter.as_mut() {
                    Some(limiter) => limiter.stop_soft(nodes),
                    None => false,
                };
                if soft_stop && !thread.infinite {
                    break;
                }
                report(thread, shared, tt);
            }
        }
    }

    if thread.is_main() {
        let best = thread.last_pv.best_move().or_else(|| thread.root_moves.first().copied());
        shared.finish_main(|| {
            report(thread, shared, tt);
            shared.reporter.on_bestmove(best);
        });
        thread.limiter = None;
    } else {
        shared.finish_thread();
    }
}

fn report(thread: &ThreadData, shared: &SearchShared, tt: &TranspositionTable) {
    let mut nodes = 0;
    let mut seldepth = 0;
    for stats in shared.stats.iter() {
        nodes += stats.load_nodes();
        seldepth = seldepth.max(stats.load_seldepth());
    }
    let time = shared.start_time.lock().unwrap().elapsed();
    // a search stopped before its first iteration has no score yet
    let score = if thread.last_score == -Value::INFINITE {
        Value::ZERO
    } else {
        thread.last_score
    };
    shared.reporter.on_info(&SearchInfo {
        depth: thread.depth_completed.max(1),
        seldepth,
        time,
        nodes,
        score,
        pv: thread.last_pv.line(),
        hashfull: tt.full_permille(),
    });
}

fn search<PV: Bool, ROOT: Bool>(
    thread: &mut ThreadData,
    shared: &SearchShared,
    tt: &TranspositionTable,
    pos: &Position,
    pv: &mut PvList,
    depth: i32,
    ply: i32,
    alpha: Value,
    beta: Value,
) -> Value {
    debug_assert!(ROOT::BOOL == (ply == 0));
    debug_assert!(!ROOT::BOOL || PV::BOOL);
    debug_assert!(-Value::INFINITE <= alpha && alpha < beta && beta <= Value::INFINITE);

    if !ROOT::BOOL && thread.is_main() && thread.root_depth > 1 {
        let nodes = thread.load_nodes();
        if let Some(limiter) = thread.limiter.as_mut() {
            if limiter.stop_hard(nodes) {
                shared.request_stop();
                return Value::ZERO;
            }
        }
    }

    if depth <= 0 {
        return qsearch::<PV>(thread, shared, pos, ply, alpha, beta, None);
    }

    thread.inc_nodes();
    thread.update_seldepth(ply + 1);

    if ply >= MAX_PLY {
        return if pos.in_check() { Value::ZERO } else { evaluate(pos) };
    }

    let tt_probe = tt.probe(pos.key(), ply);
    let tt_move = tt_probe.as_ref().and_then(|probe| probe.mv);

    if !PV::BOOL {
        if let Some(probe) = &tt_probe {
            if probe.depth >= depth
                && ((probe.bound.include_lower() && probe.score >= beta)
                    || (probe.bound.include_upper() && probe.score <= alpha))
            {
                return probe.score;
            }
        }
    }

    if !PV::BOOL && !pos.in_check() && depth <= FUTILITY_DEPTH {
        let static_eval = evaluate(pos);
        if static_eval - Value(FUTILITY_MARGIN_PER_PLY * depth) >= beta {
            return static_eval;
        }
    }

    let mut alpha = alpha;
    let mut best_score = -Value::INFINITE;
    let mut best_move: Option<Move> = None;
    let mut move_count: i32 = 0;

    let mut generator = MoveGenerator::main(tt_move);
    while let Some(m) = generator.next(pos) {
        if ROOT::BOOL {
            // search exactly the move set that was reported legal
            if !thread.root_moves.contains(&m) {
                continue;
            }
        } else if !pos.is_legal(m) {
            continue;
        }
        move_count += 1;

        let new_pos = pos.apply_move(m);
        let new_depth = depth - 1;
        let mut child_pv = PvList::new();

        thread.key_history.push(pos.key());
        let score = match new_pos.test_sennichite(thread.cutechess, &thread.key_history) {
            Sennichite::Win => None,
            Sennichite::Draw => Some(draw_score(thread.load_nodes())),
            Sennichite::None => {
                let mut score;
                if move_count == 1 {
                    score = -search::<PV, False>(
                        thread,
                        shared,
                        tt,
                        &new_pos,
                        &mut child_pv,
                        new_depth,
                        ply + 1,
                        -beta,
                        -alpha,
                    );
                } else {
                    // null-window scout, late moves reduced
                    let mut reduction = 0;
                    if depth >= LMR_MIN_DEPTH
                        && move_count >= 5 + 2 * i32::from(ROOT::BOOL)
                        && generator.stage() >= GenStage::All
                    {
                        let mut r = REDUCTIONS.get(depth, move_count);
                        if PV::BOOL {
                            r -= 1;
                        }
                        if new_depth > 1 {
                            reduction = r.clamp(1, new_depth - 1);
                        }
                    }
                    score = -search::<False, False>(
                        thread,
                        shared,
                        tt,
                        &new_pos,
                        &mut child_pv,
                        new_depth - reduction,
                        ply + 1,
                        -alpha - Value(1),
                        -alpha,
                    );
                    if score > alpha && reduction > 0 {
                        score = -search::<False, False>(
                            thread,
                            shared,
                            tt,
                            &new_pos,
                            &mut child_pv,
                            new_depth,
                            ply + 1,
                            -alpha - Value(1),
                            -alpha,
                        );
                    }
                    if PV::BOOL && score > alpha {
                        score = -search::<PV, False>(
                            thread,
                            shared,
                            tt,
                            &new_pos,
                            &mut child_pv,
                            new_depth,
                            ply + 1,
                            -beta,
                            -alpha,
                        );
                    }
                }
                Some(score)
            }
        };
        thread.key_history.pop();

        let score = match score {
            // an illegal perpetual does not count as a playable move
            None => continue,
            Some(score) => score,
        };

        if shared.has_stopped() {
            return Value::ZERO;
        }

        if score > best_score {
            best_score = score;
        }
        if score > alpha {
            alpha = score;
            best_move = Some(m);
            pv.update(m, &child_pv);
            if score >= beta {
                break;
            }
        }
    }

    if best_score == -Value::INFINITE {
        // checkmate; also reached when every reply is an illegal perpetual
        return Value::mated_in(ply);
    }

    let bound = if best_score >= beta {
        Bound::LOWER
    } else if PV::BOOL && best_move.is_some() {
        Bound::EXACT
    } else {
        Bound::UPPER
    };
    tt.put(pos.key(), best_score, best_move, depth, ply, bound);

    best_score
}

// Captures only, no TT interaction and no depth.
fn qsearch<PV: Bool>(
    thread: &mut ThreadData,
    shared: &SearchShared,
    pos: &Position,
    ply: i32,
    alpha: Value,
    beta: Value,
    recapture_sq: Option<Square>,
) -> Value {
    thread.inc_nodes();
    thread.update_seldepth(ply + 1);

    if ply >= MAX_PLY {
        return if pos.in_check() { Value::ZERO } else { evaluate(pos) };
    }

    let stand_pat = evaluate(pos);
    if stand_pat >= beta {
        return stand_pat;
    }
    let mut alpha = alpha;
    if stand_pat > alpha {
        alpha = stand_pat;
    }
    let mut best_score = stand_pat;

    let in_check = pos.in_check();
    let mut generator = MoveGenerator::qsearch(recapture_sq);
    while let Some(m) = generator.next(pos) {
        if !pos.is_legal(m) {
            continue;
        }
        // losing exchanges cannot raise the stand-pat bound
        if !in_check && !pos.see_ge(m, Value::ZERO) {
            continue;
        }

        let new_pos = pos.apply_move(m);
        thread.key_history.push(pos.key());
        let score = match new_pos.test_sennichite(thread.cutechess, &thread.key_history) {
            Sennichite::Win => None,
            Sennichite::Draw => Some(draw_score(thread.load_nodes())),
            Sennichite::None => Some(-qsearch::<PV>(
                thread,
                shared,
                &new_pos,
                ply + 1,
                -beta,
                -alpha,
                Some(m.to()),
            )),
        };
        thread.key_history.pop();

        let score = match score {
            None => continue,
            Some(score) => score,
        };

        if shared.has_stopped() {
            return Value::ZERO;
        }

        if score > best_score {
            best_score = score;
        }
        if score > alpha {
            alpha = score;
            if score >= beta {
                break;
            }
        }
    }

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reductions_shape() {
        // no reduction for early moves at low depth, growing in both axes
        assert_eq!(REDUCTIONS.get(2, 5), 1);
        assert!(REDUCTIONS.get(10, 30) > REDUCTIONS.get(10, 6));
        assert!(REDUCTIONS.get(30, 10) >= REDUCTIONS.get(3, 10));
        assert!(REDUCTIONS.get(255, 599) < MAX_PLY);
    }

    #[test]
    fn test_draw_score_jitter() {
        for nodes in 0..8u64 {
            let v = draw_score(nodes);
            assert!(v.abs() <= Value(2));
        }
        assert_eq!(draw_score(0), Value(2));
        assert_eq!(draw_score(3), Value(-1));
    }
}
