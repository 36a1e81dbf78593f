use crate::engine_name::*;
use crate::limit::*;
use crate::movetypes::*;
use crate::perft::*;
use crate::position::*;
use crate::search::*;
use crate::thread::*;
use crate::types::*;
use crate::usioption::*;
use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct UsiReporter;

impl SearchReporter for UsiReporter {
    fn on_info(&self, info: &SearchInfo) {
        let time_ms = info.time.as_millis();
        let nps = if time_ms > 0 {
            info.nodes as u128 * 1000 / time_ms
        } else {
            0
        };
        let mut line = format!(
            "info depth {} seldepth {} score {} time {} nodes {} nps {} hashfull {}",
            info.depth,
            info.seldepth,
            info.score.to_usi_string(),
            time_ms,
            info.nodes,
            nps,
            info.hashfull
        );
        if !info.pv.is_empty() {
            line += " pv ";
            line += &info
                .pv
                .iter()
                .map(|m| m.to_usi_string())
                .collect::<Vec<String>>()
                .join(" ");
        }
        println!("{}", line);
    }
    fn on_bestmove(&self, best: Option<Move>) {
        match best {
            Some(m) => println!("bestmove {}", m.to_usi_string()),
            None => println!("bestmove resign"),
        }
    }
}

fn next_num<T: std::str::FromStr>(limit_type: &str, iter: &mut std::slice::Iter<'_, &str>) -> Result<T> {
    iter.next()
        .ok_or_else(|| anyhow!("missing value after {}", limit_type))?
        .parse()
        .map_err(|_| anyhow!("invalid value after {}", limit_type))
}

fn go(searcher: &mut Searcher, pos: &Position, key_history: &[Key], args: &[&str]) -> Result<()> {
    if searcher.is_searching() {
        bail!("already searching");
    }
    let start_time = Instant::now();

    let mut time = [Duration::from_millis(0); 2];
    let mut inc = [Duration::from_millis(0); 2];
    let mut use_clock = false;
    let mut movetime: Option<Duration> = None;
    let mut depth: Option<i32> = None;
    let mut nodes: Option<u64> = None;
    let mut infinite = false;

    let mut iter = args.iter();
    while let Some(&token) = iter.next() {
        match token {
            "btime" => {
                time[Color::BLACK.0 as usize] = Duration::from_millis(next_num(token, &mut iter)?);
                use_clock = true;
            }
            "wtime" => {
                time[Color::WHITE.0 as usize] = Duration::from_millis(next_num(token, &mut iter)?);
                use_clock = true;
            }
            "binc" => inc[Color::BLACK.0 as usize] = Duration::from_millis(next_num(token, &mut iter)?),
            "winc" => inc[Color::WHITE.0 as usize] = Duration::from_millis(next_num(token, &mut iter)?),
            // byoyomi is spent like a fixed move time
            "byoyomi" | "movetime" => movetime = Some(Duration::from_millis(next_num(token, &mut iter)?)),
            "depth" => depth = Some(next_num(token, &mut iter)?),
            "nodes" => nodes = Some(next_num(token, &mut iter)?),
            "infinite" => infinite = true,
            "searchmoves" | "mate" | "ponder" => bail!("unsupported go parameter: {}", token),
            _ => bail!("unknown go parameter: {}", token),
        }
    }

    let mut limiter = CompoundLimiter::new();
    if let Some(nodes) = nodes {
        limiter.add(Box::new(NodeLimiter::new(nodes)));
    }
    if let Some(movetime) = movetime {
        limiter.add(Box::new(MoveTimeLimiter::new(start_time, movetime)));
    }
    if use_clock {
        let us = pos.side_to_move().0 as usize;
        limiter.add(Box::new(TimeManager::new(start_time, time[us], inc[us])));
    }
    let limiter: Option<Box<dyn SearchLimiter>> = if limiter.is_empty() || infinite {
        None
    } else {
        Some(Box::new(limiter))
    };

    searcher.start_search(
        pos,
        key_history,
        start_time,
        infinite,
        depth.unwrap_or(MAX_PLY),
        limiter,
    );
    Ok(())
}

fn position(pos: &mut Position, key_history: &mut Vec<Key>, args: &[&str]) {
    if args.is_empty() {
        return;
    }
    let mut next = 0;
    let parsed = if args[0] == "startpos" {
        next = 1;
        Some(Position::new())
    } else if args[0] == "sfen" {
        let count = args.iter().position(|&token| token == "moves").unwrap_or(args.len());
        match Position::new_from_sfen_parts(&args[1..count]) {
            Ok(parsed) => {
                next = count;
                Some(parsed)
            }
            Err(err) => {
                eprintln!("failed to parse sfen: {}", err);
                None
            }
        }
    } else {
        eprintln!("unknown position format: {}", args[0]);
        None
    };
    let parsed = match parsed {
        Some(parsed) => parsed,
        None => return,
    };
    *pos = parsed;
    key_history.clear();

    if next >= args.len() || args[next] != "moves" {
        return;
    }
    for token in args[next + 1..].iter() {
        let m = match Move::new_from_usi_str(token) {
            Some(m) if pos.is_pseudolegal(m) && pos.is_legal(m) => m,
            _ => {
                eprintln!("invalid move: {}", token);
                return;
            }
        };
        key_history.push(pos.key());
        *pos = pos.apply_move(m);
    }
}

fn setoption(args: &[&str], options: &mut UsiOptions, searcher: &mut Searcher) {
    // setoption name <name> value <value>
    if searcher.is_searching() {
        eprintln!("cannot change options while searching");
        return;
    }
    if args.len() < 4 || args[0] != "name" || args[2] != "value" {
        eprintln!("malformed setoption");
        return;
    }
    let (name, value) = (args[1], args[3]);
    if let Err(err) = options.set(name, value) {
        eprintln!("{}", err);
        return;
    }
    match name {
        UsiOptions::USI_HASH => searcher.set_tt_size(options.usi_hash as usize),
        UsiOptions::THREADS => searcher.set_threads(options.threads as usize),
        UsiOptions::CUTECHESS_WORKAROUND => searcher.set_cutechess_workaround(options.cutechess_workaround),
        _ => {}
    }
}

fn print_legal_moves(pos: &Position) {
    let mut list = crate::movegen::MoveList::new();
    crate::movegen::generate_all(&mut list, pos);
    let legal: Vec<String> = list
        .slice(0)
        .iter()
        .filter(|&&m| pos.is_legal(m))
        .map(|m| m.to_usi_string())
        .collect();
    println!("{} legal moves: {}", legal.len(), legal.join(" "));
}

fn print_position(pos: &Position) {
    println!("{}", pos);
    println!("Sfen: {}", pos.to_sfen());
    println!("Key: {:#018x}", pos.key().0);
    let squares = |mut bb: crate::bitboard::Bitboard| {
        let mut s = String::new();
        while let Some(sq) = bb.pop_lsb() {
            if !s.is_empty() {
                s += " ";
            }
            s += &sq.to_usi_string();
        }
        s
    };
    println!("Checkers: {}", squares(pos.checkers()));
    println!("Pinned: {}", squares(pos.pinned()));
}

pub fn cmd_loop() {
    let mut searcher = Searcher::new(Arc::new(UsiReporter));
    let mut options = UsiOptions::new();
    let mut pos = Position::new();
    let mut key_history: Vec<Key> = vec![];

    loop {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => line = String::from("quit"),
            Ok(_) => {}
        }
        let args: Vec<&str> = line.split_whitespace().collect();
        let token = if args.is_empty() { "" } else { args[0] };

        match token {
            "quit" | "gameover" => {
                searcher.stop();
                break;
            }
            "stop" => searcher.stop(),
            "go" => {
                if let Err(err) = go(&mut searcher, &pos, &key_history, &args[1..]) {
                    eprintln!("{}", err);
                }
            }
            "isready" => {
                searcher.ensure_ready();
                println!("readyok");
            }
            "usinewgame" => searcher.new_game(),
            "position" => {
                if searcher.is_searching() {
                    eprintln!("cannot change the position while searching");
                } else {
                    position(&mut pos, &mut key_history, &args[1..]);
                }
            }
            "setoption" => setoption(&args[1..], &mut options, &mut searcher),
            "usi" => {
                println!("id name {} {}", ENGINE_NAME, ENGINE_VERSION);
                println!("id author {}", ENGINE_AUTHORS);
                println!("{}", options.to_usi_string());
                println!("usiok");
            }
            // nonstandard debug commands
            "d" => print_position(&pos),
            "eval" => println!("{}", crate::evaluate::evaluate(&pos).0),
            "legal_moves" => print_legal_moves(&pos),
            "splitperft" => {
                if let Some(depth) = args.get(1).and_then(|s| s.parse().ok()) {
                    split_perft(&pos, depth);
                }
            }
            "perft" => {
                if let Some(depth) = args.get(1).and_then(|s| s.parse().ok()) {
                    println!("{}", perft(&pos, depth));
                }
            }
            "bench" => crate::bench::run(args.get(1).and_then(|s| s.parse().ok())),
            "" => {}
            _ => eprintln!("unknown command: {}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_startpos_moves() {
        let mut pos = Position::new();
        let mut key_history = vec![];
        position(&mut pos, &mut key_history, &["startpos", "moves", "7g7f", "3c3d"]);
        assert_eq!(pos.move_count(), 3);
        assert_eq!(key_history.len(), 2);
        assert_eq!(pos.side_to_move(), Color::BLACK);
        assert_eq!(key_history[0], Position::new().key());
    }

    #[test]
    fn test_position_sfen() {
        let mut pos = Position::new();
        let mut key_history = vec![];
        position(
            &mut pos,
            &mut key_history,
            &["sfen", "4k4/9/9/9/9/9/9/9/4K4", "w", "-", "10"],
        );
        assert_eq!(pos.side_to_move(), Color::WHITE);
        assert_eq!(pos.move_count(), 10);
        assert!(key_history.is_empty());
    }

    #[test]
    fn test_position_rejects_illegal_move() {
        let mut pos = Position::new();
        let mut key_history = vec![];
        position(&mut pos, &mut key_history, &["startpos", "moves", "5i5a"]);
        // the bogus move is rejected and the position stays at the start
        assert_eq!(pos.move_count(), 1);
        assert!(key_history.is_empty());
    }
}
