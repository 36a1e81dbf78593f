use crate::movegen::*;
use crate::position::*;

pub fn perft(pos: &Position, depth: i32) -> u64 {
    if depth <= 0 {
        return 1;
    }
    let mut list = MoveList::new();
    generate_all(&mut list, pos);
    let mut total = 0;
    for &m in list.slice(0) {
        if !pos.is_legal(m) {
            continue;
        }
        total += if depth == 1 { 1 } else { perft(&pos.apply_move(m), depth - 1) };
    }
    total
}

pub fn split_perft(pos: &Position, depth: i32) {
    let depth = depth.max(1);
    let start = std::time::Instant::now();
    let mut list = MoveList::new();
    generate_all(&mut list, pos);
    let mut total = 0;
    for &m in list.slice(0) {
        if !pos.is_legal(m) {
            continue;
        }
        let count = perft(&pos.apply_move(m), depth - 1);
        total += count;
        println!("{} : {}", m.to_usi_string(), count);
    }
    let elapsed = start.elapsed();
    let nps = total as u128 * 1_000_000_000 / elapsed.as_nanos().max(1);
    println!();
    println!("total: {}", total);
    println!("{} nps", nps);
}

#[test]
fn test_perft_startpos_shallow() {
    let pos = Position::new();
    assert_eq!(perft(&pos, 1), 30);
    assert_eq!(perft(&pos, 2), 900);
    assert_eq!(perft(&pos, 3), 25470);
}

#[test]
fn test_perft_startpos_depth4() {
    let pos = Position::new();
    assert_eq!(perft(&pos, 4), 719_731);
}

#[test]
fn test_perft_with_hands() {
    let pos = Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b G 1").unwrap();
    // 5 king moves plus a gold drop on each of the 79 empty squares
    assert_eq!(perft(&pos, 1), 84);
}
