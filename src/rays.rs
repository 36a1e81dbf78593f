use crate::attacks::*;
use crate::bitboard::*;
use crate::types::*;

struct RayTable {
    between: Vec<[Bitboard; Square::NUM]>,
    line: Vec<[Bitboard; Square::NUM]>,
}

static RAY_TABLE: once_cell::sync::Lazy<RayTable> = once_cell::sync::Lazy::new(|| {
    let mut table = RayTable {
        between: vec![[Bitboard::ZERO; Square::NUM]; Square::NUM],
        line: vec![[Bitboard::ZERO; Square::NUM]; Square::NUM],
    };
    for a in Square::all() {
        let a_mask = Bitboard::square_mask(a);
        let rook_rays = sliding_attacks(&AttackTable::ROOK_DELTAS, a, &Bitboard::ZERO);
        let bishop_rays = sliding_attacks(&AttackTable::BISHOP_DELTAS, a, &Bitboard::ZERO);
        for b in Square::all() {
            if a == b {
                continue;
            }
            let b_mask = Bitboard::square_mask(b);
            if rook_rays.is_set(b) {
                table.between[a.0 as usize][b.0 as usize] = sliding_attacks(&AttackTable::ROOK_DELTAS, a, &b_mask)
                    & sliding_attacks(&AttackTable::ROOK_DELTAS, b, &a_mask);
                table.line[a.0 as usize][b.0 as usize] = (a_mask | rook_rays)
                    & (b_mask | sliding_attacks(&AttackTable::ROOK_DELTAS, b, &Bitboard::ZERO));
            } else if bishop_rays.is_set(b) {
                table.between[a.0 as usize][b.0 as usize] = sliding_attacks(&AttackTable::BISHOP_DELTAS, a, &b_mask)
                    & sliding_attacks(&AttackTable::BISHOP_DELTAS, b, &a_mask);
                table.line[a.0 as usize][b.0 as usize] = (a_mask | bishop_rays)
                    & (b_mask | sliding_attacks(&AttackTable::BISHOP_DELTAS, b, &Bitboard::ZERO));
            }
        }
    }
    table
});

pub fn between(a: Square, b: Square) -> Bitboard {
    debug_assert!(a.is_ok());
    debug_assert!(b.is_ok());
    RAY_TABLE.between[a.0 as usize][b.0 as usize]
}

pub fn line(a: Square, b: Square) -> Bitboard {
    debug_assert!(a.is_ok());
    debug_assert!(b.is_ok());
    RAY_TABLE.line[a.0 as usize][b.0 as usize]
}

#[test]
fn test_between() {
    assert_eq!(between(Square::SQ11, Square::SQ13), Bitboard::square_mask(Square::SQ12));
    assert_eq!(
        between(Square::SQ99, Square::SQ66),
        Bitboard::square_mask(Square::SQ88) | Bitboard::square_mask(Square::SQ77)
    );
    assert_eq!(between(Square::SQ11, Square::SQ12), Bitboard::ZERO);
    assert_eq!(between(Square::SQ11, Square::SQ23), Bitboard::ZERO);
    assert_eq!(between(Square::SQ55, Square::SQ55), Bitboard::ZERO);
    for a in Square::all() {
        for b in Square::all() {
            assert_eq!(between(a, b), between(b, a));
            assert!(!between(a, b).is_set(a));
            assert!(!between(a, b).is_set(b));
        }
    }
}

#[test]
fn test_line() {
    let file5 = Bitboard::file_mask(File::FILE5);
    assert_eq!(line(Square::SQ51, Square::SQ59), file5);
    assert_eq!(line(Square::SQ53, Square::SQ56), file5);
    let rank_e = Bitboard::rank_mask(Rank::RANK_E);
    assert_eq!(line(Square::SQ15, Square::SQ35), rank_e);
    assert!(line(Square::SQ11, Square::SQ99).is_set(Square::SQ55));
    assert_eq!(line(Square::SQ11, Square::SQ23), Bitboard::ZERO);
    for a in Square::all() {
        for b in Square::all() {
            if line(a, b).to_bool() {
                assert!(line(a, b).is_set(a));
                assert!(line(a, b).is_set(b));
                assert_eq!(line(a, b), line(b, a));
            }
        }
    }
}
