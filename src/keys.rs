use crate::hand::*;
use crate::types::*;
use rand::prelude::*;

// Hand contributions get one key per (color, type, count) so that any
// increment or decrement of a hand is a two-XOR update.
struct ZobristTable {
    piece_square: [[u64; Piece::NUM]; Square::NUM],
    stm: u64,
    hand: [[[u64; Hand::MAX_PAWN as usize + 1]; 7]; Color::NUM],
}

static ZOBRIST: once_cell::sync::Lazy<ZobristTable> = once_cell::sync::Lazy::new(|| {
    let mut rng: StdRng = SeedableRng::seed_from_u64(0x590d_3524_d1d6_301c);
    let mut table = ZobristTable {
        piece_square: [[0; Piece::NUM]; Square::NUM],
        stm: 0,
        hand: [[[0; Hand::MAX_PAWN as usize + 1]; 7]; Color::NUM],
    };
    for sq in table.piece_square.iter_mut() {
        for key in sq.iter_mut() {
            *key = rng.gen();
        }
    }
    table.stm = rng.gen();
    for (hand_index, &pt) in PieceType::ALL_HAND.iter().enumerate() {
        for c in 0..Color::NUM {
            for count in 0..=Hand::max_of(pt) as usize {
                table.hand[c][hand_index][count] = rng.gen();
            }
        }
    }
    table
});

fn hand_index(pt: PieceType) -> usize {
    match pt {
        PieceType::PAWN => 0,
        PieceType::LANCE => 1,
        PieceType::KNIGHT => 2,
        PieceType::SILVER => 3,
        PieceType::GOLD => 4,
        PieceType::BISHOP => 5,
        PieceType::ROOK => 6,
        _ => unreachable!(),
    }
}

pub fn piece_square_key(pc: Piece, sq: Square) -> Key {
    debug_assert!(sq.is_ok());
    debug_assert!(0 <= pc.0 && (pc.0 as usize) < Piece::NUM);
    Key(ZOBRIST.piece_square[sq.0 as usize][pc.0 as usize])
}

pub fn stm_key() -> Key {
    Key(ZOBRIST.stm)
}

pub fn hand_key(c: Color, pt: PieceType, count: u32) -> Key {
    debug_assert!(count <= Hand::max_of(pt));
    Key(ZOBRIST.hand[c.0 as usize][hand_index(pt)][count as usize])
}

#[test]
fn test_keys_distinct() {
    let mut seen = std::collections::HashSet::new();
    for sq in Square::all() {
        for pc in 0..Piece::NUM as i32 {
            assert!(seen.insert(piece_square_key(Piece(pc), sq).0));
        }
    }
    assert!(seen.insert(stm_key().0));
    for &c in Color::ALL.iter() {
        for &pt in PieceType::ALL_HAND.iter() {
            for count in 0..=Hand::max_of(pt) {
                assert!(seen.insert(hand_key(c, pt, count).0));
            }
        }
    }
}

#[test]
fn test_keys_stable() {
    assert_eq!(piece_square_key(Piece::B_PAWN, Square::SQ55), piece_square_key(Piece::B_PAWN, Square::SQ55));
    assert_eq!(hand_key(Color::BLACK, PieceType::ROOK, 1), hand_key(Color::BLACK, PieceType::ROOK, 1));
}
