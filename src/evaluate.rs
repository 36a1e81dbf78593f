use crate::attacks::*;
use crate::piecevalue::*;
use crate::position::*;
use crate::types::*;

const KING_RING_BONUS: i32 = 8;

// Material over board and hands plus a small shelter term, from the side
// to move's point of view.
pub fn evaluate(pos: &Position) -> Value {
    let us = pos.side_to_move();
    let them = us.inverse();

    let mut score = 0;
    for &pt in PieceType::ALL.iter() {
        if pt == PieceType::KING {
            continue;
        }
        let imbalance = pos.pieces_cp(us, pt).count_ones() as i32 - pos.pieces_cp(them, pt).count_ones() as i32;
        score += imbalance * piece_type_value(pt).0;
    }
    for &pt in PieceType::ALL_HAND.iter() {
        let imbalance = pos.hand(us).num(pt) as i32 - pos.hand(them).num(pt) as i32;
        score += imbalance * piece_type_value(pt).0;
    }

    let shelter = |c: Color| (ATTACK_TABLE.king.attack(pos.king_square(c)) & pos.pieces_c(c)).count_ones() as i32;
    score += (shelter(us) - shelter(them)) * KING_RING_BONUS;

    Value(score.clamp(-Value::KNOWN_WIN.0 + 1, Value::KNOWN_WIN.0 - 1))
}

#[test]
fn test_eval_startpos_symmetric() {
    let pos = Position::new();
    assert_eq!(evaluate(&pos), Value::ZERO);
    // the same position from white's point of view scores the same
    let flipped = pos.apply_null_move();
    assert_eq!(evaluate(&flipped), Value::ZERO);
}

#[test]
fn test_eval_counts_hand() {
    let up_rook = Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b R 1").unwrap();
    assert_eq!(evaluate(&up_rook), Value(ROOK_VALUE));
    let down_rook = up_rook.apply_null_move();
    assert_eq!(evaluate(&down_rook), Value(-ROOK_VALUE));
}

#[test]
fn test_eval_stays_inside_window() {
    // a grotesque material edge still stays short of the mate window
    let pos = Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b 2R2B4G4S4N4L18P 1").unwrap();
    let v = evaluate(&pos);
    assert!(v < Value::KNOWN_WIN);
    assert!(v > -Value::KNOWN_WIN);
}

#[test]
fn test_eval_shelter_term() {
    let bare = Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b - 1").unwrap();
    let sheltered = Position::new_from_sfen("4k4/9/9/9/9/9/9/4G4/4K4 b - 1").unwrap();
    assert!(evaluate(&sheltered) > evaluate(&bare));
}
