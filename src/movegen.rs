use crate::attacks::*;
use crate::bitboard::*;
use crate::movetypes::*;
use crate::position::*;
use crate::rays;
use crate::types::*;
use arrayvec::ArrayVec;

pub struct MoveList {
    moves: [std::mem::MaybeUninit<Move>; MoveList::MAX_MOVES],
    pub size: usize,
}

impl MoveList {
    // 593 legal moves is the known maximum over reachable positions.
    pub const MAX_MOVES: usize = 600;

    pub fn new() -> MoveList {
        MoveList {
            moves: [std::mem::MaybeUninit::uninit(); MoveList::MAX_MOVES],
            size: 0,
        }
    }
    #[inline]
    pub fn push(&mut self, m: Move) {
        debug_assert!(self.size < MoveList::MAX_MOVES);
        self.moves[self.size] = std::mem::MaybeUninit::new(m);
        self.size += 1;
    }
    pub fn get(&self, i: usize) -> Move {
        debug_assert!(i < self.size);
        unsafe { self.moves[i].assume_init() }
    }
    pub fn slice(&self, begin: usize) -> &[Move] {
        unsafe { std::slice::from_raw_parts(self.moves.as_ptr().add(begin) as *const Move, self.size - begin) }
    }
    pub fn contains(&self, m: Move) -> bool {
        self.slice(0).contains(&m)
    }
}

// All pseudo-legal moves. The caller still filters with Position::is_legal.
pub fn generate_all(list: &mut MoveList, pos: &Position) {
    let us = pos.side_to_move();
    let dst_mask = !pos.pieces_c(us);
    let drop_mask = pos.empty_bb();
    generate(list, pos, &dst_mask, &drop_mask);
}

// Captures only; in check the usual evasion restriction applies.
pub fn generate_captures(list: &mut MoveList, pos: &Position) {
    let us = pos.side_to_move();
    let dst_mask = pos.pieces_c(us.inverse());
    generate(list, pos, &dst_mask, &Bitboard::ZERO);
}

// Recaptures on one square.
pub fn generate_recaptures(list: &mut MoveList, pos: &Position, sq: Square) {
    debug_assert!(pos.pieces_c(pos.side_to_move().inverse()).is_set(sq));
    let dst_mask = Bitboard::square_mask(sq);
    generate(list, pos, &dst_mask, &Bitboard::ZERO);
}

fn generate(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard, drop_mask: &Bitboard) {
    let us = pos.side_to_move();

    // king moves are never restricted to the check ray
    generate_king(list, pos, dst_mask);

    let (dst_mask, drop_mask) = if pos.in_check() {
        if pos.checkers().more_than_one() {
            // double check: king moves only
            return;
        }
        let checker = pos.checkers().lsb_unchecked();
        let block = rays::between(pos.king_square(us), checker);
        (
            *dst_mask & (block | Bitboard::square_mask(checker)),
            *drop_mask & block,
        )
    } else {
        (*dst_mask, *drop_mask)
    };

    generate_pawns(list, pos, &dst_mask);
    generate_lances(list, pos, &dst_mask);
    generate_knights(list, pos, &dst_mask);
    generate_silvers(list, pos, &dst_mask);
    generate_golds(list, pos, &dst_mask);
    generate_sliders(list, pos, PieceType::BISHOP, &dst_mask);
    generate_sliders(list, pos, PieceType::ROOK, &dst_mask);
    generate_sliders(list, pos, PieceType::HORSE, &dst_mask);
    generate_sliders(list, pos, PieceType::DRAGON, &dst_mask);
    generate_drops(list, pos, &drop_mask);
}

fn generate_pawns(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    let to_bb = pos.pieces_cp(us, PieceType::PAWN).shift_north_relative(us) & *dst_mask;
    let promo_zone = Bitboard::opponent_field_mask(us);
    let back = Square::delta_n_relative(us.inverse());
    let last_rank = Bitboard::relative_rank_mask(us, 8);
    for to in to_bb {
        let from = to.add_unchecked(back);
        if promo_zone.is_set(to) {
            list.push(Move::new_promote(from, to));
            if !last_rank.is_set(to) {
                list.push(Move::new_unpromote(from, to));
            }
        } else {
            list.push(Move::new_unpromote(from, to));
        }
    }
}

fn generate_lances(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    let occupied = pos.occupied_bb();
    let promo_zone = Bitboard::opponent_field_mask(us);
    let last_rank = Bitboard::relative_rank_mask(us, 8);
    for from in pos.pieces_cp(us, PieceType::LANCE) {
        let to_bb = ATTACK_TABLE.lance.attack(us, from, &occupied) & *dst_mask;
        for to in to_bb {
            if promo_zone.is_set(to) {
                list.push(Move::new_promote(from, to));
                if !last_rank.is_set(to) {
                    list.push(Move::new_unpromote(from, to));
                }
            } else {
                list.push(Move::new_unpromote(from, to));
            }
        }
    }
}

fn generate_knights(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    let promo_zone = Bitboard::opponent_field_mask(us);
    let last_two = Bitboard::relative_rank_mask(us, 8) | Bitboard::relative_rank_mask(us, 7);
    for from in pos.pieces_cp(us, PieceType::KNIGHT) {
        let to_bb = ATTACK_TABLE.knight.attack(us, from) & *dst_mask;
        for to in to_bb {
            if promo_zone.is_set(to) {
                list.push(Move::new_promote(from, to));
            }
            if !last_two.is_set(to) {
                list.push(Move::new_unpromote(from, to));
            }
        }
    }
}

fn generate_silvers(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    let promo_zone = Bitboard::opponent_field_mask(us);
    for from in pos.pieces_cp(us, PieceType::SILVER) {
        let to_bb = ATTACK_TABLE.silver.attack(us, from) & *dst_mask;
        let from_in_zone = promo_zone.is_set(from);
        for to in to_bb {
            if from_in_zone || promo_zone.is_set(to) {
                list.push(Move::new_promote(from, to));
            }
            list.push(Move::new_unpromote(from, to));
        }
    }
}

fn generate_golds(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    for from in pos.pieces_golds() & pos.pieces_c(us) {
        let to_bb = ATTACK_TABLE.gold.attack(us, from) & *dst_mask;
        for to in to_bb {
            list.push(Move::new_unpromote(from, to));
        }
    }
}

fn generate_king(list: &mut MoveList, pos: &Position, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    let from = pos.king_square(us);
    let to_bb = ATTACK_TABLE.king.attack(from) & *dst_mask;
    for to in to_bb {
        list.push(Move::new_unpromote(from, to));
    }
}

fn generate_sliders(list: &mut MoveList, pos: &Position, pt: PieceType, dst_mask: &Bitboard) {
    let us = pos.side_to_move();
    let occupied = pos.occupied_bb();
    let promo_zone = Bitboard::opponent_field_mask(us);
    let promotable = pt.can_promote();
    for from in pos.pieces_cp(us, pt) {
        let to_bb = ATTACK_TABLE.attack(pt, us, from, &occupied) & *dst_mask;
        let from_in_zone = promo_zone.is_set(from);
        for to in to_bb {
            if promotable && (from_in_zone || promo_zone.is_set(to)) {
                list.push(Move::new_promote(from, to));
            }
            list.push(Move::new_unpromote(from, to));
        }
    }
}

fn generate_drops(list: &mut MoveList, pos: &Position, drop_mask: &Bitboard) {
    let us = pos.side_to_move();
    let hand = pos.hand(us);
    if hand.is_empty() {
        return;
    }

    if hand.exist(PieceType::PAWN) {
        // nifu: skip files already holding one of our unpromoted pawns
        let mut to_bb = *drop_mask & !Bitboard::relative_rank_mask(us, 8);
        to_bb &= !pos.pieces_cp(us, PieceType::PAWN).fill_file();
        for to in to_bb {
            list.push(Move::new_drop(PieceType::PAWN, to));
        }
    }

    let mut droppables = ArrayVec::<PieceType, 6>::new();
    for &pt in [
        PieceType::ROOK,
        PieceType::BISHOP,
        PieceType::GOLD,
        PieceType::SILVER,
    ]
    .iter()
    {
        if hand.exist(pt) {
            droppables.push(pt);
        }
    }
    let unrestricted = droppables.len();
    if hand.exist(PieceType::LANCE) {
        droppables.push(PieceType::LANCE);
    }
    let with_lance = droppables.len();
    if hand.exist(PieceType::KNIGHT) {
        droppables.push(PieceType::KNIGHT);
    }
    if droppables.is_empty() {
        return;
    }

    let last_rank = Bitboard::relative_rank_mask(us, 8);
    let second_rank = Bitboard::relative_rank_mask(us, 7);
    let to_bb_last = *drop_mask & last_rank;
    let to_bb_second = *drop_mask & second_rank;
    let to_bb_rest = *drop_mask & !(last_rank | second_rank);

    for to in to_bb_last {
        for &pt in &droppables[..unrestricted] {
            list.push(Move::new_drop(pt, to));
        }
    }
    for to in to_bb_second {
        for &pt in &droppables[..with_lance] {
            list.push(Move::new_drop(pt, to));
        }
    }
    for to in to_bb_rest {
        for &pt in &droppables[..] {
            list.push(Move::new_drop(pt, to));
        }
    }
}

#[cfg(test)]
fn generate_legal(pos: &Position) -> Vec<Move> {
    let mut list = MoveList::new();
    generate_all(&mut list, pos);
    list.slice(0).iter().copied().filter(|&m| pos.is_legal(m)).collect()
}

#[test]
fn test_startpos_moves() {
    let pos = Position::new();
    let mut list = MoveList::new();
    generate_all(&mut list, &pos);
    assert_eq!(list.size, 30);
    assert_eq!(generate_legal(&pos).len(), 30);
    assert!(list.contains(Move::new_from_usi_str("7g7f").unwrap()));
    assert!(list.contains(Move::new_from_usi_str("2h3h").unwrap()));
    assert!(!list.contains(Move::new_from_usi_str("2h2f").unwrap()));
}

#[test]
fn test_generated_moves_are_pseudolegal() {
    for sfen in [
        crate::sfen::START_SFEN,
        "8k/9/9/7N1/9/9/9/7R1/K8 b P 1",
        "4k4/9/4r4/9/9/9/9/9/4K4 b G 1",
        "l2g1g1nl/2s1k2b1/p1nppsppp/2p6/1p7/2PPP4/PPSG1PPPP/1B1K2SR1/LN5NL w Rp 1",
        "4k4/9/9/9/9/9/9/9/4K4 b RBGSNLP 1",
    ]
    .iter()
    {
        let pos = Position::new_from_sfen(sfen).unwrap();
        let mut list = MoveList::new();
        generate_all(&mut list, &pos);
        for &m in list.slice(0) {
            assert!(pos.is_pseudolegal(m), "{} from {}", m.to_usi_string(), sfen);
        }
    }
}

#[test]
fn test_evasion_generation() {
    // single check: king moves, blocks and the capture of the checker
    let pos = Position::new_from_sfen("4k4/9/4r4/9/9/9/9/9/4K4 b G 1").unwrap();
    assert!(pos.in_check());
    let mut list = MoveList::new();
    generate_all(&mut list, &pos);
    for &m in list.slice(0) {
        if m.is_drop() {
            assert!(rays::between(Square::SQ59, Square::SQ53).is_set(m.to()));
        } else if pos.piece_on(m.from()) != Some(Piece::B_KING) {
            let to = m.to();
            assert!(to == Square::SQ53 || rays::between(Square::SQ59, Square::SQ53).is_set(to));
        }
    }
    // G*5e blocks, G*4e does not
    assert!(list.contains(Move::new_drop(PieceType::GOLD, Square::SQ55)));
    assert!(!list.contains(Move::new_drop(PieceType::GOLD, Square::SQ45)));
}

#[test]
fn test_double_check_only_king_moves() {
    let pos = Position::new_from_sfen("4k4/9/9/9/8b/9/4r3P/9/4KG3 b G 1").unwrap();
    assert!(pos.checkers().more_than_one());
    let mut list = MoveList::new();
    generate_all(&mut list, &pos);
    assert!(list.size > 0);
    for &m in list.slice(0) {
        assert!(!m.is_drop());
        assert_eq!(pos.piece_on(m.from()), Some(Piece::B_KING));
    }
}

#[test]
fn test_captures_generation() {
    let mut pos = Position::new();
    for m in ["7g7f", "3c3d", "8h3c+"].iter() {
        pos = pos.apply_move(Move::new_from_usi_str(m).unwrap());
    }
    // white to move; the promoted bishop on 3c can be captured
    let mut list = MoveList::new();
    generate_captures(&mut list, &pos);
    assert!(list.size > 0);
    for &m in list.slice(0) {
        assert!(!m.is_drop());
        assert!(pos.is_capture(m), "{}", m.to_usi_string());
    }
    assert!(list.contains(Move::new_from_usi_str("2b3c").unwrap()));
}

#[test]
fn test_recaptures_generation() {
    let mut pos = Position::new();
    for m in ["7g7f", "3c3d", "8h2b+"].iter() {
        pos = pos.apply_move(Move::new_from_usi_str(m).unwrap());
    }
    // white recaptures the horse on 2b
    let mut list = MoveList::new();
    generate_recaptures(&mut list, &pos, Square::SQ22);
    assert!(list.size > 0);
    for &m in list.slice(0) {
        assert_eq!(m.to(), Square::SQ22);
    }
    assert!(list.contains(Move::new_from_usi_str("3a2b").unwrap()));
}

#[test]
fn test_forced_promotion_rank_moves() {
    // a pawn reaching the last rank is generated only with promotion
    let pos = Position::new_from_sfen("4k4/8P/9/9/9/9/9/9/4K4 b - 1").unwrap();
    let mut list = MoveList::new();
    generate_all(&mut list, &pos);
    assert!(list.contains(Move::new_promote(Square::SQ12, Square::SQ11)));
    assert!(!list.contains(Move::new_unpromote(Square::SQ12, Square::SQ11)));
    // a knight jumping to the second-to-last rank likewise
    let pos = Position::new_from_sfen("4k4/9/9/8N/9/9/9/9/4K4 b - 1").unwrap();
    let mut list = MoveList::new();
    generate_all(&mut list, &pos);
    assert!(list.contains(Move::new_promote(Square::SQ14, Square::SQ22)));
    assert!(!list.contains(Move::new_unpromote(Square::SQ14, Square::SQ22)));
}

#[test]
fn test_max_legal_moves_position() {
    // the classic 593 legal move position
    let pos = Position::new_from_sfen("R8/2K1S1SSk/4B4/9/9/9/9/9/1L1L1L3 b RBGSNLP3g3n17p 1").unwrap();
    let legal = generate_legal(&pos);
    assert_eq!(legal.len(), 593);
}
