use crate::attacks::*;
use crate::bitboard::*;
use crate::hand::*;
use crate::keys;
use crate::movegen::*;
use crate::movetypes::*;
use crate::piecevalue::*;
use crate::rays;
use crate::sfen::*;
use crate::types::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sennichite {
    None,
    Draw,
    // win for the side to move at the repeated node, i.e. the side that
    // has been checked all along; the perpetrator loses
    Win,
}

#[derive(Clone)]
pub struct Position {
    color_bb: [Bitboard; Color::NUM],
    type_bb: [Bitboard; PieceType::NUM],
    mailbox: [Option<Piece>; Square::NUM],
    hands: [Hand; Color::NUM],
    stm: Color,
    move_count: u32,
    key: Key,
    checkers: Bitboard,
    pinned: Bitboard,
    consecutive_checks: [i32; Color::NUM],
}

impl Position {
    pub fn new() -> Position {
        Position::new_from_sfen(START_SFEN).expect("startpos sfen must parse")
    }

    fn empty() -> Position {
        Position {
            color_bb: [Bitboard::ZERO; Color::NUM],
            type_bb: [Bitboard::ZERO; PieceType::NUM],
            mailbox: [None; Square::NUM],
            hands: [Hand::EMPTY; Color::NUM],
            stm: Color::BLACK,
            move_count: 1,
            key: Key(0),
            checkers: Bitboard::ZERO,
            pinned: Bitboard::ZERO,
            consecutive_checks: [0; Color::NUM],
        }
    }

    pub fn pieces_c(&self, c: Color) -> Bitboard {
        self.color_bb[c.0 as usize]
    }
    pub fn pieces_p(&self, pt: PieceType) -> Bitboard {
        self.type_bb[pt.0 as usize]
    }
    pub fn pieces_cp(&self, c: Color, pt: PieceType) -> Bitboard {
        self.pieces_c(c) & self.pieces_p(pt)
    }
    // gold and the promoted minors all move as gold
    pub fn pieces_golds(&self) -> Bitboard {
        self.pieces_p(PieceType::GOLD)
            | self.pieces_p(PieceType::PRO_PAWN)
            | self.pieces_p(PieceType::PRO_LANCE)
            | self.pieces_p(PieceType::PRO_KNIGHT)
            | self.pieces_p(PieceType::PRO_SILVER)
    }
    pub fn occupied_bb(&self) -> Bitboard {
        self.pieces_c(Color::BLACK) | self.pieces_c(Color::WHITE)
    }
    pub fn empty_bb(&self) -> Bitboard {
        !self.occupied_bb()
    }
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        debug_assert!(sq.is_ok());
        self.mailbox[sq.0 as usize]
    }
    pub fn king_square(&self, c: Color) -> Square {
        let kings = self.pieces_cp(c, PieceType::KING);
        debug_assert_eq!(kings.count_ones(), 1);
        kings.lsb_unchecked()
    }
    pub fn hand(&self, c: Color) -> Hand {
        self.hands[c.0 as usize]
    }
    pub fn side_to_move(&self) -> Color {
        self.stm
    }
    pub fn move_count(&self) -> u32 {
        self.move_count
    }
    pub fn key(&self) -> Key {
        self.key
    }
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }
    pub fn pinned(&self) -> Bitboard {
        self.pinned
    }
    pub fn in_check(&self) -> bool {
        self.checkers.to_bool()
    }
    pub fn consecutive_checks(&self, c: Color) -> i32 {
        self.consecutive_checks[c.0 as usize]
    }
    pub fn is_capture(&self, m: Move) -> bool {
        !m.is_drop() && self.piece_on(m.to()).is_some()
    }

    // Pieces of color c attacking to, under the given occupancy.
    pub fn attackers_to(&self, c: Color, to: Square, occupied: &Bitboard) -> Bitboard {
        let inv = c.inverse();
        let horses = self.pieces_cp(c, PieceType::HORSE);
        let dragons = self.pieces_cp(c, PieceType::DRAGON);
        let mut attackers = self.pieces_cp(c, PieceType::PAWN) & ATTACK_TABLE.pawn.attack(inv, to);
        attackers |= self.pieces_cp(c, PieceType::KNIGHT) & ATTACK_TABLE.knight.attack(inv, to);
        attackers |= self.pieces_cp(c, PieceType::SILVER) & ATTACK_TABLE.silver.attack(inv, to);
        attackers |= (self.pieces_golds() & self.pieces_c(c)) & ATTACK_TABLE.gold.attack(inv, to);
        attackers |= (horses | dragons | self.pieces_cp(c, PieceType::KING)) & ATTACK_TABLE.king.attack(to);
        attackers |= self.pieces_cp(c, PieceType::LANCE) & ATTACK_TABLE.lance.attack(inv, to, occupied);
        attackers |= (self.pieces_cp(c, PieceType::BISHOP) | horses) & ATTACK_TABLE.bishop.attack(to, occupied);
        attackers |= (self.pieces_cp(c, PieceType::ROOK) | dragons) & ATTACK_TABLE.rook.attack(to, occupied);
        attackers
    }

    // Attackers of both colors, for the exchange evaluator.
    pub fn all_attackers_to(&self, to: Square, occupied: &Bitboard) -> Bitboard {
        self.attackers_to(Color::BLACK, to, occupied) | self.attackers_to(Color::WHITE, to, occupied)
    }

    fn xor_bbs(&mut self, pc: Piece, sq: Square) {
        self.color_bb[Color::new(pc).0 as usize].xor(sq);
        self.type_bb[PieceType::new(pc).0 as usize].xor(sq);
    }

    pub fn add_piece(&mut self, sq: Square, pc: Piece) {
        debug_assert!(self.piece_on(sq).is_none());
        self.xor_bbs(pc, sq);
        self.mailbox[sq.0 as usize] = Some(pc);
        self.key ^= keys::piece_square_key(pc, sq);
    }

    pub fn move_piece(&mut self, from: Square, to: Square, pc: Piece) {
        debug_assert!(from != to);
        debug_assert_eq!(self.piece_on(from), Some(pc));
        if let Some(captured) = self.piece_on(to) {
            debug_assert!(Color::new(captured) != Color::new(pc));
            debug_assert!(!captured.is_king());
            self.xor_bbs(captured, to);
            self.key ^= keys::piece_square_key(captured, to);
            let us = Color::new(pc);
            let hand_pt = PieceType::new(captured).to_demote();
            let old_count = self.hands[us.0 as usize].num(hand_pt);
            self.hands[us.0 as usize].plus_one(hand_pt);
            self.key ^= keys::hand_key(us, hand_pt, old_count) ^ keys::hand_key(us, hand_pt, old_count + 1);
        }
        self.xor_bbs(pc, from);
        self.xor_bbs(pc, to);
        self.mailbox[from.0 as usize] = None;
        self.mailbox[to.0 as usize] = Some(pc);
        self.key ^= keys::piece_square_key(pc, from) ^ keys::piece_square_key(pc, to);
    }

    pub fn promote_piece(&mut self, from: Square, to: Square, pc: Piece) {
        debug_assert!(!pc.is_promoted());
        self.move_piece(from, to, pc);
        let promoted = pc.to_promote();
        self.xor_bbs(pc, to);
        self.xor_bbs(promoted, to);
        self.mailbox[to.0 as usize] = Some(promoted);
        self.key ^= keys::piece_square_key(pc, to) ^ keys::piece_square_key(promoted, to);
    }

    pub fn drop_piece(&mut self, sq: Square, pc: Piece) {
        let us = Color::new(pc);
        let pt = PieceType::new(pc);
        debug_assert!(self.piece_on(sq).is_none());
        debug_assert!(self.hands[us.0 as usize].exist(pt));
        self.add_piece(sq, pc);
        let old_count = self.hands[us.0 as usize].num(pt);
        self.hands[us.0 as usize].minus_one(pt);
        self.key ^= keys::hand_key(us, pt, old_count) ^ keys::hand_key(us, pt, old_count - 1);
    }

    pub fn apply_move(&self, m: Move) -> Position {
        let mut pos = self.clone();
        let us = self.stm;
        if m.is_drop() {
            pos.drop_piece(m.to(), Piece::new(us, m.piece_type_dropped()));
        } else {
            let pc = self.piece_on(m.from()).expect("apply_move: empty from-square");
            debug_assert_eq!(Color::new(pc), us);
            if m.is_promotion() {
                pos.promote_piece(m.from(), m.to(), pc);
            } else {
                pos.move_piece(m.from(), m.to(), pc);
            }
        }
        pos.move_count += 1;
        pos.stm = us.inverse();
        pos.key ^= keys::stm_key();
        pos.update_attacks();
        if pos.in_check() {
            pos.consecutive_checks[pos.stm.0 as usize] += 1;
        } else {
            pos.consecutive_checks[pos.stm.0 as usize] = 0;
        }
        pos
    }

    pub fn apply_null_move(&self) -> Position {
        debug_assert!(!self.in_check());
        let mut pos = self.clone();
        pos.move_count += 1;
        pos.stm = pos.stm.inverse();
        pos.key ^= keys::stm_key();
        pos.update_attacks();
        pos
    }

    fn update_attacks(&mut self) {
        let us = self.stm;
        let them = us.inverse();
        let ksq = self.king_square(us);
        self.checkers = self.attackers_to(them, ksq, &self.occupied_bb());
        self.pinned = Bitboard::ZERO;

        let us_occ = self.pieces_c(us);
        let them_occ = self.pieces_c(them);

        let them_lances = self.pieces_cp(them, PieceType::LANCE);
        let them_bishops = self.pieces_cp(them, PieceType::BISHOP) | self.pieces_cp(them, PieceType::HORSE);
        let them_rooks = self.pieces_cp(them, PieceType::ROOK) | self.pieces_cp(them, PieceType::DRAGON);

        // sliders that would reach the king if our pieces were lifted off
        let mut snipers = (ATTACK_TABLE.lance.attack(us, ksq, &them_occ) & them_lances)
            | (ATTACK_TABLE.bishop.attack(ksq, &them_occ) & them_bishops)
            | (ATTACK_TABLE.rook.attack(ksq, &them_occ) & them_rooks);
        while let Some(sniper) = snipers.pop_lsb() {
            let blockers = us_occ & rays::between(sniper, ksq);
            if blockers.count_ones() == 1 {
                self.pinned |= blockers;
            }
        }
    }

    pub fn regen_key(&self) -> Key {
        let mut key = Key(0);
        let mut occ = self.occupied_bb();
        while let Some(sq) = occ.pop_lsb() {
            let pc = self.piece_on(sq).expect("occupied square without a piece");
            key ^= keys::piece_square_key(pc, sq);
        }
        if self.stm == Color::WHITE {
            key ^= keys::stm_key();
        }
        for &c in Color::ALL.iter() {
            for &pt in PieceType::ALL_HAND.iter() {
                key ^= keys::hand_key(c, pt, self.hand(c).num(pt));
            }
        }
        key
    }

    // key_history holds the keys of all ancestors up to and including the
    // parent of this node. Positions with the same side to move sit two
    // plies apart; the nearest possible repetition is four plies back.
    pub fn test_sennichite(&self, cutechess_workaround: bool, key_history: &[Key]) -> Sennichite {
        let mut repetitions = 3;
        let mut i = key_history.len() as i32 - 4;
        while i >= 0 {
            if key_history[i as usize] == self.key {
                repetitions -= 1;
                if repetitions == 0 {
                    let perpetual = if cutechess_workaround {
                        // Older cutechess versions do not handle perpetuals
                        // properly - work around that to avoid illegal moves
                        self.in_check()
                    } else {
                        self.consecutive_checks[self.stm.0 as usize] >= 2
                    };
                    return if perpetual { Sennichite::Win } else { Sennichite::Draw };
                }
            }
            i -= 2;
        }
        Sennichite::None
    }

    fn forced_promotion_zone(&self, us: Color, pt: PieceType) -> Bitboard {
        match pt {
            PieceType::PAWN | PieceType::LANCE => Bitboard::relative_rank_mask(us, 8),
            PieceType::KNIGHT => Bitboard::relative_rank_mask(us, 8) | Bitboard::relative_rank_mask(us, 7),
            _ => Bitboard::ZERO,
        }
    }

    // Cheap enough for moves of unknown provenance, e.g. out of the TT.
    pub fn is_pseudolegal(&self, m: Move) -> bool {
        let us = self.stm;
        let occ = self.occupied_bb();
        if m.is_drop() {
            let pt = m.piece_type_dropped();
            if !self.hand(us).exist(pt) {
                return false;
            }
            let to = m.to();
            if occ.is_set(to) {
                return false;
            }
            if self.forced_promotion_zone(us, pt).is_set(to) {
                return false;
            }
            if pt == PieceType::PAWN && self.pieces_cp(us, PieceType::PAWN).fill_file().is_set(to) {
                return false;
            }
            return true;
        }
        let from = m.from();
        let pc = match self.piece_on(from) {
            Some(pc) if Color::new(pc) == us => pc,
            _ => return false,
        };
        let to = m.to();
        if let Some(target) = self.piece_on(to) {
            if Color::new(target) == us || target.is_king() {
                return false;
            }
        }
        let pt = PieceType::new(pc);
        if m.is_promotion() {
            if !pt.can_promote() {
                return false;
            }
            let zone = Bitboard::opponent_field_mask(us);
            if !zone.is_set(from) && !zone.is_set(to) {
                return false;
            }
        } else if self.forced_promotion_zone(us, pt).is_set(to) {
            return false;
        }
        ATTACK_TABLE.attack(pt, us, from, &occ).is_set(to)
    }

    // Assumes the move is pseudo-legal.
    pub fn is_legal(&self, m: Move) -> bool {
        let us = self.stm;
        let them = us.inverse();
        let ksq = self.king_square(us);

        if m.is_drop() {
            if self.in_check() {
                if self.checkers.more_than_one() {
                    return false;
                }
                let checker = self.checkers.lsb_unchecked();
                if !rays::between(ksq, checker).is_set(m.to()) {
                    return false;
                }
            }
            if m.piece_type_dropped() == PieceType::PAWN {
                let gives_check = Bitboard::square_mask(m.to())
                    .shift_north_relative(us)
                    .and_to_bool(self.pieces_cp(them, PieceType::KING));
                if gives_check && self.is_pawn_drop_mate(m) {
                    return false;
                }
            }
            // a drop cannot expose our own king
            return true;
        }

        let from = m.from();
        let to = m.to();
        if self.piece_on(from).map_or(false, Piece::is_king) {
            // lift the king off so a slider keeps attacking through its old square
            let kingless = self.occupied_bb() ^ self.pieces_cp(us, PieceType::KING);
            return !self.attackers_to(them, to, &kingless).to_bool();
        }
        if self.checkers.more_than_one() {
            return false;
        }
        if self.pinned.is_set(from) && !rays::line(from, ksq).is_set(to) {
            return false;
        }
        if self.in_check() {
            let checker = self.checkers.lsb_unchecked();
            if to != checker && !rays::between(ksq, checker).is_set(to) {
                return false;
            }
        }
        true
    }

    // Delivering mate by dropping a pawn is illegal. The check is rare, so
    // apply the drop and look for any legal reply.
    fn is_pawn_drop_mate(&self, m: Move) -> bool {
        let pos = self.apply_move(m);
        debug_assert!(pos.in_check());
        let mut list = MoveList::new();
        generate_all(&mut list, &pos);
        !list.slice(0).iter().any(|&reply| pos.is_legal(reply))
    }

    fn see_gain(&self, m: Move) -> i32 {
        if m.is_drop() {
            return piece_type_value(m.piece_type_dropped()).0;
        }
        let mut gain = match self.piece_on(m.to()) {
            Some(captured) => piece_value(captured).0,
            None => 0,
        };
        if m.is_promotion() {
            let pt = PieceType::new(self.piece_on(m.from()).expect("see: empty from-square"));
            gain += piece_type_value(pt.to_promote()).0 - piece_type_value(pt).0;
        }
        gain
    }

    fn pop_least_valuable(&self, occupied: &mut Bitboard, attackers: Bitboard, c: Color) -> PieceType {
        for &pt in LVA_ORDER.iter() {
            let pt_attackers = attackers & self.pieces_cp(c, pt);
            if pt_attackers.to_bool() {
                *occupied ^= pt_attackers.isolate_lsb();
                return pt;
            }
        }
        unreachable!()
    }

    fn can_move_diagonally(pt: PieceType) -> bool {
        matches!(
            pt,
            PieceType::PRO_LANCE
                | PieceType::PRO_KNIGHT
                | PieceType::SILVER
                | PieceType::PRO_SILVER
                | PieceType::GOLD
                | PieceType::PRO_PAWN
                | PieceType::BISHOP
                | PieceType::HORSE
                | PieceType::DRAGON
        )
    }

    fn can_move_orthogonally(pt: PieceType) -> bool {
        matches!(
            pt,
            PieceType::PAWN
                | PieceType::LANCE
                | PieceType::PRO_LANCE
                | PieceType::PRO_KNIGHT
                | PieceType::SILVER
                | PieceType::PRO_SILVER
                | PieceType::GOLD
                | PieceType::PRO_PAWN
                | PieceType::ROOK
                | PieceType::HORSE
                | PieceType::DRAGON
        )
    }

    // Swap-off evaluation: does the exchange on m.to() keep at least
    // threshold for the side to move?
    pub fn see_ge(&self, m: Move, threshold: Value) -> bool {
        let stm = self.stm;

        let mut score = self.see_gain(m) - threshold.0;
        if score < 0 {
            return false;
        }

        let mut next = if m.is_drop() {
            m.piece_type_dropped()
        } else {
            PieceType::new(self.piece_on(m.from()).expect("see: empty from-square"))
        };
        score -= piece_type_value(next).0;
        if score >= 0 {
            return true;
        }

        let sq = m.to();
        let mut occupied = self.occupied_bb() ^ Bitboard::square_mask(sq);
        if !m.is_drop() {
            occupied ^= Bitboard::square_mask(m.from());
        }

        let bishops = self.pieces_p(PieceType::BISHOP) | self.pieces_p(PieceType::HORSE);
        let rooks = self.pieces_p(PieceType::ROOK) | self.pieces_p(PieceType::DRAGON);

        let mut attackers = self.all_attackers_to(sq, &occupied);
        let mut curr = stm.inverse();

        loop {
            let curr_attackers = attackers & self.pieces_c(curr);
            if !curr_attackers.to_bool() {
                break;
            }

            next = self.pop_least_valuable(&mut occupied, curr_attackers, curr);

            // removing the attacker may reveal an x-ray attacker behind it
            if Position::can_move_diagonally(next) {
                attackers |= ATTACK_TABLE.bishop.attack(sq, &occupied) & bishops;
            }
            if Position::can_move_orthogonally(next) {
                attackers |= ATTACK_TABLE.rook.attack(sq, &occupied) & rooks;
            }
            attackers &= occupied;

            score = -score - 1 - piece_type_value(next).0;
            curr = curr.inverse();

            if score >= 0 {
                if next == PieceType::KING && (attackers & self.pieces_c(curr)).to_bool() {
                    // the king cannot recapture into a defended square
                    curr = curr.inverse();
                }
                break;
            }
        }

        curr != stm
    }

    pub fn new_from_sfen(sfen: &str) -> Result<Position, SfenError> {
        let parts: Vec<&str> = sfen.split_whitespace().collect();
        Position::new_from_sfen_parts(&parts)
    }

    pub fn new_from_sfen_parts(parts: &[&str]) -> Result<Position, SfenError> {
        if parts.len() < 3 || parts.len() > 4 {
            return Err(SfenError::InvalidNumberOfSections { sections: parts.len() });
        }
        let mut pos = Position::empty();

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != Rank::NUM {
            return Err(SfenError::InvalidNumberOfRanks { ranks: ranks.len() });
        }
        for (rank_index, rank_str) in ranks.iter().enumerate() {
            let rank = Rank(8 - rank_index as i32);
            let mut file = 0i32;
            let mut promoted = false;
            for c in rank_str.chars() {
                if let Some(empties) = c.to_digit(10) {
                    if promoted {
                        return Err(SfenError::InvalidPieceCharacters { token: c.to_string() });
                    }
                    file += empties as i32;
                } else if c == '+' {
                    if promoted {
                        return Err(SfenError::InvalidPieceCharacters { token: "++".to_string() });
                    }
                    promoted = true;
                } else {
                    let token = if promoted { format!("+{}", c) } else { c.to_string() };
                    let pc = Piece::new_from_usi_str(&token).ok_or(SfenError::InvalidPieceCharacters { token })?;
                    if file >= File::NUM as i32 {
                        return Err(SfenError::InvalidNumberOfFiles { files: file + 1 });
                    }
                    pos.add_piece(Square::new(File(file), rank), pc);
                    file += 1;
                    promoted = false;
                }
            }
            if file != File::NUM as i32 || promoted {
                return Err(SfenError::InvalidNumberOfFiles { files: file });
            }
        }

        for &c in Color::ALL.iter() {
            let kings = pos.pieces_cp(c, PieceType::KING).count_ones();
            if kings != 1 {
                return Err(SfenError::InvalidNumberOfKings { c, kings });
            }
            for &(pt, zone) in [
                (PieceType::PAWN, Bitboard::relative_rank_mask(c, 8)),
                (PieceType::LANCE, Bitboard::relative_rank_mask(c, 8)),
                (
                    PieceType::KNIGHT,
                    Bitboard::relative_rank_mask(c, 8) | Bitboard::relative_rank_mask(c, 7),
                ),
            ]
            .iter()
            {
                if pos.pieces_cp(c, pt).and_to_bool(zone) {
                    return Err(SfenError::PieceOnForcedPromotionRank {
                        piece: pt.to_usi_str().to_string(),
                    });
                }
            }
        }

        pos.stm = match parts[1] {
            "b" => Color::BLACK,
            "w" => Color::WHITE,
            chars => {
                return Err(SfenError::InvalidSideToMove {
                    chars: chars.to_string(),
                })
            }
        };

        if parts[2] != "-" {
            let mut count: u32 = 0;
            let mut saw_digit = false;
            for c in parts[2].chars() {
                if let Some(d) = c.to_digit(10) {
                    count = count * 10 + d;
                    saw_digit = true;
                } else {
                    let pc = Piece::new_from_usi_str(&c.to_string()).ok_or(SfenError::InvalidHandPieceCharacters {
                        token: c.to_string(),
                    })?;
                    let pt = PieceType::new(pc);
                    if pt == PieceType::KING || pt.is_promoted() {
                        return Err(SfenError::InvalidHandPieceCharacters { token: c.to_string() });
                    }
                    let count = if saw_digit { count } else { 1 };
                    if count == 0 || count > Hand::max_of(pt) {
                        return Err(SfenError::InvalidNumberOfHandPieces {
                            piece: pt.to_usi_str().to_string(),
                            number: count,
                        });
                    }
                    pos.hands[Color::new(pc).0 as usize].set(pt, count);
                    saw_digit = false;
                }
                if !saw_digit {
                    count = 0;
                }
            }
            if saw_digit {
                return Err(SfenError::EndWithHandPieceNumber);
            }
        }

        if parts.len() == 4 {
            pos.move_count = parts[3].parse().map_err(|_| SfenError::InvalidMoveCount {
                chars: parts[3].to_string(),
            })?;
        }

        // board plus hands may not exceed the full piece set
        for &(board, hand_pt) in [
            (&[PieceType::PAWN, PieceType::PRO_PAWN][..], PieceType::PAWN),
            (&[PieceType::LANCE, PieceType::PRO_LANCE][..], PieceType::LANCE),
            (&[PieceType::KNIGHT, PieceType::PRO_KNIGHT][..], PieceType::KNIGHT),
            (&[PieceType::SILVER, PieceType::PRO_SILVER][..], PieceType::SILVER),
            (&[PieceType::GOLD][..], PieceType::GOLD),
            (&[PieceType::BISHOP, PieceType::HORSE][..], PieceType::BISHOP),
            (&[PieceType::ROOK, PieceType::DRAGON][..], PieceType::ROOK),
        ]
        .iter()
        {
            let mut number = pos.hand(Color::BLACK).num(hand_pt) + pos.hand(Color::WHITE).num(hand_pt);
            for &pt in board.iter() {
                number += pos.pieces_p(pt).count_ones();
            }
            if number > Hand::max_of(hand_pt) {
                return Err(SfenError::TooManyPieces {
                    piece: hand_pt.to_usi_str().to_string(),
                    number,
                });
            }
        }

        pos.key = pos.regen_key();
        pos.update_attacks();
        if pos.in_check() {
            pos.consecutive_checks[pos.stm.0 as usize] = 1;
        }
        Ok(pos)
    }

    pub fn to_sfen(&self) -> String {
        let mut sfen = String::new();
        for &rank in Rank::ALL.iter().rev() {
            let mut empties = 0;
            for &file in File::ALL.iter() {
                match self.piece_on(Square::new(file, rank)) {
                    Some(pc) => {
                        if empties > 0 {
                            sfen += &empties.to_string();
                            empties = 0;
                        }
                        sfen += pc.to_usi_str();
                    }
                    None => empties += 1,
                }
            }
            if empties > 0 {
                sfen += &empties.to_string();
            }
            if rank != Rank::RANK_I {
                sfen += "/";
            }
        }
        sfen += if self.stm == Color::BLACK { " b " } else { " w " };
        if self.hand(Color::BLACK).is_empty() && self.hand(Color::WHITE).is_empty() {
            sfen += "-";
        } else {
            for &c in Color::ALL.iter() {
                let hand = self.hand(c);
                for &pt in PieceType::ALL_HAND_FOR_SFEN.iter() {
                    let num = hand.num(pt);
                    if num == 0 {
                        continue;
                    }
                    if num > 1 {
                        sfen += &num.to_string();
                    }
                    let s = pt.to_usi_str();
                    if c == Color::BLACK {
                        sfen += s;
                    } else {
                        sfen += &s.to_ascii_lowercase();
                    }
                }
            }
        }
        sfen += &format!(" {}", self.move_count);
        sfen
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "  9  8  7  6  5  4  3  2  1")?;
        writeln!(f, "+---+---+---+---+---+---+---+---+---+")?;
        for &rank in Rank::ALL.iter().rev() {
            let mut line = String::new();
            for &file in File::ALL.iter() {
                match self.piece_on(Square::new(file, rank)) {
                    Some(pc) => {
                        let s = pc.to_usi_str();
                        if s.len() == 1 {
                            line += &format!("| {} ", s);
                        } else {
                            line += &format!("|{} ", s);
                        }
                    }
                    None => line += "|   ",
                }
            }
            writeln!(f, "{}| {}", line, rank.to_usi_char())?;
        }
        writeln!(f, "+---+---+---+---+---+---+---+---+---+")?;
        let hand_string = |c: Color| {
            let hand = self.hand(c);
            let mut s = String::new();
            for &pt in PieceType::ALL_HAND_FOR_SFEN.iter() {
                let num = hand.num(pt);
                if num == 0 {
                    continue;
                }
                if !s.is_empty() {
                    s += " ";
                }
                if num > 1 {
                    s += &num.to_string();
                }
                s += pt.to_usi_str();
            }
            s
        };
        writeln!(f, "Black hand: {}", hand_string(Color::BLACK))?;
        writeln!(f, "White hand: {}", hand_string(Color::WHITE))?;
        write!(
            f,
            "{} to move",
            if self.stm == Color::BLACK { "Black" } else { "White" }
        )
    }
}

#[test]
fn test_startpos() {
    let pos = Position::new();
    assert_eq!(pos.side_to_move(), Color::BLACK);
    assert_eq!(pos.move_count(), 1);
    assert_eq!(pos.occupied_bb().count_ones(), 40);
    assert_eq!(pos.pieces_p(PieceType::PAWN).count_ones(), 18);
    assert_eq!(pos.piece_on(Square::SQ59), Some(Piece::B_KING));
    assert_eq!(pos.piece_on(Square::SQ51), Some(Piece::W_KING));
    assert_eq!(pos.piece_on(Square::SQ88), Some(Piece::B_BISHOP));
    assert_eq!(pos.piece_on(Square::SQ28), Some(Piece::B_ROOK));
    assert!(!pos.in_check());
    assert_eq!(pos.key(), pos.regen_key());
    // regenerating is idempotent
    assert_eq!(pos.regen_key(), pos.regen_key());
}

#[test]
fn test_sfen_round_trip() {
    for sfen in [
        START_SFEN,
        "8k/9/9/7N1/9/9/9/7R1/K8 b P 1",
        "lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2",
        "4k4/9/9/9/9/9/9/9/4K4 b 2RB2G18p 55",
    ]
    .iter()
    {
        let pos = Position::new_from_sfen(sfen).unwrap();
        assert_eq!(&pos.to_sfen(), sfen);
        assert_eq!(pos.key(), pos.regen_key());
    }
}

#[test]
fn test_sfen_errors() {
    assert!(Position::new_from_sfen("9/9/9/9/9/9/9/9/9 b - 1").is_err()); // no kings
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b - 1 foo bar").is_err());
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/3KK4 b - 1").is_err()); // two black kings
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/8 b - 1").is_err()); // short rank
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 x - 1").is_err());
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b 19P 1").is_err()); // hand overflow
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b 3R 1").is_err());
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b 2 1").is_err()); // dangling count
    assert!(Position::new_from_sfen("P3k4/9/9/9/9/9/9/9/4K4 b - 1").is_err()); // pawn on rank a
    assert!(Position::new_from_sfen("4k3N/9/9/9/9/9/9/9/4K4 b - 1").is_err()); // knight on rank a
    assert!(Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K3l w - 1").is_err()); // white lance on rank i
}

#[test]
fn test_apply_move_capture_to_hand() {
    // 7g7f 3c3d 8h2b+: the promoted bishop captures on 2b and white's
    // bishop goes to black's hand.
    let mut pos = Position::new();
    for m in ["7g7f", "3c3d", "8h2b+"].iter() {
        let m = Move::new_from_usi_str(m).unwrap();
        assert!(pos.is_pseudolegal(m));
        assert!(pos.is_legal(m));
        pos = pos.apply_move(m);
        assert_eq!(pos.key(), pos.regen_key());
    }
    assert_eq!(pos.piece_on(Square::SQ22), Some(Piece::B_HORSE));
    assert_eq!(pos.piece_on(Square::SQ88), None);
    assert_eq!(pos.hand(Color::BLACK).num(PieceType::BISHOP), 1);
    assert!(pos.hand(Color::WHITE).is_empty());
    let sfen = pos.to_sfen();
    let hand_field: Vec<&str> = sfen.split_whitespace().collect();
    assert_eq!(hand_field[2], "B");
    assert_eq!(pos.side_to_move(), Color::WHITE);
    assert_eq!(pos.move_count(), 4);
}

#[test]
fn test_apply_null_move() {
    let pos = Position::new();
    let null_pos = pos.apply_null_move();
    assert_eq!(null_pos.side_to_move(), Color::WHITE);
    assert_eq!(null_pos.key(), null_pos.regen_key());
    // two null moves cancel out on the key
    assert_eq!(null_pos.apply_null_move().key(), pos.key());
    assert_eq!(null_pos.move_count(), pos.move_count() + 1);
}

#[test]
fn test_checkers_and_pinned() {
    // white rook on 5c pins the black gold on 5e against the king on 5i
    let pos = Position::new_from_sfen("4k4/9/4r4/9/4G4/9/9/9/4K4 b - 1").unwrap();
    assert!(!pos.in_check());
    assert!(pos.pinned().is_set(Square::SQ55));
    assert_eq!(pos.pinned().count_ones(), 1);
    // the pinned gold may slide along the pin ray but not off it
    let push = Move::new_unpromote(Square::SQ55, Square::SQ54);
    let sideways = Move::new_unpromote(Square::SQ55, Square::SQ45);
    assert!(pos.is_pseudolegal(push) && pos.is_legal(push));
    assert!(pos.is_pseudolegal(sideways) && !pos.is_legal(sideways));

    // a bare rook on the king's file gives check
    let pos = Position::new_from_sfen("4k4/9/4r4/9/9/9/9/9/4K4 b - 1").unwrap();
    assert!(pos.in_check());
    assert_eq!(pos.checkers().count_ones(), 1);
    assert!(pos.checkers().is_set(Square::SQ53));
    assert_eq!(pos.consecutive_checks(Color::BLACK), 1);
    assert_eq!(pos.consecutive_checks(Color::WHITE), 0);
}

#[test]
fn test_pseudolegal_drops() {
    let pos = Position::new_from_sfen("4k4/9/9/9/9/9/9/9/4K4 b P2LN 1").unwrap();
    assert!(pos.is_pseudolegal(Move::new_drop(PieceType::PAWN, Square::SQ55)));
    // no gold in hand
    assert!(!pos.is_pseudolegal(Move::new_drop(PieceType::GOLD, Square::SQ55)));
    // occupied square
    assert!(!pos.is_pseudolegal(Move::new_drop(PieceType::PAWN, Square::SQ51)));
    // forced-promotion ranks
    assert!(!pos.is_pseudolegal(Move::new_drop(PieceType::PAWN, Square::SQ61)));
    assert!(!pos.is_pseudolegal(Move::new_drop(PieceType::LANCE, Square::SQ61)));
    assert!(!pos.is_pseudolegal(Move::new_drop(PieceType::KNIGHT, Square::SQ62)));
    assert!(pos.is_pseudolegal(Move::new_drop(PieceType::KNIGHT, Square::SQ63)));

    // nifu: no second unpromoted pawn on a file
    let pos = Position::new_from_sfen("4k4/9/9/9/4P4/9/9/9/4K4 b P 1").unwrap();
    assert!(!pos.is_pseudolegal(Move::new_drop(PieceType::PAWN, Square::SQ57)));
    assert!(pos.is_pseudolegal(Move::new_drop(PieceType::PAWN, Square::SQ47)));
}

#[test]
fn test_pseudolegal_board_moves() {
    let pos = Position::new();
    // a pawn cannot promote outside the zone
    assert!(!pos.is_pseudolegal(Move::new_promote(Square::SQ77, Square::SQ76)));
    // the rook cannot jump over the pawn wall
    assert!(!pos.is_pseudolegal(Move::new_unpromote(Square::SQ28, Square::SQ24)));
    // own piece on the target square
    assert!(!pos.is_pseudolegal(Move::new_unpromote(Square::SQ59, Square::SQ58)));
    assert!(pos.is_pseudolegal(Move::new_unpromote(Square::SQ27, Square::SQ26)));

    // a lance move to the last rank must promote
    let pos = Position::new_from_sfen("4k4/8L/9/9/9/9/9/9/4K4 b - 1").unwrap();
    assert!(!pos.is_pseudolegal(Move::new_unpromote(Square::SQ12, Square::SQ11)));
    assert!(pos.is_pseudolegal(Move::new_promote(Square::SQ12, Square::SQ11)));
}

#[test]
fn test_pawn_drop_mate() {
    // P*1b would be mate: the knight guards the pawn and the rook covers
    // the king's flight squares. The drop is pseudo-legal yet illegal.
    let pos = Position::new_from_sfen("8k/9/9/7N1/9/9/9/7R1/K8 b P 1").unwrap();
    let mate_drop = Move::new_drop(PieceType::PAWN, Square::SQ12);
    assert!(pos.is_pseudolegal(mate_drop));
    assert!(!pos.is_legal(mate_drop));
    // the same pawn dropped elsewhere is fine
    let quiet_drop = Move::new_drop(PieceType::PAWN, Square::SQ55);
    assert!(pos.is_pseudolegal(quiet_drop));
    assert!(pos.is_legal(quiet_drop));
    // a check that is not mate stays legal
    let pos = Position::new_from_sfen("8k/9/9/7N1/9/9/9/9/K8 b P 1").unwrap();
    let check_drop = Move::new_drop(PieceType::PAWN, Square::SQ12);
    assert!(pos.is_legal(check_drop));
}

#[test]
fn test_see_threshold() {
    // bishop takes the rook on 5e; the rook is defended by a pawn only
    let pos = Position::new_from_sfen("8k/9/9/4p4/4r4/9/2B6/9/K8 b - 1").unwrap();
    let capture = Move::new_unpromote(Square::SQ77, Square::SQ55);
    assert!(pos.is_pseudolegal(capture));
    assert!(pos.see_ge(capture, Value(0)));
    assert!(!pos.see_ge(capture, Value(250)));
}

#[test]
fn test_see_undefended_capture() {
    let pos = Position::new_from_sfen("8k/9/9/9/4r4/9/2B6/9/K8 b - 1").unwrap();
    let capture = Move::new_unpromote(Square::SQ77, Square::SQ55);
    assert!(pos.see_ge(capture, Value(ROOK_VALUE)));
    assert!(!pos.see_ge(capture, Value(ROOK_VALUE + 1)));
}

#[test]
fn test_sennichite_perpetual_check() {
    // black shuffles the rook between 5h and 4h, checking every time;
    // white's king steps between 4a and 5a.
    let mut pos = Position::new_from_sfen("5k3/9/9/9/9/9/9/4R4/K8 b - 1").unwrap();
    let cycle = ["5h4h", "4a5a", "4h5h", "5a4a"];
    let mut history: Vec<Key> = vec![];
    let mut statuses: Vec<Sennichite> = vec![];
    for ply in 0..13 {
        let m = Move::new_from_usi_str(cycle[ply % 4]).unwrap();
        assert!(pos.is_pseudolegal(m), "ply {}", ply);
        assert!(pos.is_legal(m), "ply {}", ply);
        history.push(pos.key());
        pos = pos.apply_move(m);
        statuses.push(pos.test_sennichite(false, &history));
    }
    // nothing repeats often enough before the fourth occurrence
    for status in statuses[..11].iter() {
        assert_eq!(*status, Sennichite::None);
    }
    // ply 12 closes the fourth occurrence of the quiet root position
    assert_eq!(statuses[11], Sennichite::Draw);
    // ply 13 closes the fourth occurrence of the checked position: white,
    // perpetually checked, wins and black's repetition is illegal
    assert_eq!(statuses[12], Sennichite::Win);
    assert!(pos.in_check());
    assert_eq!(pos.side_to_move(), Color::WHITE);
    assert!(pos.consecutive_checks(Color::WHITE) >= 2);
    // the compatibility flag reports the same two outcomes here
    assert_eq!(pos.test_sennichite(true, &history), Sennichite::Win);
}

#[test]
fn test_evasion_legality() {
    // double check: only king moves are legal
    let pos = Position::new_from_sfen("4k4/9/9/9/8b/9/4r3P/9/4KG3 b - 1").unwrap();
    assert!(pos.in_check());
    assert!(pos.checkers().more_than_one());
    // the gold cannot parry both checks
    let gold_up = Move::new_unpromote(Square::SQ49, Square::SQ48);
    assert!(pos.is_pseudolegal(gold_up));
    assert!(!pos.is_legal(gold_up));
    // single check: blocking on the ray is legal
    let pos = Position::new_from_sfen("4k4/9/4r4/9/9/9/9/3G5/4K4 b - 1").unwrap();
    assert!(pos.in_check());
    let block = Move::new_unpromote(Square::SQ68, Square::SQ58);
    assert!(pos.is_pseudolegal(block));
    assert!(pos.is_legal(block));
    let away = Move::new_unpromote(Square::SQ68, Square::SQ78);
    assert!(pos.is_pseudolegal(away));
    assert!(!pos.is_legal(away));
}
