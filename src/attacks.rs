use crate::bitboard::*;
use crate::types::*;

pub fn sliding_attacks(deltas: &[Square], sq: Square, occupied: &Bitboard) -> Bitboard {
    let mut bb = Bitboard::ZERO;
    for delta in deltas {
        let mut sq_prev = sq;
        let mut sq_opt = sq.checked_add(*delta);
        while let Some(sq_tmp) = sq_opt {
            if (File::new(sq_prev).0 - File::new(sq_tmp).0).abs() <= 1 && (Rank::new(sq_prev).0 - Rank::new(sq_tmp).0).abs() <= 1
            {
                bb.set(sq_tmp);
                if occupied.is_set(sq_tmp) {
                    break;
                }
                sq_prev = sq_tmp;
                sq_opt = sq_tmp.checked_add(*delta);
            } else {
                break;
            }
        }
    }
    bb
}

pub struct PieceAttackTable([[Bitboard; Color::NUM]; Square::NUM]);

impl PieceAttackTable {
    const BLACK_PAWN_DELTAS: &'static [Square] = &[Square::DELTA_N];
    const WHITE_PAWN_DELTAS: &'static [Square] = &[Square::DELTA_S];
    const BLACK_KNIGHT_DELTAS: &'static [Square] = &[Square::DELTA_NNE, Square::DELTA_NNW];
    const WHITE_KNIGHT_DELTAS: &'static [Square] = &[Square::DELTA_SSE, Square::DELTA_SSW];
    const BLACK_SILVER_DELTAS: &'static [Square] = &[
        Square::DELTA_N,
        Square::DELTA_NE,
        Square::DELTA_SE,
        Square::DELTA_SW,
        Square::DELTA_NW,
    ];
    const WHITE_SILVER_DELTAS: &'static [Square] = &[
        Square::DELTA_NE,
        Square::DELTA_SE,
        Square::DELTA_S,
        Square::DELTA_SW,
        Square::DELTA_NW,
    ];
    const BLACK_GOLD_DELTAS: &'static [Square] = &[
        Square::DELTA_N,
        Square::DELTA_NE,
        Square::DELTA_E,
        Square::DELTA_S,
        Square::DELTA_W,
        Square::DELTA_NW,
    ];
    const WHITE_GOLD_DELTAS: &'static [Square] = &[
        Square::DELTA_N,
        Square::DELTA_E,
        Square::DELTA_SE,
        Square::DELTA_S,
        Square::DELTA_SW,
        Square::DELTA_W,
    ];

    fn new(deltass: &[&[Square]; Color::NUM]) -> PieceAttackTable {
        let mut ret = PieceAttackTable([[Bitboard::ZERO; Color::NUM]; Square::NUM]);
        for &c in Color::ALL.iter() {
            for sq in Square::all() {
                for delta in deltass[c.0 as usize].iter() {
                    if let Some(to) = sq.checked_add(*delta) {
                        if (File::new(sq).0 - File::new(to).0).abs() <= 1 && (Rank::new(sq).0 - Rank::new(to).0).abs() <= 2 {
                            ret.0[sq.0 as usize][c.0 as usize].set(to);
                        }
                    }
                }
            }
        }
        ret
    }
    pub fn attack(&self, c: Color, sq: Square) -> Bitboard {
        debug_assert!(sq.is_ok());
        self.0[sq.0 as usize][c.0 as usize]
    }
}

pub struct KingAttackTable([Bitboard; Square::NUM]);

impl KingAttackTable {
    const DELTAS: [Square; 8] = [
        Square::DELTA_N,
        Square::DELTA_NE,
        Square::DELTA_E,
        Square::DELTA_SE,
        Square::DELTA_S,
        Square::DELTA_SW,
        Square::DELTA_W,
        Square::DELTA_NW,
    ];

    fn new() -> KingAttackTable {
        let mut ret = KingAttackTable([Bitboard::ZERO; Square::NUM]);
        for sq in Square::all() {
            for delta in KingAttackTable::DELTAS.iter() {
                if let Some(to) = sq.checked_add(*delta) {
                    if (File::new(sq).0 - File::new(to).0).abs() <= 1 && (Rank::new(sq).0 - Rank::new(to).0).abs() <= 1 {
                        ret.0[sq.0 as usize].set(to);
                    }
                }
            }
        }
        ret
    }
    pub fn attack(&self, sq: Square) -> Bitboard {
        debug_assert!(sq.is_ok());
        self.0[sq.0 as usize]
    }
}

#[derive(Copy, Clone)]
struct SliderData {
    mask: Bitboard,
    offset: usize,
    low_count: u32,
}

// One table serves both slider backends: the relevant occupancy is
// compressed to an index with hardware PEXT where available and the
// identical software extraction otherwise, so the index spaces match.
pub struct SliderAttackTable {
    data: [SliderData; Square::NUM],
    attacks: Vec<Bitboard>,
}

fn delta_edge(delta: Square) -> Bitboard {
    match delta {
        Square::DELTA_N => Bitboard::rank_mask(Rank::RANK_A),
        Square::DELTA_S => Bitboard::rank_mask(Rank::RANK_I),
        Square::DELTA_E => Bitboard::file_mask(File::FILE1),
        Square::DELTA_W => Bitboard::file_mask(File::FILE9),
        Square::DELTA_NE => Bitboard::rank_mask(Rank::RANK_A) | Bitboard::file_mask(File::FILE1),
        Square::DELTA_NW => Bitboard::rank_mask(Rank::RANK_A) | Bitboard::file_mask(File::FILE9),
        Square::DELTA_SE => Bitboard::rank_mask(Rank::RANK_I) | Bitboard::file_mask(File::FILE1),
        Square::DELTA_SW => Bitboard::rank_mask(Rank::RANK_I) | Bitboard::file_mask(File::FILE9),
        _ => unreachable!(),
    }
}

impl SliderAttackTable {
    fn new(deltas: &[Square]) -> SliderAttackTable {
        let mut data = [SliderData {
            mask: Bitboard::ZERO,
            offset: 0,
            low_count: 0,
        }; Square::NUM];
        let mut total = 0usize;
        for sq in Square::all() {
            // the outer edge of a ray never changes the attack set
            let mut mask = Bitboard::ZERO;
            for delta in deltas.iter() {
                mask |= sliding_attacks(&[*delta], sq, &Bitboard::ZERO) & !delta_edge(*delta);
            }
            data[sq.0 as usize] = SliderData {
                mask,
                offset: total,
                low_count: mask.v[0].count_ones(),
            };
            total += 1 << mask.count_ones();
        }
        let mut attacks = vec![Bitboard::ZERO; total];
        for sq in Square::all() {
            let d = &data[sq.0 as usize];
            for index in 0..(1u64 << d.mask.count_ones()) {
                let occupied = Bitboard::pdep(index, &d.mask, d.low_count);
                attacks[d.offset + index as usize] = sliding_attacks(deltas, sq, &occupied);
            }
        }
        SliderAttackTable { data, attacks }
    }
    pub fn attack(&self, sq: Square, occupied: &Bitboard) -> Bitboard {
        debug_assert!(sq.is_ok());
        let d = &self.data[sq.0 as usize];
        self.attacks[d.offset + occupied.pext(&d.mask, d.low_count)]
    }
    pub fn pseudo_attack(&self, sq: Square) -> Bitboard {
        debug_assert!(sq.is_ok());
        self.attacks[self.data[sq.0 as usize].offset]
    }
}

pub struct LanceAttackTable {
    tables: [SliderAttackTable; Color::NUM],
}

impl LanceAttackTable {
    fn new() -> LanceAttackTable {
        LanceAttackTable {
            tables: [
                SliderAttackTable::new(&[Square::DELTA_N]),
                SliderAttackTable::new(&[Square::DELTA_S]),
            ],
        }
    }
    pub fn attack(&self, c: Color, sq: Square, occupied: &Bitboard) -> Bitboard {
        self.tables[c.0 as usize].attack(sq, occupied)
    }
    pub fn pseudo_attack(&self, c: Color, sq: Square) -> Bitboard {
        self.tables[c.0 as usize].pseudo_attack(sq)
    }
}

pub struct AttackTable {
    pub pawn: PieceAttackTable,
    pub lance: LanceAttackTable,
    pub knight: PieceAttackTable,
    pub silver: PieceAttackTable,
    pub gold: PieceAttackTable,
    pub king: KingAttackTable,
    pub bishop: SliderAttackTable,
    pub rook: SliderAttackTable,
}

impl AttackTable {
    pub const BISHOP_DELTAS: [Square; 4] = [Square::DELTA_NE, Square::DELTA_SE, Square::DELTA_SW, Square::DELTA_NW];
    pub const ROOK_DELTAS: [Square; 4] = [Square::DELTA_N, Square::DELTA_E, Square::DELTA_S, Square::DELTA_W];

    pub fn attack(&self, pt: PieceType, c: Color, sq: Square, occupied: &Bitboard) -> Bitboard {
        match pt {
            PieceType::PAWN => self.pawn.attack(c, sq),
            PieceType::LANCE => self.lance.attack(c, sq, occupied),
            PieceType::KNIGHT => self.knight.attack(c, sq),
            PieceType::SILVER => self.silver.attack(c, sq),
            PieceType::BISHOP => self.bishop.attack(sq, occupied),
            PieceType::ROOK => self.rook.attack(sq, occupied),
            PieceType::GOLD | PieceType::PRO_PAWN | PieceType::PRO_LANCE | PieceType::PRO_KNIGHT | PieceType::PRO_SILVER => {
                self.gold.attack(c, sq)
            }
            PieceType::KING => self.king.attack(sq),
            PieceType::HORSE => self.bishop.attack(sq, occupied) | self.king.attack(sq),
            PieceType::DRAGON => self.rook.attack(sq, occupied) | self.king.attack(sq),
            _ => unreachable!(),
        }
    }
}

pub static ATTACK_TABLE: once_cell::sync::Lazy<AttackTable> = once_cell::sync::Lazy::new(|| AttackTable {
    pawn: PieceAttackTable::new(&[PieceAttackTable::BLACK_PAWN_DELTAS, PieceAttackTable::WHITE_PAWN_DELTAS]),
    lance: LanceAttackTable::new(),
    knight: PieceAttackTable::new(&[PieceAttackTable::BLACK_KNIGHT_DELTAS, PieceAttackTable::WHITE_KNIGHT_DELTAS]),
    silver: PieceAttackTable::new(&[PieceAttackTable::BLACK_SILVER_DELTAS, PieceAttackTable::WHITE_SILVER_DELTAS]),
    gold: PieceAttackTable::new(&[PieceAttackTable::BLACK_GOLD_DELTAS, PieceAttackTable::WHITE_GOLD_DELTAS]),
    king: KingAttackTable::new(),
    bishop: SliderAttackTable::new(&AttackTable::BISHOP_DELTAS),
    rook: SliderAttackTable::new(&AttackTable::ROOK_DELTAS),
});

#[test]
fn test_pawn_attack() {
    let bb = Bitboard::ZERO;
    assert_eq!(ATTACK_TABLE.pawn.attack(Color::BLACK, Square::SQ11), bb);
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ12);
    assert_eq!(ATTACK_TABLE.pawn.attack(Color::WHITE, Square::SQ11), bb);
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ54);
    assert_eq!(ATTACK_TABLE.pawn.attack(Color::BLACK, Square::SQ55), bb);
}

#[test]
fn test_knight_attack() {
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ76);
    bb.set(Square::SQ96);
    assert_eq!(ATTACK_TABLE.knight.attack(Color::BLACK, Square::SQ88), bb);
    assert_eq!(ATTACK_TABLE.knight.attack(Color::WHITE, Square::SQ88), Bitboard::ZERO);
    // the jump must not wrap a file edge
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ23);
    assert_eq!(ATTACK_TABLE.knight.attack(Color::BLACK, Square::SQ15), bb);
}

#[test]
fn test_silver_gold_attack() {
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ77);
    bb.set(Square::SQ79);
    bb.set(Square::SQ87);
    bb.set(Square::SQ97);
    bb.set(Square::SQ99);
    assert_eq!(ATTACK_TABLE.silver.attack(Color::BLACK, Square::SQ88), bb);
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ77);
    bb.set(Square::SQ78);
    bb.set(Square::SQ87);
    bb.set(Square::SQ89);
    bb.set(Square::SQ97);
    bb.set(Square::SQ98);
    assert_eq!(ATTACK_TABLE.gold.attack(Color::BLACK, Square::SQ88), bb);
}

#[test]
fn test_king_attack() {
    let mut bb = Bitboard::ZERO;
    bb.set(Square::SQ12);
    bb.set(Square::SQ21);
    bb.set(Square::SQ22);
    assert_eq!(ATTACK_TABLE.king.attack(Square::SQ11), bb);
    assert_eq!(ATTACK_TABLE.king.attack(Square::SQ55).count_ones(), 8);
}

#[test]
fn test_lance_attack() {
    let mut occupied = Bitboard::ZERO;
    occupied.set(Square::SQ52);
    let attack = ATTACK_TABLE.lance.attack(Color::BLACK, Square::SQ55, &occupied);
    assert!(attack.is_set(Square::SQ54));
    assert!(attack.is_set(Square::SQ53));
    assert!(attack.is_set(Square::SQ52));
    assert!(!attack.is_set(Square::SQ51));
    assert!(!attack.is_set(Square::SQ56));
    let attack = ATTACK_TABLE.lance.attack(Color::WHITE, Square::SQ55, &occupied);
    assert!(attack.is_set(Square::SQ56));
    assert!(attack.is_set(Square::SQ59));
    assert!(!attack.is_set(Square::SQ54));
}

#[test]
fn test_slider_attack_matches_reference() {
    use rand::prelude::*;
    let mut rng: StdRng = SeedableRng::seed_from_u64(7);
    for _ in 0..200 {
        let mut occupied = Bitboard::ZERO;
        for _ in 0..20 {
            occupied.set(Square(rng.gen_range(0..Square::NUM as i32)));
        }
        for sq in Square::all() {
            assert_eq!(
                ATTACK_TABLE.bishop.attack(sq, &occupied),
                sliding_attacks(&AttackTable::BISHOP_DELTAS, sq, &occupied)
            );
            assert_eq!(
                ATTACK_TABLE.rook.attack(sq, &occupied),
                sliding_attacks(&AttackTable::ROOK_DELTAS, sq, &occupied)
            );
            assert_eq!(
                ATTACK_TABLE.lance.attack(Color::BLACK, sq, &occupied),
                sliding_attacks(&[Square::DELTA_N], sq, &occupied)
            );
            assert_eq!(
                ATTACK_TABLE.lance.attack(Color::WHITE, sq, &occupied),
                sliding_attacks(&[Square::DELTA_S], sq, &occupied)
            );
        }
    }
}

#[test]
fn test_pseudo_attack() {
    for sq in Square::all() {
        assert_eq!(
            ATTACK_TABLE.bishop.attack(sq, &Bitboard::ZERO),
            ATTACK_TABLE.bishop.pseudo_attack(sq)
        );
        assert_eq!(
            ATTACK_TABLE.rook.attack(sq, &Bitboard::ZERO),
            ATTACK_TABLE.rook.pseudo_attack(sq)
        );
        for &c in Color::ALL.iter() {
            assert_eq!(
                ATTACK_TABLE.lance.attack(c, sq, &Bitboard::ZERO),
                ATTACK_TABLE.lance.pseudo_attack(c, sq)
            );
        }
    }
}

#[test]
fn test_horse_dragon_attack() {
    let occupied = Bitboard::ZERO;
    let horse = ATTACK_TABLE.attack(PieceType::HORSE, Color::BLACK, Square::SQ55, &occupied);
    assert_eq!(
        horse,
        ATTACK_TABLE.bishop.attack(Square::SQ55, &occupied) | ATTACK_TABLE.king.attack(Square::SQ55)
    );
    let dragon = ATTACK_TABLE.attack(PieceType::DRAGON, Color::WHITE, Square::SQ55, &occupied);
    assert_eq!(
        dragon,
        ATTACK_TABLE.rook.attack(Square::SQ55, &occupied) | ATTACK_TABLE.king.attack(Square::SQ55)
    );
}
