use crate::movegen::*;
use crate::movetypes::*;
use crate::position::*;
use crate::types::*;

// Staged generation lets the search try the TT move before paying for
// full generation, and stop early on a cutoff.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GenStage {
    TtMove,
    GenerateAll,
    All,
    QsGenerateCaptures,
    QsCaptures,
    QsGenerateRecaptures,
    QsRecaptures,
    End,
}

pub struct MoveGenerator {
    stage: GenStage,
    tt_move: Option<Move>,
    recapture_sq: Square,
    list: MoveList,
    idx: usize,
}

impl MoveGenerator {
    pub fn main(tt_move: Option<Move>) -> MoveGenerator {
        MoveGenerator {
            stage: GenStage::TtMove,
            tt_move,
            recapture_sq: Square(0),
            list: MoveList::new(),
            idx: 0,
        }
    }
    pub fn qsearch(recapture_sq: Option<Square>) -> MoveGenerator {
        match recapture_sq {
            Some(sq) => MoveGenerator {
                stage: GenStage::QsGenerateRecaptures,
                tt_move: None,
                recapture_sq: sq,
                list: MoveList::new(),
                idx: 0,
            },
            None => MoveGenerator {
                stage: GenStage::QsGenerateCaptures,
                tt_move: None,
                recapture_sq: Square(0),
                list: MoveList::new(),
                idx: 0,
            },
        }
    }
    pub fn stage(&self) -> GenStage {
        self.stage
    }

    fn select_next(&mut self, skip: Option<Move>) -> Option<Move> {
        while self.idx < self.list.size {
            let m = self.list.get(self.idx);
            self.idx += 1;
            if Some(m) != skip {
                return Some(m);
            }
        }
        None
    }

    pub fn next(&mut self, pos: &Position) -> Option<Move> {
        loop {
            match self.stage {
                GenStage::TtMove => {
                    self.stage = GenStage::GenerateAll;
                    if let Some(tt_move) = self.tt_move {
                        if pos.is_pseudolegal(tt_move) {
                            return Some(tt_move);
                        }
                        // a stale TT move is silently dropped
                        self.tt_move = None;
                    }
                }
                GenStage::GenerateAll => {
                    generate_all(&mut self.list, pos);
                    self.stage = GenStage::All;
                }
                GenStage::All => {
                    let skip = self.tt_move;
                    if let Some(m) = self.select_next(skip) {
                        return Some(m);
                    }
                    self.stage = GenStage::End;
                }
                GenStage::QsGenerateCaptures => {
                    generate_captures(&mut self.list, pos);
                    self.stage = GenStage::QsCaptures;
                }
                GenStage::QsCaptures => {
                    if let Some(m) = self.select_next(None) {
                        return Some(m);
                    }
                    self.stage = GenStage::End;
                }
                GenStage::QsGenerateRecaptures => {
                    generate_recaptures(&mut self.list, pos, self.recapture_sq);
                    self.stage = GenStage::QsRecaptures;
                }
                GenStage::QsRecaptures => {
                    if let Some(m) = self.select_next(None) {
                        return Some(m);
                    }
                    self.stage = GenStage::End;
                }
                GenStage::End => return None,
            }
        }
    }
}

#[test]
fn test_tt_move_first_then_rest() {
    let pos = Position::new();
    let tt_move = Move::new_from_usi_str("7g7f").unwrap();
    let mut gen = MoveGenerator::main(Some(tt_move));
    assert_eq!(gen.next(&pos), Some(tt_move));
    let mut rest = vec![];
    while let Some(m) = gen.next(&pos) {
        assert_ne!(m, tt_move);
        rest.push(m);
    }
    assert_eq!(rest.len(), 29);
    assert_eq!(gen.stage(), GenStage::End);
}

#[test]
fn test_stale_tt_move_is_dropped() {
    let pos = Position::new();
    // there is no black piece on 5e
    let bogus = Move::new_from_usi_str("5e5d").unwrap();
    let mut gen = MoveGenerator::main(Some(bogus));
    let mut count = 0;
    while let Some(m) = gen.next(&pos) {
        assert_ne!(m, bogus);
        count += 1;
    }
    assert_eq!(count, 30);
}

#[test]
fn test_qsearch_generates_captures_only() {
    let mut pos = Position::new();
    for m in ["7g7f", "3c3d", "8h3c+"].iter() {
        pos = pos.apply_move(Move::new_from_usi_str(m).unwrap());
    }
    let mut gen = MoveGenerator::qsearch(None);
    let mut count = 0;
    while let Some(m) = gen.next(&pos) {
        assert!(pos.is_capture(m));
        count += 1;
    }
    assert!(count > 0);
}

#[test]
fn test_qsearch_recaptures_restricted() {
    let mut pos = Position::new();
    for m in ["7g7f", "3c3d", "8h2b+"].iter() {
        pos = pos.apply_move(Move::new_from_usi_str(m).unwrap());
    }
    let mut gen = MoveGenerator::qsearch(Some(Square::SQ22));
    let mut count = 0;
    while let Some(m) = gen.next(&pos) {
        assert_eq!(m.to(), Square::SQ22);
        count += 1;
    }
    assert!(count > 0);
}
