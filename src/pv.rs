use crate::movetypes::*;
use crate::types::*;

#[derive(Clone)]
pub struct PvList {
    pub moves: [Option<Move>; MAX_PLY as usize],
    pub length: usize,
}

impl PvList {
    pub fn new() -> PvList {
        PvList {
            moves: [None; MAX_PLY as usize],
            length: 0,
        }
    }
    // Prepend move to the child's line.
    pub fn update(&mut self, m: Move, child: &PvList) {
        debug_assert!(child.length + 1 <= MAX_PLY as usize);
        self.moves[0] = Some(m);
        self.moves[1..=child.length].copy_from_slice(&child.moves[..child.length]);
        self.length = child.length + 1;
    }
    pub fn clear(&mut self) {
        self.moves[0] = None;
        self.length = 0;
    }
    pub fn best_move(&self) -> Option<Move> {
        if self.length == 0 {
            None
        } else {
            self.moves[0]
        }
    }
    pub fn line(&self) -> Vec<Move> {
        self.moves[..self.length].iter().filter_map(|m| *m).collect()
    }
    pub fn to_usi_string(&self) -> String {
        self.line()
            .iter()
            .map(|m| m.to_usi_string())
            .collect::<Vec<String>>()
            .join(" ")
    }
}

#[test]
fn test_pv_update_concatenates() {
    let m1 = Move::new_from_usi_str("7g7f").unwrap();
    let m2 = Move::new_from_usi_str("3c3d").unwrap();
    let m3 = Move::new_from_usi_str("8h2b+").unwrap();
    let mut leaf = PvList::new();
    leaf.update(m3, &PvList::new());
    let mut mid = PvList::new();
    mid.update(m2, &leaf);
    let mut root = PvList::new();
    root.update(m1, &mid);
    assert_eq!(root.length, 3);
    assert_eq!(root.line(), vec![m1, m2, m3]);
    assert_eq!(root.to_usi_string(), "7g7f 3c3d 8h2b+");
    assert_eq!(root.best_move(), Some(m1));
}

#[test]
fn test_pv_clear() {
    let mut pv = PvList::new();
    pv.update(Move::new_from_usi_str("7g7f").unwrap(), &PvList::new());
    pv.clear();
    assert_eq!(pv.length, 0);
    assert_eq!(pv.best_move(), None);
}
