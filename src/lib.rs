#![cfg_attr(
    feature = "cargo-clippy",
    allow(
        clippy::cognitive_complexity,
        clippy::too_many_arguments,
        clippy::new_without_default
    )
)]
#[macro_use]
extern crate derive_more;
mod attacks;
mod bench;
mod bitboard;
mod engine_name;
mod evaluate;
mod hand;
mod keys;
mod limit;
mod movegen;
mod movepick;
mod movetypes;
mod perft;
mod piecevalue;
mod position;
mod pv;
mod rays;
mod search;
mod sfen;
mod thread;
mod tt;
mod types;
pub mod usi;
mod usioption;

pub mod stack_size {
    // Attack table construction and deep perft recursion want more than the
    // default main-thread stack on some platforms.
    pub const STACK_SIZE: usize = 128 * 1024 * 1024;
}
