use crate::types::*;
use thiserror::Error;

pub const START_SFEN: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum SfenError {
    #[error("invalid number of sections. found {sections} sections.")]
    InvalidNumberOfSections { sections: usize },
    #[error("invalid number of ranks. found {ranks} ranks.")]
    InvalidNumberOfRanks { ranks: usize },
    #[error("invalid number of files in rank. found {files} files.")]
    InvalidNumberOfFiles { files: i32 },
    #[error(r##"invalid piece characters. found "{token}"."##)]
    InvalidPieceCharacters { token: String },
    #[error(r##"invalid hand piece characters. found "{token}"."##)]
    InvalidHandPieceCharacters { token: String },
    #[error("invalid number of hand pieces. found {number} of {piece}.")]
    InvalidNumberOfHandPieces { piece: String, number: u32 },
    #[error(r##"hand ends with a count and no matching piece."##)]
    EndWithHandPieceNumber,
    #[error("invalid side to move. found {chars}.")]
    InvalidSideToMove { chars: String },
    #[error("invalid move count. found {chars}.")]
    InvalidMoveCount { chars: String },
    #[error("{c:?} must have exactly one king. found {kings}.")]
    InvalidNumberOfKings { c: Color, kings: u32 },
    #[error("too many {piece} pieces. found {number}.")]
    TooManyPieces { piece: String, number: u32 },
    #[error("a {piece} stands on a rank it could never move from.")]
    PieceOnForcedPromotionRank { piece: String },
}
