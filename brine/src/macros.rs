//! Helper macros

/// Helper to combine deeply nested sequences.
/// ```ignore
/// seq(P1, seq(P2, seq(P3, P4)))
/// // is equivalent to
/// seqs!(P1, P2, P3, P4)
/// ```
#[macro_export]
macro_rules! seqs {
    ($p:expr) => {
        $p
    };
    ($p:expr , $($ts:tt)+) => {
        seq($p, seqs!($($ts)+))
    };
}

pub use seqs;
