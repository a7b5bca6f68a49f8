pub mod calc_engine;

#[cfg(feature = "line")]
pub mod line_mode;
#[cfg(feature = "tui")]
pub mod tui_mode;

pub use calc_engine::{build_rpn, evaluate, evaluate_rpn, CalcError, Op, Rpn, Token};
