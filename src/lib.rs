mod cli;
mod layout;
mod parse;
mod process;
mod record;
mod verify;

pub use crate::cli::*;
pub use crate::layout::*;
pub use crate::parse::*;
pub use crate::process::*;
pub use crate::record::*;
pub use crate::verify::*;
