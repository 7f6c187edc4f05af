mod limits;
mod skip;
pub mod utils;
