pub mod engine;
pub mod geometry;
pub mod increment;
pub mod matching;
pub mod replay;
pub mod snapshot;

pub fn version() -> &'static str {
    "0.1.0"
}
