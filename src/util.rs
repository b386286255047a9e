mod ref_id;

pub use ref_id::*;

/// Values which occupy a variable number of register slots
pub trait Width {
    /// Number of register slots
    fn width(&self) -> usize;
}
