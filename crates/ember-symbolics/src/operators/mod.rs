//! Individual lowering rules that don't fit a family.

mod pooling;
mod shape;

pub use pooling::MaxPool2dSymbolic;
pub use shape::ViewSymbolic;
