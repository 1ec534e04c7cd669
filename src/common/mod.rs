pub mod frame;

pub use frame::{BoundingBox, Frame, FrameSize};
