use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("expected {expected} projected points ({blocks} blocks x {block_size}), got {got}")]
    PointCountMismatch {
        expected: usize,
        got: usize,
        blocks: usize,
        block_size: usize,
    },
    #[error("alpha must be finite and within [0, 1], got {0}")]
    InvalidAlpha(f32),
    #[error("{kind} references vertex {index}, block has {block_size} vertices")]
    InvalidIndex {
        kind: &'static str,
        index: usize,
        block_size: usize,
    },
    #[error("overlay is {overlay:?} but frame is {frame:?}")]
    DimensionMismatch {
        frame: (u32, u32),
        overlay: (u32, u32),
    },
}
