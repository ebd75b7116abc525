mod frame;
pub mod listener;
pub mod output;
pub mod sink;

pub use frame::{FRAME_TERMINATOR, FrameReader, encode_frame};
pub use listener::serve;
pub use output::{OutFrame, OutputError, OutputHandle, SessionOut};
