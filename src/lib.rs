//! GorgZorg library
//!
//! Point to point file transfer between two hosts of a private network:
//! one side gorgs (sends), the other zorgs (receives) over a single framed
//! TCP connection.

pub mod archive;
pub mod cli;
pub mod codec;
pub mod fs_enum;
pub mod gorg;
pub mod log;
pub mod net;
pub mod paths;
pub mod progress;
pub mod protocol;
pub mod zorg;
