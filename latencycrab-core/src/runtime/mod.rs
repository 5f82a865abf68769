//! Runtime-domain modules: channels, gates, the operator interface and the
//! task event loop.

pub mod channel;
pub mod clock;
pub mod input_gate;
pub mod operator;
pub mod output_gate;
pub mod task;

pub use channel::*;
pub use clock::*;
pub use input_gate::*;
pub use operator::*;
pub use output_gate::*;
pub use task::*;
