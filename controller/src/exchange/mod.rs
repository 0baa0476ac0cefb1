//! Command/response state machines. AECP serializes commands per target and
//! retries on timeout; ACMP runs transactions concurrently against a
//! controller-global sequence space with per-message-type timeouts and no
//! retries. Both report resolved commands as completion records the
//! controller routes onward; neither touches controller state directly.

pub mod acmp;
pub mod aecp;

pub use acmp::{AcmpCompletion, AcmpStateMachine};
pub use aecp::{AecpCompletion, AecpStateMachine};
