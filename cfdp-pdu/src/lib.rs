pub mod pdu;
pub mod seq_count;
pub mod util;

// re-exported for convenience.
pub use pdu::{PDUEncode, PDUError, PDUFactory, PDUHolder, PDUResult};
pub use util::{EntityID, TransactionId, TransactionSeqNum, UnsignedByteField};

// this import is necessary for the template macro in rstest_reuse as of v0.5.0
#[cfg(test)]
#[cfg_attr(test, allow(clippy::single_component_path_imports))]
use rstest_reuse;
