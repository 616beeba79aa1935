//! Data availability: namespaced commitments, erasure coding, and
//! light-client sampling.

pub mod erasure;
pub mod error;
pub mod nmt;
pub mod sampling;

pub use erasure::ErasureCoder;
pub use error::DaError;
pub use nmt::{NamespaceId, NamespaceProof, NmtNode, NmtTree};
pub use sampling::{required_sample_count, LightClientSampler, Sample};
