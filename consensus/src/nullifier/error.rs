//! Errors raised by [`super::NullifierIndex`].

use crate::types::Hash256;

#[derive(Debug, thiserror::Error)]
pub enum NullifierError {
    #[error("nullifier {nullifier} has already been spent")]
    AlreadySpent { nullifier: Hash256 },
}
