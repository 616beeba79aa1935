//! Errors raised by [`super::DifficultyController`].

#[derive(Debug, thiserror::Error)]
pub enum DifficultyError {
    #[error("parameter bundle has a zero target interval")]
    ZeroTargetInterval,
}
