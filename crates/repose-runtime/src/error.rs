use futures::task::SpawnError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn local task: {0}")]
    Spawn(#[from] SpawnError),
}
