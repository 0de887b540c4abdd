//! Registry error types.

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No room with that id in the workspace.
    #[error("room not found: {workspace_id}/{room_id}")]
    RoomNotFound {
        workspace_id: String,
        room_id: String,
    },
    /// A room with that id already exists in the workspace.
    #[error("room already exists: {workspace_id}/{room_id}")]
    RoomExists {
        workspace_id: String,
        room_id: String,
    },
}
