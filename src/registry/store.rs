//! Registry implementation.
//!
//! The central map from workspaces to rooms. Thread-safe via `RwLock`;
//! read-heavy workloads (room lookups on every REST call and WebSocket
//! join) get concurrent read access, while room mutations happen behind
//! each room's own lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::RegistryError;

type RoomMap<R> = HashMap<String, Arc<RwLock<R>>>;

/// Two-level registry: workspace id → room id → room.
///
/// Generic over the room type so the robotics and video surfaces each
/// get their own isolated namespace with identical lifecycle rules.
pub struct Registry<R> {
    workspaces: RwLock<HashMap<String, RoomMap<R>>>,
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Self {
            workspaces: RwLock::new(HashMap::new()),
        }
    }

    /// Create a room in a workspace, generating a UUID v4 room id when
    /// none is supplied. The workspace is created implicitly.
    ///
    /// `build` constructs the room from the final room id; it runs only
    /// after the id is known to be free.
    pub async fn create_room<F>(
        &self,
        workspace_id: &str,
        room_id: Option<String>,
        build: F,
    ) -> Result<String, RegistryError>
    where
        F: FnOnce(&str) -> R,
    {
        let room_id = room_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut workspaces = self.workspaces.write().await;
        let rooms = workspaces.entry(workspace_id.to_string()).or_default();

        if rooms.contains_key(&room_id) {
            return Err(RegistryError::RoomExists {
                workspace_id: workspace_id.into(),
                room_id,
            });
        }

        let room = build(&room_id);
        rooms.insert(room_id.clone(), Arc::new(RwLock::new(room)));

        tracing::info!(
            workspace = %workspace_id,
            room = %room_id,
            "Room created"
        );
        Ok(room_id)
    }

    /// Look up a room handle.
    pub async fn get(
        &self,
        workspace_id: &str,
        room_id: &str,
    ) -> Result<Arc<RwLock<R>>, RegistryError> {
        self.workspaces
            .read()
            .await
            .get(workspace_id)
            .and_then(|rooms| rooms.get(room_id))
            .cloned()
            .ok_or_else(|| RegistryError::RoomNotFound {
                workspace_id: workspace_id.into(),
                room_id: room_id.into(),
            })
    }

    /// Remove a room, returning its handle so the caller can close the
    /// sessions still attached to it. Removing a missing room fails
    /// with `RoomNotFound`; empty workspaces are dropped.
    pub async fn remove(
        &self,
        workspace_id: &str,
        room_id: &str,
    ) -> Result<Arc<RwLock<R>>, RegistryError> {
        let mut workspaces = self.workspaces.write().await;
        let room = workspaces
            .get_mut(workspace_id)
            .and_then(|rooms| rooms.remove(room_id))
            .ok_or_else(|| RegistryError::RoomNotFound {
                workspace_id: workspace_id.into(),
                room_id: room_id.into(),
            })?;

        if workspaces
            .get(workspace_id)
            .is_some_and(|rooms| rooms.is_empty())
        {
            workspaces.remove(workspace_id);
        }

        tracing::info!(
            workspace = %workspace_id,
            room = %room_id,
            "Room deleted"
        );
        Ok(room)
    }

    /// Snapshot of the room handles in one workspace.
    pub async fn list(&self, workspace_id: &str) -> Vec<Arc<RwLock<R>>> {
        self.workspaces
            .read()
            .await
            .get(workspace_id)
            .map(|rooms| rooms.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn workspace_count(&self) -> usize {
        self.workspaces.read().await.len()
    }

    pub async fn room_count(&self) -> usize {
        self.workspaces
            .read()
            .await
            .values()
            .map(HashMap::len)
            .sum()
    }
}

impl<R> Default for Registry<R> {
    fn default() -> Self {
        Self::new()
    }
}
