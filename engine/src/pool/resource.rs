use crate::error::BoxError;

use core::fmt;
use std::any::Any;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The kinds of resource the pool manages. Each kind has its own capacity,
/// idle list and wait queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
  Database,
  Cache,
  Http,
  File,
  Memory,
  BackgroundTask,
}

impl ResourceType {
  pub const ALL: [ResourceType; 6] = [
    ResourceType::Database,
    ResourceType::Cache,
    ResourceType::Http,
    ResourceType::File,
    ResourceType::Memory,
    ResourceType::BackgroundTask,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceType::Database => "database",
      ResourceType::Cache => "cache",
      ResourceType::Http => "http",
      ResourceType::File => "file",
      ResourceType::Memory => "memory",
      ResourceType::BackgroundTask => "background_task",
    }
  }
}

impl fmt::Display for ResourceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ResourceType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
    ResourceType::ALL
      .into_iter()
      .find(|kind| kind.as_str() == normalized)
      .ok_or_else(|| {
        format!(
          "Unknown resource type '{}'. Expected one of: database, cache, http, file, memory, background_task.",
          s
        )
      })
  }
}

/// The object a factory produced for a resource. Callers downcast it with
/// [`Resource::handle_as`].
pub type ResourceHandle = Arc<dyn Any + Send + Sync>;

/// Builds the handle for a new resource of the given type.
pub type ResourceFactory = Arc<dyn Fn(ResourceType) -> Result<ResourceHandle, BoxError> + Send + Sync>;

/// Tears a resource down when the pool destroys it.
pub type ResourceCleanup = Arc<dyn Fn(&Resource) -> Result<(), BoxError> + Send + Sync>;

/// A pooled resource.
///
/// Owned by the pool while idle; between `acquire` and `release` the caller
/// owns it and must hand it back with [`crate::pool::ResourcePool::release`].
pub struct Resource {
  pub(crate) id: String,
  pub(crate) kind: ResourceType,
  pub(crate) created_at: Instant,
  pub(crate) last_used: Instant,
  pub(crate) use_count: u64,
  pub(crate) active: bool,
  pub(crate) metadata: HashMap<String, serde_json::Value>,
  pub(crate) handle: Option<ResourceHandle>,
  pub(crate) cleanup: Option<ResourceCleanup>,
}

impl fmt::Debug for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Resource")
      .field("id", &self.id)
      .field("kind", &self.kind)
      .field("use_count", &self.use_count)
      .field("active", &self.active)
      .field("metadata", &self.metadata)
      .field("has_handle", &self.handle.is_some())
      .field("has_cleanup", &self.cleanup.is_some())
      .finish()
  }
}

impl Resource {
  pub(crate) fn new(
    id: String,
    kind: ResourceType,
    handle: Option<ResourceHandle>,
    cleanup: Option<ResourceCleanup>,
  ) -> Self {
    let now = Instant::now();
    Self {
      id,
      kind,
      created_at: now,
      last_used: now,
      use_count: 0,
      active: false,
      metadata: HashMap::new(),
      handle,
      cleanup,
    }
  }

  /// Hands the resource to a caller, merging in the caller's metadata.
  pub(crate) fn check_out(&mut self, metadata: HashMap<String, serde_json::Value>) {
    self.active = true;
    self.last_used = Instant::now();
    self.use_count += 1;
    self.metadata.extend(metadata);
  }

  pub(crate) fn run_cleanup(&self) -> Result<(), BoxError> {
    match &self.cleanup {
      Some(cleanup) => cleanup(self),
      None => Ok(()),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn kind(&self) -> ResourceType {
    self.kind
  }

  pub fn created_at(&self) -> Instant {
    self.created_at
  }

  /// When the resource was last checked out.
  pub fn last_used(&self) -> Instant {
    self.last_used
  }

  pub fn use_count(&self) -> u64 {
    self.use_count
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
    &self.metadata
  }

  pub fn metadata_mut(&mut self) -> &mut HashMap<String, serde_json::Value> {
    &mut self.metadata
  }

  pub fn handle(&self) -> Option<&ResourceHandle> {
    self.handle.as_ref()
  }

  /// The factory's handle, if there is one and it is a `T`.
  pub fn handle_as<T>(&self) -> Option<Arc<T>>
  where
    T: Any + Send + Sync,
  {
    self.handle.clone()?.downcast::<T>().ok()
  }
}
