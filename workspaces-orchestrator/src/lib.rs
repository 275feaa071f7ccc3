//! Workspace management business logic
//!
//! This crate contains the core logic for listing and creating tenant
//! workspaces: store access, custom domain registration with the hosting
//! platform, and the routing cache entry for custom domains. It is consumed
//! by the workspaces-api HTTP service.

pub mod cache;
pub mod db;
pub mod domain;
pub mod error;
pub mod plan;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod workspace;

pub use cache::{DomainCache, MemoryDomainCache, RedisDomainCache, RootDomainEntry};
pub use domain::{
    DisabledProvider, DomainRegistration, DomainService, HostingProvider, VercelProvider,
    VercelSettings,
};
pub use error::{OrchestratorError, Result};
pub use plan::{Plan, Role, FREE_WORKSPACES_LIMIT};
pub use workspace::{
    CreateWorkspaceRequest, DomainSummary, MembershipRole, Workspace, WorkspaceId,
    WorkspaceOrchestrator, WorkspaceSettings, DEFAULT_DOMAINS,
};
