use crate::error::{ErrorBody, ErrorResponse};
use crate::validation::CreateWorkspaceBody;
use utoipa::OpenApi;
use workspaces_orchestrator::{DomainSummary, MembershipRole, Plan, Role, Workspace};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::workspaces::list_workspaces,
        crate::routes::workspaces::create_workspace,
    ),
    components(
        schemas(
            Workspace,
            DomainSummary,
            MembershipRole,
            Plan,
            Role,
            CreateWorkspaceBody,
            ErrorResponse,
            ErrorBody
        )
    ),
    tags(
        (name = "workspaces-api", description = "Workspace management API")
    )
)]
pub struct ApiDoc;
