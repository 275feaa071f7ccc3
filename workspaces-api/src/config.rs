use serde::Deserialize;
use std::path::PathBuf;
use workspaces_orchestrator::{
    VercelSettings, WorkspaceSettings, DEFAULT_DOMAINS, FREE_WORKSPACES_LIMIT,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Routing cache; an in-process map is used when unset
    #[serde(default = "default_redis_url")]
    pub redis_url: Option<String>,

    #[serde(default = "default_free_workspaces_limit")]
    pub free_workspaces_limit: i64,

    #[serde(default = "default_default_domains")]
    pub default_domains: Vec<String>,

    #[serde(default = "default_vercel_api_token")]
    pub vercel_api_token: Option<String>,

    #[serde(default = "default_vercel_project_id")]
    pub vercel_project_id: Option<String>,

    #[serde(default = "default_vercel_team_id")]
    pub vercel_team_id: Option<String>,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_bind_addr() -> String {
    non_empty_env("WORKSPACES_API_BIND").unwrap_or_else(|| "0.0.0.0:3131".to_string())
}

fn default_db_path() -> PathBuf {
    if let Some(path) = non_empty_env("WORKSPACES_API_DB_PATH") {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata)
            .join("workspaces")
            .join("api")
            .join("workspaces.db")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".workspaces")
            .join("api")
            .join("workspaces.db")
    }
}

fn default_redis_url() -> Option<String> {
    non_empty_env("WORKSPACES_REDIS_URL")
}

fn default_free_workspaces_limit() -> i64 {
    non_empty_env("WORKSPACES_FREE_LIMIT")
        .and_then(|s| s.parse().ok())
        .unwrap_or(FREE_WORKSPACES_LIMIT)
}

fn default_default_domains() -> Vec<String> {
    match non_empty_env("WORKSPACES_DEFAULT_DOMAINS") {
        Some(list) => parse_domain_list(&list),
        None => DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
    }
}

fn default_vercel_api_token() -> Option<String> {
    non_empty_env("VERCEL_API_TOKEN")
}

fn default_vercel_project_id() -> Option<String> {
    non_empty_env("VERCEL_PROJECT_ID")
}

fn default_vercel_team_id() -> Option<String> {
    non_empty_env("VERCEL_TEAM_ID")
}

/// Split a comma separated domain list, dropping blanks and repeats
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    for domain in raw.split(',').map(|d| d.trim().to_lowercase()) {
        if !domain.is_empty() && !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    domains
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            redis_url: default_redis_url(),
            free_workspaces_limit: default_free_workspaces_limit(),
            default_domains: default_default_domains(),
            vercel_api_token: default_vercel_api_token(),
            vercel_project_id: default_vercel_project_id(),
            vercel_team_id: default_vercel_team_id(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Hosting provider settings, present only when both token and project are set
    pub fn vercel_settings(&self) -> Option<VercelSettings> {
        match (&self.vercel_api_token, &self.vercel_project_id) {
            (Some(token), Some(project_id)) => Some(VercelSettings::new(
                token.clone(),
                project_id.clone(),
                self.vercel_team_id.clone(),
            )),
            _ => None,
        }
    }

    pub fn workspace_settings(&self) -> WorkspaceSettings {
        WorkspaceSettings {
            free_workspaces_limit: self.free_workspaces_limit,
            default_domains: self.default_domains.clone(),
        }
    }
}
