use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    /// CSV file holding registered users
    pub users_csv: PathBuf,
    /// Root directory of the local artifact backend
    pub local_root: PathBuf,
    pub github: GitHubConfig,
}

/// Settings for the GitHub Contents API backend
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,
    /// Repository folder that holds every user's uploads
    pub target_path: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let users_csv = env::var("USERS_CSV").unwrap_or_else(|_| "users.csv".to_string());
        let local_root = env::var("LOCAL_DIR").unwrap_or_else(|_| "local_backup".to_string());

        Ok(Config {
            server_host,
            server_port,
            allowed_origins,
            environment,
            users_csv: PathBuf::from(users_csv),
            local_root: PathBuf::from(local_root),
            github: GitHubConfig::from_env()?,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl GitHubConfig {
    fn from_env() -> Result<Self, String> {
        // Never fall back to unauthenticated calls
        let token = required("GITHUB_TOKEN")?;
        let repo_owner = required("REPO_OWNER")?;
        let repo_name = required("REPO_NAME")?;

        let api_url =
            env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string());
        let branch = env::var("BRANCH").unwrap_or_else(|_| "main".to_string());
        let target_path = env::var("TARGET_PATH").unwrap_or_else(|_| "saving".to_string());

        let timeout_secs = env::var("REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| "Invalid REMOTE_TIMEOUT_SECS")?;

        Ok(GitHubConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            repo_owner,
            repo_name,
            branch,
            target_path: target_path.trim_matches('/').to_string(),
            timeout_secs,
        })
    }
}

fn required(name: &str) -> Result<String, String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("{} must be set", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_missing_and_blank() {
        assert!(required("FILESAVER_TEST_UNSET_VARIABLE").is_err());

        env::set_var("FILESAVER_TEST_BLANK_VARIABLE", "   ");
        assert_eq!(
            required("FILESAVER_TEST_BLANK_VARIABLE").unwrap_err(),
            "FILESAVER_TEST_BLANK_VARIABLE must be set"
        );

        env::set_var("FILESAVER_TEST_SET_VARIABLE", "ghp_abc");
        assert_eq!(required("FILESAVER_TEST_SET_VARIABLE").unwrap(), "ghp_abc");
    }
}
