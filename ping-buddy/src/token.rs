use std::fmt;

/// Credential for the result stream of one job. The service recomputes it from the job id,
/// so it never has to be exchanged separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middle 16 hex digits of `md5(task_id + suffix)`.
pub fn derive(task_id: &str, suffix: &str) -> AuthToken {
    let digest = md5::compute(format!("{}{}", task_id, suffix));
    let hex = format!("{:x}", digest);
    AuthToken(hex[8..24].to_string())
}
