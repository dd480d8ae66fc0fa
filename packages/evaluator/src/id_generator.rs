use uuid::Uuid;

/// Seed for one render session: creation time plus a random salt
pub fn session_seed() -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), &salt[..8])
}

/// Sequential instance ID generator for one render session
#[derive(Debug, Clone)]
pub struct IDGenerator {
    seed: String,
    count: u32,
}

impl Default for IDGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IDGenerator {
    pub fn new() -> Self {
        Self::from_seed(session_seed())
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate the next instance ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("inst-{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
