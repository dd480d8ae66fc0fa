use serde::Serialize;

/// Capabilities scripts may use beyond their own context
///
/// This is the full list of side effects a component script can have
/// outside its instance. Rendering code never calls these directly.
pub trait HostEnv {
    /// User-visible alert
    fn alert(&mut self, message: &str);

    /// `console.*` output
    fn console(&mut self, level: ConsoleLevel, message: &str);

    /// Open a URL in a new window
    fn open(&mut self, url: &str);

    /// Navigate the current view to a URL
    fn navigate(&mut self, url: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "log" | "debug" => Some(ConsoleLevel::Log),
            "info" => Some(ConsoleLevel::Info),
            "warn" => Some(ConsoleLevel::Warn),
            "error" => Some(ConsoleLevel::Error),
            _ => None,
        }
    }
}

/// One side effect requested by a script
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostEffect {
    Alert { message: String },
    Console { level: ConsoleLevel, message: String },
    Open { url: String },
    Navigate { url: String },
}

/// Host that records effects instead of performing them
///
/// Console output is also forwarded to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    effects: Vec<HostEffect>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> &[HostEffect] {
        &self.effects
    }

    pub fn take_effects(&mut self) -> Vec<HostEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                HostEffect::Alert { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn console_lines(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                HostEffect::Console { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl HostEnv for RecordingHost {
    fn alert(&mut self, message: &str) {
        self.effects.push(HostEffect::Alert {
            message: message.to_string(),
        });
    }

    fn console(&mut self, level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => tracing::info!(target: "tessera::console", "{}", message),
            ConsoleLevel::Warn => tracing::warn!(target: "tessera::console", "{}", message),
            ConsoleLevel::Error => tracing::error!(target: "tessera::console", "{}", message),
        }
        self.effects.push(HostEffect::Console {
            level,
            message: message.to_string(),
        });
    }

    fn open(&mut self, url: &str) {
        self.effects.push(HostEffect::Open {
            url: url.to_string(),
        });
    }

    fn navigate(&mut self, url: &str) {
        self.effects.push(HostEffect::Navigate {
            url: url.to_string(),
        });
    }
}
