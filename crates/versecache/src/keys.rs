//! Cache key construction
//!
//! Keys are colon-joined semantic parts, e.g. `KJV:John:3:pages` or
//! `KJV:John:3:16:Explanation:Study`. Empty parts are skipped. Nothing here
//! guarantees uniqueness; callers pick parts that do not collide.

use std::fmt;

/// Small-tier key holding the last reading location
pub const READING_LOCATION: &str = "reading_location";

/// Small-tier key holding the selected AI mode
pub const AI_MODE: &str = "ai_mode";

/// Small-tier key holding the AI thinking sound toggle
pub const AI_THINKING_SOUND_ENABLED: &str = "ai_thinking_sound_enabled";

/// Small-tier key holding the app theme
pub const APP_THEME: &str = "app_theme";

const SEPARATOR: char = ':';

/// Builder for colon-joined keys
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StorageKey {
    parts: Vec<String>,
}

impl StorageKey {
    /// Empty key
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part; empty parts are dropped
    pub fn part(mut self, part: impl fmt::Display) -> Self {
        let part = part.to_string();
        if !part.is_empty() {
            self.parts.push(part);
        }
        self
    }

    /// Append a part only if present
    pub fn opt_part<P: fmt::Display>(self, part: Option<P>) -> Self {
        match part {
            Some(part) => self.part(part),
            None => self,
        }
    }

    /// Whether no parts were kept
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The joined key
    pub fn build(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}
