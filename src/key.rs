//! [`Key`] is a wrapper around a Replicate API token.

use zeroize::Zeroizing;

/// Environment variable the token is read from by default.
pub const ENV_VAR: &str = "REPLICATE_API_TOKEN";

/// Error for when the token is absent or empty.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{var} is not set in the environment variables.")]
pub struct MissingKey {
    /// The variable that was looked up.
    pub var: String,
}

/// Stores a Replicate API token. The token is zeroized on drop and is never
/// printed by [`Debug`].
///
/// The object features a [`Display`] implementation that can be used to write
/// out the key. **Be sure to zeroize whatever you write it to**. Prefer
/// [`Key::read`] where a borrowed value is enough.
///
/// [`Display`]: std::fmt::Display
pub struct Key {
    token: Zeroizing<String>,
}

impl Key {
    /// Read the token from the environment variable `var`. A `.env` file is
    /// not loaded here, see [`Settings::from_env`].
    ///
    /// [`Settings::from_env`]: crate::config::Settings::from_env
    pub fn from_env(var: &str) -> Result<Self, MissingKey> {
        let missing = || MissingKey {
            var: var.to_string(),
        };
        let value = std::env::var(var).map_err(|_| missing())?;
        Self::try_from(value).map_err(|_| missing())
    }

    /// Borrow the token.
    pub fn read(&self) -> &str {
        self.token.as_str()
    }
}

impl TryFrom<String> for Key {
    type Error = MissingKey;

    /// Create a new key from a string. The string is moved into zeroizing
    /// storage. Whitespace around the token is dropped.
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let s = Zeroizing::new(s);
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MissingKey {
                var: ENV_VAR.to_string(),
            });
        }

        Ok(Self {
            token: Zeroizing::new(trimmed.to_string()),
        })
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("token", &"<redacted>").finish()
    }
}

impl std::fmt::Display for Key {
    /// Write out the key. Make sure to zeroize whatever you write it to if at
    /// all possible.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.read())
    }
}
