use std::fmt;

/// Upper bound on configured provider keys.
pub const MAX_CREDENTIAL_SLOTS: usize = 5;

/// A provider API key. Debug/Display never reveal the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    slot: usize,
    secret: String,
}

impl Credential {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn expose_secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("slot", &self.slot)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credential#{}", self.slot)
    }
}

/// Ordered, immutable set of provider keys tried one after another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPool {
    slots: Vec<Credential>,
}

impl CredentialPool {
    /// Blank keys are skipped and anything past the fifth is dropped.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = keys
            .into_iter()
            .map(Into::into)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .take(MAX_CREDENTIAL_SLOTS)
            .enumerate()
            .map(|(slot, secret)| Credential { slot, secret })
            .collect();
        Self { slots }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.slots.iter()
    }
}
