use alloy::primitives::B256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Info,
    Error,
    Success,
}

/// The one status line under the swap button. Each transition overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwapStatus {
    pub text: String,
    pub kind: StatusKind,
    /// Set once a transaction has been broadcast.
    pub tx_hash: Option<B256>,
}

impl SwapStatus {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
            tx_hash: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
            tx_hash: None,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Success,
            tx_hash: None,
        }
    }

    pub fn with_hash(mut self, hash: B256) -> Self {
        self.tx_hash = Some(hash);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tx_hash {
            Some(hash) => write!(f, "{} ({:#})", self.text, hash),
            None => write!(f, "{}", self.text),
        }
    }
}
