//! Pairing answers.
//!
//! Labels either ask for a plain confirmation or for a PIN. eslink does not
//! implement a pairing policy of its own beyond answering those prompts
//! with a fixed PIN; stacks call [`PairingPolicy::respond`] from their
//! pairing-requested handler.

/// PIN the labels ship with.
pub const DEFAULT_PIN: &str = "0000";

/// The kind of prompt a stack raised while pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingKind {
    /// Just confirm the pairing.
    ConfirmOnly,
    /// Supply a PIN.
    ProvidePin,
    /// Confirm that both sides display the same PIN.
    ConfirmPinMatch,
}

/// What to answer to a [`PairingKind`] prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingResponse {
    Accept,
    AcceptWithPin(String),
    /// Leave the prompt unanswered.
    Decline,
}

/// Fixed-PIN pairing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingPolicy {
    pin: String,
}

impl PairingPolicy {
    /// Creates a policy that supplies `pin` when asked for one.
    pub fn with_pin(pin: impl Into<String>) -> Self {
        Self { pin: pin.into() }
    }

    /// The PIN supplied on [`PairingKind::ProvidePin`].
    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// Answers a pairing prompt.
    pub fn respond(&self, kind: PairingKind) -> PairingResponse {
        match kind {
            PairingKind::ConfirmOnly => PairingResponse::Accept,
            PairingKind::ProvidePin => PairingResponse::AcceptWithPin(self.pin.clone()),
            PairingKind::ConfirmPinMatch => PairingResponse::Decline,
        }
    }
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self::with_pin(DEFAULT_PIN)
    }
}
