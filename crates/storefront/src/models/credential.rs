//! Stored `WebAuthn` passkeys.

use chrono::{DateTime, Utc};
use webauthn_rs::prelude::Passkey;

use jouwwinkel_core::{CredentialId, CustomerId};

/// A passkey registered to a customer account.
#[derive(Debug, Clone)]
pub struct CustomerCredential {
    pub id: CredentialId,
    pub customer_id: CustomerId,
    /// Raw credential ID bytes, used to find the passkey at sign-in.
    pub webauthn_id: Vec<u8>,
    pub passkey: Passkey,
    /// Friendly name such as "MacBook".
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}
