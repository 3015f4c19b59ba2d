//! Payment proof verification.
//!
//! One [`Verifier`] per payment rail. The coordinator hands it the opaque
//! proof bytes plus the seller's account commitment, the anti-replay hash,
//! the expected fiat amount, and the payment time, and trusts the boolean
//! verdict. Anti-replay lives entirely in the verifier: it must refuse a
//! `TxIdHash` it has already seen, and it learns about committed
//! settlements through [`Verifier::consume`].

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use fiatlock_types::{AccountLinesHash, FiatlockError, PaymentRail, Result, TxIdHash};
use sha2::{Digest, Sha256};

/// Predicate over a payment proof.
pub trait Verifier: Send + Sync {
    fn verify_payment(
        &self,
        proof: &[u8],
        account_commitment: &AccountLinesHash,
        anti_replay_hash: &TxIdHash,
        expected_fiat_amount: u64,
        payment_time: &str,
    ) -> bool;

    /// Called once a settlement using `anti_replay_hash` has committed.
    fn consume(&self, _anti_replay_hash: &TxIdHash) {}
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Verifiers keyed by payment rail.
#[derive(Default, Clone)]
pub struct VerifierRegistry {
    verifiers: HashMap<PaymentRail, Arc<dyn Verifier>>,
}

impl VerifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the verifier for `rail`.
    pub fn register(&mut self, rail: PaymentRail, verifier: Arc<dyn Verifier>) {
        self.verifiers.insert(rail, verifier);
    }

    /// Returns `true` if a verifier was removed.
    pub fn remove(&mut self, rail: PaymentRail) -> bool {
        self.verifiers.remove(&rail).is_some()
    }

    /// # Errors
    /// Returns `VerifierNotConfigured` if no verifier serves `rail`.
    pub fn get(&self, rail: PaymentRail) -> Result<Arc<dyn Verifier>> {
        self.verifiers
            .get(&rail)
            .cloned()
            .ok_or(FiatlockError::VerifierNotConfigured(rail))
    }

    #[must_use]
    pub fn contains(&self, rail: PaymentRail) -> bool {
        self.verifiers.contains_key(&rail)
    }

    #[must_use]
    pub fn rails(&self) -> Vec<PaymentRail> {
        PaymentRail::ALL
            .into_iter()
            .filter(|r| self.contains(*r))
            .collect()
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierRegistry")
            .field("rails", &self.rails())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Attestation verifier
// ---------------------------------------------------------------------------

/// Domain prefix of the attested payment payload.
const PAYMENT_DOMAIN: &[u8] = b"fiatlock:payment:v1:";

/// Accepts payments signed by a trusted attester.
///
/// The proof is a 64-byte ed25519 signature over
/// `SHA-256("fiatlock:payment:v1:" || commitment || tx_id_hash || fiat_amount_be || payment_time)`.
/// Each `tx_id_hash` settles at most one trade.
pub struct AttestationVerifier {
    attester: VerifyingKey,
    seen: Mutex<HashSet<TxIdHash>>,
}

impl AttestationVerifier {
    #[must_use]
    pub fn new(attester: VerifyingKey) -> Self {
        Self {
            attester,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Build from a raw 32-byte public key.
    ///
    /// # Errors
    /// Returns `Configuration` if the bytes are not a valid ed25519 point.
    pub fn from_public_key(bytes: &[u8; 32]) -> Result<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(Self::new)
            .map_err(|e| FiatlockError::Configuration(format!("attester key: {e}")))
    }

    /// Mark hashes as already used, e.g. settlements restored from a
    /// snapshot.
    pub fn seed(&self, hashes: impl IntoIterator<Item = TxIdHash>) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.extend(hashes);
    }

    #[must_use]
    pub fn has_seen(&self, hash: &TxIdHash) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(hash)
    }

    /// Digest the attester signs.
    #[must_use]
    pub fn payload_digest(
        account_commitment: &AccountLinesHash,
        anti_replay_hash: &TxIdHash,
        fiat_amount: u64,
        payment_time: &str,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(PAYMENT_DOMAIN);
        hasher.update(account_commitment.as_bytes());
        hasher.update(anti_replay_hash.as_bytes());
        hasher.update(fiat_amount.to_be_bytes());
        hasher.update(payment_time.as_bytes());
        hasher.finalize().into()
    }

    /// Produce a proof as the attester would.
    #[must_use]
    pub fn attest(
        key: &SigningKey,
        account_commitment: &AccountLinesHash,
        anti_replay_hash: &TxIdHash,
        fiat_amount: u64,
        payment_time: &str,
    ) -> Vec<u8> {
        let digest =
            Self::payload_digest(account_commitment, anti_replay_hash, fiat_amount, payment_time);
        key.sign(&digest).to_bytes().to_vec()
    }
}

impl Verifier for AttestationVerifier {
    fn verify_payment(
        &self,
        proof: &[u8],
        account_commitment: &AccountLinesHash,
        anti_replay_hash: &TxIdHash,
        expected_fiat_amount: u64,
        payment_time: &str,
    ) -> bool {
        if self.has_seen(anti_replay_hash) {
            tracing::warn!(tx_id_hash = %anti_replay_hash, "payment already used");
            return false;
        }
        let Ok(signature) = Signature::from_slice(proof) else {
            return false;
        };
        let digest = Self::payload_digest(
            account_commitment,
            anti_replay_hash,
            expected_fiat_amount,
            payment_time,
        );
        self.attester.verify_strict(&digest, &signature).is_ok()
    }

    fn consume(&self, anti_replay_hash: &TxIdHash) {
        self.seed([*anti_replay_hash]);
    }
}

// ---------------------------------------------------------------------------
// Mock verifier
// ---------------------------------------------------------------------------

/// Verifier with a switchable verdict, for tests and local nodes.
#[derive(Debug)]
pub struct MockVerifier {
    accept: AtomicBool,
    calls: AtomicUsize,
}

impl MockVerifier {
    #[must_use]
    pub fn accepting() -> Self {
        Self {
            accept: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            accept: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Number of `verify_payment` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Verifier for MockVerifier {
    fn verify_payment(
        &self,
        _proof: &[u8],
        _account_commitment: &AccountLinesHash,
        _anti_replay_hash: &TxIdHash,
        _expected_fiat_amount: u64,
        _payment_time: &str,
    ) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accept.load(Ordering::SeqCst)
    }
}
