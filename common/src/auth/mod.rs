pub mod verifier;

pub use verifier::{IdentityAssertion, SignatureVerifier, Verdict, VerifyReason};
