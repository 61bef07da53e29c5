//! Synchronous prompt filtering — the pre-LLM checkpoint.
//!
//! Every outbound prompt is screened against a compiled signature corpus
//! over Unicode-normalized text and classified into allow / flag /
//! sanitize / block with an aggregate risk score.

pub mod entropy;
pub mod filter;
pub mod normalize;
pub mod signatures;

pub use filter::{FilterAction, FilterResult, InjectionAttempt, PromptFilter, SignatureMatch};
pub use signatures::{DetectionConfig, DetectionMode, PromptSignature, SignatureSet};
