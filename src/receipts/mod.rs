//! Receipt rendering
//!
//! Receipts are produced by an external renderer (PDF or otherwise); the
//! core only attaches the resulting artifact reference to the ledger entry.
//! Rendering is best-effort and decoupled from the atomic transfer: it runs
//! after the monetary mutation committed, and a failure is logged, never
//! propagated.

use crate::ledger::LedgerEntry;

/// A rendered receipt artifact. The core stores `reference` on the ledger
/// entry and does not depend on the byte format.
#[derive(Debug, Clone)]
pub struct ReceiptArtifact {
    /// Stable reference to the stored artifact (path, object key, ...)
    pub reference: String,
    pub bytes: Vec<u8>,
}

/// Receipt rendering errors
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("Receipt rendering failed: {0}")]
    Render(String),

    #[error("Receipt storage failed: {0}")]
    Storage(String),
}

/// External collaborator that renders and stores a receipt for a completed
/// ledger entry. The transfer engine holds an optional renderer; absence
/// means receipts are disabled.
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, entry: &LedgerEntry) -> Result<ReceiptArtifact, ReceiptError>;
}
