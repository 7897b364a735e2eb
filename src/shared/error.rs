/// Crate-wide error taxonomy.
///
/// `Validation` is the only error pure business logic raises; the monitor and
/// dispatcher contain `NotFound`/`TransientData`/`Delivery` failures to the
/// smallest unit (one tenant, one ticket, one notification) and continue.
#[derive(Debug, thiserror::Error)]
pub enum HelpdeskError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Transient data error: {0}")]
    TransientData(String),
    #[error("Delivery error: {0}")]
    Delivery(String),
}

impl HelpdeskError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
