use starwake_protocol::EmpireId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no relation from {from} to {to}")]
    MissingRelation { from: EmpireId, to: EmpireId },
    #[error("unknown empire: {0}")]
    UnknownEmpire(EmpireId),
    #[error("unknown tech: {0}")]
    UnknownTech(String),
}
