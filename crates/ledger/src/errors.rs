use bson::oid::ObjectId;
use gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("No payout account for instructor {0}")]
    MissingAccountId(ObjectId),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Common(#[from] eyre::Error),
}
