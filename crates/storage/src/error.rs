use snafu::Snafu;

use crate::ids::ConversationId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("store transport failed at {stage}: {details}"))]
    Transport {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("store rejected {stage}: {details}"))]
    Rejected {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("store response at {stage} could not be decoded: {details}"))]
    Decode {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("store response at {stage} was missing '{field}'"))]
    MissingData {
        stage: &'static str,
        field: &'static str,
    },
    #[snafu(display("store id '{raw}' is invalid for {id_kind}"))]
    InvalidId {
        stage: &'static str,
        id_kind: &'static str,
        raw: String,
        source: uuid::Error,
    },
    #[snafu(display("subscription for conversation {conversation_id} failed at {stage}: {details}"))]
    Subscription {
        stage: &'static str,
        conversation_id: ConversationId,
        details: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
