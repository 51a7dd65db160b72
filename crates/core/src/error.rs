use thiserror::Error;

use crate::model::{FilterError, ItemError, ParseIdError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
