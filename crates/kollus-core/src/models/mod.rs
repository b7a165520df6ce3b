pub mod progress;
pub mod transfer;
pub mod upload;

pub use progress::{ProgressResult, ProgressSnapshot};
pub use transfer::{UploadFile, UploadOutcome};
pub use upload::{
    CreateUrlResponse, DataDestination, DestinationDescriptor, DestinationRequest,
    ResultDestination, UploadVariant,
};
