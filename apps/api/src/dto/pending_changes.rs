mod conversions;
mod types;

pub use types::{
    ApprovedPendingChangeResponse, PendingChangeListQuery, PendingChangeResponse,
    RejectPendingChangeRequest, SubmitPendingChangeRequest,
};
