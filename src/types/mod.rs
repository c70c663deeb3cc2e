mod frames;
mod rest;

pub use frames::StreamFrame;
pub use rest::{
    AdminAccount, AdminListData, ApiEnvelope, AuthData, PromptResponse, UploadHistoryResponse,
    UploadRecord,
};
