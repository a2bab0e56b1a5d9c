// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire shapes shared by every controller call.
//!
//! The controller answers nearly every action with the same envelope:
//! `{"return": bool, "reason": string, "results": ...}`. This module holds
//! that envelope, the response checks that decide which failures a caller
//! tolerates, and the payload capability used to refresh the session token
//! when a request is retried.

mod check;
mod envelope;
mod payload;
mod upload;

pub use check::{BasicCheck, CheckApiResponse, IgnoreCheck, NotFoundCheck};
pub use envelope::{
    ApiEnvelope, ApiErrorBody, ApiResponse, AsyncTaskStatus, HaCreateResponse, LoginResponse,
};
pub use payload::{FormParams, SessionPayload, SESSION_TOKEN_FIELD};
pub use upload::{UploadFile, UploadSource};
