// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pd-core: domain types for the printerd job lifecycle engine

pub mod macros;

pub mod attrs;
pub mod error;
pub mod event;
pub mod invocation;
pub mod job;
pub mod paths;
pub mod printer;
pub mod reasons;

pub use attrs::{update_attributes, AttrValue, Attributes};
pub use attrs::{ATTR_DEVICE_URI, ATTR_DOCUMENT_FORMAT, ATTR_MEDIA, ATTR_USER};
pub use error::MethodError;
pub use event::{Event, Stage};
pub use invocation::{actions, AllowAll, AuthorizationChecker, Invocation};
pub use job::{JobId, JobState, CANCELED_BY_USER, JOB_INCOMING, PROCESSING_TO_STOP_POINT};
pub use printer::{canonicalize_id, PrinterState};
pub use reasons::StateReasons;
