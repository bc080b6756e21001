//! Shared helpers used across the echoprobe library and its tests
//!
//! This module contains the scripted transport and the canned local HTTP
//! servers that unit, integration and property tests drive the requesters
//! against.

pub mod test_utils;

pub use test_utils::{
    CapturedRequests, MockReply, MockTransport, RecordedRequest, http_response,
    spawn_canned_http_server, spawn_silent_server, split_request,
};
