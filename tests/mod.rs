//! Integration tests for vodplay
//!
//! Tests are organized by component:
//! - api_test: HTTP content service client (mock server)
//! - cli_test: command handlers and exit codes (mock server)
//! - navigation_test: next/previous lookup per content type
//! - resolver_test: manifest selection and stream failures
//! - preview_test: scrub preview loading
//! - playhead_test: resume restore and the persistence loop
//! - session_test: the playback session state machine end to end
//!
//! `common` holds the in-memory service and recording surfaces they share.

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
