//! End-to-end tests for textblast-rs
//!
//! These tests send real messages through Twilio and require live
//! credentials. Run with: cargo test -- --ignored
//!
//! Required environment variables:
//! - TWILIO_ACCOUNT_SID: Account to send from
//! - TWILIO_AUTH_TOKEN: API credential for that account
//! - TWILIO_FROM_NUMBER: E.164 number messages are sent from
//! - TEXTBLAST_TEST_TO: E.164 number willing to receive test messages
