//! Unit tests for the rtchat-protocol crate.
