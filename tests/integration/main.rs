//! Integration tests for the analysis pipeline
//!
//! These tests use wiremock to stand in for the YouTube Data API, the
//! Instagram web endpoints and oEmbed, and drive full analyses end-to-end
//! against a SQLite file.

mod common;
mod instagram;
mod lookup;
mod youtube;
