//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! against temporary frontier, export and store directories.

mod crawl_tests;
mod resume_tests;
