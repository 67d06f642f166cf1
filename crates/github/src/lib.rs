//! Source control capability: a typed client for the GitHub REST API.
//!
//! Covers exactly what the pipelines need -- repository inspection, forking
//! into the managed organization, branch create/delete, and file
//! read/write with a blob-sha revision guard.

mod client;

pub use client::{
    FileContent, ForkedRepo, GitHubClient, GitHubError, RepoInfo,
};
