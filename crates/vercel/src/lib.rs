//! Deployment capability: a typed client for the Vercel REST API.
//!
//! Registers hosted projects, triggers deployments from a git branch, and
//! fetches deployment readiness. Readiness strings are returned raw; the
//! deployment poller owns the translation onto internal vocabulary.

mod client;

pub use client::{
    DeploymentInfo, TriggeredDeployment, VercelClient, VercelError, VercelProject,
};
