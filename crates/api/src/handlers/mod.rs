pub mod billing;
pub mod deployments;
pub mod fixes;
pub mod health;
pub mod projects;
pub mod webhooks;
