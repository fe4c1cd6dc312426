// Quick apply: a one-step application with a resume, stored as a pending application.

pub mod handlers;
pub mod quick_apply;
