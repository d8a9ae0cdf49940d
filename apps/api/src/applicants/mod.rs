//! Applicant-facing glue: profiles, credentials, resumes and repositories.
//! Skill derivation itself lives in `skills`.

pub mod github;
pub mod handlers;
pub mod service;
