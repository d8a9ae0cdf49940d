pub mod applicant;
pub mod credential;
pub mod job;
pub mod notification;
pub mod skill;
pub mod skill_test;
