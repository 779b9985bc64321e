//! SeaORM entities for the helpdesk tables.

pub mod audit_log;
pub mod comment;
pub mod member;
pub mod tag;
pub mod ticket;
pub mod ticket_tag;
