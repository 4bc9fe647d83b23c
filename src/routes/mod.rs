//! Route handlers shared by the whole back-office

pub mod health;
pub mod invoices;
