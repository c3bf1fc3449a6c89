//! Pool Ledger Service - invoicing, payment allocation and ledger queries for a
//! pool-cleaning business.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
