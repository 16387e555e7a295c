pub mod expiry;
pub mod payouts;
