pub mod payouts;
pub mod subscription;
