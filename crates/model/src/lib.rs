pub mod billing;
pub mod decimal;
pub mod earnings;
pub mod instructor;
pub mod order;
pub mod payout;
pub mod schedule;
