pub mod layout;
pub mod multipliers;
