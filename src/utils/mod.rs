pub mod calc;
pub mod position;
pub mod quote;
pub mod token;
