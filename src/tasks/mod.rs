pub mod clock;
pub mod fault;
pub mod features;
pub mod frame;
pub mod inference;
pub mod output;
