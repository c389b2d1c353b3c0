pub mod export;
pub mod record;
pub mod ticks;
pub mod top;
