pub mod core;
pub mod error;
mod interpret_effect;
pub mod main;
#[cfg(test)]
mod tests;
