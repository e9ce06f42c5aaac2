pub mod backup;
pub mod commands;
pub mod duration;
pub mod manager;
pub mod paths;
pub mod storage;
pub mod store;
pub mod ui;
pub mod validate;

#[cfg(test)]
pub mod test_utils;
