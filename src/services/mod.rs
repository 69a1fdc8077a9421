pub mod cdn;
pub mod classify;
pub mod cleanup;
pub mod cms;
pub mod comparator;
pub mod folder_sync;
pub mod http;
pub mod inventory;
pub mod reference_writer;
pub mod report;
pub mod retry;
pub mod validate;
pub mod workflow;

#[cfg(test)]
pub mod testing;
