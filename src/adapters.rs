pub mod adapter;
pub mod cached;
#[cfg(test)]
pub mod mock;
pub mod s3;
