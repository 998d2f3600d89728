pub mod retention;
pub mod storage;
pub mod upload_service;
