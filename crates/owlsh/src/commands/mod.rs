pub mod exec;
pub mod sftp;
pub mod ssh;
