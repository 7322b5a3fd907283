pub mod balances;
pub mod init;
pub mod settle;
pub mod simplify;
