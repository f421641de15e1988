pub mod aero;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod datalog;
pub mod geodesy;
pub mod output;
pub mod replay;
pub mod resolve;
pub mod traffic;
