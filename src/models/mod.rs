pub mod http;
pub mod jsonrpc;
pub mod payment;
pub mod tool;
pub mod zyfai;
