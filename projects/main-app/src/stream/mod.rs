pub mod decode;
pub mod http_transport;
pub mod jpeg;
pub mod probe;
pub mod service;
pub mod session;
pub mod traits;
pub mod url;

#[cfg(test)]
pub mod testing;
