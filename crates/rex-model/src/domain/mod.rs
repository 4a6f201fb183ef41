mod env;
mod kv;
mod limits;

pub use env::Env;
pub use kv::KeyValue;
pub use limits::Limits;
