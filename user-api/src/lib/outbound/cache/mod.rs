pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;
