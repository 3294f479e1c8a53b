//! Cache infrastructure - Cache implementations and key derivation

mod factory;
mod in_memory;
mod key_deriver;
mod redis;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use key_deriver::HmacKeyDeriver;
pub use self::redis::{RedisCache, RedisCacheConfig};

pub(crate) use self::redis::connect as connect_redis;
