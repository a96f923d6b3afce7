pub mod db;
pub mod redis;

pub use self::db::{connect_to_mongo, supports_transactions};
pub use self::redis::{RedisService, connect_to_redis};
