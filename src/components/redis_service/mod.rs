mod actor;

pub use actor::{keys, RedisActor, RedisActorHandle, RedisCommand};
