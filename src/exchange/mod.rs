//! 问答记录：记录结构、追加式存储与永不报错的记录器

pub mod logger;
pub mod record;
pub mod store;

pub use logger::ExchangeLogger;
pub use record::{Exchange, ExchangeRecord, DATE_FORMAT};
pub use store::{ExchangeStore, FileExchangeStore, MemoryExchangeStore};
