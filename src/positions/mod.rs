mod cache;
mod load;
mod parse;
mod record;

pub use cache::TtlCache;
pub use load::load_snapshot;
#[cfg(test)]
pub use parse::parse_snapshot;
pub use record::{Market, Snapshot, WalletStake, layout_entities};
