pub mod format;
pub mod shopping;
pub mod staking;

pub use format::{
    format_confidence, format_spread_pick, format_total_pick, parse_confidence,
    parse_spread_pick, parse_total_pick,
};
pub use shopping::{
    consensus_line, filter_books, pick_moneyline, shop_spread, shop_total, GamePicks,
    LineStrategy, MoneylinePick, SpreadPick, TotalPick,
};
pub use staking::{ConfidenceTier, KellySettings};
