pub mod buy;
pub mod filters;
pub mod scanner;
pub mod trades;

pub use buy::{BuyCheck, BuyDetector, BuyEvaluation, is_valid_buy};
pub use filters::{
    AcceptAll, AccountMembership, EnrichedBuy, TokenTransferMembership, TransactionFilter,
};
pub use scanner::{ScanOutcome, Termination, WindowScanner};
pub use trades::{
    attach_surrounding_trades, common_wallets, fetch_transaction, find_focus_trades,
    find_surrounding_trades, find_token_buys, report_wallets, token_creation_date,
    token_pair_label,
};
