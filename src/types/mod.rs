//! Data types shared by sources, the scanner and the trade pipeline.

pub mod record;
pub mod trades;
pub mod window;

pub use record::{
    NativeTransfer, SignatureInfo, TokenAccount, TokenBalance, TokenTransfer, TransactionPage,
    TransactionRecord,
};
pub use trades::{
    EnrichedSurroundingTrade, FocusTrade, SurroundingReport, SurroundingTrade, TokenBuy,
};
pub use window::ScanWindow;
