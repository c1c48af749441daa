pub mod change;
pub mod error;
pub mod normalize;
pub mod types;
pub mod volatility;

pub use change::*;
pub use error::*;
pub use normalize::normalize_account;
pub use types::*;
pub use volatility::*;
